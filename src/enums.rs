//! Closed enumerations stored as text columns.
//!
//! Request payloads deserialize straight into these types, so unknown
//! values are rejected before anything reaches the database.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Approval status of a single drawing row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawingStatus {
    Draft,
    ForReview,
    ForApproval,
    Approved,
    ForConstruction,
    AsBuilt,
    /// Set by the supersession linker when a newer revision is issued.
    Superseded,
    /// Terminal; reached through soft delete.
    Obsolete,
}

impl DrawingStatus {
    pub const ALL: [DrawingStatus; 8] = [
        Self::Draft,
        Self::ForReview,
        Self::ForApproval,
        Self::Approved,
        Self::ForConstruction,
        Self::AsBuilt,
        Self::Superseded,
        Self::Obsolete,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::ForReview => "for_review",
            Self::ForApproval => "for_approval",
            Self::Approved => "approved",
            Self::ForConstruction => "for_construction",
            Self::AsBuilt => "as_built",
            Self::Superseded => "superseded",
            Self::Obsolete => "obsolete",
        }
    }

    /// Whether a caller may request this status directly.
    pub const fn is_manual_target(&self) -> bool {
        !matches!(self, Self::Superseded)
    }
}

/// Kind of sheet. The numbering generator uses the three letter code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawingType {
    Architectural,
    Structural,
    Mechanical,
    Electrical,
    Plumbing,
    Civil,
    Landscape,
    Interior,
    Detail,
    Schedule,
}

impl DrawingType {
    pub const ALL: [DrawingType; 10] = [
        Self::Architectural,
        Self::Structural,
        Self::Mechanical,
        Self::Electrical,
        Self::Plumbing,
        Self::Civil,
        Self::Landscape,
        Self::Interior,
        Self::Detail,
        Self::Schedule,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Architectural => "architectural",
            Self::Structural => "structural",
            Self::Mechanical => "mechanical",
            Self::Electrical => "electrical",
            Self::Plumbing => "plumbing",
            Self::Civil => "civil",
            Self::Landscape => "landscape",
            Self::Interior => "interior",
            Self::Detail => "detail",
            Self::Schedule => "schedule",
        }
    }

    pub const fn code(&self) -> &'static str {
        match self {
            Self::Architectural => "ARC",
            Self::Structural => "STR",
            Self::Mechanical => "MEC",
            Self::Electrical => "ELE",
            Self::Plumbing => "PLU",
            Self::Civil => "CIV",
            Self::Landscape => "LAN",
            Self::Interior => "INT",
            Self::Detail => "DET",
            Self::Schedule => "SCH",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Discipline {
    Architecture,
    Structure,
    Mechanical,
    Electrical,
    Plumbing,
    Civil,
    Landscape,
    Interior,
    FireProtection,
}

impl Discipline {
    pub const ALL: [Discipline; 9] = [
        Self::Architecture,
        Self::Structure,
        Self::Mechanical,
        Self::Electrical,
        Self::Plumbing,
        Self::Civil,
        Self::Landscape,
        Self::Interior,
        Self::FireProtection,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Architecture => "architecture",
            Self::Structure => "structure",
            Self::Mechanical => "mechanical",
            Self::Electrical => "electrical",
            Self::Plumbing => "plumbing",
            Self::Civil => "civil",
            Self::Landscape => "landscape",
            Self::Interior => "interior",
            Self::FireProtection => "fire_protection",
        }
    }

    pub const fn code(&self) -> &'static str {
        match self {
            Self::Architecture => "A",
            Self::Structure => "S",
            Self::Mechanical => "M",
            Self::Electrical => "E",
            Self::Plumbing => "P",
            Self::Civil => "C",
            Self::Landscape => "L",
            Self::Interior => "I",
            Self::FireProtection => "F",
        }
    }
}

macro_rules! text_enum_impls {
    ($ty:ident, $label:literal) => {
        impl FromStr for $ty {
            type Err = EngineError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|candidate| candidate.as_str() == value)
                    .ok_or_else(|| EngineError::validation(format!("unknown {} '{value}'", $label)))
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum_impls!(DrawingStatus, "status");
text_enum_impls!(DrawingType, "drawing type");
text_enum_impls!(Discipline, "discipline");
