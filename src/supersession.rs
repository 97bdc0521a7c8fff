//! The only code that writes `supersedes` / `superseded_by`.
//!
//! A lineage is a doubly linked list of drawing rows: every row points back
//! to the row it replaced and forward to the row that replaced it, and only
//! the tail carries `current_version = true`.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::enums::DrawingStatus;
use crate::error::{EngineError, EngineResult};
use crate::models::{Drawing, NewDrawing};
use crate::schema::drawings;

/// Replaces `previous` with a freshly inserted row, linking both directions.
///
/// `previous` must be locked by the caller and still current. The new row's
/// `supersedes` and `current_version` are set here regardless of what the
/// caller put in `next`.
pub fn supersede(
    conn: &mut PgConnection,
    previous: &Drawing,
    mut next: NewDrawing,
) -> EngineResult<(Drawing, Drawing)> {
    if !previous.current_version || previous.superseded_by.is_some() {
        return Err(EngineError::conflict(format!(
            "drawing {} is not the current version of its lineage",
            previous.id
        )));
    }

    let now = Utc::now().naive_utc();

    diesel::update(drawings::table.find(previous.id))
        .set((
            drawings::current_version.eq(false),
            drawings::updated_at.eq(now),
        ))
        .execute(conn)?;

    next.supersedes = Some(previous.id);
    next.current_version = true;
    let inserted: Drawing = diesel::insert_into(drawings::table)
        .values(&next)
        .get_result(conn)?;

    let retired: Drawing = diesel::update(drawings::table.find(previous.id))
        .set((
            drawings::superseded_by.eq(Some(inserted.id)),
            drawings::status.eq(DrawingStatus::Superseded.as_str()),
            drawings::updated_at.eq(now),
        ))
        .get_result(conn)?;

    Ok((retired, inserted))
}

/// Every row of the lineage containing `drawing_id`, oldest first.
pub fn lineage(conn: &mut PgConnection, drawing_id: Uuid) -> EngineResult<Vec<Drawing>> {
    let start: Drawing = drawings::table
        .find(drawing_id)
        .first(conn)
        .optional()?
        .ok_or_else(|| EngineError::not_found("drawing"))?;

    let mut seen: HashSet<Uuid> = HashSet::from([start.id]);
    let mut older: Vec<Drawing> = Vec::new();
    let mut cursor = start.supersedes;
    while let Some(id) = cursor {
        if !seen.insert(id) {
            return Err(EngineError::conflict(format!(
                "supersession cycle detected at drawing {id}"
            )));
        }
        let row: Drawing = drawings::table.find(id).first(conn)?;
        cursor = row.supersedes;
        older.push(row);
    }
    older.reverse();

    let mut chain = older;
    let mut cursor = start.superseded_by;
    chain.push(start);
    while let Some(id) = cursor {
        if !seen.insert(id) {
            return Err(EngineError::conflict(format!(
                "supersession cycle detected at drawing {id}"
            )));
        }
        let row: Drawing = drawings::table.find(id).first(conn)?;
        cursor = row.superseded_by;
        chain.push(row);
    }

    Ok(chain)
}

pub fn lineage_ids(conn: &mut PgConnection, drawing_id: Uuid) -> EngineResult<Vec<Uuid>> {
    Ok(lineage(conn, drawing_id)?
        .into_iter()
        .map(|row| row.id)
        .collect())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineageViolation {
    /// `from.superseded_by = to` but `to.supersedes` does not point back.
    DanglingForward { from: Uuid, to: Uuid },
    /// `from.supersedes = to` but `to.superseded_by` does not point back.
    DanglingBackward { from: Uuid, to: Uuid },
    /// The lineage rooted at `root` does not have exactly one current row.
    CurrentCount { root: Uuid, current: usize },
    /// Following `superseded_by` from `root` revisits a row.
    Cycle { root: Uuid },
}

/// Checks mutual links and the single-current rule over a set of rows,
/// typically every drawing of one project.
pub fn verify(rows: &[Drawing]) -> Vec<LineageViolation> {
    let by_id: HashMap<Uuid, &Drawing> = rows.iter().map(|row| (row.id, row)).collect();
    let mut violations = Vec::new();

    for row in rows {
        if let Some(next) = row.superseded_by {
            let back = by_id.get(&next).and_then(|target| target.supersedes);
            if back != Some(row.id) {
                violations.push(LineageViolation::DanglingForward {
                    from: row.id,
                    to: next,
                });
            }
        }
        if let Some(prev) = row.supersedes {
            let forward = by_id.get(&prev).and_then(|target| target.superseded_by);
            if forward != Some(row.id) {
                violations.push(LineageViolation::DanglingBackward {
                    from: row.id,
                    to: prev,
                });
            }
        }
    }

    for root in rows.iter().filter(|row| row.supersedes.is_none()) {
        let mut seen: HashSet<Uuid> = HashSet::new();
        let mut current = 0usize;
        let mut cursor = Some(root.id);
        let mut cyclic = false;
        while let Some(id) = cursor {
            if !seen.insert(id) {
                cyclic = true;
                break;
            }
            let Some(row) = by_id.get(&id) else {
                break;
            };
            if row.current_version {
                current += 1;
            }
            cursor = row.superseded_by;
        }
        if cyclic {
            violations.push(LineageViolation::Cycle { root: root.id });
        }
        if current != 1 {
            violations.push(LineageViolation::CurrentCount {
                root: root.id,
                current,
            });
        }
    }

    violations
}
