use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::access_log::{self, ClientMetadata, ACTION_TRANSMITTED};
use crate::drawings::{check_length, check_optional_length, find_project, non_empty};
use crate::error::{EngineError, EngineResult};
use crate::models::{NewTransmittal, NewTransmittalItem, Transmittal, TransmittalItem};
use crate::numbering;
use crate::schema::{drawings, transmittal_items, transmittals};

pub const DEFAULT_COPIES: i32 = 1;
pub const DEFAULT_FORMAT: &str = "PDF";
pub const DEFAULT_PURPOSE: &str = "For Information";
const MAX_RECIPIENT_LEN: usize = 255;
const MAX_PURPOSE_LEN: usize = 64;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTransmittalInput {
    pub recipient_name: Option<String>,
    pub recipient_company: Option<String>,
    pub recipient_email: Option<String>,
    pub purpose: Option<String>,
    pub remarks: Option<String>,
    pub transmitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub drawing_ids: Vec<Uuid>,
}

#[derive(Debug, Clone)]
pub struct TransmittalWithItems {
    pub transmittal: Transmittal,
    pub items: Vec<TransmittalItem>,
}

impl TransmittalWithItems {
    pub fn drawing_ids(&self) -> Vec<Uuid> {
        self.items.iter().map(|item| item.drawing_id).collect()
    }
}

fn dedup_preserving_order(ids: Vec<Uuid>) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

/// Issues a transmittal for a set of drawings.
///
/// The transmittal row and all of its items are one unit: if any item
/// cannot be written, the transmittal is not kept either.
pub fn create_transmittal(
    conn: &mut PgConnection,
    project_id: Uuid,
    input: CreateTransmittalInput,
    actor: &str,
    client: &ClientMetadata,
) -> EngineResult<TransmittalWithItems> {
    let recipient_name = non_empty(input.recipient_name)
        .ok_or_else(|| EngineError::validation("recipient_name is required"))?;
    let recipient_company = non_empty(input.recipient_company);
    let recipient_email = non_empty(input.recipient_email);
    let purpose = non_empty(input.purpose).unwrap_or_else(|| DEFAULT_PURPOSE.to_string());
    check_length("recipient_name", &recipient_name, MAX_RECIPIENT_LEN)?;
    check_optional_length(
        "recipient_company",
        recipient_company.as_deref(),
        MAX_RECIPIENT_LEN,
    )?;
    check_optional_length("recipient_email", recipient_email.as_deref(), MAX_RECIPIENT_LEN)?;
    check_length("purpose", &purpose, MAX_PURPOSE_LEN)?;

    let drawing_ids = dedup_preserving_order(input.drawing_ids);
    if drawing_ids.is_empty() {
        return Err(EngineError::validation(
            "drawing_ids must contain at least one drawing",
        ));
    }

    let result = conn.transaction::<TransmittalWithItems, EngineError, _>(|conn| {
        let project = find_project(conn, project_id)?;

        let foreign: Vec<Uuid> = drawings::table
            .filter(drawings::id.eq_any(&drawing_ids))
            .filter(drawings::project_id.ne(project_id))
            .select(drawings::id)
            .load(conn)?;
        if let Some(id) = foreign.first() {
            return Err(EngineError::validation(format!(
                "drawing {id} belongs to another project"
            )));
        }

        let transmittal_number =
            numbering::allocate_transmittal_number(conn, project.id, &project.code)?;

        let new_transmittal = NewTransmittal {
            id: Uuid::new_v4(),
            project_id,
            transmittal_number,
            recipient_name,
            recipient_company,
            recipient_email,
            purpose,
            remarks: non_empty(input.remarks),
            transmitted_by: actor.to_string(),
            transmitted_at: input
                .transmitted_at
                .map(|at| at.naive_utc())
                .unwrap_or_else(|| Utc::now().naive_utc()),
        };
        let transmittal: Transmittal = diesel::insert_into(transmittals::table)
            .values(&new_transmittal)
            .get_result(conn)?;

        let mut items = Vec::with_capacity(drawing_ids.len());
        for drawing_id in &drawing_ids {
            let item = NewTransmittalItem {
                transmittal_id: transmittal.id,
                drawing_id: *drawing_id,
                copies: DEFAULT_COPIES,
                format: DEFAULT_FORMAT.to_string(),
            };
            let inserted: TransmittalItem = diesel::insert_into(transmittal_items::table)
                .values(&item)
                .get_result(conn)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                        EngineError::not_found(format!("drawing {drawing_id}"))
                    }
                    other => EngineError::from(other),
                })?;
            access_log::record(conn, *drawing_id, actor, ACTION_TRANSMITTED, client)?;
            items.push(inserted);
        }

        Ok(TransmittalWithItems { transmittal, items })
    });

    match result {
        Ok(created) => {
            info!(
                transmittal_id = %created.transmittal.id,
                transmittal_number = %created.transmittal.transmittal_number,
                drawings = created.items.len(),
                actor = %actor,
                "transmittal issued"
            );
            Ok(created)
        }
        Err(err) => {
            warn!(project_id = %project_id, error = %err, "transmittal rejected");
            Err(err)
        }
    }
}

pub fn get_transmittal(
    conn: &mut PgConnection,
    transmittal_id: Uuid,
) -> EngineResult<TransmittalWithItems> {
    let transmittal: Transmittal = transmittals::table
        .find(transmittal_id)
        .first(conn)
        .optional()?
        .ok_or_else(|| EngineError::not_found("transmittal"))?;
    let items = load_items(conn, transmittal_id)?;
    Ok(TransmittalWithItems { transmittal, items })
}

fn load_items(conn: &mut PgConnection, transmittal_id: Uuid) -> EngineResult<Vec<TransmittalItem>> {
    Ok(transmittal_items::table
        .filter(transmittal_items::transmittal_id.eq(transmittal_id))
        .order(transmittal_items::created_at.asc())
        .load(conn)?)
}

/// Records receipt. Acknowledgement is written once; later calls return the
/// stored acknowledgement untouched. The transmitted items come back with it.
pub fn acknowledge_transmittal(
    conn: &mut PgConnection,
    transmittal_id: Uuid,
    actor: &str,
) -> EngineResult<TransmittalWithItems> {
    let (transmittal, changed) = conn.transaction::<(Transmittal, bool), EngineError, _>(|conn| {
        let existing: Transmittal = transmittals::table
            .find(transmittal_id)
            .for_update()
            .first(conn)
            .optional()?
            .ok_or_else(|| EngineError::not_found("transmittal"))?;
        if existing.acknowledged {
            return Ok((existing, false));
        }

        let now = Utc::now().naive_utc();
        let updated: Transmittal = diesel::update(
            transmittals::table
                .find(transmittal_id)
                .filter(transmittals::acknowledged.eq(false)),
        )
        .set((
            transmittals::acknowledged.eq(true),
            transmittals::acknowledged_at.eq(Some(now)),
            transmittals::acknowledged_by.eq(Some(actor)),
            transmittals::updated_at.eq(now),
        ))
        .get_result(conn)?;
        Ok((updated, true))
    })?;

    if changed {
        info!(transmittal_id = %transmittal_id, actor = %actor, "transmittal acknowledged");
    }
    let items = load_items(conn, transmittal_id)?;
    Ok(TransmittalWithItems { transmittal, items })
}

/// Transmittals of a project with their drawing ids, latest first.
pub fn list_transmittals(
    conn: &mut PgConnection,
    project_id: Uuid,
) -> EngineResult<Vec<TransmittalWithItems>> {
    let rows: Vec<Transmittal> = transmittals::table
        .filter(transmittals::project_id.eq(project_id))
        .order((
            transmittals::transmitted_at.desc(),
            transmittals::created_at.desc(),
        ))
        .load(conn)?;

    let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
    let mut items_by_transmittal: HashMap<Uuid, Vec<TransmittalItem>> = HashMap::new();
    if !ids.is_empty() {
        let items: Vec<TransmittalItem> = transmittal_items::table
            .filter(transmittal_items::transmittal_id.eq_any(&ids))
            .order(transmittal_items::created_at.asc())
            .load(conn)?;
        for item in items {
            items_by_transmittal
                .entry(item.transmittal_id)
                .or_default()
                .push(item);
        }
    }

    Ok(rows
        .into_iter()
        .map(|transmittal| {
            let items = items_by_transmittal
                .remove(&transmittal.id)
                .unwrap_or_default();
            TransmittalWithItems { transmittal, items }
        })
        .collect())
}
