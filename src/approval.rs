//! Status changes on a single drawing row.
//!
//! Any named status may follow any other; there is no predecessor check.
//! Two targets stamp extra fields: `approved` records the approver and the
//! issue date, `for_construction` records what the drawing was issued for.

use chrono::{NaiveDateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use tracing::info;
use uuid::Uuid;

use crate::access_log::{self, status_changed_action, ClientMetadata};
use crate::drawings::lock_drawing;
use crate::enums::DrawingStatus;
use crate::error::{EngineError, EngineResult};
use crate::models::Drawing;
use crate::schema::drawings;

pub const ISSUED_FOR_CONSTRUCTION: &str = "Construction";

#[derive(AsChangeset, Debug, Default, PartialEq)]
#[diesel(table_name = drawings)]
struct StatusChangeset {
    status: Option<String>,
    approved_by: Option<String>,
    issue_date: Option<NaiveDateTime>,
    issued_for: Option<String>,
    updated_at: Option<NaiveDateTime>,
}

fn changeset_for(target: DrawingStatus, actor: &str, now: NaiveDateTime) -> StatusChangeset {
    let mut changes = StatusChangeset {
        status: Some(target.as_str().to_string()),
        updated_at: Some(now),
        ..Default::default()
    };
    match target {
        DrawingStatus::Approved => {
            changes.approved_by = Some(actor.to_string());
            changes.issue_date = Some(now);
        }
        DrawingStatus::ForConstruction => {
            changes.issued_for = Some(ISSUED_FOR_CONSTRUCTION.to_string());
        }
        _ => {}
    }
    changes
}

pub fn update_status(
    conn: &mut PgConnection,
    drawing_id: Uuid,
    target: DrawingStatus,
    actor: &str,
    client: &ClientMetadata,
) -> EngineResult<Drawing> {
    if !target.is_manual_target() {
        return Err(EngineError::validation(format!(
            "status '{target}' is set when a newer revision is issued and cannot be requested"
        )));
    }

    let (previous_status, drawing) = conn.transaction::<(String, Drawing), EngineError, _>(|conn| {
        let existing = lock_drawing(conn, drawing_id)?;
        let changes = changeset_for(target, actor, Utc::now().naive_utc());
        let updated: Drawing = diesel::update(drawings::table.find(drawing_id))
            .set(&changes)
            .get_result(conn)?;
        access_log::record(
            conn,
            drawing_id,
            actor,
            &status_changed_action(target.as_str()),
            client,
        )?;
        Ok((existing.status, updated))
    })?;

    info!(
        drawing_id = %drawing_id,
        from = %previous_status,
        to = %target,
        actor = %actor,
        "drawing status changed"
    );
    Ok(drawing)
}
