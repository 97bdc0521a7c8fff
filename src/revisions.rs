use chrono::{DateTime, Utc};
use diesel::dsl::exists;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::select;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::access_log::{self, ClientMetadata, ACTION_CREATED, ACTION_REVISED};
use crate::drawings::{
    check_length, check_optional_length, get_drawing, lock_drawing, non_empty, MAX_PERSON_LEN,
    MAX_REVISION_LEN,
};
use crate::enums::DrawingStatus;
use crate::error::{EngineError, EngineResult};
use crate::models::{Drawing, NewDrawing, NewRevision, Revision};
use crate::schema::drawing_revisions;
use crate::supersession;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewRevisionInput {
    pub revision: Option<String>,
    pub description: Option<String>,
    pub revised_by: Option<String>,
    pub approved_by: Option<String>,
    pub file_ref: Option<String>,
    pub changes_summary: Option<String>,
    pub markup_data: Option<Value>,
    pub revision_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct RevisionOutcome {
    pub previous: Drawing,
    pub current: Drawing,
    pub revision: Revision,
}

/// Appends a ledger row. Ledger rows are never updated or deleted.
pub(crate) fn append(conn: &mut PgConnection, entry: NewRevision) -> EngineResult<Revision> {
    match diesel::insert_into(drawing_revisions::table)
        .values(&entry)
        .get_result::<Revision>(conn)
    {
        Ok(revision) => Ok(revision),
        Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            Err(EngineError::conflict(format!(
                "revision {} already recorded for drawing {}",
                entry.revision, entry.drawing_id
            )))
        }
        Err(err) => Err(EngineError::from(err)),
    }
}

/// Issues a new revision of a drawing.
///
/// The ledger row is written under the existing drawing id, the existing row
/// stops being current, and a new row carrying the new revision becomes the
/// current version, linked both ways to the row it replaces.
pub fn create_new_revision(
    conn: &mut PgConnection,
    drawing_id: Uuid,
    input: NewRevisionInput,
    actor: &str,
    client: &ClientMetadata,
) -> EngineResult<RevisionOutcome> {
    let label = non_empty(input.revision)
        .ok_or_else(|| EngineError::validation("revision is required"))?;
    check_length("revision", &label, MAX_REVISION_LEN)?;
    let file_ref =
        non_empty(input.file_ref).ok_or_else(|| EngineError::validation("file_ref is required"))?;
    let revised_by = non_empty(input.revised_by).unwrap_or_else(|| actor.to_string());
    check_length("revised_by", &revised_by, MAX_PERSON_LEN)?;
    let approved_by = non_empty(input.approved_by);
    check_optional_length("approved_by", approved_by.as_deref(), MAX_PERSON_LEN)?;
    let description =
        non_empty(input.description).unwrap_or_else(|| format!("Revision {label}"));
    let revision_date = input
        .revision_date
        .map(|date| date.naive_utc())
        .unwrap_or_else(|| Utc::now().naive_utc());

    let result = conn.transaction::<RevisionOutcome, EngineError, _>(|conn| {
        let existing = lock_drawing(conn, drawing_id)?;
        if !existing.current_version {
            return Err(EngineError::conflict(format!(
                "drawing {drawing_id} has been superseded; revise the current version instead"
            )));
        }

        let lineage = supersession::lineage_ids(conn, drawing_id)?;
        let label_used: bool = select(exists(
            drawing_revisions::table
                .filter(drawing_revisions::drawing_id.eq_any(&lineage))
                .filter(drawing_revisions::revision.eq(&label)),
        ))
        .get_result(conn)?;
        if label_used {
            return Err(EngineError::conflict(format!(
                "revision {label} already exists for drawing {}",
                existing.drawing_number
            )));
        }

        let revision = append(
            conn,
            NewRevision {
                id: Uuid::new_v4(),
                drawing_id,
                revision: label.clone(),
                revision_date,
                description,
                revised_by,
                approved_by,
                file_ref: file_ref.clone(),
                changes_summary: non_empty(input.changes_summary),
                markup_data: input.markup_data,
            },
        )?;

        let next = NewDrawing {
            id: Uuid::new_v4(),
            project_id: existing.project_id,
            drawing_number: existing.drawing_number.clone(),
            title: existing.title.clone(),
            description: existing.description.clone(),
            drawing_type: existing.drawing_type.clone(),
            discipline: existing.discipline.clone(),
            status: DrawingStatus::Draft.as_str().to_string(),
            revision: label.clone(),
            revision_date,
            file_ref,
            preview_ref: None,
            drawn_by: existing.drawn_by.clone(),
            checked_by: None,
            approved_by: None,
            current_version: true,
            supersedes: Some(existing.id),
            sheet_number: existing.sheet_number.clone(),
            sheet_size: existing.sheet_size.clone(),
            scale: existing.scale.clone(),
            grid_reference: existing.grid_reference.clone(),
            tags: existing.tags.clone(),
        };

        let (previous, current) = supersession::supersede(conn, &existing, next)?;

        access_log::record(conn, previous.id, actor, ACTION_REVISED, client)?;
        access_log::record(conn, current.id, actor, ACTION_CREATED, client)?;

        Ok(RevisionOutcome {
            previous,
            current,
            revision,
        })
    });

    match result {
        Ok(outcome) => {
            info!(
                previous_id = %outcome.previous.id,
                drawing_id = %outcome.current.id,
                drawing_number = %outcome.current.drawing_number,
                revision = %outcome.current.revision,
                actor = %actor,
                "drawing revised"
            );
            Ok(outcome)
        }
        Err(err) => {
            warn!(drawing_id = %drawing_id, error = %err, "drawing revision rejected");
            Err(err)
        }
    }
}

/// Ledger of the whole lineage the drawing belongs to, newest first.
pub fn list_revisions(conn: &mut PgConnection, drawing_id: Uuid) -> EngineResult<Vec<Revision>> {
    get_drawing(conn, drawing_id)?;
    let lineage = supersession::lineage_ids(conn, drawing_id)?;

    let rows = drawing_revisions::table
        .filter(drawing_revisions::drawing_id.eq_any(&lineage))
        .order((
            drawing_revisions::revision_date.desc(),
            drawing_revisions::created_at.desc(),
            drawing_revisions::revision.desc(),
        ))
        .load(conn)?;
    Ok(rows)
}
