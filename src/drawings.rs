use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::access_log::{self, ClientMetadata, ACTION_CREATED, ACTION_DELETED, ACTION_VIEWED};
use crate::enums::{Discipline, DrawingStatus, DrawingType};
use crate::error::{EngineError, EngineResult};
use crate::models::{Drawing, NewDrawing, NewRevision, Project};
use crate::numbering;
use crate::schema::{drawings, projects};

pub const DEFAULT_INITIAL_REVISION: &str = "A";
pub const INITIAL_REVISION_DESCRIPTION: &str = "Initial issue";
pub(crate) const MAX_REVISION_LEN: usize = 16;
const MAX_NUMBER_LEN: usize = 64;
const MAX_TITLE_LEN: usize = 255;
pub(crate) const MAX_PERSON_LEN: usize = 128;
const MAX_SHEET_NUMBER_LEN: usize = 32;
const MAX_SHEET_SIZE_LEN: usize = 16;
const MAX_SCALE_LEN: usize = 32;
const MAX_GRID_REFERENCE_LEN: usize = 64;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateDrawingInput {
    /// Honoured verbatim when present, for imports from another register.
    pub drawing_number: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub drawing_type: Option<DrawingType>,
    pub discipline: Option<Discipline>,
    pub revision: Option<String>,
    pub revision_date: Option<DateTime<Utc>>,
    pub file_ref: Option<String>,
    pub preview_ref: Option<String>,
    pub drawn_by: Option<String>,
    pub checked_by: Option<String>,
    pub sheet_number: Option<String>,
    pub sheet_size: Option<String>,
    pub scale: Option<String>,
    pub grid_reference: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

struct ValidatedDrawing {
    drawing_number: Option<String>,
    title: Option<String>,
    description: Option<String>,
    drawing_type: DrawingType,
    discipline: Discipline,
    revision: String,
    revision_date: NaiveDateTime,
    file_ref: String,
    preview_ref: Option<String>,
    drawn_by: String,
    checked_by: Option<String>,
    sheet_number: Option<String>,
    sheet_size: Option<String>,
    scale: Option<String>,
    grid_reference: Option<String>,
    tags: Vec<String>,
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn check_length(field: &str, value: &str, max: usize) -> EngineResult<()> {
    if value.chars().count() > max {
        return Err(EngineError::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

pub(crate) fn check_optional_length(
    field: &str,
    value: Option<&str>,
    max: usize,
) -> EngineResult<()> {
    value.map_or(Ok(()), |value| check_length(field, value, max))
}

pub(crate) fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = tags
        .into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect();
    normalized.sort();
    normalized.dedup();
    normalized
}

impl CreateDrawingInput {
    fn validate(self) -> EngineResult<ValidatedDrawing> {
        let discipline = self
            .discipline
            .ok_or_else(|| EngineError::validation("discipline is required"))?;
        let drawing_type = self
            .drawing_type
            .ok_or_else(|| EngineError::validation("drawing_type is required"))?;
        let drawn_by = non_empty(self.drawn_by)
            .ok_or_else(|| EngineError::validation("drawn_by is required"))?;
        let file_ref = non_empty(self.file_ref)
            .ok_or_else(|| EngineError::validation("file_ref is required"))?;

        let drawing_number = match self.drawing_number {
            Some(number) => Some(
                non_empty(Some(number))
                    .ok_or_else(|| EngineError::validation("drawing_number must not be empty"))?,
            ),
            None => None,
        };

        let revision =
            non_empty(self.revision).unwrap_or_else(|| DEFAULT_INITIAL_REVISION.to_string());
        let title = non_empty(self.title);
        let checked_by = non_empty(self.checked_by);
        let sheet_number = non_empty(self.sheet_number);
        let sheet_size = non_empty(self.sheet_size);
        let scale = non_empty(self.scale);
        let grid_reference = non_empty(self.grid_reference);

        check_length("revision", &revision, MAX_REVISION_LEN)?;
        check_length("drawn_by", &drawn_by, MAX_PERSON_LEN)?;
        check_optional_length("drawing_number", drawing_number.as_deref(), MAX_NUMBER_LEN)?;
        check_optional_length("title", title.as_deref(), MAX_TITLE_LEN)?;
        check_optional_length("checked_by", checked_by.as_deref(), MAX_PERSON_LEN)?;
        check_optional_length("sheet_number", sheet_number.as_deref(), MAX_SHEET_NUMBER_LEN)?;
        check_optional_length("sheet_size", sheet_size.as_deref(), MAX_SHEET_SIZE_LEN)?;
        check_optional_length("scale", scale.as_deref(), MAX_SCALE_LEN)?;
        check_optional_length(
            "grid_reference",
            grid_reference.as_deref(),
            MAX_GRID_REFERENCE_LEN,
        )?;

        Ok(ValidatedDrawing {
            drawing_number,
            title,
            description: non_empty(self.description),
            drawing_type,
            discipline,
            revision,
            revision_date: self
                .revision_date
                .map(|date| date.naive_utc())
                .unwrap_or_else(|| Utc::now().naive_utc()),
            file_ref,
            preview_ref: non_empty(self.preview_ref),
            drawn_by,
            checked_by,
            sheet_number,
            sheet_size,
            scale,
            grid_reference,
            tags: normalize_tags(self.tags),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DrawingFilters {
    pub status: Option<DrawingStatus>,
    pub discipline: Option<Discipline>,
    #[serde(alias = "type")]
    pub drawing_type: Option<DrawingType>,
    #[serde(default)]
    pub current_only: bool,
}

pub fn find_project(conn: &mut PgConnection, project_id: Uuid) -> EngineResult<Project> {
    projects::table
        .find(project_id)
        .first(conn)
        .optional()?
        .ok_or_else(|| EngineError::not_found("project"))
}

/// Loads a drawing row and holds its row lock until the transaction ends.
pub(crate) fn lock_drawing(conn: &mut PgConnection, drawing_id: Uuid) -> EngineResult<Drawing> {
    drawings::table
        .find(drawing_id)
        .for_update()
        .first(conn)
        .optional()?
        .ok_or_else(|| EngineError::not_found("drawing"))
}

/// Registers a new drawing lineage with its initial revision.
///
/// Number allocation, the drawing row, the revision row and the audit row
/// commit together or not at all.
pub fn create_drawing(
    conn: &mut PgConnection,
    project_id: Uuid,
    input: CreateDrawingInput,
    actor: &str,
    client: &ClientMetadata,
) -> EngineResult<Drawing> {
    let fields = input.validate()?;

    let drawing = conn.transaction::<Drawing, EngineError, _>(|conn| {
        let project = find_project(conn, project_id)?;

        let drawing_number = match fields.drawing_number {
            Some(number) => {
                let taken: Option<Uuid> = drawings::table
                    .filter(drawings::project_id.eq(project_id))
                    .filter(drawings::drawing_number.eq(&number))
                    .select(drawings::id)
                    .first(conn)
                    .optional()?;
                if taken.is_some() {
                    return Err(EngineError::conflict(format!(
                        "drawing number {number} already exists in this project"
                    )));
                }
                number
            }
            None => numbering::allocate_drawing_number(
                conn,
                project.id,
                &project.code,
                fields.discipline,
                fields.drawing_type,
            )?,
        };

        let new_drawing = NewDrawing {
            id: Uuid::new_v4(),
            project_id,
            title: fields.title.unwrap_or_else(|| drawing_number.clone()),
            drawing_number,
            description: fields.description,
            drawing_type: fields.drawing_type.as_str().to_string(),
            discipline: fields.discipline.as_str().to_string(),
            status: DrawingStatus::Draft.as_str().to_string(),
            revision: fields.revision,
            revision_date: fields.revision_date,
            file_ref: fields.file_ref,
            preview_ref: fields.preview_ref,
            drawn_by: fields.drawn_by,
            checked_by: fields.checked_by,
            approved_by: None,
            current_version: true,
            supersedes: None,
            sheet_number: fields.sheet_number,
            sheet_size: fields.sheet_size,
            scale: fields.scale,
            grid_reference: fields.grid_reference,
            tags: fields.tags,
        };

        let drawing: Drawing = diesel::insert_into(drawings::table)
            .values(&new_drawing)
            .get_result(conn)?;

        crate::revisions::append(
            conn,
            NewRevision {
                id: Uuid::new_v4(),
                drawing_id: drawing.id,
                revision: drawing.revision.clone(),
                revision_date: drawing.revision_date,
                description: INITIAL_REVISION_DESCRIPTION.to_string(),
                revised_by: drawing.drawn_by.clone(),
                approved_by: None,
                file_ref: drawing.file_ref.clone(),
                changes_summary: None,
                markup_data: None,
            },
        )?;

        access_log::record(conn, drawing.id, actor, ACTION_CREATED, client)?;

        Ok(drawing)
    })?;

    info!(
        drawing_id = %drawing.id,
        drawing_number = %drawing.drawing_number,
        project_id = %drawing.project_id,
        actor = %actor,
        "drawing created"
    );

    Ok(drawing)
}

pub fn get_drawing(conn: &mut PgConnection, drawing_id: Uuid) -> EngineResult<Drawing> {
    drawings::table
        .find(drawing_id)
        .first(conn)
        .optional()?
        .ok_or_else(|| EngineError::not_found("drawing"))
}

/// Reads a drawing and records the read in the access log.
pub fn view_drawing(
    conn: &mut PgConnection,
    drawing_id: Uuid,
    actor: &str,
    client: &ClientMetadata,
) -> EngineResult<Drawing> {
    conn.transaction::<Drawing, EngineError, _>(|conn| {
        let drawing = get_drawing(conn, drawing_id)?;
        access_log::record(conn, drawing.id, actor, ACTION_VIEWED, client)?;
        Ok(drawing)
    })
}

/// Drawing register for a project: discipline, then number, then newest
/// revision first.
pub fn list_by_project(
    conn: &mut PgConnection,
    project_id: Uuid,
    filters: &DrawingFilters,
) -> EngineResult<Vec<Drawing>> {
    let mut query = drawings::table
        .filter(drawings::project_id.eq(project_id))
        .into_boxed();

    if let Some(status) = filters.status {
        query = query.filter(drawings::status.eq(status.as_str()));
    }
    if let Some(discipline) = filters.discipline {
        query = query.filter(drawings::discipline.eq(discipline.as_str()));
    }
    if let Some(drawing_type) = filters.drawing_type {
        query = query.filter(drawings::drawing_type.eq(drawing_type.as_str()));
    }
    if filters.current_only {
        query = query.filter(drawings::current_version.eq(true));
    }

    let rows = query
        .order((
            drawings::discipline.asc(),
            drawings::drawing_number.asc(),
            drawings::revision.desc(),
        ))
        .load(conn)?;
    Ok(rows)
}

fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

/// Case-insensitive substring match on number, title and description, or an
/// exact tag match. Current versions sort first.
pub fn search_drawings(
    conn: &mut PgConnection,
    project_id: Uuid,
    term: &str,
) -> EngineResult<Vec<Drawing>> {
    let term = term.trim();
    if term.is_empty() {
        return Err(EngineError::validation("search term must not be empty"));
    }
    let pattern = like_pattern(term);

    let rows = drawings::table
        .filter(drawings::project_id.eq(project_id))
        .filter(
            drawings::drawing_number
                .ilike(&pattern)
                .or(drawings::title.ilike(&pattern))
                .or(drawings::description.assume_not_null().ilike(&pattern))
                .or(drawings::tags.contains(vec![term.to_string()])),
        )
        .order((
            drawings::current_version.desc(),
            drawings::drawing_number.asc(),
            drawings::revision.desc(),
        ))
        .load(conn)?;
    Ok(rows)
}

/// Soft delete: the row stays so audit and transmittal references remain
/// valid. Deleting an obsolete drawing again changes nothing.
pub fn delete_drawing(
    conn: &mut PgConnection,
    drawing_id: Uuid,
    actor: &str,
    client: &ClientMetadata,
) -> EngineResult<Drawing> {
    let (drawing, changed) = conn.transaction::<(Drawing, bool), EngineError, _>(|conn| {
        let existing = lock_drawing(conn, drawing_id)?;
        if existing.status == DrawingStatus::Obsolete.as_str() {
            return Ok((existing, false));
        }

        let updated: Drawing = diesel::update(drawings::table.find(drawing_id))
            .set((
                drawings::status.eq(DrawingStatus::Obsolete.as_str()),
                drawings::updated_at.eq(Utc::now().naive_utc()),
            ))
            .get_result(conn)?;
        access_log::record(conn, drawing_id, actor, ACTION_DELETED, client)?;
        Ok((updated, true))
    })?;

    if changed {
        info!(drawing_id = %drawing_id, actor = %actor, "drawing marked obsolete");
    }
    Ok(drawing)
}
