use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::access_log;
use crate::actor::Actor;
use crate::approval;
use crate::drawings::{self, CreateDrawingInput, DrawingFilters};
use crate::enums::DrawingStatus;
use crate::error::AppResult;
use crate::models::{AccessLogEntry, Drawing, Revision};
use crate::revisions::{self, NewRevisionInput};
use crate::state::AppState;
use crate::supersession;

#[derive(Serialize)]
pub struct DrawingResponse {
    pub id: Uuid,
    pub project_id: Uuid,
    pub drawing_number: String,
    pub title: String,
    pub description: Option<String>,
    pub drawing_type: String,
    pub discipline: String,
    pub status: String,
    pub revision: String,
    pub revision_date: String,
    pub file_ref: String,
    pub preview_ref: Option<String>,
    pub drawn_by: String,
    pub checked_by: Option<String>,
    pub approved_by: Option<String>,
    pub issue_date: Option<String>,
    pub issued_for: Option<String>,
    pub current_version: bool,
    pub superseded_by: Option<Uuid>,
    pub supersedes: Option<Uuid>,
    pub sheet_number: Option<String>,
    pub sheet_size: Option<String>,
    pub scale: Option<String>,
    pub grid_reference: Option<String>,
    pub tags: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Drawing> for DrawingResponse {
    fn from(drawing: Drawing) -> Self {
        Self {
            id: drawing.id,
            project_id: drawing.project_id,
            drawing_number: drawing.drawing_number,
            title: drawing.title,
            description: drawing.description,
            drawing_type: drawing.drawing_type,
            discipline: drawing.discipline,
            status: drawing.status,
            revision: drawing.revision,
            revision_date: to_iso(drawing.revision_date),
            file_ref: drawing.file_ref,
            preview_ref: drawing.preview_ref,
            drawn_by: drawing.drawn_by,
            checked_by: drawing.checked_by,
            approved_by: drawing.approved_by,
            issue_date: drawing.issue_date.map(to_iso),
            issued_for: drawing.issued_for,
            current_version: drawing.current_version,
            superseded_by: drawing.superseded_by,
            supersedes: drawing.supersedes,
            sheet_number: drawing.sheet_number,
            sheet_size: drawing.sheet_size,
            scale: drawing.scale,
            grid_reference: drawing.grid_reference,
            tags: drawing.tags,
            created_at: to_iso(drawing.created_at),
            updated_at: to_iso(drawing.updated_at),
        }
    }
}

#[derive(Serialize)]
pub struct DrawingDetailResponse {
    pub drawing: DrawingResponse,
}

#[derive(Serialize)]
pub struct RevisionResponse {
    pub id: Uuid,
    pub drawing_id: Uuid,
    pub revision: String,
    pub revision_date: String,
    pub description: String,
    pub revised_by: String,
    pub approved_by: Option<String>,
    pub file_ref: String,
    pub changes_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markup_data: Option<Value>,
    pub created_at: String,
}

impl From<Revision> for RevisionResponse {
    fn from(revision: Revision) -> Self {
        Self {
            id: revision.id,
            drawing_id: revision.drawing_id,
            revision: revision.revision,
            revision_date: to_iso(revision.revision_date),
            description: revision.description,
            revised_by: revision.revised_by,
            approved_by: revision.approved_by,
            file_ref: revision.file_ref,
            changes_summary: revision.changes_summary,
            markup_data: revision.markup_data,
            created_at: to_iso(revision.created_at),
        }
    }
}

#[derive(Serialize)]
pub struct RevisionIssuedResponse {
    pub previous: DrawingResponse,
    pub current: DrawingResponse,
    pub revision: RevisionResponse,
}

#[derive(Serialize)]
pub struct AccessLogResponse {
    pub id: Uuid,
    pub drawing_id: Uuid,
    pub actor: String,
    pub action: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: String,
}

impl From<AccessLogEntry> for AccessLogResponse {
    fn from(entry: AccessLogEntry) -> Self {
        Self {
            id: entry.id,
            drawing_id: entry.drawing_id,
            actor: entry.actor,
            action: entry.action,
            ip_address: entry.ip_address,
            user_agent: entry.user_agent,
            created_at: to_iso(entry.created_at),
        }
    }
}

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: DrawingStatus,
}

pub(crate) fn to_iso(dt: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc).to_rfc3339()
}

fn to_responses(rows: Vec<Drawing>) -> Vec<DrawingResponse> {
    rows.into_iter().map(DrawingResponse::from).collect()
}

pub async fn create_drawing(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    actor: Actor,
    Json(payload): Json<CreateDrawingInput>,
) -> AppResult<(StatusCode, Json<DrawingDetailResponse>)> {
    let mut conn = state.db()?;
    let drawing =
        drawings::create_drawing(&mut conn, project_id, payload, &actor.id, &actor.client)?;
    Ok((
        StatusCode::CREATED,
        Json(DrawingDetailResponse {
            drawing: drawing.into(),
        }),
    ))
}

pub async fn list_drawings(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Query(filters): Query<DrawingFilters>,
) -> AppResult<Json<Vec<DrawingResponse>>> {
    let mut conn = state.db()?;
    let rows = drawings::list_by_project(&mut conn, project_id, &filters)?;
    Ok(Json(to_responses(rows)))
}

pub async fn search_drawings(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Vec<DrawingResponse>>> {
    let mut conn = state.db()?;
    let rows = drawings::search_drawings(&mut conn, project_id, &query.q)?;
    Ok(Json(to_responses(rows)))
}

pub async fn get_drawing(
    State(state): State<AppState>,
    Path(drawing_id): Path<Uuid>,
    actor: Actor,
) -> AppResult<Json<DrawingDetailResponse>> {
    let mut conn = state.db()?;
    let drawing = drawings::view_drawing(&mut conn, drawing_id, &actor.id, &actor.client)?;
    Ok(Json(DrawingDetailResponse {
        drawing: drawing.into(),
    }))
}

pub async fn delete_drawing(
    State(state): State<AppState>,
    Path(drawing_id): Path<Uuid>,
    actor: Actor,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.db()?;
    drawings::delete_drawing(&mut conn, drawing_id, &actor.id, &actor.client)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(drawing_id): Path<Uuid>,
    actor: Actor,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<DrawingDetailResponse>> {
    let mut conn = state.db()?;
    let drawing = approval::update_status(
        &mut conn,
        drawing_id,
        payload.status,
        &actor.id,
        &actor.client,
    )?;
    Ok(Json(DrawingDetailResponse {
        drawing: drawing.into(),
    }))
}

pub async fn create_revision(
    State(state): State<AppState>,
    Path(drawing_id): Path<Uuid>,
    actor: Actor,
    Json(payload): Json<NewRevisionInput>,
) -> AppResult<(StatusCode, Json<RevisionIssuedResponse>)> {
    let mut conn = state.db()?;
    let outcome =
        revisions::create_new_revision(&mut conn, drawing_id, payload, &actor.id, &actor.client)?;
    Ok((
        StatusCode::CREATED,
        Json(RevisionIssuedResponse {
            previous: outcome.previous.into(),
            current: outcome.current.into(),
            revision: outcome.revision.into(),
        }),
    ))
}

pub async fn list_revisions(
    State(state): State<AppState>,
    Path(drawing_id): Path<Uuid>,
) -> AppResult<Json<Vec<RevisionResponse>>> {
    let mut conn = state.db()?;
    let rows = revisions::list_revisions(&mut conn, drawing_id)?;
    Ok(Json(rows.into_iter().map(RevisionResponse::from).collect()))
}

pub async fn lineage(
    State(state): State<AppState>,
    Path(drawing_id): Path<Uuid>,
) -> AppResult<Json<Vec<DrawingResponse>>> {
    let mut conn = state.db()?;
    let rows = supersession::lineage(&mut conn, drawing_id)?;
    Ok(Json(to_responses(rows)))
}

pub async fn list_access_log(
    State(state): State<AppState>,
    Path(drawing_id): Path<Uuid>,
) -> AppResult<Json<Vec<AccessLogResponse>>> {
    let mut conn = state.db()?;
    drawings::get_drawing(&mut conn, drawing_id)?;
    let entries = access_log::list(&mut conn, drawing_id, state.config.access_log_limit)?;
    Ok(Json(
        entries.into_iter().map(AccessLogResponse::from).collect(),
    ))
}
