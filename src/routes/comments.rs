use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::drawings::to_iso;
use crate::actor::Actor;
use crate::comments::{self, AddCommentInput};
use crate::error::AppResult;
use crate::models::Comment;
use crate::state::AppState;

#[derive(Serialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub drawing_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub author: String,
    pub body: String,
    pub x_coord: Option<f64>,
    pub y_coord: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markup: Option<Value>,
    pub resolved: bool,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<String>,
    pub created_at: String,
}

impl From<Comment> for CommentResponse {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            drawing_id: comment.drawing_id,
            parent_id: comment.parent_id,
            author: comment.author,
            body: comment.body,
            x_coord: comment.x_coord,
            y_coord: comment.y_coord,
            markup: comment.markup,
            resolved: comment.resolved,
            resolved_by: comment.resolved_by,
            resolved_at: comment.resolved_at.map(to_iso),
            created_at: to_iso(comment.created_at),
        }
    }
}

fn to_responses(rows: Vec<Comment>) -> Vec<CommentResponse> {
    rows.into_iter().map(CommentResponse::from).collect()
}

pub async fn add_comment(
    State(state): State<AppState>,
    Path(drawing_id): Path<Uuid>,
    actor: Actor,
    Json(payload): Json<AddCommentInput>,
) -> AppResult<(StatusCode, Json<CommentResponse>)> {
    let mut conn = state.db()?;
    let comment = comments::add_comment(&mut conn, drawing_id, payload, &actor.id, &actor.client)?;
    Ok((StatusCode::CREATED, Json(comment.into())))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(drawing_id): Path<Uuid>,
) -> AppResult<Json<Vec<CommentResponse>>> {
    let mut conn = state.db()?;
    let rows = comments::list_comments(&mut conn, drawing_id)?;
    Ok(Json(to_responses(rows)))
}

pub async fn list_replies(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
) -> AppResult<Json<Vec<CommentResponse>>> {
    let mut conn = state.db()?;
    let rows = comments::list_replies(&mut conn, comment_id)?;
    Ok(Json(to_responses(rows)))
}

pub async fn resolve_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    actor: Actor,
) -> AppResult<Json<CommentResponse>> {
    let mut conn = state.db()?;
    let comment = comments::resolve_comment(&mut conn, comment_id, &actor.id, &actor.client)?;
    Ok(Json(comment.into()))
}

pub async fn unresolve_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    actor: Actor,
) -> AppResult<Json<CommentResponse>> {
    let mut conn = state.db()?;
    let comment = comments::unresolve_comment(&mut conn, comment_id, &actor.id, &actor.client)?;
    Ok(Json(comment.into()))
}
