use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::access_log::{
    self, ClientMetadata, ACTION_COMMENTED, ACTION_COMMENT_RESOLVED, ACTION_COMMENT_UNRESOLVED,
};
use crate::drawings::{get_drawing, non_empty};
use crate::error::{EngineError, EngineResult};
use crate::models::{Comment, NewComment};
use crate::schema::drawing_comments;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddCommentInput {
    pub body: Option<String>,
    pub x_coord: Option<f64>,
    pub y_coord: Option<f64>,
    pub markup: Option<Value>,
    pub parent_id: Option<Uuid>,
}

fn find_comment(conn: &mut PgConnection, comment_id: Uuid) -> EngineResult<Comment> {
    drawing_comments::table
        .find(comment_id)
        .first(conn)
        .optional()?
        .ok_or_else(|| EngineError::not_found("comment"))
}

fn lock_comment(conn: &mut PgConnection, comment_id: Uuid) -> EngineResult<Comment> {
    drawing_comments::table
        .find(comment_id)
        .for_update()
        .first(conn)
        .optional()?
        .ok_or_else(|| EngineError::not_found("comment"))
}

pub fn add_comment(
    conn: &mut PgConnection,
    drawing_id: Uuid,
    input: AddCommentInput,
    actor: &str,
    client: &ClientMetadata,
) -> EngineResult<Comment> {
    let body =
        non_empty(input.body).ok_or_else(|| EngineError::validation("comment body is required"))?;
    if input.x_coord.is_some() != input.y_coord.is_some() {
        return Err(EngineError::validation(
            "x_coord and y_coord must be given together",
        ));
    }
    if [input.x_coord, input.y_coord]
        .iter()
        .flatten()
        .any(|coord| !coord.is_finite())
    {
        return Err(EngineError::validation("coordinates must be finite numbers"));
    }

    conn.transaction::<Comment, EngineError, _>(|conn| {
        get_drawing(conn, drawing_id)?;
        if let Some(parent_id) = input.parent_id {
            let parent = find_comment(conn, parent_id)?;
            if parent.drawing_id != drawing_id {
                return Err(EngineError::validation(
                    "parent comment belongs to a different drawing",
                ));
            }
        }

        let new_comment = NewComment {
            id: Uuid::new_v4(),
            drawing_id,
            parent_id: input.parent_id,
            author: actor.to_string(),
            body,
            x_coord: input.x_coord,
            y_coord: input.y_coord,
            markup: input.markup,
        };
        let comment: Comment = diesel::insert_into(drawing_comments::table)
            .values(&new_comment)
            .get_result(conn)?;
        access_log::record(conn, drawing_id, actor, ACTION_COMMENTED, client)?;
        Ok(comment)
    })
}

/// Top-level comments on a drawing, newest first. Replies are fetched per
/// thread with [`list_replies`].
pub fn list_comments(conn: &mut PgConnection, drawing_id: Uuid) -> EngineResult<Vec<Comment>> {
    get_drawing(conn, drawing_id)?;
    let rows = drawing_comments::table
        .filter(drawing_comments::drawing_id.eq(drawing_id))
        .filter(drawing_comments::parent_id.is_null())
        .order((
            drawing_comments::created_at.desc(),
            drawing_comments::id.desc(),
        ))
        .load(conn)?;
    Ok(rows)
}

pub fn list_replies(conn: &mut PgConnection, comment_id: Uuid) -> EngineResult<Vec<Comment>> {
    find_comment(conn, comment_id)?;
    let rows = drawing_comments::table
        .filter(drawing_comments::parent_id.eq(comment_id))
        .order((
            drawing_comments::created_at.asc(),
            drawing_comments::id.asc(),
        ))
        .load(conn)?;
    Ok(rows)
}

/// Marks a comment resolved. Resolving again keeps the first resolver.
pub fn resolve_comment(
    conn: &mut PgConnection,
    comment_id: Uuid,
    actor: &str,
    client: &ClientMetadata,
) -> EngineResult<Comment> {
    conn.transaction::<Comment, EngineError, _>(|conn| {
        let existing = lock_comment(conn, comment_id)?;
        if existing.resolved {
            return Ok(existing);
        }
        let now = Utc::now().naive_utc();
        let updated: Comment = diesel::update(drawing_comments::table.find(comment_id))
            .set((
                drawing_comments::resolved.eq(true),
                drawing_comments::resolved_by.eq(Some(actor)),
                drawing_comments::resolved_at.eq(Some(now)),
                drawing_comments::updated_at.eq(now),
            ))
            .get_result(conn)?;
        access_log::record(
            conn,
            updated.drawing_id,
            actor,
            ACTION_COMMENT_RESOLVED,
            client,
        )?;
        Ok(updated)
    })
}

pub fn unresolve_comment(
    conn: &mut PgConnection,
    comment_id: Uuid,
    actor: &str,
    client: &ClientMetadata,
) -> EngineResult<Comment> {
    conn.transaction::<Comment, EngineError, _>(|conn| {
        let existing = lock_comment(conn, comment_id)?;
        if !existing.resolved {
            return Ok(existing);
        }
        let updated: Comment = diesel::update(drawing_comments::table.find(comment_id))
            .set((
                drawing_comments::resolved.eq(false),
                drawing_comments::resolved_by.eq(None::<String>),
                drawing_comments::resolved_at.eq(None::<chrono::NaiveDateTime>),
                drawing_comments::updated_at.eq(Utc::now().naive_utc()),
            ))
            .get_result(conn)?;
        access_log::record(
            conn,
            updated.drawing_id,
            actor,
            ACTION_COMMENT_UNRESOLVED,
            client,
        )?;
        Ok(updated)
    })
}
