use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::error::EngineResult;
use crate::models::{AccessLogEntry, NewAccessLogEntry};
use crate::schema::drawing_access_log;

pub const ACTION_CREATED: &str = "created";
pub const ACTION_VIEWED: &str = "viewed";
pub const ACTION_REVISED: &str = "revised";
pub const ACTION_DELETED: &str = "deleted";
pub const ACTION_COMMENTED: &str = "commented";
pub const ACTION_COMMENT_RESOLVED: &str = "comment_resolved";
pub const ACTION_COMMENT_UNRESOLVED: &str = "comment_unresolved";
pub const ACTION_TRANSMITTED: &str = "transmitted";

pub const DEFAULT_ACCESS_LOG_LIMIT: i64 = 100;

pub fn status_changed_action(status: &str) -> String {
    format!("status_changed_to_{status}")
}

/// Network details of the caller, when the transport knows them.
#[derive(Debug, Clone, Default)]
pub struct ClientMetadata {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Appends an audit row.
///
/// Callers invoke this on the same connection as the write being audited,
/// inside its transaction, so a failed append rolls the write back too.
pub fn record(
    conn: &mut PgConnection,
    drawing_id: Uuid,
    actor: &str,
    action: &str,
    client: &ClientMetadata,
) -> EngineResult<()> {
    let entry = NewAccessLogEntry {
        id: Uuid::new_v4(),
        drawing_id,
        actor: actor.to_string(),
        action: action.to_string(),
        ip_address: client.ip_address.clone(),
        user_agent: client.user_agent.clone(),
    };

    diesel::insert_into(drawing_access_log::table)
        .values(&entry)
        .execute(conn)?;
    Ok(())
}

/// Most recent entries for a drawing, newest first.
pub fn list(
    conn: &mut PgConnection,
    drawing_id: Uuid,
    limit: i64,
) -> EngineResult<Vec<AccessLogEntry>> {
    let entries = drawing_access_log::table
        .filter(drawing_access_log::drawing_id.eq(drawing_id))
        .order((
            drawing_access_log::created_at.desc(),
            drawing_access_log::id.desc(),
        ))
        .limit(limit.max(1))
        .load(conn)?;
    Ok(entries)
}
