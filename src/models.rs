use chrono::NaiveDateTime;
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::*;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = projects)]
pub struct Project {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = projects)]
pub struct NewProject {
    pub id: Uuid,
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = drawings)]
#[diesel(belongs_to(Project))]
pub struct Drawing {
    pub id: Uuid,
    pub project_id: Uuid,
    pub drawing_number: String,
    pub title: String,
    pub description: Option<String>,
    pub drawing_type: String,
    pub discipline: String,
    pub status: String,
    pub revision: String,
    pub revision_date: NaiveDateTime,
    pub file_ref: String,
    pub preview_ref: Option<String>,
    pub drawn_by: String,
    pub checked_by: Option<String>,
    pub approved_by: Option<String>,
    pub issue_date: Option<NaiveDateTime>,
    pub issued_for: Option<String>,
    pub current_version: bool,
    pub superseded_by: Option<Uuid>,
    pub supersedes: Option<Uuid>,
    pub sheet_number: Option<String>,
    pub sheet_size: Option<String>,
    pub scale: Option<String>,
    pub grid_reference: Option<String>,
    pub tags: Vec<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = drawings)]
pub struct NewDrawing {
    pub id: Uuid,
    pub project_id: Uuid,
    pub drawing_number: String,
    pub title: String,
    pub description: Option<String>,
    pub drawing_type: String,
    pub discipline: String,
    pub status: String,
    pub revision: String,
    pub revision_date: NaiveDateTime,
    pub file_ref: String,
    pub preview_ref: Option<String>,
    pub drawn_by: String,
    pub checked_by: Option<String>,
    pub approved_by: Option<String>,
    pub current_version: bool,
    pub supersedes: Option<Uuid>,
    pub sheet_number: Option<String>,
    pub sheet_size: Option<String>,
    pub scale: Option<String>,
    pub grid_reference: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = drawing_revisions)]
#[diesel(belongs_to(Drawing))]
pub struct Revision {
    pub id: Uuid,
    pub drawing_id: Uuid,
    pub revision: String,
    pub revision_date: NaiveDateTime,
    pub description: String,
    pub revised_by: String,
    pub approved_by: Option<String>,
    pub file_ref: String,
    pub changes_summary: Option<String>,
    pub markup_data: Option<serde_json::Value>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = drawing_revisions)]
pub struct NewRevision {
    pub id: Uuid,
    pub drawing_id: Uuid,
    pub revision: String,
    pub revision_date: NaiveDateTime,
    pub description: String,
    pub revised_by: String,
    pub approved_by: Option<String>,
    pub file_ref: String,
    pub changes_summary: Option<String>,
    pub markup_data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = transmittals)]
pub struct Transmittal {
    pub id: Uuid,
    pub project_id: Uuid,
    pub transmittal_number: String,
    pub recipient_name: String,
    pub recipient_company: Option<String>,
    pub recipient_email: Option<String>,
    pub purpose: String,
    pub remarks: Option<String>,
    pub transmitted_by: String,
    pub transmitted_at: NaiveDateTime,
    pub acknowledged: bool,
    pub acknowledged_at: Option<NaiveDateTime>,
    pub acknowledged_by: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = transmittals)]
pub struct NewTransmittal {
    pub id: Uuid,
    pub project_id: Uuid,
    pub transmittal_number: String,
    pub recipient_name: String,
    pub recipient_company: Option<String>,
    pub recipient_email: Option<String>,
    pub purpose: String,
    pub remarks: Option<String>,
    pub transmitted_by: String,
    pub transmitted_at: NaiveDateTime,
}

#[allow(dead_code)]
#[derive(Debug, Clone, Queryable, Associations)]
#[diesel(table_name = transmittal_items)]
#[diesel(belongs_to(Transmittal))]
#[diesel(belongs_to(Drawing))]
#[diesel(primary_key(transmittal_id, drawing_id))]
pub struct TransmittalItem {
    pub transmittal_id: Uuid,
    pub drawing_id: Uuid,
    pub copies: i32,
    pub format: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = transmittal_items)]
pub struct NewTransmittalItem {
    pub transmittal_id: Uuid,
    pub drawing_id: Uuid,
    pub copies: i32,
    pub format: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = drawing_comments)]
#[diesel(belongs_to(Drawing))]
pub struct Comment {
    pub id: Uuid,
    pub drawing_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub author: String,
    pub body: String,
    pub x_coord: Option<f64>,
    pub y_coord: Option<f64>,
    pub markup: Option<serde_json::Value>,
    pub resolved: bool,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = drawing_comments)]
pub struct NewComment {
    pub id: Uuid,
    pub drawing_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub author: String,
    pub body: String,
    pub x_coord: Option<f64>,
    pub y_coord: Option<f64>,
    pub markup: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = drawing_access_log)]
#[diesel(belongs_to(Drawing))]
pub struct AccessLogEntry {
    pub id: Uuid,
    pub drawing_id: Uuid,
    pub actor: String,
    pub action: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = drawing_access_log)]
pub struct NewAccessLogEntry {
    pub id: Uuid,
    pub drawing_id: Uuid,
    pub actor: String,
    pub action: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}
