use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use serde::Serialize;
use uuid::Uuid;

use super::drawings::to_iso;
use crate::actor::Actor;
use crate::error::AppResult;
use crate::models::TransmittalItem;
use crate::state::AppState;
use crate::transmittals::{self, CreateTransmittalInput, TransmittalWithItems};

#[derive(Serialize)]
pub struct TransmittalItemResponse {
    pub drawing_id: Uuid,
    pub copies: i32,
    pub format: String,
}

impl From<TransmittalItem> for TransmittalItemResponse {
    fn from(item: TransmittalItem) -> Self {
        Self {
            drawing_id: item.drawing_id,
            copies: item.copies,
            format: item.format,
        }
    }
}

#[derive(Serialize)]
pub struct TransmittalResponse {
    pub id: Uuid,
    pub project_id: Uuid,
    pub transmittal_number: String,
    pub recipient_name: String,
    pub recipient_company: Option<String>,
    pub recipient_email: Option<String>,
    pub purpose: String,
    pub remarks: Option<String>,
    pub transmitted_by: String,
    pub transmitted_at: String,
    pub acknowledged: bool,
    pub acknowledged_at: Option<String>,
    pub acknowledged_by: Option<String>,
    pub items: Vec<TransmittalItemResponse>,
}

impl From<TransmittalWithItems> for TransmittalResponse {
    fn from(value: TransmittalWithItems) -> Self {
        let row = value.transmittal;
        Self {
            id: row.id,
            project_id: row.project_id,
            transmittal_number: row.transmittal_number,
            recipient_name: row.recipient_name,
            recipient_company: row.recipient_company,
            recipient_email: row.recipient_email,
            purpose: row.purpose,
            remarks: row.remarks,
            transmitted_by: row.transmitted_by,
            transmitted_at: to_iso(row.transmitted_at),
            acknowledged: row.acknowledged,
            acknowledged_at: row.acknowledged_at.map(to_iso),
            acknowledged_by: row.acknowledged_by,
            items: value
                .items
                .into_iter()
                .map(TransmittalItemResponse::from)
                .collect(),
        }
    }
}

pub async fn create_transmittal(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    actor: Actor,
    Json(payload): Json<CreateTransmittalInput>,
) -> AppResult<(StatusCode, Json<TransmittalResponse>)> {
    let mut conn = state.db()?;
    let created =
        transmittals::create_transmittal(&mut conn, project_id, payload, &actor.id, &actor.client)?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

pub async fn list_transmittals(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> AppResult<Json<Vec<TransmittalResponse>>> {
    let mut conn = state.db()?;
    let rows = transmittals::list_transmittals(&mut conn, project_id)?;
    Ok(Json(rows.into_iter().map(TransmittalResponse::from).collect()))
}

pub async fn acknowledge_transmittal(
    State(state): State<AppState>,
    Path(transmittal_id): Path<Uuid>,
    actor: Actor,
) -> AppResult<Json<TransmittalResponse>> {
    let mut conn = state.db()?;
    let acknowledged =
        transmittals::acknowledge_transmittal(&mut conn, transmittal_id, &actor.id)?;
    Ok(Json(acknowledged.into()))
}

pub async fn get_transmittal(
    State(state): State<AppState>,
    Path(transmittal_id): Path<Uuid>,
) -> AppResult<Json<TransmittalResponse>> {
    let mut conn = state.db()?;
    let transmittal = transmittals::get_transmittal(&mut conn, transmittal_id)?;
    Ok(Json(transmittal.into()))
}
