use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;

use super::appointments::AppointmentResponse;
use super::{check_auth, parse_date};
use crate::errors::AppError;
use crate::services::admission;
use crate::state::AppState;

#[derive(Deserialize, Default)]
pub struct OfflineBookingRequest {
    pub date: Option<String>,
}

// POST /api/reception/appointments
pub async fn create_offline_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Option<Json<OfflineBookingRequest>>,
) -> Result<(StatusCode, Json<AppointmentResponse>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let body = body.map(|Json(b)| b).unwrap_or_default();
    let date = body
        .date
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(|s| parse_date("date", s))
        .transpose()?;

    let appt = admission::admit_walk_in(&state, date).await?;

    Ok((StatusCode::CREATED, Json(AppointmentResponse::from(&appt))))
}
