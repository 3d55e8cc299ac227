use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{check_auth, parse_date};
use crate::db::queries;
use crate::errors::AppError;
use crate::services::queue::{self, record_queue_event};
use crate::state::AppState;

#[derive(Serialize)]
pub struct AvailabilityResponse {
    pub date: NaiveDate,
    pub available: bool,
    pub note: Option<String>,
    /// False when no one has set the date and the configured default applies.
    pub explicit: bool,
}

// GET /api/availability/:date
pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    Path(date): Path<String>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let date = parse_date("date", &date)?;
    let row = {
        let db = state.db();
        queries::get_availability(&db, date)?
    };

    Ok(Json(match row {
        Some(a) => AvailabilityResponse {
            date,
            available: a.available,
            note: a.note,
            explicit: true,
        },
        None => AvailabilityResponse {
            date,
            available: state.config.doctor_available_by_default,
            note: None,
            explicit: false,
        },
    }))
}

#[derive(Deserialize)]
pub struct SetAvailabilityRequest {
    pub available: bool,
    pub note: Option<String>,
}

// PUT /api/availability/:date
pub async fn set_availability(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(date): Path<String>,
    Json(body): Json<SetAvailabilityRequest>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let date = parse_date("date", &date)?;
    let note = body.note.as_deref().map(str::trim).filter(|n| !n.is_empty());
    {
        let db = state.db();
        queries::set_availability(&db, date, body.available, note)?;
    }

    tracing::info!(date = %date, available = body.available, "doctor availability set");
    record_queue_event(
        &state,
        date,
        None,
        queue::AVAILABILITY_CHANGED,
        if body.available { "available" } else { "unavailable" },
    );

    Ok(Json(AvailabilityResponse {
        date,
        available: body.available,
        note: note.map(str::to_string),
        explicit: true,
    }))
}
