use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::appointments::AppointmentResponse;
use super::{check_auth, parse_date};
use crate::db::queries;
use crate::errors::AppError;
use crate::models::BookingSummary;
use crate::services::lifecycle;
use crate::services::queue::{self, record_queue_event};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct BookingsQuery {
    pub date: Option<String>,
}

#[derive(Serialize)]
pub struct BookingsResponse {
    pub date: NaiveDate,
    pub appointments: Vec<AppointmentResponse>,
    pub summary: BookingSummary,
}

// GET /api/bookings?date=YYYY-MM-DD
pub async fn current_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<BookingsResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let date = match query.date.as_deref() {
        Some(s) => parse_date("date", s)?,
        None => state.clock.now().date(),
    };

    let appointments = {
        let db = state.db();
        queries::get_appointments_for_date(&db, date)?
    };

    Ok(Json(BookingsResponse {
        date,
        summary: BookingSummary::tally(&appointments),
        appointments: appointments.iter().map(AppointmentResponse::from).collect(),
    }))
}

// POST /api/bookings/:date/complete-all
pub async fn complete_all(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(date): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let date = parse_date("date", &date)?;
    let completed = {
        let db = state.db();
        lifecycle::complete_all_for_date(&db, date)?
    };

    record_queue_event(
        &state,
        date,
        None,
        queue::DAY_CLOSED,
        &format!("{completed} completed"),
    );

    Ok(Json(serde_json::json!({ "date": date, "count": completed })))
}
