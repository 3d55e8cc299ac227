pub mod appointments;
pub mod availability;
pub mod bookings;
pub mod health;
pub mod payments;
pub mod queue;
pub mod reception;
pub mod window;

use std::sync::Arc;

use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::Router;
use chrono::NaiveDate;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::db::queries::DATE_FORMAT;
use crate::errors::AppError;
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/booking-window", get(window::booking_window))
        .route("/api/appointments", post(appointments::create_appointment))
        .route("/api/appointments/:id", get(appointments::get_appointment))
        .route(
            "/api/appointments/:id/status",
            post(appointments::update_status),
        )
        .route(
            "/api/appointments/:id/payment",
            get(appointments::get_payment_status),
        )
        .route("/api/bookings", get(bookings::current_bookings))
        .route(
            "/api/bookings/:date/complete-all",
            post(bookings::complete_all),
        )
        .route(
            "/api/reception/appointments",
            post(reception::create_offline_appointment),
        )
        .route(
            "/api/availability/:date",
            get(availability::get_availability).put(availability::set_availability),
        )
        .route("/api/payments/callback", post(payments::payment_callback))
        .route("/api/queue/events", get(queue::events_stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Staff endpoints take `Authorization: Bearer <ADMIN_TOKEN>`.
pub(crate) fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token.is_empty() || token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

pub(crate) fn parse_date(field: &str, value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| AppError::invalid(field, "must be a date in YYYY-MM-DD form"))
}
