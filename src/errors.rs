use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::db::ledger::LedgerError;
use crate::models::AppointmentStatus;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("booking window is closed")]
    BookingClosed { opens_at: Option<NaiveDateTime> },

    #[error("doctor is not available on {0}")]
    DoctorUnavailable(NaiveDate),

    #[error("validation failed")]
    Validation(Vec<FieldError>),

    #[error("no general appointments left on {0}")]
    CapacityExhausted(NaiveDate),

    #[error("booking system busy, please retry")]
    Busy,

    #[error("cannot move appointment from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("invalid payment signature")]
    InvalidSignature,

    #[error("payment gateway error: {0}")]
    Gateway(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation(vec![FieldError::new(field, message)])
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Conflict => AppError::Busy,
            LedgerError::CapacityExhausted(date) => AppError::CapacityExhausted(date),
            LedgerError::Database(e) => AppError::Database(e),
            other => AppError::Internal(anyhow::anyhow!(other)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::BookingClosed { .. } => StatusCode::FORBIDDEN,
            AppError::DoctorUnavailable(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::CapacityExhausted(_) => StatusCode::CONFLICT,
            AppError::Busy => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InvalidTransition { .. } => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::InvalidSignature => StatusCode::BAD_REQUEST,
            AppError::Gateway(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() && !matches!(self, AppError::Busy) {
            tracing::error!(error = %self, "request failed");
        }

        let mut body = serde_json::json!({ "error": self.to_string() });
        match &self {
            AppError::BookingClosed { opens_at } => {
                body["opens_at"] = serde_json::json!(opens_at
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string()));
            }
            AppError::Validation(fields) => {
                body["fields"] = serde_json::json!(fields);
            }
            AppError::Busy => {
                body["retryable"] = serde_json::json!(true);
            }
            _ => {}
        }

        let mut response = (status, axum::Json(body)).into_response();
        if matches!(self, AppError::Busy) {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, header::HeaderValue::from_static("1"));
        }
        response
    }
}
