use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::check_auth;
use crate::db::queries::{self, TIMESTAMP_FORMAT, TIME_FORMAT};
use crate::errors::AppError;
use crate::models::{
    Appointment, AppointmentStatus, AppointmentType, BookingType, Confirmation, PatientDetails,
    Payment, PaymentMethod, PaymentStatus,
};
use crate::services::admission::{self, CreateAppointmentRequest};
use crate::services::lifecycle;
use crate::services::queue::{self, record_queue_event};
use crate::state::AppState;

#[derive(Serialize)]
pub struct AppointmentResponse {
    pub id: String,
    pub date: NaiveDate,
    pub serial_number: Option<u32>,
    pub appointment_type: AppointmentType,
    pub booking_type: BookingType,
    pub payment_method: PaymentMethod,
    pub preferred_time: Option<String>,
    pub arrival_time: Option<String>,
    pub slot_time: Option<String>,
    pub status: AppointmentStatus,
    pub confirmation: Confirmation,
    pub patient: Option<PatientDetails>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_next_statuses: Option<Vec<AppointmentStatus>>,
}

fn hhmm(t: Option<NaiveTime>) -> Option<String> {
    t.map(|t| t.format(TIME_FORMAT).to_string())
}

impl From<&Appointment> for AppointmentResponse {
    fn from(appt: &Appointment) -> Self {
        Self {
            id: appt.id.clone(),
            date: appt.date,
            serial_number: appt.serial_number,
            appointment_type: appt.appointment_type,
            booking_type: appt.booking_type,
            payment_method: appt.payment_method,
            preferred_time: hhmm(appt.preferred_time),
            arrival_time: hhmm(appt.arrival_time),
            slot_time: hhmm(appt.slot_time),
            status: appt.status,
            confirmation: appt.confirmation(),
            patient: appt.patient.clone(),
            created_at: appt.created_at.format(TIMESTAMP_FORMAT).to_string(),
            updated_at: appt.updated_at.format(TIMESTAMP_FORMAT).to_string(),
            valid_next_statuses: None,
        }
    }
}

// POST /api/appointments
pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let appt = admission::admit_online(&state, &body).await?;

    let payment = if appt.payment_method == PaymentMethod::Online {
        let db = state.db();
        queries::get_payment_for_appointment(&db, &appt.id)?
    } else {
        None
    };

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "appointment": AppointmentResponse::from(&appt),
            "payment": payment.map(|p| serde_json::json!({
                "gateway_order_id": p.gateway_order_id,
                "amount_minor": p.amount_minor,
                "key_id": state.config.payment_key_id,
            })),
        })),
    ))
}

// GET /api/appointments/:id
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<AppointmentResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let appt = {
        let db = state.db();
        queries::get_appointment(&db, &id)?
    }
    .ok_or_else(|| AppError::NotFound(format!("appointment {id}")))?;

    let mut response = AppointmentResponse::from(&appt);
    response.valid_next_statuses = Some(lifecycle::valid_transitions(appt.status).to_vec());
    Ok(Json(response))
}

#[derive(Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

// POST /api/appointments/:id/status
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<StatusUpdateRequest>,
) -> Result<Json<AppointmentResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let to = AppointmentStatus::parse(body.status.trim())
        .ok_or_else(|| AppError::invalid("status", "unknown appointment status"))?;

    let appt = {
        let db = state.db();
        lifecycle::transition(&db, &id, to)?
    };

    record_queue_event(&state, appt.date, Some(&appt.id), queue::STATUS_CHANGED, to.as_str());

    let mut response = AppointmentResponse::from(&appt);
    response.valid_next_statuses = Some(lifecycle::valid_transitions(appt.status).to_vec());
    Ok(Json(response))
}

#[derive(Serialize)]
pub struct PaymentStatusResponse {
    pub appointment_id: String,
    pub payment_method: PaymentMethod,
    /// Gateway status; null for pay-at-counter bookings.
    pub status: Option<PaymentStatus>,
    pub confirmation: Confirmation,
    pub payment: Option<Payment>,
}

// GET /api/appointments/:id/payment
pub async fn get_payment_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PaymentStatusResponse>, AppError> {
    let (appt, payment) = {
        let db = state.db();
        let appt = queries::get_appointment(&db, &id)?
            .ok_or_else(|| AppError::NotFound(format!("appointment {id}")))?;
        let payment = queries::get_payment_for_appointment(&db, &id)?;
        (appt, payment)
    };

    Ok(Json(PaymentStatusResponse {
        appointment_id: appt.id.clone(),
        payment_method: appt.payment_method,
        status: appt.payment_status,
        confirmation: appt.confirmation(),
        payment,
    }))
}
