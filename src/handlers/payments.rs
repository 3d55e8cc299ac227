use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::db::queries;
use crate::errors::AppError;
use crate::services::payments::{self, PaymentCallback};
use crate::services::queue::{self, record_queue_event};
use crate::state::AppState;

// POST /api/payments/callback
pub async fn payment_callback(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PaymentCallback>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (payment, appt) = {
        let db = state.db();
        let payment = payments::settle(&db, state.payments.as_ref(), &body)?;
        let appt = queries::get_appointment(&db, &payment.appointment_id)?;
        (payment, appt)
    };

    if let Some(appt) = appt {
        record_queue_event(
            &state,
            appt.date,
            Some(&appt.id),
            queue::PAYMENT_SETTLED,
            payment.status.as_str(),
        );
    }

    Ok(Json(serde_json::json!({
        "ok": true,
        "appointment_id": payment.appointment_id,
        "status": payment.status,
    })))
}
