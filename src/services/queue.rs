use chrono::NaiveDate;

use crate::db::queries;
use crate::state::AppState;

pub const BOOKED: &str = "booked";
pub const STATUS_CHANGED: &str = "status_changed";
pub const PAYMENT_SETTLED: &str = "payment_settled";
pub const DAY_CLOSED: &str = "day_closed";
pub const AVAILABILITY_CHANGED: &str = "availability_changed";

/// Stores a queue event and pushes it to live reception displays. Failure to
/// record never fails the request that caused it.
pub fn record_queue_event(
    state: &AppState,
    date: NaiveDate,
    appointment_id: Option<&str>,
    kind: &str,
    detail: &str,
) {
    let result = {
        let db = state.db();
        queries::insert_queue_event(&db, date, appointment_id, kind, detail)
    };

    match result {
        Ok(event) => {
            // no subscribers is fine
            let _ = state.queue_tx.send(event);
        }
        Err(e) => {
            tracing::error!(error = %e, kind, "failed to record queue event");
        }
    }
}
