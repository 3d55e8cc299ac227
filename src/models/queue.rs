use serde::{Deserialize, Serialize};

/// A change on the day's queue, replayed to the reception display.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueueEvent {
    pub id: i64,
    pub date: String,
    pub appointment_id: Option<String>,
    pub kind: String,
    pub detail: String,
    pub created_at: String,
}
