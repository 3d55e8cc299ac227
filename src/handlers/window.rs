use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::services::booking_window::WindowStatus;
use crate::state::AppState;

// GET /api/booking-window
pub async fn booking_window(State(state): State<Arc<AppState>>) -> Json<WindowStatus> {
    Json(state.policy.window.evaluate(state.clock.now()))
}
