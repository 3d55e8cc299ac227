use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::sse::{Event, Sse};
use serde::Deserialize;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::{BroadcastStream, IntervalStream};
use tokio_stream::StreamExt;

use super::parse_date;
use crate::db::queries::{self, DATE_FORMAT};
use crate::errors::AppError;
use crate::models::QueueEvent;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct QueueStreamQuery {
    pub token: Option<String>,
    pub last_id: Option<i64>,
    pub date: Option<String>,
}

fn to_sse(event: &QueueEvent) -> Event {
    let data = serde_json::to_string(event).unwrap_or_default();
    Event::default()
        .id(event.id.to_string())
        .event("queue_event")
        .data(data)
}

// GET /api/queue/events — SSE
pub async fn events_stream(
    State(state): State<Arc<AppState>>,
    Query(query): Query<QueueStreamQuery>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>, AppError> {
    // EventSource cannot send headers, so the token rides in the query
    let token = query.token.as_deref().unwrap_or("");
    if token.is_empty() || token != state.config.admin_token {
        return Err(AppError::Unauthorized);
    }

    let date = query.date.as_deref().map(|d| parse_date("date", d)).transpose()?;
    let last_id = query.last_id.unwrap_or(0);

    // subscribe before the catch-up read so nothing falls between them
    let rx = state.queue_tx.subscribe();
    let catchup = {
        let db = state.db();
        queries::get_queue_events_since(&db, last_id, date)?
    };
    let replayed_up_to = catchup.last().map(|e| e.id).unwrap_or(last_id);

    let catchup_stream =
        tokio_stream::iter(catchup.into_iter().map(|event| Ok::<_, Infallible>(to_sse(&event))));

    let date_filter = date.map(|d| d.format(DATE_FORMAT).to_string());
    let live_stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(event) if event.id <= replayed_up_to => None,
        Ok(event) if date_filter.as_ref().is_some_and(|d| *d != event.date) => None,
        Ok(event) => Some(Ok(to_sse(&event))),
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "queue event subscriber lagged");
            None
        }
    });

    let keepalive = IntervalStream::new(tokio::time::interval(Duration::from_secs(30)))
        .map(|_| Ok(Event::default().comment("keepalive")));

    Ok(Sse::new(catchup_stream.chain(live_stream).merge(keepalive)))
}
