//! GET /events: queue mutations as server-sent events
//!
//! Each `QueueEvent` goes out as one message named after its variant, with
//! the JSON body as data. A subscriber that falls behind skips what it
//! missed; displays re-sync from `/queue/current` on the next event anyway.

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{Stream, StreamExt};
use kq_common::events::QueueEvent;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::{debug, info, warn};

use super::AppState;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.events.subscribe();
    info!(
        "Event subscriber connected ({} listening)",
        state.events.subscriber_count()
    );

    let stream = BroadcastStream::new(rx).filter_map(|received| async move {
        match received {
            Ok(event) => sse_message(&event).map(Ok),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!("Event subscriber fell behind, skipped {} events", skipped);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("keep-alive"),
    )
}

fn sse_message(event: &QueueEvent) -> Option<Event> {
    match Event::default().event(event.event_type()).json_data(event) {
        Ok(message) => {
            debug!("Sending {} (length {})", event.event_type(), event.queue_length());
            Some(message)
        }
        Err(e) => {
            warn!("Failed to encode {}: {}", event.event_type(), e);
            None
        }
    }
}
