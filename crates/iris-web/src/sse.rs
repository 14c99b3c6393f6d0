//! Server-Sent Events (SSE) stream of job lifecycle events.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::state::SharedState;

/// SSE endpoint. Each event's `event:` field is the job event type, its data
/// the JSON-encoded event.
pub async fn sse_handler(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.subscribe();
    // Lagged receivers skip the missed events.
    let stream = BroadcastStream::new(rx)
        .filter_map(|result| {
            result.ok().and_then(|event| {
                let name = event_name(&event);
                serde_json::to_string(&event).ok().map(|data| {
                    Ok(Event::default().event(name).data(data))
                })
            })
        });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn event_name(event: &iris_synthesis::JobEvent) -> &'static str {
    use iris_synthesis::JobEvent::*;
    match event {
        JobSubmitted { .. } => "job_submitted",
        JobStarted { .. }   => "job_started",
        JobCompleted { .. } => "job_completed",
        JobFailed { .. }    => "job_failed",
    }
}
