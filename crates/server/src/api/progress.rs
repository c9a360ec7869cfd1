//! Server-sent event stream of job progress.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use spotitools_core::{JobState, JobToken, Subscription};
use tracing::{debug, warn};

use crate::metrics::{SSE_CONNECTIONS_ACTIVE, SSE_CONNECTIONS_TOTAL, SSE_FRAMES_SENT};
use crate::state::AppState;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Keeps the open-stream gauge in step with the stream's lifetime.
struct ConnectionGuard {
    token: String,
}

impl ConnectionGuard {
    fn open(token: String) -> Self {
        SSE_CONNECTIONS_ACTIVE.inc();
        SSE_CONNECTIONS_TOTAL.inc();
        debug!("Progress stream opened for {}", token);
        Self { token }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        SSE_CONNECTIONS_ACTIVE.dec();
        debug!("Progress stream closed for {}", self.token);
    }
}

/// Stream a job's state: the current snapshot first, then one frame per
/// update. The stream ends when the job is released or cancelled, right
/// away for unknown ids, and when another client subscribes to the same job.
pub async fn stream_progress(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = match JobToken::parse(&id) {
        Ok(token) => state.manager().subscribe(&token).await,
        Err(_) => Subscription::closed(),
    };

    Sse::new(frames(subscription, ConnectionGuard::open(id)))
        .keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
}

fn frames(
    subscription: Subscription<JobState>,
    guard: ConnectionGuard,
) -> impl Stream<Item = Result<Event, Infallible>> {
    subscription.filter_map(move |job_state| {
        let frame = match Event::default().json_data(&job_state) {
            Ok(event) => {
                SSE_FRAMES_SENT.inc();
                Some(Ok(event))
            }
            Err(e) => {
                warn!("Dropping progress frame for {}: {}", guard.token, e);
                None
            }
        };
        futures::future::ready(frame)
    })
}
