//! Streaming handler
//!
//! Serves one long-lived `text/event-stream` response per request, fed by a
//! dedicated ticker task.

use axum::extract::State;
use axum::http::header::{self, HeaderName};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

use crate::error::ApiError;
use crate::producer::spawn_ticker;
use crate::state::AppState;

/// GET /api/sse
/// Subscribe to the sample stream
///
/// Emits one sample immediately and then one per tick until the client
/// disconnects. The stream ends with an error if a sample cannot be encoded.
pub async fn stream_samples(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    if state.is_shutting_down() {
        return Err(ApiError::ServiceUnavailable(
            "Server is shutting down".to_string(),
        ));
    }

    let config = state.config();
    let feed = spawn_ticker(state.create_source(), config, state.shutdown_token().child_token());
    tracing::info!(subscription_id = %feed.id, "Subscription opened");

    // The ticker outlives this handler and stops on its own once the body
    // (and with it the receiver) is dropped.
    drop(feed.handle);

    let stream = ReceiverStream::new(feed.receiver)
        .map(|item| item.map(|data| Event::default().data(data)));

    // `keep_alive` wraps the stream type, so both arms become a `Response`.
    let sse = match config.keep_alive {
        Some(interval) => Sse::new(stream)
            .keep_alive(KeepAlive::new().interval(interval))
            .into_response(),
        None => Sse::new(stream).into_response(),
    };

    Ok((
        [
            (header::CACHE_CONTROL, "no-cache, no-transform"),
            (header::CONNECTION, "keep-alive"),
            // Disables response buffering in nginx-style reverse proxies
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        sse,
    ))
}
