//! pulse-api - Server-sent event producer for pulse sample streams
//!
//! Serves a single subscription endpoint. Each request gets its own ticker
//! that pushes one timestamped random sample immediately and then one per
//! interval, for as long as the client stays connected.
//!
//! # Usage
//!
//! ```ignore
//! use pulse_api::{create_router, AppState, ProducerConfig};
//!
//! let state = AppState::new(ProducerConfig::default());
//! let router = create_router(state);
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod producer;
pub mod state;

pub use config::ProducerConfig;
pub use error::ApiError;
pub use producer::{spawn_ticker, ExitReason, ProducerError, SampleFeed, TickerExit};
pub use state::AppState;

use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the producer router with the given application state
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let stream_path = state.config().path.clone();

    Router::new()
        // Health check
        .route("/health", get(|| async { "OK" }))
        // Subscription endpoint
        .route(&stream_path, get(handlers::stream::stream_samples))
        .fallback(|| async { ApiError::NotFound("No such endpoint".to_string()) })
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
