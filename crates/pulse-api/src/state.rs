//! Application state for the stream producer

use std::sync::Arc;

use pulse_core::{RandomSourceFactory, SampleSource, SourceFactory};
use tokio_util::sync::CancellationToken;

use crate::config::ProducerConfig;

/// Application state shared across all handlers
///
/// Holds configuration and the factory for per-subscription sources only;
/// nothing here changes as subscriptions come and go.
#[derive(Clone)]
pub struct AppState {
    config: Arc<ProducerConfig>,
    sources: Arc<dyn SourceFactory>,
    shutdown: CancellationToken,
}

impl AppState {
    /// Create state serving uniformly random samples
    pub fn new(config: ProducerConfig) -> Self {
        Self::with_source_factory(config, RandomSourceFactory)
    }

    /// Create state with a custom sample source per subscription
    pub fn with_source_factory(config: ProducerConfig, sources: impl SourceFactory + 'static) -> Self {
        Self {
            config: Arc::new(config),
            sources: Arc::new(sources),
            shutdown: CancellationToken::new(),
        }
    }

    /// Get the producer configuration
    pub fn config(&self) -> &ProducerConfig {
        &self.config
    }

    /// Source for a new subscription
    pub fn create_source(&self) -> Box<dyn SampleSource> {
        self.sources.create()
    }

    /// Token cancelled when the server starts shutting down
    ///
    /// Cancelling it ends every open stream, which lets graceful shutdown
    /// complete instead of waiting on connections that never close.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(ProducerConfig::default())
    }
}
