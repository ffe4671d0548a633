//! Test utilities for pulse-client
//!
//! Provides helpers for running integration tests against a pulse server.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::{PulseClient, Result};

/// A test server that automatically shuts down when dropped
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: PulseClient,
    streams: CancellationToken,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    /// Create a new test server from an axum Router on a free port
    ///
    /// `streams` is cancelled on shutdown so open event streams end and
    /// graceful shutdown can finish; pass the producer's shutdown token.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use pulse_client::testing::TestServer;
    /// use pulse_api::{create_router, AppState};
    ///
    /// let state = AppState::default();
    /// let server = TestServer::start(create_router(state.clone()), state.shutdown_token()).await?;
    /// let subscription = server.client.subscribe().await?;
    /// ```
    pub async fn start<S>(router: axum::Router<S>, streams: CancellationToken) -> Result<Self>
    where
        S: Clone + Send + Sync + 'static,
        axum::Router<S>: Into<axum::Router>,
    {
        Self::start_at(SocketAddr::from(([127, 0, 0, 1], 0)), router, streams).await
    }

    /// Create a new test server bound to a specific address
    ///
    /// Useful to bring a server back on the port a consumer is retrying.
    pub async fn start_at<S>(
        addr: SocketAddr,
        router: axum::Router<S>,
        streams: CancellationToken,
    ) -> Result<Self>
    where
        S: Clone + Send + Sync + 'static,
        axum::Router<S>: Into<axum::Router>,
    {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let router: axum::Router = router.into();
        let on_shutdown = streams.clone();

        // Spawn the server
        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                    on_shutdown.cancel();
                })
                .await
                .ok();
        });

        // Give server a moment to start
        tokio::time::sleep(Duration::from_millis(10)).await;

        let client = PulseClient::new(&format!("http://{}", addr))?;

        Ok(Self {
            addr,
            client,
            streams,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Get the base URL of the test server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get a reference to the client
    pub fn client(&self) -> &PulseClient {
        &self.client
    }

    /// Shutdown the server gracefully, ending every open stream
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.streams.cancel();
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        // Abort the task if still running
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
