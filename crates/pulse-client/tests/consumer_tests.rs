//! Consumer state machine tests
//!
//! A scripted transport hands out in-memory streams the test feeds by hand,
//! and tokio's paused clock makes the reconnect delay exact.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use pretty_assertions::assert_eq;
use pulse_client::consumer::{PARSE_ERROR_MESSAGE, RECONNECTING_MESSAGE};
use pulse_client::{
    ConnectionStatus, Consumer, ConsumerConfig, ConsumerView, EventStream, Sample, StreamError,
    StreamResult, Transport,
};
use tokio::sync::{mpsc, Notify};
use tokio::time::Instant;
use tokio_stream::wrappers::UnboundedReceiverStream;

// =============================================================================
// Scripted transport
// =============================================================================

type Connection = mpsc::UnboundedSender<StreamResult<Sample>>;

#[derive(Default)]
struct Script {
    queued: VecDeque<StreamResult<mpsc::UnboundedReceiver<StreamResult<Sample>>>>,
    opens: Vec<Instant>,
}

#[derive(Clone, Default)]
struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    /// Queue a connection that opens; the returned sender feeds its events
    fn accept(&self) -> Connection {
        let (tx, rx) = mpsc::unbounded_channel();
        self.script.lock().unwrap().queued.push_back(Ok(rx));
        tx
    }

    /// Queue a connection attempt that fails before opening
    fn refuse(&self) {
        self.script.lock().unwrap().queued.push_back(Err(StreamError::Server {
            status: 503,
            message: "unavailable".to_string(),
        }));
    }

    fn opens(&self) -> Vec<Instant> {
        self.script.lock().unwrap().opens.clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open(&self) -> StreamResult<EventStream> {
        let next = {
            let mut script = self.script.lock().unwrap();
            script.opens.push(Instant::now());
            script.queued.pop_front()
        };

        match next {
            Some(Ok(rx)) => Ok(Box::pin(UnboundedReceiverStream::new(rx))),
            Some(Err(e)) => Err(e),
            None => Err(StreamError::Transport("no connection scripted".to_string())),
        }
    }

    fn endpoint(&self) -> String {
        "scripted".to_string()
    }
}

/// Holds every open until the gate is released
#[derive(Clone, Default)]
struct GatedTransport {
    gate: Arc<Notify>,
    started: Arc<AtomicUsize>,
    completed: Arc<AtomicUsize>,
}

#[async_trait]
impl Transport for GatedTransport {
    async fn open(&self) -> StreamResult<EventStream> {
        self.started.fetch_add(1, Ordering::SeqCst);
        self.gate.notified().await;
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(Box::pin(futures::stream::pending::<StreamResult<Sample>>()))
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn sample(value: f64) -> Sample {
    Sample::new(value, Utc::now())
}

fn spawn_consumer(transport: &ScriptedTransport) -> Consumer {
    Consumer::spawn(transport.clone(), ConsumerConfig::default())
}

/// Wait for a view matching `predicate`, failing instead of hanging
async fn expect_view(
    consumer: &Consumer,
    predicate: impl FnMut(&ConsumerView) -> bool,
) -> ConsumerView {
    tokio::time::timeout(Duration::from_secs(60), consumer.wait_for(predicate))
        .await
        .expect("timed out waiting for consumer view")
        .expect("consumer stopped")
}

async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(1), future)
        .await
        .expect("timed out")
}

fn is_connected(view: &ConsumerView) -> bool {
    view.connected
}

fn is_errored(view: &ConsumerView) -> bool {
    view.status == ConnectionStatus::Errored
}

fn is_disabled(view: &ConsumerView) -> bool {
    view.status == ConnectionStatus::Disabled
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_starts_disabled_without_connecting() {
    let transport = ScriptedTransport::default();
    let _conn = transport.accept();
    let consumer = spawn_consumer(&transport);

    tokio::time::sleep(Duration::from_secs(10)).await;

    let view = consumer.view();
    assert_eq!(view.status, ConnectionStatus::Disabled);
    assert_eq!(view.display_value(), "Waiting for data...");
    assert!(transport.opens().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_enable_connects_and_tracks_latest_sample() {
    let transport = ScriptedTransport::default();
    let conn = transport.accept();
    let consumer = spawn_consumer(&transport);

    consumer.enable();
    expect_view(&consumer, is_connected).await;

    conn.send(Ok(sample(42.5))).unwrap();
    let view = expect_view(&consumer, |v| v.value() == Some(42.5)).await;
    assert_eq!(view.display_value(), "42.50");
    assert_eq!(view.error, None);

    conn.send(Ok(sample(17.0))).unwrap();
    let view = expect_view(&consumer, |v| v.value() == Some(17.0)).await;
    assert_eq!(view.status_label(), "Connected");
    assert_eq!(transport.opens().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_enable_is_idempotent() {
    let transport = ScriptedTransport::default();
    let _conn = transport.accept();
    let consumer = spawn_consumer(&transport);

    consumer.enable();
    consumer.enable();
    expect_view(&consumer, is_connected).await;
    consumer.enable();

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(transport.opens().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_after_error_uses_fixed_delay() {
    let transport = ScriptedTransport::default();
    let first = transport.accept();
    let _second = transport.accept();
    let consumer = spawn_consumer(&transport);

    // Record each distinct connected/disconnected label as it is published.
    let labels = Arc::new(Mutex::new(vec![consumer.view().status_label()]));
    let mut views = consumer.watch();
    let recorder = {
        let labels = labels.clone();
        tokio::spawn(async move {
            while views.changed().await.is_ok() {
                let label = views.borrow_and_update().status_label();
                let mut labels = labels.lock().unwrap();
                if labels.last() != Some(&label) {
                    labels.push(label);
                }
            }
        })
    };

    consumer.enable();
    expect_view(&consumer, is_connected).await;

    first
        .send(Err(StreamError::Transport("connection reset".to_string())))
        .unwrap();
    let view = expect_view(&consumer, is_errored).await;
    let failed_at = Instant::now();
    assert!(!view.connected);
    assert_eq!(view.error.as_deref(), Some(RECONNECTING_MESSAGE));
    assert_eq!(view.reconnects, 1);

    let view = expect_view(&consumer, is_connected).await;
    assert_eq!(view.error, None);
    assert_eq!(view.reconnects, 1);

    let opens = transport.opens();
    assert_eq!(opens.len(), 2);
    let waited = opens[1] - failed_at;
    assert!(waited >= Duration::from_millis(5000), "waited {:?}", waited);
    assert!(waited < Duration::from_millis(5100), "waited {:?}", waited);

    recorder.abort();
    assert_eq!(
        *labels.lock().unwrap(),
        vec!["Disconnected", "Connected", "Disconnected", "Connected"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_one_reconnect_per_error() {
    let transport = ScriptedTransport::default();
    let first = transport.accept();
    transport.refuse();
    let _third = transport.accept();
    let consumer = spawn_consumer(&transport);

    consumer.enable();
    expect_view(&consumer, is_connected).await;
    first.send(Err(StreamError::Closed)).unwrap();

    // The refused attempt is a second error and schedules a second reconnect.
    let view = expect_view(&consumer, |v| v.connected && v.reconnects == 2).await;
    assert_eq!(view.error, None);

    let opens = transport.opens();
    assert_eq!(opens.len(), 3);
    assert!(opens[2] - opens[1] >= Duration::from_millis(5000));
}

#[tokio::test(start_paused = true)]
async fn test_disable_during_reconnect_delay_prevents_reconnect() {
    let transport = ScriptedTransport::default();
    let first = transport.accept();
    let _second = transport.accept();
    let consumer = spawn_consumer(&transport);

    consumer.enable();
    expect_view(&consumer, is_connected).await;

    first
        .send(Err(StreamError::Transport("connection reset".to_string())))
        .unwrap();
    expect_view(&consumer, is_errored).await;

    tokio::time::sleep(Duration::from_millis(1000)).await;
    consumer.disable();
    let view = expect_view(&consumer, is_disabled).await;
    assert_eq!(view.error, None);
    assert!(!view.connected);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(transport.opens().len(), 1);
    assert_eq!(consumer.view().status, ConnectionStatus::Disabled);
}

#[tokio::test(start_paused = true)]
async fn test_disable_closes_open_stream() {
    let transport = ScriptedTransport::default();
    let conn = transport.accept();
    let consumer = spawn_consumer(&transport);

    consumer.enable();
    expect_view(&consumer, is_connected).await;
    conn.send(Ok(sample(3.0))).unwrap();
    expect_view(&consumer, |v| v.latest.is_some()).await;

    consumer.disable();
    let view = expect_view(&consumer, is_disabled).await;
    assert_eq!(view.latest, None);
    assert_eq!(view.display_value(), "Waiting for data...");

    within(conn.closed()).await;
}

#[tokio::test(start_paused = true)]
async fn test_malformed_event_keeps_value_and_connection() {
    let transport = ScriptedTransport::default();
    let conn = transport.accept();
    let consumer = spawn_consumer(&transport);

    consumer.enable();
    expect_view(&consumer, is_connected).await;
    conn.send(Ok(sample(42.5))).unwrap();
    expect_view(&consumer, |v| v.value() == Some(42.5)).await;

    conn.send(Err(StreamError::Parse("expected value at line 1".to_string())))
        .unwrap();
    let view = expect_view(&consumer, |v| v.error.is_some()).await;
    assert_eq!(view.error.as_deref(), Some(PARSE_ERROR_MESSAGE));
    assert_eq!(view.value(), Some(42.5));
    assert!(view.connected);
    assert_eq!(view.reconnects, 0);

    conn.send(Ok(sample(50.0))).unwrap();
    let view = expect_view(&consumer, |v| v.value() == Some(50.0)).await;
    assert_eq!(view.error, None);
    assert_eq!(transport.opens().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stream_end_is_a_transport_error() {
    let transport = ScriptedTransport::default();
    let conn = transport.accept();
    let consumer = spawn_consumer(&transport);

    consumer.enable();
    expect_view(&consumer, is_connected).await;

    drop(conn);
    let view = expect_view(&consumer, is_errored).await;
    assert_eq!(view.error.as_deref(), Some(RECONNECTING_MESSAGE));
}

#[tokio::test(start_paused = true)]
async fn test_refused_open_schedules_reconnect() {
    let transport = ScriptedTransport::default();
    transport.refuse();
    let _conn = transport.accept();
    let consumer = spawn_consumer(&transport);

    consumer.enable();
    let view = expect_view(&consumer, is_errored).await;
    assert!(!view.connected);

    expect_view(&consumer, is_connected).await;
    assert_eq!(transport.opens().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_toggle_and_reenable() {
    let transport = ScriptedTransport::default();
    let first = transport.accept();
    let second = transport.accept();
    let consumer = spawn_consumer(&transport);

    consumer.toggle();
    expect_view(&consumer, is_connected).await;
    first.send(Ok(sample(9.0))).unwrap();
    expect_view(&consumer, |v| v.latest.is_some()).await;

    consumer.toggle();
    let view = expect_view(&consumer, is_disabled).await;
    assert_eq!(view.toggle_label(), "Start Connection");

    consumer.toggle();
    let view = expect_view(&consumer, is_connected).await;
    assert_eq!(view.latest, None);
    assert_eq!(view.toggle_label(), "Stop Connection");

    second.send(Ok(sample(10.0))).unwrap();
    expect_view(&consumer, |v| v.value() == Some(10.0)).await;
    assert_eq!(transport.opens().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_closes_stream() {
    let transport = ScriptedTransport::default();
    let conn = transport.accept();
    let consumer = spawn_consumer(&transport);

    consumer.enable();
    expect_view(&consumer, is_connected).await;

    within(consumer.shutdown()).await;
    within(conn.closed()).await;
}

#[tokio::test(start_paused = true)]
async fn test_dropping_consumer_cancels_pending_reconnect() {
    let transport = ScriptedTransport::default();
    let first = transport.accept();
    let _second = transport.accept();
    let consumer = spawn_consumer(&transport);

    consumer.enable();
    expect_view(&consumer, is_connected).await;
    first.send(Err(StreamError::Closed)).unwrap();
    expect_view(&consumer, is_errored).await;

    drop(consumer);
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(transport.opens().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_disable_while_opening_abandons_the_open() {
    let transport = GatedTransport::default();
    let consumer = Consumer::spawn(transport.clone(), ConsumerConfig::default());

    consumer.enable();
    expect_view(&consumer, |v| v.status == ConnectionStatus::Connecting).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(transport.started.load(Ordering::SeqCst), 1);

    consumer.disable();
    expect_view(&consumer, is_disabled).await;

    // Releasing the gate now reaches no one: the pending open was dropped.
    transport.gate.notify_one();
    tokio::time::sleep(Duration::from_secs(30)).await;

    let view = consumer.view();
    assert_eq!(view.status, ConnectionStatus::Disabled);
    assert!(!view.connected);
    assert_eq!(view.error, None);
    assert_eq!(transport.started.load(Ordering::SeqCst), 1);
    assert_eq!(transport.completed.load(Ordering::SeqCst), 0);
}
