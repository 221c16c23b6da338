// crates/sync/tests/live_sync.rs
//! End-to-end: a real HTTP fixture serving the push-event stream plus the
//! jobs listing, consumed through the relay and the table adapter.

use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use axum::routing::get;
use axum::{Json, Router};
use futures_util::Stream;
use pretty_assertions::assert_eq;
use tokio::sync::broadcast;

use transferdeck_core::JobStatus;
use transferdeck_sync::adapters::JobsTableAdapter;
use transferdeck_sync::{ApiClient, StreamConfig, StreamRelay, StreamSignal, StreamSubscription, SyncConfig};

#[derive(Clone)]
struct AppState {
    events: broadcast::Sender<serde_json::Value>,
    close: broadcast::Sender<()>,
    jobs: Arc<Vec<serde_json::Value>>,
    list_calls: Arc<AtomicUsize>,
}

struct Fixture {
    base_url: String,
    events: broadcast::Sender<serde_json::Value>,
    /// Ends every open event stream, as if the server restarted.
    close: broadcast::Sender<()>,
    list_calls: Arc<AtomicUsize>,
}

async fn start_fixture(jobs: Vec<serde_json::Value>) -> Fixture {
    let (events, _) = broadcast::channel(64);
    let (close, _) = broadcast::channel(4);
    let list_calls = Arc::new(AtomicUsize::new(0));
    let state = AppState {
        events: events.clone(),
        close: close.clone(),
        jobs: Arc::new(jobs),
        list_calls: list_calls.clone(),
    };
    let app = Router::new()
        .route("/api/jobs/", get(list_jobs))
        .route("/api/events", get(event_stream))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Fixture {
        base_url: format!("http://{addr}"),
        events,
        close,
        list_calls,
    }
}

async fn list_jobs(State(state): State<AppState>) -> Json<Vec<serde_json::Value>> {
    state.list_calls.fetch_add(1, Ordering::SeqCst);
    Json(state.jobs.as_ref().clone())
}

async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.events.subscribe();
    let mut close = state.close.subscribe();
    let stream = async_stream::stream! {
        loop {
            tokio::select! {
                _ = close.recv() => break,
                value = rx.recv() => match value {
                    Ok(value) => yield Ok(Event::default().data(value.to_string())),
                    Err(_) => break,
                },
            }
        }
    };
    Sse::new(stream)
}

async fn next_signal(sub: &mut StreamSubscription) -> StreamSignal {
    tokio::time::timeout(Duration::from_secs(5), sub.recv())
        .await
        .expect("timed out waiting for stream signal")
        .expect("stream closed")
}

#[tokio::test]
async fn test_table_follows_live_feed_without_refetching() {
    let fixture = start_fixture(vec![serde_json::json!({
        "id": 1,
        "name": "nightly backup",
        "operation": "sync",
        "last_status": "failed",
        "last_error": "timeout"
    })])
    .await;

    let config = SyncConfig::new(&fixture.base_url);
    let mut table = JobsTableAdapter::new(ApiClient::new(&config));
    table.refresh().await;
    assert!(table.notice().is_none());
    assert_eq!(table.rows()[0].status, JobStatus::Failed);
    assert_eq!(fixture.list_calls.load(Ordering::SeqCst), 1);

    let relay = StreamRelay::new(StreamConfig::from_sync(&config));
    let mut sub = relay.subscribe();

    // Connecting triggers exactly one REST resync.
    assert_eq!(next_signal(&mut sub).await, StreamSignal::Connected);
    assert!(table.apply(&StreamSignal::Connected));
    table.refresh().await;
    assert_eq!(fixture.list_calls.load(Ordering::SeqCst), 2);

    // Progress flips the row to running without another listing fetch.
    fixture
        .events
        .send(serde_json::json!({
            "type": "progress",
            "job_id": 1,
            "stats": {"bytes": 50, "totalBytes": 100, "speed": 1024.0}
        }))
        .unwrap();
    let signal = next_signal(&mut sub).await;
    assert!(!table.apply(&signal));
    let row = &table.rows()[0];
    assert_eq!(row.status, JobStatus::Running);
    assert_eq!(row.metrics.as_ref().unwrap().percent, Some(50.0));
    assert_eq!(fixture.list_calls.load(Ordering::SeqCst), 2);

    // A terminal update clears telemetry and stamps the run, still no fetch.
    fixture
        .events
        .send(serde_json::json!({
            "type": "job_update",
            "job_id": 1,
            "status": "finished"
        }))
        .unwrap();
    let signal = next_signal(&mut sub).await;
    assert!(!table.apply(&signal));
    let row = &table.rows()[0];
    assert_eq!(row.status, JobStatus::Succeeded);
    assert!(row.error.is_none());
    assert!(row.metrics.is_none());
    assert!(row.last_run.is_some());
    assert_eq!(fixture.list_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_one_connection_fans_out_to_every_subscriber() {
    let fixture = start_fixture(vec![]).await;
    let config = SyncConfig::new(&fixture.base_url);
    let relay = StreamRelay::new(StreamConfig::from_sync(&config));

    let mut sub_a = relay.subscribe();
    assert_eq!(next_signal(&mut sub_a).await, StreamSignal::Connected);
    // The second subscription reuses the live connection.
    let mut sub_b = relay.subscribe();
    assert_eq!(relay.subscriber_count(), 2);

    fixture
        .events
        .send(serde_json::json!({
            "type": "job_update",
            "job_id": 3,
            "status": "running"
        }))
        .unwrap();

    let a = next_signal(&mut sub_a).await;
    let b = next_signal(&mut sub_b).await;
    assert_eq!(a, b);
    match a {
        StreamSignal::Event(event) => assert_eq!(event.job_id(), 3),
        other => panic!("expected an event, got {other:?}"),
    }
}

#[tokio::test]
async fn test_server_close_triggers_backoff_and_fresh_connected() {
    let fixture = start_fixture(vec![]).await;
    // Backoff long enough to observe the disconnected window, short enough
    // to keep the test quick.
    let relay = StreamRelay::new(StreamConfig {
        events_url: format!("{}/api/events", fixture.base_url),
        initial_backoff: Duration::from_millis(500),
        max_backoff: Duration::from_secs(1),
    });
    let mut connected = relay.connected();
    let mut sub = relay.subscribe();

    assert_eq!(next_signal(&mut sub).await, StreamSignal::Connected);
    assert!(relay.is_connected());

    // Server drops the stream; the indicator goes down while the relay
    // waits out the backoff.
    fixture.close.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), async {
        while *connected.borrow_and_update() {
            connected.changed().await.unwrap();
        }
    })
    .await
    .expect("indicator never dropped after server close");
    assert!(!relay.is_connected());

    // The reconnect announces itself again, which is the resync trigger.
    assert_eq!(next_signal(&mut sub).await, StreamSignal::Connected);
    assert!(relay.is_connected());

    // And the reopened stream still delivers events.
    fixture
        .events
        .send(serde_json::json!({
            "type": "job_update",
            "job_id": 5,
            "status": "running"
        }))
        .unwrap();
    match next_signal(&mut sub).await {
        StreamSignal::Event(event) => assert_eq!(event.job_id(), 5),
        other => panic!("expected an event, got {other:?}"),
    }
}
