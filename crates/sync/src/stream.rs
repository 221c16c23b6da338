// crates/sync/src/stream.rs
//! Multiplexed push-event stream client.
//!
//! One SSE connection per process context, fanned out to any number of
//! subscribing surfaces over a broadcast channel. The connection lifetime is
//! reference-counted: it opens when the first subscription is taken and is
//! cancelled synchronously when the last one drops. On transport failure the
//! relay reconnects with exponential backoff and emits a fresh
//! [`StreamSignal::Connected`] so consumers resync via REST, bounding the
//! staleness window after a drop.
//!
//! Frame decoding is fail-open: a malformed frame is logged and dropped, and
//! the stream keeps flowing for every other job.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::StreamExt;
use reqwest::header::ACCEPT;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use transferdeck_core::JobStatusEvent;

use crate::config::StreamConfig;
use crate::error::{SyncError, SyncResult};

/// What a subscription yields.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamSignal {
    /// The connection was (re)established, or this subscriber fell behind and
    /// missed events. Either way: refetch the REST snapshot.
    Connected,
    /// A decoded feed event.
    Event(JobStatusEvent),
}

struct RelayShared {
    config: StreamConfig,
    http: reqwest::Client,
    events_tx: broadcast::Sender<StreamSignal>,
    connected_tx: watch::Sender<bool>,
    subscribers: AtomicUsize,
    conn: Mutex<Option<CancellationToken>>,
}

/// Shared handle to the single push-event connection.
///
/// Cheap to clone; all clones fan out from the same connection.
#[derive(Clone)]
pub struct StreamRelay {
    shared: Arc<RelayShared>,
}

impl StreamRelay {
    pub fn new(config: StreamConfig) -> Self {
        let (events_tx, _) = broadcast::channel(256);
        let (connected_tx, _) = watch::channel(false);
        Self {
            shared: Arc::new(RelayShared {
                config,
                http: reqwest::Client::new(),
                events_tx,
                connected_tx,
                subscribers: AtomicUsize::new(0),
                conn: Mutex::new(None),
            }),
        }
    }

    /// Take a subscription, opening the connection if this is the first one.
    ///
    /// Opening while a connection is already live is a no-op.
    pub fn subscribe(&self) -> StreamSubscription {
        let rx = self.shared.events_tx.subscribe();
        let prev = self.shared.subscribers.fetch_add(1, Ordering::SeqCst);
        if prev == 0 {
            self.open();
        }
        StreamSubscription {
            rx,
            shared: self.shared.clone(),
        }
    }

    /// Presentational connection indicator. Never gates correctness.
    pub fn connected(&self) -> watch::Receiver<bool> {
        self.shared.connected_tx.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        *self.shared.connected_tx.borrow()
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers.load(Ordering::SeqCst)
    }

    fn open(&self) {
        let mut conn = match self.shared.conn.lock() {
            Ok(guard) => guard,
            Err(e) => {
                warn!("relay connection lock poisoned: {e}");
                return;
            }
        };
        if conn.as_ref().is_some_and(|token| !token.is_cancelled()) {
            return;
        }
        let cancel = CancellationToken::new();
        *conn = Some(cancel.clone());
        let shared = self.shared.clone();
        tokio::spawn(run_connection(shared, cancel));
    }
}

/// One surface's view of the feed. Dropping it stops delivery immediately;
/// dropping the last one cancels the underlying connection.
pub struct StreamSubscription {
    rx: broadcast::Receiver<StreamSignal>,
    shared: Arc<RelayShared>,
}

impl StreamSubscription {
    /// Next signal, or `None` once the relay is gone.
    pub async fn recv(&mut self) -> Option<StreamSignal> {
        loop {
            match self.rx.recv().await {
                Ok(signal) => return Some(signal),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "stream subscriber lagged, forcing resync");
                    return Some(StreamSignal::Connected);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for StreamSubscription {
    fn drop(&mut self) {
        if self.shared.subscribers.fetch_sub(1, Ordering::SeqCst) == 1 {
            if let Ok(conn) = self.shared.conn.lock() {
                if let Some(token) = conn.as_ref() {
                    token.cancel();
                }
            }
            let _ = self.shared.connected_tx.send(false);
        }
    }
}

/// Connect-and-stream loop with exponential backoff, teardown via `cancel`.
async fn run_connection(shared: Arc<RelayShared>, cancel: CancellationToken) {
    let mut backoff = shared.config.initial_backoff;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            result = stream_once(&shared, &cancel) => {
                if cancel.is_cancelled() {
                    break;
                }
                match result {
                    Ok(()) => {
                        info!("event stream closed by server, reconnecting");
                        backoff = shared.config.initial_backoff;
                    }
                    Err(e) => {
                        warn!(backoff_secs = backoff.as_secs(), "event stream failed: {e}");
                    }
                }
            }
        }
        let _ = shared.connected_tx.send(false);
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(backoff) => {}
        }
        backoff = (backoff * 2).min(shared.config.max_backoff);
    }
    let _ = shared.connected_tx.send(false);
    debug!("event stream connection task stopped");
}

/// One connection attempt: connect, announce, pump frames until EOF or error.
async fn stream_once(shared: &RelayShared, cancel: &CancellationToken) -> SyncResult<()> {
    let response = shared
        .http
        .get(&shared.config.events_url)
        .header(ACCEPT, "text/event-stream")
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(SyncError::Api {
            status: response.status(),
            path: shared.config.events_url.clone(),
        });
    }

    info!(url = %shared.config.events_url, "event stream connected");
    let _ = shared.connected_tx.send(true);
    let _ = shared.events_tx.send(StreamSignal::Connected);

    let mut frames = FrameBuffer::default();
    let mut body = response.bytes_stream();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            chunk = body.next() => match chunk {
                Some(Ok(bytes)) => {
                    for event in frames.push(&bytes) {
                        let _ = shared.events_tx.send(StreamSignal::Event(event));
                    }
                }
                Some(Err(e)) => return Err(e.into()),
                None => return Ok(()),
            }
        }
    }
}

/// Incremental SSE frame decoder.
///
/// Messages are blank-line delimited; payload is the concatenation of the
/// frame's `data:` lines. Anything that is not one JSON `JobStatusEvent` per
/// message (comments, heartbeats, malformed payloads) is dropped.
#[derive(Default)]
pub(crate) struct FrameBuffer {
    buf: String,
}

impl FrameBuffer {
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<JobStatusEvent> {
        let text = String::from_utf8_lossy(chunk);
        self.buf.extend(text.chars().filter(|&c| c != '\r'));

        let mut events = Vec::new();
        while let Some(pos) = self.buf.find("\n\n") {
            let frame: String = self.buf.drain(..pos + 2).collect();
            if let Some(event) = decode_frame(&frame) {
                events.push(event);
            }
        }
        events
    }
}

fn decode_frame(frame: &str) -> Option<JobStatusEvent> {
    let data = frame
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
        .collect::<Vec<_>>()
        .join("\n");
    if data.is_empty() {
        return None;
    }
    match serde_json::from_str(&data) {
        Ok(event) => Some(event),
        Err(e) => {
            debug!(error = %e, "dropping malformed event frame");
            None
        }
    }
}
