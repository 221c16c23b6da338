// crates/sync/src/config.rs
//! Endpoint and reconnect configuration.

use std::time::Duration;

/// Where the backend lives and which paths this layer consumes.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the dashboard API (e.g. `http://127.0.0.1:8787`).
    /// Defaults from `TRANSFERDECK_API_URL`.
    pub base_url: String,
    /// Quiet period before a search-text change triggers a listing fetch.
    pub search_debounce: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("TRANSFERDECK_API_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8787".to_string()),
            search_debounce: Duration::from_millis(300),
        }
    }
}

impl SyncConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }
}

/// Reconnect behavior for the push-event connection.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Full URL of the push-event endpoint.
    pub events_url: String,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl StreamConfig {
    pub fn from_sync(config: &SyncConfig) -> Self {
        Self {
            events_url: format!("{}/api/events", config.base_url.trim_end_matches('/')),
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        }
    }
}
