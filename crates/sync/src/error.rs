// crates/sync/src/error.rs
//! Error taxonomy for the synchronization layer.
//!
//! Nothing here is fatal to a surface: a fetch failure leaves prior state in
//! place and is surfaced as a transient notice; stream problems are handled
//! inside the relay's reconnect loop and never reach adapters as errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend returned {status} for {path}")]
    Api {
        status: reqwest::StatusCode,
        path: String,
    },

    #[error("no widget published under key {0}")]
    WidgetNotFound(String),
}

pub type SyncResult<T> = Result<T, SyncError>;
