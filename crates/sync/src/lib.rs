// crates/sync/src/lib.rs
//! Transferdeck live-status synchronization layer.
//!
//! Connects the rendering surfaces (jobs table, standalone embed, widget
//! embed, widget editor preview) to the backend: one multiplexed push-event
//! stream fanned out per subscriber, plus REST snapshots that live data
//! merges into but never overwrites.

pub mod adapters;
pub mod config;
pub mod error;
pub mod rest;
pub mod stream;

pub use config::{StreamConfig, SyncConfig};
pub use error::{SyncError, SyncResult};
pub use rest::{ApiClient, JobRecord, WidgetBundle, WidgetConfig, WidgetJobInfo};
pub use stream::{StreamRelay, StreamSignal, StreamSubscription};
