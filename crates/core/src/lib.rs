// crates/core/src/lib.rs
//! Transferdeck live-status core.
//!
//! Leaf crate for the live job-status synchronization layer: wire types for
//! the push-event feed, the per-job runtime projection, and the pure
//! display-metric derivations. No I/O lives here; the `transferdeck-sync`
//! crate owns connections and fetches.

pub mod event;
pub mod metrics;
pub mod runtime;
pub mod telemetry;

pub use event::*;
pub use metrics::*;
pub use runtime::*;
pub use telemetry::*;
