// crates/core/src/telemetry.rs
//! Transfer telemetry wire types.
//!
//! Shape of the `stats` payload inside a progress frame. The transfer engine
//! reports these in camelCase (`core/stats` vocabulary); every field is
//! optional on the wire, and an absent field is equivalent to zero.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// One in-flight file inside a progress frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../../frontend/src/types/generated/")]
#[serde(rename_all = "camelCase", default)]
pub struct TransferItem {
    pub name: String,
    /// Instantaneous speed in bytes/sec.
    pub speed: f64,
    /// Average speed for this file in bytes/sec.
    pub speed_avg: f64,
}

/// Snapshot of in-flight transfer telemetry for one job.
///
/// `total_bytes` may be zero when the engine could not pre-compute the run
/// size; consumers must treat that as "unknown", not "empty".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../../frontend/src/types/generated/")]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressStats {
    pub bytes: u64,
    pub total_bytes: u64,
    pub transfers: u64,
    pub total_transfers: u64,
    /// Aggregate average speed for the whole run, bytes/sec.
    pub speed: f64,
    /// Compact duration string, e.g. `"1h2m3s"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta: Option<String>,
    /// Currently transferring files, in engine order.
    pub transferring: Vec<TransferItem>,
    /// Most recently completed file, if the engine reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_file: Option<String>,
    /// Seconds since the run started.
    pub elapsed_time: f64,
}
