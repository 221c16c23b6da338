// crates/core/src/metrics.rs
//! Display-metric derivation from raw telemetry.
//!
//! Every surface (table row, embed, widget field) computes its numbers
//! through these functions so the same stats render identically everywhere.

use regex_lite::Regex;
use serde::Serialize;
use ts_rs::TS;

use crate::telemetry::ProgressStats;

/// Completion percentage, 0..=100.
///
/// Byte counts win when the engine knows the total; transfer counts are the
/// fallback. `None` means indeterminate, rendered as "starting" rather
/// than 0%.
pub fn percentage(stats: &ProgressStats) -> Option<f64> {
    if stats.total_bytes > 0 {
        Some((stats.bytes as f64 / stats.total_bytes as f64 * 100.0).min(100.0))
    } else if stats.total_transfers > 0 {
        Some((stats.transfers as f64 / stats.total_transfers as f64 * 100.0).min(100.0))
    } else {
        None
    }
}

/// Whether there is real movement to draw a bar for.
///
/// A non-zero total with zero movement must not flash a bar; percent > 0
/// alone is not enough either, since stale totals can survive a restart.
pub fn has_progress(stats: &ProgressStats) -> bool {
    percentage(stats).is_some_and(|p| p > 0.0) && (stats.bytes > 0 || stats.transfers > 0)
}

/// Current throughput in bytes/sec.
///
/// Per-file speeds (preferring `speedAvg`, falling back to `speed` per entry)
/// are more representative of "what's happening now" than the whole-run
/// average, so their sum wins whenever it is non-zero.
pub fn throughput(stats: &ProgressStats) -> f64 {
    let per_file: f64 = stats
        .transferring
        .iter()
        .map(|t| if t.speed_avg > 0.0 { t.speed_avg } else { t.speed })
        .sum();
    if per_file > 0.0 {
        per_file
    } else {
        stats.speed
    }
}

/// Re-render a compact engine ETA (`"1h2m3s"`, any subset of components)
/// as `"1h 2m"`, `"5m"`, or `"< 1m"`. Seconds are accepted but not shown.
///
/// Returns `None` when the input carries no recognizable component.
pub fn format_eta(raw: &str) -> Option<String> {
    // Compile-time-constant pattern; new() cannot fail.
    let re = Regex::new(r"^(?:(\d+)h)?(?:(\d+)m)?(?:(\d+)s)?$").unwrap();
    let caps = re.captures(raw.trim())?;

    let hours: u64 = caps.get(1).map_or(0, |m| m.as_str().parse().unwrap_or(0));
    let minutes: u64 = caps.get(2).map_or(0, |m| m.as_str().parse().unwrap_or(0));
    if caps.get(1).is_none() && caps.get(2).is_none() && caps.get(3).is_none() {
        return None;
    }

    Some(if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m")
    } else {
        "< 1m".to_string()
    })
}

/// The derived numbers every rendering surface consumes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, TS)]
#[ts(export, export_to = "../../../frontend/src/types/generated/")]
#[serde(rename_all = "camelCase")]
pub struct ProgressMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,
    pub has_progress: bool,
    /// Bytes/sec.
    pub throughput: f64,
    /// Human-form ETA, e.g. `"1h 2m"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta: Option<String>,
}

impl ProgressMetrics {
    pub fn from_stats(stats: &ProgressStats) -> Self {
        Self {
            percent: percentage(stats),
            has_progress: has_progress(stats),
            throughput: throughput(stats),
            eta: stats.eta.as_deref().and_then(format_eta),
        }
    }
}
