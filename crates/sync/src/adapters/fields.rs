// crates/sync/src/adapters/fields.rs
//! Shared field-composition contract for the widget embed and the editor
//! preview. Both surfaces call [`compose_fields`] with the same inputs, which
//! is what keeps the preview pixel-compatible with the real embed.

use serde::Serialize;
use ts_rs::TS;

use transferdeck_core::{JobRuntimeState, JobStatus, ProgressMetrics};

use crate::rest::{WidgetConfig, WidgetField, WidgetJobInfo};

/// One rendered widget field.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = "../../../frontend/src/types/generated/")]
pub struct FieldView {
    pub field: WidgetField,
    pub label: &'static str,
    pub value: String,
}

/// Human label for a display status.
pub fn status_label(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Idle => "Idle",
        JobStatus::Running => "Running",
        JobStatus::Succeeded => "Succeeded",
        JobStatus::Failed => "Failed",
    }
}

/// Humanize a throughput in bytes/sec, e.g. `"1.2 MB/s"`.
pub fn format_speed(bytes_per_sec: f64) -> String {
    const UNITS: [&str; 4] = ["B/s", "KB/s", "MB/s", "GB/s"];
    let mut value = bytes_per_sec.max(0.0);
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{value:.0} {}", UNITS[unit])
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

/// Compose the enabled fields, in configured order, from one job's runtime
/// state. Every numeric comes from the same derivations the jobs table uses.
pub fn compose_fields(
    config: &WidgetConfig,
    job: &WidgetJobInfo,
    state: &JobRuntimeState,
) -> Vec<FieldView> {
    let metrics = state.stats.as_ref().map(ProgressMetrics::from_stats);

    config
        .fields
        .iter()
        .map(|&field| {
            let (label, value) = match field {
                WidgetField::Name => ("Job", job.name.clone()),
                WidgetField::Status => ("Status", status_label(state.status).to_string()),
                WidgetField::Progress => (
                    "Progress",
                    match metrics.as_ref() {
                        Some(m) if m.has_progress => {
                            format!("{:.0}%", m.percent.unwrap_or(0.0))
                        }
                        Some(_) => "Starting...".to_string(),
                        None => "—".to_string(),
                    },
                ),
                WidgetField::Speed => (
                    "Speed",
                    match metrics.as_ref() {
                        Some(m) if m.throughput > 0.0 => format_speed(m.throughput),
                        _ => "—".to_string(),
                    },
                ),
                WidgetField::Eta => (
                    "ETA",
                    metrics
                        .as_ref()
                        .and_then(|m| m.eta.clone())
                        .unwrap_or_else(|| "—".to_string()),
                ),
                WidgetField::LastRun => (
                    "Last run",
                    job.last_run
                        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
                        .unwrap_or_else(|| "never".to_string()),
                ),
                WidgetField::Operation => ("Operation", job.operation.clone()),
            };
            FieldView {
                field,
                label,
                value,
            }
        })
        .collect()
}
