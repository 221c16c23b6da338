// crates/core/src/runtime.rs
//! Per-job runtime projection.
//!
//! [`StatusStore`] maps job id to the state folded from the most recently
//! received event for that id. Events for other ids never touch an entry,
//! and an id with no entry reads as [`JobStatus::Idle`] with no stats.
//!
//! Folds are last-write-wins: no sequence or timestamp guard is applied
//! before overwrite. All events for one store arrive on one task in
//! transmission order, so a guard would only mask transport reordering the
//! feed does not exhibit.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use ts_rs::TS;

use crate::event::{JobId, JobStatusEvent, RunPhase};
use crate::telemetry::ProgressStats;

/// Display status of a job as projected from the live feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, TS)]
#[ts(export, export_to = "../../../frontend/src/types/generated/")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// No event seen this session.
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_active(self) -> bool {
        self == JobStatus::Running
    }
}

/// The authoritative per-job projection of the live feed.
///
/// A finished job has no "current" transfer, so terminal folds clear `stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, TS)]
#[ts(export, export_to = "../../../frontend/src/types/generated/")]
#[serde(rename_all = "camelCase")]
pub struct JobRuntimeState {
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<ProgressStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the event producing this state was folded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated_at: Option<DateTime<Utc>>,
}

/// Fold one event into the state for its job id.
///
/// Pure with respect to the previous state: every arm fully replaces the
/// entry.
fn fold(event: &JobStatusEvent, at: DateTime<Utc>) -> JobRuntimeState {
    match event {
        JobStatusEvent::Progress { stats, .. } => JobRuntimeState {
            status: JobStatus::Running,
            stats: Some(stats.clone()),
            error: None,
            last_updated_at: Some(at),
        },
        JobStatusEvent::JobUpdate { status, error, .. } => {
            let status = match status {
                RunPhase::Running => JobStatus::Running,
                RunPhase::Success => JobStatus::Succeeded,
                RunPhase::Failed => JobStatus::Failed,
            };
            JobRuntimeState {
                status,
                // An explicit run-start carries no telemetry yet, and a
                // finished run has no current transfer.
                stats: None,
                error: if status == JobStatus::Failed {
                    error.clone()
                } else {
                    None
                },
                last_updated_at: Some(at),
            }
        }
    }
}

/// Mapping from job id to [`JobRuntimeState`], owned by one consuming surface.
///
/// Not shared across surfaces: each embed or page holds its own store and
/// discards it on teardown; a fresh subscription starts from Idle until the
/// next event arrives.
#[derive(Debug, Default)]
pub struct StatusStore {
    entries: HashMap<JobId, JobRuntimeState>,
}

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold an event into the entry for its job id. Only that entry changes.
    pub fn apply(&mut self, event: &JobStatusEvent) -> &JobRuntimeState {
        self.apply_at(event, Utc::now())
    }

    /// Fold with an explicit timestamp (tests inject a fixed clock).
    pub fn apply_at(&mut self, event: &JobStatusEvent, at: DateTime<Utc>) -> &JobRuntimeState {
        let state = fold(event, at);
        tracing::trace!(job_id = event.job_id(), status = ?state.status, "folded status event");
        let slot = self.entries.entry(event.job_id()).or_default();
        *slot = state;
        slot
    }

    /// The live entry for a job id, if one exists this session.
    pub fn get(&self, job_id: JobId) -> Option<&JobRuntimeState> {
        self.entries.get(&job_id)
    }

    /// Display status for a job id; unknown ids read as Idle.
    pub fn status_of(&self, job_id: JobId) -> JobStatus {
        self.entries
            .get(&job_id)
            .map(|s| s.status)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&JobId, &JobRuntimeState)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn progress(job_id: JobId, bytes: u64, total: u64) -> JobStatusEvent {
        JobStatusEvent::Progress {
            job_id,
            stats: ProgressStats {
                bytes,
                total_bytes: total,
                ..Default::default()
            },
        }
    }

    fn update(job_id: JobId, status: RunPhase, error: Option<&str>) -> JobStatusEvent {
        JobStatusEvent::JobUpdate {
            job_id,
            status,
            error: error.map(Into::into),
        }
    }

    #[test]
    fn test_timestamp_field_has_a_ts_binding() {
        // DateTime<Utc> must map to a TS type or frontend codegen breaks.
        use ts_rs::TS;
        let decl = JobRuntimeState::decl(&ts_rs::Config::default());
        assert!(decl.contains("lastUpdatedAt"), "decl was: {decl}");
    }

    #[test]
    fn test_unknown_id_reads_idle() {
        let store = StatusStore::new();
        assert_eq!(store.status_of(42), JobStatus::Idle);
        assert!(store.get(42).is_none());
    }

    #[test]
    fn test_progress_implies_running() {
        let mut store = StatusStore::new();
        store.apply(&progress(1, 50, 100));
        let state = store.get(1).unwrap();
        assert_eq!(state.status, JobStatus::Running);
        assert_eq!(state.stats.as_ref().unwrap().bytes, 50);
        assert!(state.last_updated_at.is_some());
    }

    #[test]
    fn test_progress_overrides_terminal_status() {
        // A progress frame always means "running now", whatever came before.
        let mut store = StatusStore::new();
        store.apply(&update(1, RunPhase::Failed, Some("boom")));
        store.apply(&progress(1, 1, 10));
        let state = store.get(1).unwrap();
        assert_eq!(state.status, JobStatus::Running);
        assert!(state.error.is_none());
    }

    #[test]
    fn test_run_start_has_no_stats() {
        let mut store = StatusStore::new();
        store.apply(&progress(1, 50, 100));
        store.apply(&update(1, RunPhase::Running, None));
        let state = store.get(1).unwrap();
        assert_eq!(state.status, JobStatus::Running);
        assert!(state.stats.is_none());
    }

    #[test]
    fn test_success_clears_stats_and_error() {
        let mut store = StatusStore::new();
        store.apply(&update(1, RunPhase::Failed, Some("earlier failure")));
        store.apply(&progress(1, 99, 100));
        store.apply(&update(1, RunPhase::Success, None));
        let state = store.get(1).unwrap();
        assert_eq!(state.status, JobStatus::Succeeded);
        assert!(state.stats.is_none());
        assert!(state.error.is_none());
    }

    #[test]
    fn test_failure_keeps_error() {
        let mut store = StatusStore::new();
        store.apply(&progress(1, 10, 100));
        store.apply(&update(1, RunPhase::Failed, Some("quota exceeded")));
        let state = store.get(1).unwrap();
        assert_eq!(state.status, JobStatus::Failed);
        assert_eq!(state.error.as_deref(), Some("quota exceeded"));
        assert!(state.stats.is_none());
    }

    #[test]
    fn test_fold_is_idempotent_to_last_write() {
        // Folding a whole sequence must equal folding only the last event.
        let at = Utc::now();
        let events = [
            progress(1, 10, 100),
            progress(1, 20, 100),
            update(1, RunPhase::Running, None),
            progress(1, 90, 100),
        ];

        let mut folded_all = StatusStore::new();
        for event in &events {
            folded_all.apply_at(event, at);
        }

        let mut folded_last = StatusStore::new();
        folded_last.apply_at(events.last().unwrap(), at);

        assert_eq!(folded_all.get(1), folded_last.get(1));
    }

    #[test]
    fn test_strict_demultiplexing_by_job_id() {
        let mut store = StatusStore::new();
        store.apply(&progress(1, 10, 100));
        store.apply(&update(2, RunPhase::Failed, Some("other job")));

        assert_eq!(store.status_of(1), JobStatus::Running);
        assert_eq!(store.status_of(2), JobStatus::Failed);
        assert!(store.get(1).unwrap().error.is_none());
        assert_eq!(store.len(), 2);
    }
}
