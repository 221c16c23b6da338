// crates/core/src/event.rs
//! Push-feed event types.
//!
//! One JSON object per stream message, discriminated by `type`. The feed is
//! multiplexed across all jobs; consumers demultiplex strictly by `job_id`.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::telemetry::ProgressStats;

/// Database id of a configured transfer job.
pub type JobId = i64;

/// Lifecycle value carried by a `job_update` frame.
///
/// Canonical vocabulary is `running`/`success`/`failed`. Older producers
/// emitted `finished` for a successful run; that spelling is normalized to
/// [`RunPhase::Success`] at decode time so no consumer has to special-case it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../../frontend/src/types/generated/")]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Running,
    #[serde(alias = "finished")]
    Success,
    Failed,
}

impl RunPhase {
    /// True for phases that end a run.
    pub fn is_terminal(self) -> bool {
        matches!(self, RunPhase::Success | RunPhase::Failed)
    }
}

/// A decoded message from the push-event feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../../frontend/src/types/generated/")]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobStatusEvent {
    /// In-flight telemetry for one job. Receiving one always implies the job
    /// is running right now, whatever the store thought before.
    Progress { job_id: JobId, stats: ProgressStats },
    /// A lifecycle transition (run start, success, failure).
    JobUpdate {
        job_id: JobId,
        status: RunPhase,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl JobStatusEvent {
    /// The job this event belongs to (the demultiplexing key).
    pub fn job_id(&self) -> JobId {
        match self {
            JobStatusEvent::Progress { job_id, .. } => *job_id,
            JobStatusEvent::JobUpdate { job_id, .. } => *job_id,
        }
    }
}
