// crates/sync/src/adapters/embed.rs
//! Standalone job embed: one configured job, events for every other id
//! ignored.

use chrono::Utc;
use tracing::warn;
use ts_rs::TS;

use serde::Serialize;
use transferdeck_core::{
    JobId, JobRuntimeState, JobStatus, JobStatusEvent, ProgressMetrics, StatusStore,
};

use crate::adapters::rest_status;
use crate::error::SyncResult;
use crate::rest::{ApiClient, JobRecord};
use crate::stream::StreamSignal;

/// Display model for the single-job embed page.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = "../../../frontend/src/types/generated/")]
pub struct EmbedView {
    pub job_id: JobId,
    pub name: String,
    pub operation: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<ProgressMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_file: Option<String>,
}

/// Consumer for the standalone embed page. Pinned to one job id at
/// construction; the filter predicate never changes afterwards.
pub struct JobEmbedAdapter {
    api: ApiClient,
    job_id: JobId,
    store: StatusStore,
    job: Option<JobRecord>,
}

impl JobEmbedAdapter {
    pub fn new(api: ApiClient, job_id: JobId) -> Self {
        Self {
            api,
            job_id,
            store: StatusStore::new(),
            job: None,
        }
    }

    /// Fetch the job record. Errors propagate; the embed page has nothing to
    /// show without its one job.
    pub async fn refresh(&mut self) -> SyncResult<()> {
        self.job = Some(self.api.get_job(self.job_id).await?);
        Ok(())
    }

    /// Fold one stream signal, dropping events for any other job id.
    /// Returns true when a REST resync is needed.
    pub fn apply(&mut self, signal: &StreamSignal) -> bool {
        match signal {
            StreamSignal::Connected => true,
            StreamSignal::Event(event) => {
                if event.job_id() != self.job_id {
                    return false;
                }
                if let JobStatusEvent::JobUpdate { status, error, .. } = event {
                    if status.is_terminal() {
                        if let Some(job) = self.job.as_mut() {
                            job.apply_terminal(*status, error.as_deref(), Utc::now());
                        }
                    }
                }
                self.store.apply(event);
                false
            }
        }
    }

    /// Drive the adapter from a subscription until it closes.
    pub async fn run(&mut self, sub: &mut crate::stream::StreamSubscription) {
        while let Some(signal) = sub.recv().await {
            if self.apply(&signal) {
                if let Err(e) = self.refresh().await {
                    warn!(job_id = self.job_id, error = %e, "embed resync failed");
                }
            }
        }
    }

    /// Render the embed, or `None` before the first successful fetch.
    pub fn view(&self) -> Option<EmbedView> {
        let job = self.job.as_ref()?;
        let live = self.store.get(self.job_id);
        let (status, error, metrics, current_file) = match live {
            Some(state) => view_parts(state),
            None => (
                rest_status(job.last_status.as_deref()),
                job.last_error.clone(),
                None,
                None,
            ),
        };
        Some(EmbedView {
            job_id: job.id,
            name: job.name.clone(),
            operation: job.operation.clone(),
            status,
            error,
            metrics,
            current_file,
        })
    }
}

fn view_parts(
    state: &JobRuntimeState,
) -> (JobStatus, Option<String>, Option<ProgressMetrics>, Option<String>) {
    (
        state.status,
        state.error.clone(),
        state.stats.as_ref().map(ProgressMetrics::from_stats),
        state.stats.as_ref().and_then(|s| s.last_file.clone()),
    )
}
