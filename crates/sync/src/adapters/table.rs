// crates/sync/src/adapters/table.rs
//! Jobs table adapter: full map of runtime state, one row per job, REST
//! baseline merged with live overrides.

use serde::Serialize;
use tracing::warn;
use ts_rs::TS;

use chrono::{DateTime, Utc};
use transferdeck_core::{
    JobId, JobStatus, JobStatusEvent, ProgressMetrics, StatusStore,
};

use crate::adapters::rest_status;
use crate::rest::{ApiClient, JobRecord};
use crate::stream::StreamSignal;

/// A display-ready row for the jobs table.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = "../../../frontend/src/types/generated/")]
pub struct JobRow {
    pub id: JobId,
    pub name: String,
    pub operation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    pub enabled: bool,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_run: Option<DateTime<Utc>>,
    /// Present only while live telemetry exists for this job.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<ProgressMetrics>,
    /// Most recently completed file, from live telemetry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_file: Option<String>,
}

/// Consumer for the jobs list page. Subscribes once, keeps runtime state for
/// every job id the feed mentions, and renders rows on demand.
pub struct JobsTableAdapter {
    api: ApiClient,
    store: StatusStore,
    jobs: Vec<JobRecord>,
    search: Option<String>,
    notice: Option<String>,
}

impl JobsTableAdapter {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            store: StatusStore::new(),
            jobs: Vec::new(),
            search: None,
            notice: None,
        }
    }

    /// Fetch the baseline job listing. A failure keeps the previous listing
    /// and store untouched; it only sets a transient notice.
    pub async fn refresh(&mut self) {
        match self.api.list_jobs(self.search.as_deref()).await {
            Ok(jobs) => {
                self.jobs = jobs;
                self.notice = None;
            }
            Err(e) => {
                warn!(error = %e, "job listing refresh failed, keeping previous state");
                self.notice = Some(format!("Refresh failed: {e}"));
            }
        }
    }

    /// Change the search text and refetch. Call this with already-debounced
    /// values (see [`crate::rest::search_debouncer`]).
    pub async fn set_search(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.search = if text.trim().is_empty() { None } else { Some(text) };
        self.refresh().await;
    }

    /// Fold one stream signal. Returns true when the caller should resync
    /// via REST (connection established or re-established).
    pub fn apply(&mut self, signal: &StreamSignal) -> bool {
        match signal {
            StreamSignal::Connected => true,
            StreamSignal::Event(event) => {
                if let JobStatusEvent::JobUpdate { job_id, status, error } = event {
                    if status.is_terminal() {
                        if let Some(record) = self.jobs.iter_mut().find(|j| j.id == *job_id) {
                            record.apply_terminal(*status, error.as_deref(), Utc::now());
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
                self.refresh().await;
            }
        }
    }

    /// Transient fetch-failure notice, if any.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Render all rows, live state taking precedence over REST fields it
    /// covers, REST keeping everything the stream never carries.
    pub fn rows(&self) -> Vec<JobRow> {
        self.jobs.iter().map(|job| self.row(job)).collect()
    }

    fn row(&self, job: &JobRecord) -> JobRow {
        let live = self.store.get(job.id);
        let (status, error, metrics, current_file) = match live {
            Some(state) => (
                state.status,
                state.error.clone(),
                state.stats.as_ref().map(ProgressMetrics::from_stats),
                state.stats.as_ref().and_then(|s| s.last_file.clone()),
            ),
            None => (
                rest_status(job.last_status.as_deref()),
                job.last_error.clone(),
                None,
                None,
            ),
        };
        JobRow {
            id: job.id,
            name: job.name.clone(),
            operation: job.operation.clone(),
            schedule: job.schedule.clone(),
            enabled: job.enabled,
            status,
            error,
            last_run: job.last_run,
            next_run: job.next_run,
            metrics,
            current_file,
        }
    }
}
