// crates/sync/src/rest.rs
//! REST reconciliation: baseline job snapshots, widget resolution, and the
//! debounced search trigger.
//!
//! REST-sourced fields are authoritative only until a live event for the same
//! job id arrives in the current session; after that the live projection wins
//! for status display, while REST remains authoritative for fields the stream
//! never carries (name, schedule, enabled flag, next run).

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;
use ts_rs::TS;

use transferdeck_core::{JobId, RunPhase};

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};

/// A job definition as the listing endpoint returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../../frontend/src/types/generated/")]
pub struct JobRecord {
    pub id: JobId,
    pub name: String,
    /// `sync`, `copy`, or `move`.
    pub operation: String,
    #[serde(default)]
    pub schedule: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub source_path: Option<String>,
    #[serde(default)]
    pub dest_path: Option<String>,
    #[serde(default)]
    pub embed_key: Option<String>,
    #[serde(default)]
    pub last_run: Option<DateTime<Utc>>,
    /// Scheduler output; the stream never carries this.
    #[serde(default)]
    pub next_run: Option<DateTime<Utc>>,
    /// `idle`, `running`, `success`, or `failed`.
    #[serde(default)]
    pub last_status: Option<String>,
    #[serde(default)]
    pub last_error: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl JobRecord {
    /// Patch the REST-origin copy after a terminal live update, so re-renders
    /// without a fresh fetch still show the correct terminal state even if
    /// the live store entry is later discarded.
    pub fn apply_terminal(&mut self, phase: RunPhase, error: Option<&str>, at: DateTime<Utc>) {
        match phase {
            RunPhase::Success => {
                self.last_status = Some("success".to_string());
                self.last_error = None;
            }
            RunPhase::Failed => {
                self.last_status = Some("failed".to_string());
                self.last_error = error.map(Into::into);
            }
            RunPhase::Running => return,
        }
        self.last_run = Some(at);
    }
}

/// Presentational field of an embeddable widget, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../../frontend/src/types/generated/")]
#[serde(rename_all = "snake_case")]
pub enum WidgetField {
    Name,
    Status,
    Progress,
    Speed,
    Eta,
    LastRun,
    Operation,
}

/// Widget styling/field-layout configuration. Static state owned by the
/// editor; this layer only threads it through to rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../../frontend/src/types/generated/")]
pub struct WidgetConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// Enabled fields, in render order.
    pub fields: Vec<WidgetField>,
    #[serde(default)]
    pub accent_color: Option<String>,
}

fn default_width() -> u32 {
    350
}

fn default_height() -> u32 {
    150
}

/// Static job fields resolved alongside a widget key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../../frontend/src/types/generated/")]
pub struct WidgetJobInfo {
    pub id: JobId,
    pub name: String,
    pub operation: String,
    #[serde(default)]
    pub schedule: Option<String>,
    #[serde(default)]
    pub last_run: Option<DateTime<Utc>>,
}

/// What the widget-by-key endpoint resolves an opaque public key into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../../frontend/src/types/generated/")]
pub struct WidgetBundle {
    pub widget: WidgetConfig,
    pub job: WidgetJobInfo,
}

/// Request/response client for the dashboard API.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch job records, optionally filtered by free-text search.
    pub async fn list_jobs(&self, search: Option<&str>) -> SyncResult<Vec<JobRecord>> {
        let url = format!("{}/api/jobs/", self.base_url);
        let mut request = self.http.get(&url);
        if let Some(text) = search.filter(|t| !t.trim().is_empty()) {
            request = request.query(&[("search", text)]);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(SyncError::Api {
                status: response.status(),
                path: url,
            });
        }
        let jobs: Vec<JobRecord> = response.json().await?;
        debug!(count = jobs.len(), "fetched job listing");
        Ok(jobs)
    }

    pub async fn get_job(&self, id: JobId) -> SyncResult<JobRecord> {
        let url = format!("{}/api/jobs/{id}", self.base_url);
        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(SyncError::Api {
                status: response.status(),
                path: url,
            });
        }
        Ok(response.json().await?)
    }

    /// Resolve an opaque public key into a widget configuration bundle.
    pub async fn widget_by_key(&self, key: &str) -> SyncResult<WidgetBundle> {
        let url = format!("{}/api/widgets/{key}", self.base_url);
        let response = self.http.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(SyncError::WidgetNotFound(key.to_string()));
        }
        if !response.status().is_success() {
            return Err(SyncError::Api {
                status: response.status(),
                path: url,
            });
        }
        Ok(response.json().await?)
    }
}

/// Debounce a stream of search-text changes: a value is released only after
/// `window` of quiet, and intermediate keystrokes are coalesced into the
/// latest one. Exists so the listing endpoint is not hit per keystroke.
pub fn search_debouncer(window: Duration) -> (mpsc::UnboundedSender<String>, mpsc::UnboundedReceiver<String>) {
    let (in_tx, mut in_rx) = mpsc::unbounded_channel::<String>();
    let (out_tx, out_rx) = mpsc::unbounded_channel::<String>();

    tokio::spawn(async move {
        while let Some(mut latest) = in_rx.recv().await {
            loop {
                tokio::select! {
                    next = in_rx.recv() => match next {
                        Some(text) => latest = text,
                        None => {
                            let _ = out_tx.send(latest);
                            return;
                        }
                    },
                    _ = tokio::time::sleep(window) => {
                        let _ = out_tx.send(latest);
                        break;
                    }
                }
            }
        }
    });

    (in_tx, out_rx)
}
