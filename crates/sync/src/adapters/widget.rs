// crates/sync/src/adapters/widget.rs
//! Widget embed: resolved by opaque public key, renders the configured
//! fields for its one job.

use chrono::Utc;
use tracing::warn;

use transferdeck_core::{JobRuntimeState, JobStatusEvent, StatusStore};

use crate::adapters::fields::{compose_fields, FieldView};
use crate::error::SyncResult;
use crate::rest::{ApiClient, WidgetBundle, WidgetConfig};
use crate::stream::StreamSignal;

/// Consumer for the embeddable widget page. The opaque key resolves into a
/// widget configuration plus its job; from then on this behaves like the
/// standalone embed, filtered to that job id.
pub struct WidgetEmbedAdapter {
    api: ApiClient,
    key: String,
    store: StatusStore,
    bundle: Option<WidgetBundle>,
}

impl WidgetEmbedAdapter {
    pub fn new(api: ApiClient, key: impl Into<String>) -> Self {
        Self {
            api,
            key: key.into(),
            store: StatusStore::new(),
            bundle: None,
        }
    }

    /// Resolve the key. An unknown key surfaces as
    /// [`crate::SyncError::WidgetNotFound`].
    pub async fn resolve(&mut self) -> SyncResult<()> {
        self.bundle = Some(self.api.widget_by_key(&self.key).await?);
        Ok(())
    }

    /// Fold one stream signal, dropping events for any other job id.
    /// Returns true when a REST resync is needed.
    pub fn apply(&mut self, signal: &StreamSignal) -> bool {
        match signal {
            StreamSignal::Connected => true,
            StreamSignal::Event(event) => {
                let Some(bundle) = self.bundle.as_mut() else {
                    return false;
                };
                if event.job_id() != bundle.job.id {
                    return false;
                }
                if let JobStatusEvent::JobUpdate { status, .. } = event {
                    if status.is_terminal() {
                        bundle.job.last_run = Some(Utc::now());
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
                if let Err(e) = self.resolve().await {
                    warn!(key = %self.key, error = %e, "widget resync failed");
                }
            }
        }
    }

    /// Widget styling configuration, once resolved.
    pub fn config(&self) -> Option<&WidgetConfig> {
        self.bundle.as_ref().map(|b| &b.widget)
    }

    /// Render the configured fields, or `None` before the key resolves.
    pub fn fields(&self) -> Option<Vec<FieldView>> {
        let bundle = self.bundle.as_ref()?;
        let idle = JobRuntimeState::default();
        let state = self.store.get(bundle.job.id).unwrap_or(&idle);
        Some(compose_fields(&bundle.widget, &bundle.job, state))
    }
}
