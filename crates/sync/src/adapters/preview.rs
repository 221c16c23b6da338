// crates/sync/src/adapters/preview.rs
//! Widget editor preview: renders through the same field contract as the
//! real embed, but never touches the stream. The "running" look is driven
//! by fixed illustrative telemetry so the editor shows a stable picture.

use transferdeck_core::{JobRuntimeState, JobStatus, ProgressStats, TransferItem};

use crate::adapters::fields::{compose_fields, FieldView};
use crate::rest::{WidgetConfig, WidgetJobInfo};

/// In-editor preview of a widget configuration. Holds no subscription and
/// performs no I/O; it renders whatever config the editor currently has.
pub struct WidgetPreviewAdapter {
    job: WidgetJobInfo,
    mock_running: bool,
}

impl WidgetPreviewAdapter {
    pub fn new(job: WidgetJobInfo) -> Self {
        Self {
            job,
            mock_running: false,
        }
    }

    /// Toggle between the idle look and the illustrative mid-transfer look.
    pub fn set_mock_running(&mut self, on: bool) {
        self.mock_running = on;
    }

    pub fn mock_running(&self) -> bool {
        self.mock_running
    }

    /// Render the preview for the editor's current config. Same composition
    /// path as the live embed, so field order and formatting always match.
    pub fn fields(&self, config: &WidgetConfig) -> Vec<FieldView> {
        let state = if self.mock_running {
            mock_running_state()
        } else {
            JobRuntimeState::default()
        };
        compose_fields(config, &self.job, &state)
    }
}

/// Fixed mid-transfer telemetry, chosen so every field has something to show.
fn mock_running_state() -> JobRuntimeState {
    JobRuntimeState {
        status: JobStatus::Running,
        stats: Some(ProgressStats {
            bytes: 45_088_768,
            total_bytes: 104_857_600,
            transfers: 3,
            total_transfers: 8,
            speed: 2_621_440.0,
            eta: Some("4m30s".to_string()),
            transferring: vec![TransferItem {
                name: "photos/2024/holiday.zip".to_string(),
                speed: 2_621_440.0,
                speed_avg: 2_359_296.0,
            }],
            last_file: Some("photos/2024/intro.mp4".to_string()),
            elapsed_time: 22.5,
        }),
        error: None,
        last_updated_at: None,
    }
}
