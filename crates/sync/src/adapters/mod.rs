// crates/sync/src/adapters/mod.rs
//! Surface adapters: independent consumers of the synchronization core.
//!
//! Each adapter owns its own [`StatusStore`] and its own stream subscription;
//! nothing is shared across surfaces except the multiplexed feed itself.

pub mod embed;
pub mod fields;
pub mod preview;
pub mod table;
pub mod widget;

pub use embed::{EmbedView, JobEmbedAdapter};
pub use fields::{compose_fields, format_speed, status_label, FieldView};
pub use preview::WidgetPreviewAdapter;
pub use table::{JobRow, JobsTableAdapter};
pub use widget::WidgetEmbedAdapter;

use transferdeck_core::JobStatus;

/// Map a REST `last_status` label onto the display status used before any
/// live event has arrived for that job this session.
pub(crate) fn rest_status(label: Option<&str>) -> JobStatus {
    match label {
        Some("running") => JobStatus::Running,
        Some("success") => JobStatus::Succeeded,
        Some("failed") => JobStatus::Failed,
        _ => JobStatus::Idle,
    }
}
