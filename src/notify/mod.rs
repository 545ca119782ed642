//! Outbound notifications for positive detections.
//!
//! Delivery is best-effort: one attempt, bounded by a timeout, never retried.
//! The saved positive image stays on disk whether or not delivery succeeds.

mod multipart;
pub mod webhook;

use std::path::Path;

use anyhow::Result;

pub use multipart::MultipartForm;
pub use webhook::{WebhookConfig, WebhookNotifier};

use crate::cycle::CycleTimestamp;

/// Sends one message carrying a positive image.
pub trait Notifier: Send {
    /// Notifier identifier for logs.
    fn name(&self) -> &'static str;

    /// Deliver `image_path` for cycle `ts`. One attempt; errors are for logging only.
    fn notify(&mut self, image_path: &Path, ts: &CycleTimestamp) -> Result<()>;
}
