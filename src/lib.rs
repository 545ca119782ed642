//! Cat sentry
//!
//! A single-process surveillance loop: every interval, take a still with the
//! webcam, run a YOLO detector over it, and when the target class (a cat,
//! COCO id 15, by default) is in frame, keep an annotated copy and post it to
//! a webhook.
//!
//! # Architecture
//!
//! Four components, strictly sequential, one cycle at a time:
//!
//! 1. **Driver** ([`Sentry`]): fixed-interval scheduling and per-cycle failure isolation.
//! 2. **Frame acquirer** ([`capture`]): one image file per cycle via an external tool.
//! 3. **Detector** ([`detect`]): one forward pass, target-class membership test.
//! 4. **Notifier** ([`notify`]): best-effort multipart POST with the positive image.
//!
//! A failure in any stage skips the rest of that cycle only. The process is
//! meant to run unattended; it exits on a signal or on invalid startup
//! configuration, never because of a single bad cycle.
//!
//! # Module Structure
//!
//! - `cycle`: cycle timestamps and outcomes
//! - `storage`: on-disk capture layout
//! - `config`: file + environment configuration
//! - `logging`: stderr + daily-rotated log file

pub mod capture;
pub mod config;
pub mod cycle;
pub mod detect;
pub mod driver;
pub mod logging;
pub mod notify;
pub mod storage;

pub use capture::{FrameAcquirer, FswebcamConfig, FswebcamSource};
pub use config::SentryConfig;
pub use cycle::{CycleOutcome, CycleTimestamp};
pub use detect::{DetectOutcome, Detector, DetectorBackend, ModelConfig, StubBackend};
pub use driver::{Sentry, SentryStats};
pub use notify::{Notifier, WebhookConfig, WebhookNotifier};
pub use storage::CaptureLayout;
