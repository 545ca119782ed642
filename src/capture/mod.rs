//! Frame acquisition.
//!
//! An acquirer turns "take a picture now" into exactly one image file at a
//! caller-chosen path. Failures are reported as `false` after being logged;
//! the driver never sees the underlying error and treats any `false` as
//! "no usable frame", whatever partial file may be left behind.

pub mod fswebcam;

use std::path::Path;

pub use fswebcam::{FswebcamConfig, FswebcamSource};

/// Produces one still image per call.
pub trait FrameAcquirer: Send {
    /// Acquirer identifier for logs.
    fn name(&self) -> &'static str;

    /// Capture a frame to `path`. Returns true only if the file exists afterwards.
    fn capture(&mut self, path: &Path) -> bool;
}
