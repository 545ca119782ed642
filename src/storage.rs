//! Flat-file capture layout.
//!
//! ```text
//! captures/all/<timestamp>.jpg    every frame the camera produced
//! captures/cats/<timestamp>.jpg   annotated frames with a positive detection
//! ```
//!
//! Files are keyed by [`CycleTimestamp`] and never rewritten by a later cycle
//! unless two cycles share a timestamp.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::cycle::CycleTimestamp;

pub const DEFAULT_CAPTURE_ROOT: &str = "captures";
pub const ALL_SUBDIR: &str = "all";
pub const POSITIVE_SUBDIR: &str = "cats";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureLayout {
    pub all_dir: PathBuf,
    pub positive_dir: PathBuf,
}

impl CaptureLayout {
    /// `<root>/all` and `<root>/cats`.
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            all_dir: root.join(ALL_SUBDIR),
            positive_dir: root.join(POSITIVE_SUBDIR),
        }
    }

    /// Create both directories. Run at startup and again at the top of every cycle.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.all_dir, &self.positive_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create capture dir {}", dir.display()))?;
        }
        Ok(())
    }

    pub fn frame_path(&self, ts: &CycleTimestamp) -> PathBuf {
        self.all_dir.join(ts.file_name())
    }
}

impl Default for CaptureLayout {
    fn default() -> Self {
        Self::under(DEFAULT_CAPTURE_ROOT)
    }
}
