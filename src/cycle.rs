//! Per-cycle identity and outcome.
//!
//! A cycle is one pass through capture -> detect -> notify. It is identified by
//! a wall-clock timestamp at second resolution, which doubles as the file name
//! key for every image written during the cycle.

use std::fmt;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};

/// `YYYY-MM-DD_HH-MM-SS`, local time.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Timestamp that names a cycle and its images.
///
/// Uniqueness is only as good as the wall clock: two cycles started within the
/// same second share a timestamp and the later one overwrites the earlier files.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CycleTimestamp(String);

impl CycleTimestamp {
    /// Timestamp for a cycle starting now.
    pub fn now() -> Self {
        Self::from_datetime(&Local::now())
    }

    pub fn from_datetime<Tz: TimeZone>(at: &DateTime<Tz>) -> Self
    where
        Tz::Offset: fmt::Display,
    {
        Self(at.format(TIMESTAMP_FORMAT).to_string())
    }

    /// Parse a string in [`TIMESTAMP_FORMAT`].
    pub fn parse(raw: &str) -> Result<Self> {
        let parsed = NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
            .with_context(|| format!("invalid cycle timestamp '{}'", raw))?;
        Ok(Self(parsed.format(TIMESTAMP_FORMAT).to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `<timestamp>.jpg`
    pub fn file_name(&self) -> String {
        format!("{}.jpg", self.0)
    }
}

impl fmt::Display for CycleTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a cycle ended. Every variant is followed by the same fixed sleep.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No usable frame; detection and notification were skipped.
    CaptureFailed,
    /// Target absent, or detection failed (the two are only told apart in logs).
    NoDetection,
    DetectedAndNotified,
    /// Positive image saved but the webhook call failed.
    DetectedNotifyFailed,
    /// An error or panic escaped a stage and was caught by the driver.
    UnexpectedError,
}

impl CycleOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleOutcome::CaptureFailed => "capture-failed",
            CycleOutcome::NoDetection => "no-detection",
            CycleOutcome::DetectedAndNotified => "detected-and-notified",
            CycleOutcome::DetectedNotifyFailed => "detected-notify-failed",
            CycleOutcome::UnexpectedError => "unexpected-error",
        }
    }
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
