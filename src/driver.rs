//! Fixed-interval capture -> detect -> notify loop.
//!
//! ```text
//! START -> CAPTURING -> CAPTURE_FAILED ------------------------------> SLEEP
//!                    -> CAPTURED -> DETECTING -> NO_DETECTION -------> SLEEP
//!                                             -> DETECTED -> NOTIFYING -> SLEEP
//! ```
//!
//! Every cycle ends in the same fixed sleep. Stage failures degrade to
//! "skip the rest of this cycle"; errors and panics that escape a stage are
//! caught here and recorded as [`CycleOutcome::UnexpectedError`]. Nothing is
//! retried and no state other than counters carries over between cycles.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::capture::FrameAcquirer;
use crate::cycle::{CycleOutcome, CycleTimestamp};
use crate::detect::Detector;
use crate::logging::panic_message;
use crate::notify::Notifier;
use crate::storage::CaptureLayout;

/// Granularity at which a sleeping driver notices shutdown.
const SLEEP_SLICE: Duration = Duration::from_millis(250);
/// Cycles between health summaries in the log.
const HEALTH_LOG_EVERY: u64 = 120;

/// Outcome counters since startup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SentryStats {
    pub cycles: u64,
    pub capture_failed: u64,
    pub no_detection: u64,
    pub detected_and_notified: u64,
    pub detected_notify_failed: u64,
    pub unexpected_errors: u64,
}

impl SentryStats {
    fn record(&mut self, outcome: CycleOutcome) {
        self.cycles += 1;
        let counter = match outcome {
            CycleOutcome::CaptureFailed => &mut self.capture_failed,
            CycleOutcome::NoDetection => &mut self.no_detection,
            CycleOutcome::DetectedAndNotified => &mut self.detected_and_notified,
            CycleOutcome::DetectedNotifyFailed => &mut self.detected_notify_failed,
            CycleOutcome::UnexpectedError => &mut self.unexpected_errors,
        };
        *counter += 1;
    }

    pub fn detections(&self) -> u64 {
        self.detected_and_notified + self.detected_notify_failed
    }
}

/// The scheduler. Owns one instance of each stage for the process lifetime.
pub struct Sentry {
    acquirer: Box<dyn FrameAcquirer>,
    detector: Detector,
    notifier: Box<dyn Notifier>,
    layout: CaptureLayout,
    interval: Duration,
    stats: SentryStats,
}

impl Sentry {
    pub fn new(
        acquirer: Box<dyn FrameAcquirer>,
        detector: Detector,
        notifier: Box<dyn Notifier>,
        layout: CaptureLayout,
        interval: Duration,
    ) -> Self {
        Self {
            acquirer,
            detector,
            notifier,
            layout,
            interval,
            stats: SentryStats::default(),
        }
    }

    pub fn stats(&self) -> SentryStats {
        self.stats
    }

    /// Run cycles until `shutdown` is set. Does not return otherwise.
    pub fn run(&mut self, shutdown: &AtomicBool) {
        log::info!(
            "sentry running: {} -> {} (target class {}) -> {}, every {}s",
            self.acquirer.name(),
            self.detector.backend_name(),
            self.detector.target_class(),
            self.notifier.name(),
            self.interval.as_secs()
        );
        while !shutdown.load(Ordering::SeqCst) {
            self.run_once();
            sleep_unless_shutdown(self.interval, shutdown);
        }
        log::info!("shutdown requested after {} cycles", self.stats.cycles);
    }

    /// One cycle stamped with the current wall-clock time. No sleep.
    pub fn run_once(&mut self) -> CycleOutcome {
        let ts = CycleTimestamp::now();
        self.run_cycle(&ts)
    }

    /// One cycle for `ts`. Never fails and never panics outward.
    pub fn run_cycle(&mut self, ts: &CycleTimestamp) -> CycleOutcome {
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.execute_cycle(ts)));
        let outcome = match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                log::error!("unexpected error in cycle {}: {:?}", ts, e);
                CycleOutcome::UnexpectedError
            }
            Err(payload) => {
                log::error!("cycle {} panicked: {}", ts, panic_message(payload.as_ref()));
                CycleOutcome::UnexpectedError
            }
        };

        self.stats.record(outcome);
        log::debug!("cycle {} finished: {}", ts, outcome);
        if self.stats.cycles % HEALTH_LOG_EVERY == 0 {
            let s = self.stats;
            log::info!(
                "health: cycles={} capture_failed={} detections={} notify_failed={} unexpected={}",
                s.cycles,
                s.capture_failed,
                s.detections(),
                s.detected_notify_failed,
                s.unexpected_errors
            );
        }
        outcome
    }

    fn execute_cycle(&mut self, ts: &CycleTimestamp) -> Result<CycleOutcome> {
        // Directories may have been removed while we slept.
        self.layout.ensure_dirs()?;

        let frame_path = self.layout.frame_path(ts);
        if !self.acquirer.capture(&frame_path) {
            log::warn!("cycle {}: no frame, skipping detection", ts);
            return Ok(CycleOutcome::CaptureFailed);
        }

        let detection = self.detector.detect(&frame_path, ts);
        let Some(positive) = detection.positive_path() else {
            return Ok(CycleOutcome::NoDetection);
        };

        match self.notifier.notify(positive, ts) {
            Ok(()) => Ok(CycleOutcome::DetectedAndNotified),
            Err(e) => {
                log::error!(
                    "failed to send {} notification for {}: {:#}",
                    self.notifier.name(),
                    ts,
                    e
                );
                Ok(CycleOutcome::DetectedNotifyFailed)
            }
        }
    }
}

/// Sleep for `total`, returning early once `shutdown` is set.
pub fn sleep_unless_shutdown(total: Duration, shutdown: &AtomicBool) {
    let deadline = Instant::now() + total;
    loop {
        if shutdown.load(Ordering::SeqCst) {
            return;
        }
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        thread::sleep((deadline - now).min(SLEEP_SLICE));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_count_each_outcome() {
        let mut stats = SentryStats::default();
        for outcome in [
            CycleOutcome::CaptureFailed,
            CycleOutcome::NoDetection,
            CycleOutcome::DetectedAndNotified,
            CycleOutcome::DetectedNotifyFailed,
            CycleOutcome::UnexpectedError,
            CycleOutcome::NoDetection,
        ] {
            stats.record(outcome);
        }
        assert_eq!(stats.cycles, 6);
        assert_eq!(stats.no_detection, 2);
        assert_eq!(stats.detections(), 2);
        assert_eq!(stats.unexpected_errors, 1);
    }

    #[test]
    fn sleep_returns_immediately_on_shutdown() {
        let shutdown = AtomicBool::new(true);
        let start = Instant::now();
        sleep_unless_shutdown(Duration::from_secs(30), &shutdown);
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
