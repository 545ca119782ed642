//! `fswebcam` frame source.
//!
//! Runs `fswebcam -r <WxH> --no-banner <path>` once per capture. The tool
//! writes the JPEG itself; this module only checks the exit status and that
//! the output file appeared.
//!
//! The child is killed if it runs longer than the configured timeout, so a
//! wedged camera driver costs one cycle instead of stalling the loop forever.

use std::fs;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};

use super::FrameAcquirer;

const DEFAULT_PROGRAM: &str = "fswebcam";
const DEFAULT_RESOLUTION: &str = "640x480";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Configuration for the `fswebcam` source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FswebcamConfig {
    /// Program to execute. Overridable so tests can substitute a script.
    pub program: PathBuf,
    /// Capture resolution, `WIDTHxHEIGHT`.
    pub resolution: String,
    /// Kill the capture process after this long.
    pub timeout: Duration,
}

impl Default for FswebcamConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_PROGRAM),
            resolution: DEFAULT_RESOLUTION.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl FswebcamConfig {
    /// Argument vector for a capture to `path`.
    pub fn args(&self, path: &Path) -> Vec<std::ffi::OsString> {
        vec![
            "-r".into(),
            self.resolution.clone().into(),
            "--no-banner".into(),
            path.as_os_str().to_owned(),
        ]
    }
}

/// Validate a `WIDTHxHEIGHT` resolution string.
pub fn parse_resolution(raw: &str) -> Result<(u32, u32)> {
    let (w, h) = raw
        .split_once('x')
        .ok_or_else(|| anyhow!("resolution '{}' must look like 640x480", raw))?;
    let width: u32 = w
        .trim()
        .parse()
        .map_err(|_| anyhow!("invalid resolution width in '{}'", raw))?;
    let height: u32 = h
        .trim()
        .parse()
        .map_err(|_| anyhow!("invalid resolution height in '{}'", raw))?;
    if width == 0 || height == 0 {
        return Err(anyhow!("resolution '{}' must be non-zero", raw));
    }
    Ok((width, height))
}

/// Webcam still capture through the `fswebcam` CLI.
pub struct FswebcamSource {
    config: FswebcamConfig,
    captures: u64,
    failures: u64,
}

impl FswebcamSource {
    pub fn new(config: FswebcamConfig) -> Self {
        Self {
            config,
            captures: 0,
            failures: 0,
        }
    }

    /// Get capture statistics.
    pub fn stats(&self) -> CaptureStats {
        CaptureStats {
            captures: self.captures,
            failures: self.failures,
        }
    }

    fn try_capture(&self, path: &Path) -> Result<()> {
        // A leftover file from a same-second cycle would satisfy the existence check.
        match fs::remove_file(path) {
            Ok(()) => log::warn!("overwriting existing frame {}", path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| format!("failed to clear {}", path.display()))
            }
        }

        let mut child = Command::new(&self.config.program)
            .args(self.config.args(path))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn {}", self.config.program.display()))?;

        let stderr = child.stderr.take();
        let stderr_reader = thread::spawn(move || {
            let mut buf = String::new();
            if let Some(mut pipe) = stderr {
                let _ = pipe.read_to_string(&mut buf);
            }
            buf
        });

        // On timeout the reader is left detached; a grandchild may still hold the pipe.
        let Some(status) = wait_with_timeout(&mut child, self.config.timeout)? else {
            return Err(anyhow!(
                "{} timed out after {}s",
                self.config.program.display(),
                self.config.timeout.as_secs()
            ));
        };
        let stderr = stderr_reader.join().unwrap_or_default();
        if !status.success() {
            return Err(anyhow!(
                "{} exited with {}: {}",
                self.config.program.display(),
                status,
                stderr.trim()
            ));
        }
        if !path.exists() {
            return Err(anyhow!("image was not saved: {}", path.display()));
        }
        Ok(())
    }
}

impl FrameAcquirer for FswebcamSource {
    fn name(&self) -> &'static str {
        "fswebcam"
    }

    fn capture(&mut self, path: &Path) -> bool {
        match self.try_capture(path) {
            Ok(()) => {
                self.captures += 1;
                log::info!("saved {}", path.display());
                true
            }
            Err(e) => {
                self.failures += 1;
                log::error!("image capture failed: {:#}", e);
                false
            }
        }
    }
}

/// Statistics for a capture source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CaptureStats {
    pub captures: u64,
    pub failures: u64,
}

/// Wait for `child`, killing it once `timeout` elapses. `None` means it was killed.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait().context("failed to poll capture process")? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            child.wait().context("failed to reap capture process")?;
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}
