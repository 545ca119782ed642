//! Process-wide logging: `log` facade, `env_logger` backend, every record
//! written to stderr and to a daily-rotated `main.log`. Panics are routed
//! through the same logger once [`install_panic_hook`] has run.

mod hook;
mod rotate;

use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use env_logger::Env;

pub use hook::{install_panic_hook, panic_message, panic_report};
pub use rotate::DailyRotatingFile;

pub const LOG_FILE_NAME: &str = "main.log";
/// Dated backups kept besides the active file.
pub const LOG_BACKUP_COUNT: usize = 7;

/// Install the global logger. `RUST_LOG` overrides the default `info` filter.
pub fn init(log_dir: &Path) -> Result<()> {
    let file = DailyRotatingFile::open(log_dir, LOG_FILE_NAME, LOG_BACKUP_COUNT)?;
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
                record.level(),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(TeeWriter::new(file))))
        .try_init()
        .context("failed to install logger")?;
    Ok(())
}

/// Duplicates every write to stderr and a secondary sink.
///
/// Errors from the secondary sink are dropped so a full disk cannot silence stderr.
pub struct TeeWriter<W: Write> {
    secondary: W,
}

impl<W: Write> TeeWriter<W> {
    pub fn new(secondary: W) -> Self {
        Self { secondary }
    }
}

impl<W: Write> Write for TeeWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let _ = self.secondary.write_all(buf);
        io::stderr().write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let _ = self.secondary.flush();
        io::stderr().flush()
    }
}
