//! Daily log file rotation.
//!
//! The active file is `<dir>/<name>`. On the first write after local midnight
//! it is renamed to `<name>.YYYY-MM-DD` (the day it covered) and a fresh file
//! is started. Only the newest `keep` dated backups are retained.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate};

const BACKUP_DATE_FORMAT: &str = "%Y-%m-%d";

pub struct DailyRotatingFile {
    dir: PathBuf,
    name: String,
    keep: usize,
    current_date: NaiveDate,
    file: File,
}

impl DailyRotatingFile {
    /// Open (appending) `<dir>/<name>`, creating `dir` if needed.
    pub fn open(dir: impl AsRef<Path>, name: &str, keep: usize) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create log dir {}", dir.display()))?;
        let path = dir.join(name);

        // An existing file belongs to the day it was last written.
        let current_date = fs::metadata(&path)
            .and_then(|meta| meta.modified())
            .map(|mtime| DateTime::<Local>::from(mtime).date_naive())
            .unwrap_or_else(|_| Local::now().date_naive());

        let file = open_append(&path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        Ok(Self {
            dir,
            name: name.to_string(),
            keep,
            current_date,
            file,
        })
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.name)
    }

    /// Write `buf` as of local date `today`, rotating first if the day changed.
    pub fn write_on(&mut self, today: NaiveDate, buf: &[u8]) -> io::Result<usize> {
        if today != self.current_date {
            self.rotate(today)?;
        }
        self.file.write(buf)
    }

    fn rotate(&mut self, today: NaiveDate) -> io::Result<()> {
        self.file.flush()?;
        let active = self.path();
        let backup = self.backup_path(self.current_date);
        if active.exists() {
            fs::rename(&active, &backup)?;
        }
        self.file = open_append(&active)?;
        self.current_date = today;
        self.prune()
    }

    fn backup_path(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("{}.{}", self.name, date.format(BACKUP_DATE_FORMAT)))
    }

    /// Dated backups, newest first.
    pub fn backups(&self) -> io::Result<Vec<(NaiveDate, PathBuf)>> {
        let prefix = format!("{}.", self.name);
        let mut backups = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(suffix) = file_name.to_str().and_then(|n| n.strip_prefix(&prefix)) else {
                continue;
            };
            if let Ok(date) = NaiveDate::parse_from_str(suffix, BACKUP_DATE_FORMAT) {
                backups.push((date, entry.path()));
            }
        }
        backups.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(backups)
    }

    fn prune(&self) -> io::Result<()> {
        for (_, path) in self.backups()?.into_iter().skip(self.keep) {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

impl Write for DailyRotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_on(Local::now().date_naive(), buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn rotates_on_date_change() {
        let dir = tempdir().unwrap();
        let mut log = DailyRotatingFile::open(dir.path(), "main.log", 7).unwrap();
        log.current_date = day(1);

        log.write_on(day(1), b"first\n").unwrap();
        log.write_on(day(2), b"second\n").unwrap();
        log.flush().unwrap();

        let backup = dir.path().join("main.log.2024-01-01");
        assert_eq!(fs::read_to_string(backup).unwrap(), "first\n");
        assert_eq!(fs::read_to_string(log.path()).unwrap(), "second\n");
    }

    #[test]
    fn keeps_only_newest_backups() {
        let dir = tempdir().unwrap();
        let mut log = DailyRotatingFile::open(dir.path(), "main.log", 3).unwrap();
        log.current_date = day(1);

        for d in 1..=6 {
            log.write_on(day(d), format!("day {}\n", d).as_bytes()).unwrap();
        }

        let dates: Vec<NaiveDate> = log.backups().unwrap().into_iter().map(|(d, _)| d).collect();
        assert_eq!(dates, vec![day(5), day(4), day(3)]);
        assert_eq!(fs::read_to_string(log.path()).unwrap(), "day 6\n");
    }

    #[test]
    fn unrelated_files_are_left_alone() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("main.log.old"), b"x").unwrap();
        fs::write(dir.path().join("other.log.2020-01-01"), b"x").unwrap();
        let mut log = DailyRotatingFile::open(dir.path(), "main.log", 0).unwrap();
        log.current_date = day(1);

        log.write_on(day(2), b"x\n").unwrap();

        assert!(dir.path().join("main.log.old").exists());
        assert!(dir.path().join("other.log.2020-01-01").exists());
        assert!(log.backups().unwrap().is_empty());
    }

    #[test]
    fn reopening_appends() {
        let dir = tempdir().unwrap();
        {
            let mut log = DailyRotatingFile::open(dir.path(), "main.log", 7).unwrap();
            log.write_all(b"a\n").unwrap();
        }
        let mut log = DailyRotatingFile::open(dir.path(), "main.log", 7).unwrap();
        log.write_all(b"b\n").unwrap();
        log.flush().unwrap();
        assert_eq!(fs::read_to_string(log.path()).unwrap(), "a\nb\n");
    }
}
