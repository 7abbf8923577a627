//! Log output.
//!
//! Without a log directory, logs go to stdout. With one, they go to
//! `<dir>/YYYY-MM-DD.log` (local date), appended across runs of the same
//! day. Log files that are at least `retention_days` old are removed at
//! start-up.

use crate::config::LoggingConfig;
use anyhow::{Context, Result};
use chrono::{Days, Local, NaiveDate};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Install the global tracing subscriber.
///
/// # Errors
///
/// Returns error if the log directory or today's log file cannot be created.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let Some(dir) = &config.log_dir else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        return Ok(());
    };

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let today = Local::now().date_naive();
    let removed = prune_logs(dir, today, config.retention_days)
        .with_context(|| format!("Failed to clean log directory {}", dir.display()))?;

    let path = dir.join(log_file_name(today));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();

    tracing::info!(path = %path.display(), removed = removed.len(), "Logging to file");
    Ok(())
}

/// Name of the log file for `date`.
#[must_use]
pub fn log_file_name(date: NaiveDate) -> String {
    format!("{}.log", date.format(DATE_FORMAT))
}

/// Remove log files in `dir` dated `retention_days` or more before `today`.
///
/// Files whose name is not `YYYY-MM-DD.log` are left alone. Returns the
/// removed paths.
///
/// # Errors
///
/// Returns error if the directory cannot be read.
pub fn prune_logs(dir: &Path, today: NaiveDate, retention_days: u32) -> std::io::Result<Vec<PathBuf>> {
    let mut removed = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(date) = log_date(&path) else {
            continue;
        };
        let expired = date
            .checked_add_days(Days::new(u64::from(retention_days)))
            .is_some_and(|expiry| expiry <= today);
        if expired {
            std::fs::remove_file(&path)?;
            removed.push(path);
        }
    }

    Ok(removed)
}

fn log_date(path: &Path) -> Option<NaiveDate> {
    let name = path.file_name()?.to_str()?;
    let date = name.strip_suffix(".log")?;
    NaiveDate::parse_from_str(date, DATE_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn file_name_is_iso_date() {
        assert_eq!(log_file_name(date("2024-03-09")), "2024-03-09.log");
    }

    #[test]
    fn prune_keeps_recent_and_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "2024-03-01.log",
            "2024-03-03.log",
            "2024-03-04.log",
            "2024-03-10.log",
            "notes.log",
            "2024-03-01.txt",
        ] {
            std::fs::write(dir.path().join(name), "x").unwrap();
        }

        let mut removed: Vec<String> = prune_logs(dir.path(), date("2024-03-10"), 7)
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        removed.sort();

        assert_eq!(removed, ["2024-03-01.log", "2024-03-03.log"]);
        assert!(dir.path().join("2024-03-04.log").exists());
        assert!(dir.path().join("notes.log").exists());
        assert!(dir.path().join("2024-03-01.txt").exists());
    }
}
