//! File-backed log sink
//!
//! Resolves destination files (dated or single-file, with per-category
//! "apart" files), rotates oversized files aside, and appends each rendered
//! write with a single `write_all` on a file opened in append mode.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use std::sync::Mutex;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};

use crate::config::{ExecutionMode, LogConfig};
use crate::error::{LogError, Result};

use super::category::Category;
use super::entry::LogBuffer;
use super::format;
use super::retention;

/// Appends categorized log entries to files under a base directory
///
/// A sink can be shared between threads behind an `Arc`; each flush holds an
/// internal lock across its rotate-then-write sequence.
#[derive(Debug)]
pub struct FileSink {
    /// Settings with `path` normalized to end in a separator
    config: LogConfig,
    mode: ExecutionMode,
    write_lock: Mutex<()>,
}

impl FileSink {
    /// Create a sink from `config`
    ///
    /// Fails if `config.path` is empty or `config.time_format` is not a valid
    /// strftime string.
    pub fn new(mut config: LogConfig, mode: ExecutionMode) -> Result<Self> {
        if config.path.is_empty() {
            return Err(LogError::MissingPath);
        }

        if StrftimeItems::new(&config.time_format).any(|item| matches!(item, Item::Error)) {
            return Err(LogError::InvalidTimeFormat(config.time_format));
        }

        if !config.path.ends_with(MAIN_SEPARATOR) {
            config.path.push(MAIN_SEPARATOR);
        }

        Ok(Self {
            config,
            mode,
            write_lock: Mutex::new(()),
        })
    }

    /// Get the settings this sink was built with
    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Base directory, always ending in a separator
    pub fn base_dir(&self) -> &Path {
        Path::new(&self.config.path)
    }

    /// Path of the master log file for the current local time
    pub fn master_path(&self) -> PathBuf {
        self.master_path_at(&Local::now())
    }

    /// Path of the master log file at `now`
    ///
    /// `{base}{name}{suffix}.log` in single-file mode, otherwise
    /// `{base}{YYYYMM}/{DD}{suffix}.log`.
    pub fn master_path_at(&self, now: &DateTime<Local>) -> PathBuf {
        let suffix = self.mode.file_suffix();
        let file = match self.config.single.name() {
            Some(name) => format!("{}{}.log", name, suffix),
            None => format!(
                "{}{}{}{}.log",
                now.format("%Y%m"),
                MAIN_SEPARATOR,
                now.format("%d"),
                suffix
            ),
        };
        PathBuf::from(format!("{}{}", self.config.path, file))
    }

    /// Path of the dedicated file for `category` inside `dir`
    pub fn apart_path_at(&self, dir: &Path, category: &Category, now: &DateTime<Local>) -> PathBuf {
        let name = match self.config.single.name() {
            Some(name) => name.to_string(),
            None => now.format("%d").to_string(),
        };
        dir.join(format!("{}_{}{}.log", name, category, self.mode.file_suffix()))
    }

    /// Persist `entries`, returning whether every write succeeded
    ///
    /// Only a failure to create the destination directory is an error.
    pub fn save(&self, entries: &LogBuffer, append: bool) -> Result<bool> {
        self.save_at(entries, append, Local::now())
    }

    /// Persist `entries` as if the current local time were `now`
    pub fn save_at(&self, entries: &LogBuffer, append: bool, now: DateTime<Local>) -> Result<bool> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let destination = self.master_path_at(&now);
        let dir = destination
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.base_dir().to_path_buf());

        if !dir.is_dir() {
            fs::create_dir_all(&dir).map_err(|source| LogError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        }

        tracing::trace!(
            append,
            categories = entries.len(),
            messages = entries.message_count(),
            destination = %destination.display(),
            "Flushing log entries"
        );

        let timestamp = now.format(&self.config.time_format).to_string();
        let mut master = LogBuffer::new();
        let mut ok = true;

        for (category, messages) in entries.iter() {
            if !self.config.json && self.config.apart_level.contains(category) {
                let path = self.apart_path_at(&dir, category, &now);
                let mut apart = LogBuffer::new();
                apart.extend(category.clone(), messages.iter().cloned());
                ok &= self.write(&path, &apart, &timestamp, &now);
            } else {
                master.extend(category.clone(), messages.iter().cloned());
            }
        }

        if !master.is_empty() {
            ok &= self.write(&destination, &master, &timestamp, &now);
        }

        Ok(ok)
    }

    /// Delete rotated backups older than `retention_days`, if configured
    pub fn prune_rotated(&self) -> anyhow::Result<usize> {
        match self.config.retention_days {
            Some(days) => {
                retention::prune_rotated(self.base_dir(), days, self.config.single.name())
            }
            None => Ok(0),
        }
    }

    fn write(&self, path: &Path, batch: &LogBuffer, timestamp: &str, now: &DateTime<Local>) -> bool {
        self.rotate_if_oversized(path, now);

        let content = format::render(batch, timestamp, self.config.json, self.mode);
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| file.write_all(content.as_bytes()));

        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to write log file");
                false
            }
        }
    }

    /// Move `path` aside if it has reached the size threshold
    ///
    /// Best-effort: a failed rename leaves the file in place and the write
    /// goes ahead.
    fn rotate_if_oversized(&self, path: &Path, now: &DateTime<Local>) {
        let Ok(metadata) = fs::metadata(path) else {
            return;
        };
        if !metadata.is_file() || metadata.len() < self.config.file_size {
            return;
        }

        let backup = rotated_path(path, now.timestamp());
        match fs::rename(path, &backup) {
            Ok(()) => tracing::debug!(
                from = %path.display(),
                to = %backup.display(),
                "Rotated log file"
            ),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Log rotation failed"),
        }
    }
}

/// Backup name for a rotated file: `{dir}/{unix_ts}-{name}`
pub fn rotated_path(path: &Path, unix_ts: i64) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}-{}", unix_ts, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApartLevels, SingleFile};
    use crate::logging::Message;
    use chrono::TimeZone;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 1, 21, 14, 30, 45).single().unwrap()
    }

    fn test_config(temp_dir: &TempDir) -> LogConfig {
        LogConfig::with_path(temp_dir.path().to_string_lossy().into_owned())
    }

    fn sink(config: LogConfig) -> FileSink {
        FileSink::new(config, ExecutionMode::Batch).unwrap()
    }

    #[test]
    fn test_new_requires_path() {
        let result = FileSink::new(LogConfig::default(), ExecutionMode::Batch);
        assert!(matches!(result, Err(LogError::MissingPath)));
    }

    #[test]
    fn test_new_rejects_invalid_time_format() {
        let mut config = LogConfig::with_path("/tmp/logs");
        config.time_format = "%Q-%".to_string();
        let result = FileSink::new(config, ExecutionMode::Batch);
        assert!(matches!(result, Err(LogError::InvalidTimeFormat(_))));
    }

    #[test]
    fn test_trailing_separator_is_normalized() {
        let now = fixed_now();
        let without = sink(LogConfig::with_path("/var/log"));
        let with = sink(LogConfig::with_path("/var/log/"));

        assert_eq!(without.master_path_at(&now), with.master_path_at(&now));
        assert!(without.config().path.ends_with(MAIN_SEPARATOR));
    }

    #[test]
    fn test_dated_master_path() {
        let sink = sink(LogConfig::with_path("/var/log/app"));
        assert_eq!(
            sink.master_path_at(&fixed_now()),
            PathBuf::from("/var/log/app/202601/21.log")
        );
    }

    #[test]
    fn test_streaming_paths_have_cli_suffix() {
        let now = fixed_now();
        let dated = FileSink::new(LogConfig::with_path("/logs"), ExecutionMode::Streaming).unwrap();
        assert_eq!(dated.master_path_at(&now), PathBuf::from("/logs/202601/21_cli.log"));
        assert_eq!(
            dated.apart_path_at(Path::new("/logs/202601"), &Category::Error, &now),
            PathBuf::from("/logs/202601/21_error_cli.log")
        );

        let mut config = LogConfig::with_path("/logs");
        config.single = SingleFile::Default;
        let single = FileSink::new(config, ExecutionMode::Streaming).unwrap();
        assert_eq!(single.master_path_at(&now), PathBuf::from("/logs/single_cli.log"));
    }

    #[test]
    fn test_single_file_paths() {
        let now = fixed_now();
        let mut config = LogConfig::with_path("/logs");
        config.single = SingleFile::Named("app".to_string());
        let sink = sink(config);

        assert_eq!(sink.master_path_at(&now), PathBuf::from("/logs/app.log"));
        assert_eq!(
            sink.apart_path_at(Path::new("/logs"), &Category::Sql, &now),
            PathBuf::from("/logs/app_sql.log")
        );
    }

    #[test]
    fn test_rotated_path() {
        assert_eq!(
            rotated_path(Path::new("/logs/202601/21.log"), 1_768_977_045),
            PathBuf::from("/logs/202601/1768977045-21.log")
        );
    }

    #[test]
    fn test_save_creates_dated_directory_and_writes_text() {
        let temp_dir = TempDir::new().unwrap();
        let sink = sink(test_config(&temp_dir));
        let mut entries = LogBuffer::new();
        entries.push(Category::Info, "started".into());

        assert!(sink.save_at(&entries, true, fixed_now()).unwrap());

        let content = fs::read_to_string(temp_dir.path().join("202601").join("21.log")).unwrap();
        assert!(content.starts_with(format::BANNER));
        assert!(content.contains("[2026-01-21T14:30:45"));
        assert!(content.ends_with("[ info ] started\r\n"));
    }

    #[test]
    fn test_save_appends_to_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let sink = sink(test_config(&temp_dir));
        let now = fixed_now();

        sink.save_at(&LogBuffer::single(Category::Info, "one".into()), true, now)
            .unwrap();
        sink.save_at(&LogBuffer::single(Category::Info, "two".into()), true, now)
            .unwrap();

        let content = fs::read_to_string(sink.master_path_at(&now)).unwrap();
        assert_eq!(content.matches(format::BANNER).count(), 2);
        assert!(content.find("one").unwrap() < content.find("two").unwrap());
    }

    #[test]
    fn test_rotation_at_threshold() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(&temp_dir);
        config.single = SingleFile::Named("app".to_string());
        config.file_size = 100;
        let sink = sink(config);
        let now = fixed_now();

        let master = temp_dir.path().join("app.log");
        fs::write(&master, vec![b'x'; 100]).unwrap();

        assert!(sink
            .save_at(&LogBuffer::single(Category::Info, "fresh".into()), true, now)
            .unwrap());

        let backup = temp_dir.path().join(format!("{}-app.log", now.timestamp()));
        assert_eq!(fs::read(&backup).unwrap(), vec![b'x'; 100]);
        let content = fs::read_to_string(&master).unwrap();
        assert!(content.starts_with(format::BANNER));
        assert!(content.contains("[ info ] fresh"));
    }

    #[test]
    fn test_no_rotation_below_threshold() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(&temp_dir);
        config.single = SingleFile::Named("app".to_string());
        config.file_size = 100;
        let sink = sink(config);

        let master = temp_dir.path().join("app.log");
        fs::write(&master, vec![b'x'; 99]).unwrap();

        sink.save_at(&LogBuffer::single(Category::Info, "more".into()), true, fixed_now())
            .unwrap();

        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 1);
        let content = fs::read_to_string(&master).unwrap();
        assert!(content.starts_with(&"x".repeat(99)));
        assert!(content.contains("[ info ] more"));
    }

    #[test]
    fn test_rotation_failure_does_not_block_write() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(&temp_dir);
        config.single = SingleFile::Named("app".to_string());
        config.file_size = 10;
        let sink = sink(config);
        let now = fixed_now();

        let master = temp_dir.path().join("app.log");
        fs::write(&master, vec![b'x'; 20]).unwrap();

        // A non-empty directory at the backup name makes the rename fail
        let backup = temp_dir.path().join(format!("{}-app.log", now.timestamp()));
        fs::create_dir(&backup).unwrap();
        fs::write(backup.join("keep"), b"occupied").unwrap();

        assert!(sink
            .save_at(&LogBuffer::single(Category::Info, "still written".into()), true, now)
            .unwrap());

        assert!(backup.is_dir());
        let content = fs::read_to_string(&master).unwrap();
        assert!(content.starts_with(&"x".repeat(20)));
        assert!(content.contains("[ info ] still written"));
    }

    #[test]
    fn test_apart_level_file_is_rotated() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(&temp_dir);
        config.apart_level = ApartLevels::Only(vec![Category::Error]);
        config.file_size = 50;
        let sink = sink(config);
        let now = fixed_now();

        let dir = temp_dir.path().join("202601");
        fs::create_dir_all(&dir).unwrap();
        let apart = dir.join("21_error.log");
        fs::write(&apart, vec![b'e'; 50]).unwrap();

        assert!(sink
            .save_at(&LogBuffer::single(Category::Error, "boom".into()), true, now)
            .unwrap());

        let backup = dir.join(format!("{}-21_error.log", now.timestamp()));
        assert_eq!(fs::read(&backup).unwrap(), vec![b'e'; 50]);
        let content = fs::read_to_string(&apart).unwrap();
        assert!(content.starts_with(format::BANNER));
        assert!(content.contains("[ error ] boom"));
    }

    #[test]
    fn test_prune_keeps_live_single_file_with_digit_prefix() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(&temp_dir);
        config.single = SingleFile::Named("2024-report".to_string());
        config.retention_days = Some(7);
        let sink = sink(config);

        assert!(sink
            .save_at(&LogBuffer::single(Category::Info, "live".into()), true, fixed_now())
            .unwrap());
        fs::write(temp_dir.path().join("100-2024-report.log"), b"old").unwrap();

        assert_eq!(sink.prune_rotated().unwrap(), 1);
        assert!(temp_dir.path().join("2024-report.log").exists());
        assert!(!temp_dir.path().join("100-2024-report.log").exists());
    }

    #[test]
    fn test_apart_levels_are_partitioned() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(&temp_dir);
        config.apart_level = ApartLevels::Only(vec![Category::Error]);
        let sink = sink(config);

        let mut entries = LogBuffer::new();
        entries.push(Category::Error, "boom".into());
        entries.push(Category::Info, "hello".into());

        assert!(sink.save_at(&entries, true, fixed_now()).unwrap());

        let dir = temp_dir.path().join("202601");
        let apart = fs::read_to_string(dir.join("21_error.log")).unwrap();
        let master = fs::read_to_string(dir.join("21.log")).unwrap();

        assert!(apart.contains("[ error ] boom"));
        assert!(!apart.contains("hello"));
        assert!(master.contains("[ info ] hello"));
        assert!(!master.contains("boom"));
    }

    #[test]
    fn test_all_apart_levels_skip_master_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(&temp_dir);
        config.apart_level = ApartLevels::All;
        let sink = sink(config);

        let mut entries = LogBuffer::new();
        entries.push(Category::Warning, "w".into());
        entries.push(Category::Custom("audit".into()), "a".into());

        assert!(sink.save_at(&entries, true, fixed_now()).unwrap());

        let dir = temp_dir.path().join("202601");
        assert!(dir.join("21_warning.log").is_file());
        assert!(dir.join("21_audit.log").is_file());
        assert!(!dir.join("21.log").exists());
    }

    #[test]
    fn test_json_mode_writes_everything_to_master() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(&temp_dir);
        config.json = true;
        config.apart_level = ApartLevels::Only(vec![Category::Error]);
        let sink = sink(config);

        let mut entries = LogBuffer::new();
        entries.push(Category::Error, "boom".into());
        entries.push(Category::Info, Message::from("a/b"));

        assert!(sink.save_at(&entries, true, fixed_now()).unwrap());
        sink.save_at(&LogBuffer::single(Category::Notice, "n".into()), true, fixed_now())
            .unwrap();

        let dir = temp_dir.path().join("202601");
        assert!(!dir.join("21_error.log").exists());

        let content = fs::read_to_string(dir.join("21.log")).unwrap();
        let lines: Vec<&str> = content.split("\r\n").filter(|l| !l.is_empty()).collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        let object = first.as_object().unwrap();
        assert!(object.contains_key("timestamp"));
        assert_eq!(object["error"], "boom");
        assert_eq!(object["info"], "a/b");
        assert_eq!(object.len(), 3);

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["notice"], "n");
    }

    #[test]
    fn test_streaming_mode_text_layout() {
        let temp_dir = TempDir::new().unwrap();
        let sink = FileSink::new(test_config(&temp_dir), ExecutionMode::Streaming).unwrap();

        sink.save_at(&LogBuffer::single(Category::Sql, "select 1".into()), false, fixed_now())
            .unwrap();

        let content =
            fs::read_to_string(temp_dir.path().join("202601").join("21_cli.log")).unwrap();
        assert!(content.starts_with("[2026-01-21T14:30:45"));
        assert!(content.ends_with("][ sql ] select 1\r\nsql\r\n"));
    }

    #[test]
    fn test_save_empty_batch_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let sink = sink(test_config(&temp_dir));

        assert!(sink.save_at(&LogBuffer::new(), true, fixed_now()).unwrap());
        assert!(temp_dir.path().join("202601").is_dir());
        assert!(!temp_dir.path().join("202601").join("21.log").exists());
    }

    #[test]
    fn test_write_failure_returns_false() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(&temp_dir);
        config.single = SingleFile::Named("app".to_string());
        let sink = sink(config);

        // A directory where the log file should be cannot be opened for append
        fs::create_dir(temp_dir.path().join("app.log")).unwrap();

        let result = sink.save_at(&LogBuffer::single(Category::Info, "x".into()), true, fixed_now());
        assert!(!result.unwrap());
    }

    #[test]
    fn test_directory_creation_failure_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, b"not a directory").unwrap();

        let sink = sink(LogConfig::with_path(
            blocker.join("logs").to_string_lossy().into_owned(),
        ));
        let result = sink.save_at(&LogBuffer::single(Category::Info, "x".into()), true, fixed_now());
        assert!(matches!(result, Err(LogError::CreateDir { .. })));
    }

    #[test]
    fn test_shared_sink_serializes_concurrent_flushes() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(&temp_dir);
        config.single = SingleFile::Named("shared".to_string());
        let sink = Arc::new(sink(config));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let sink = Arc::clone(&sink);
                std::thread::spawn(move || {
                    for i in 0..25 {
                        let entry = LogBuffer::single(Category::Info, format!("t{} m{}", t, i).into());
                        assert!(sink.save(&entry, true).unwrap());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let content = fs::read_to_string(temp_dir.path().join("shared.log")).unwrap();
        assert_eq!(content.matches("[ info ] t").count(), 200);
        assert_eq!(content.matches(format::BANNER).count(), 200);
    }
}
