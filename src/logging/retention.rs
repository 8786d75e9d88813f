//! Rotated backup retention
//!
//! Deletes backups produced by rotation (`{unix_ts}-{name}.log`) once they
//! are older than the retention period. Live log files are never touched.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;

const SECS_PER_DAY: i64 = 24 * 60 * 60;

/// Delete rotated backups under `logs_dir` older than `retention_days`
///
/// `single` is the sink's single-file name, or `None` for dated files; only
/// backups of names that layout produces are considered. Looks in `logs_dir`
/// itself and in its immediate subdirectories (the dated `YYYYMM` folders).
/// Returns the number of files deleted.
pub fn prune_rotated(logs_dir: &Path, retention_days: u64, single: Option<&str>) -> Result<usize> {
    if !logs_dir.exists() {
        return Ok(0);
    }

    // A period reaching before the epoch keeps everything
    let Some(cutoff) = i64::try_from(retention_days)
        .ok()
        .and_then(|days| days.checked_mul(SECS_PER_DAY))
        .and_then(|secs| Utc::now().timestamp().checked_sub(secs))
    else {
        return Ok(0);
    };

    let mut deleted_count = prune_dir(logs_dir, cutoff, single)?;

    for entry in fs::read_dir(logs_dir).context("Failed to read logs directory")? {
        let entry = entry?;
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            // Unreadable month directories are skipped rather than failing the sweep
            deleted_count += prune_dir(&entry.path(), cutoff, single).unwrap_or(0);
        }
    }

    Ok(deleted_count)
}

fn prune_dir(dir: &Path, cutoff: i64, single: Option<&str>) -> Result<usize> {
    let mut deleted_count = 0;

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        let Some(rotated_at) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| rotated_backup(n, single))
        else {
            continue;
        };

        if rotated_at < cutoff && path.is_file() && fs::remove_file(&path).is_ok() {
            deleted_count += 1;
        }
    }

    Ok(deleted_count)
}

/// Unix timestamp embedded in a rotated backup name, if `name` is one
///
/// `name` must be `{digits}-{live}` where `{live}` is a file name the sink
/// writes (`DD[_category][_cli].log`, or `{single}[_category][_cli].log`),
/// and `name` must not itself be such a live name.
pub fn rotated_backup(name: &str, single: Option<&str>) -> Option<i64> {
    if is_live_name(name, single) {
        return None;
    }
    let (prefix, live) = name.split_once('-')?;
    if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if !is_live_name(live, single) {
        return None;
    }
    prefix.parse().ok()
}

/// Check whether `name` is a file name the sink writes live
pub fn is_live_name(name: &str, single: Option<&str>) -> bool {
    let Some(stem) = name.strip_suffix(".log") else {
        return false;
    };
    let stem = stem.strip_suffix("_cli").unwrap_or(stem);

    let rest = match single {
        Some(base) => match stem.strip_prefix(base) {
            Some(rest) => rest,
            None => return false,
        },
        None => {
            let bytes = stem.as_bytes();
            if bytes.len() < 2 || !bytes[..2].iter().all(|b| b.is_ascii_digit()) {
                return false;
            }
            &stem[2..]
        }
    };

    rest.is_empty() || rest.strip_prefix('_').is_some_and(|category| !category.is_empty())
}
