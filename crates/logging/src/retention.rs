use crate::{AppError, ResultExt};
use anyhow::Context;
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

pub(crate) fn cleanup_expired_logs_with_duration(
    log_dir: &Path,
    keep_duration: Duration,
    now: SystemTime,
) -> Result<usize, AppError> {
    if !log_dir.exists() {
        return Ok(0);
    }

    let entries = fs::read_dir(log_dir)
        .with_context(|| format!("读取日志目录失败: {}", log_dir.display()))
        .with_code("log_cleanup_read_dir_failed", "读取日志目录失败")
        .with_ctx("logDir", log_dir.display().to_string())?;

    let mut removed = 0usize;
    for entry in entries {
        let entry = entry
            .with_context(|| format!("读取日志条目失败: {}", log_dir.display()))
            .with_code("log_cleanup_read_entry_failed", "读取日志条目失败")
            .with_ctx("logDir", log_dir.display().to_string())?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let modified_at = entry
            .metadata()
            .and_then(|metadata| metadata.modified())
            .with_context(|| format!("读取日志修改时间失败: {}", path.display()))
            .with_code("log_cleanup_modified_time_failed", "读取日志修改时间失败")
            .with_ctx("logPath", path.display().to_string())?;

        let elapsed = now.duration_since(modified_at).unwrap_or_default();
        if elapsed <= keep_duration {
            continue;
        }

        fs::remove_file(&path)
            .with_context(|| format!("删除过期日志失败: {}", path.display()))
            .with_code("log_cleanup_remove_failed", "删除过期日志失败")
            .with_ctx("logPath", path.display().to_string())?;
        removed += 1;
    }

    Ok(removed)
}

/// Removes log files older than `keep_days` (clamped to 1..=90).
pub fn cleanup_expired_logs(log_dir: &Path, keep_days: u64) -> Result<usize, AppError> {
    let keep_days = keep_days.clamp(1, 90);
    let keep_duration = Duration::from_secs(keep_days.saturating_mul(24 * 60 * 60));
    cleanup_expired_logs_with_duration(log_dir, keep_duration, SystemTime::now())
}
