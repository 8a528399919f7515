use crate::{AppError, ResultExt};
use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{Builder as RollingBuilder, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[path = "level.rs"]
mod level;
#[path = "retention.rs"]
mod retention;
#[path = "sanitize.rs"]
mod sanitize;

pub use level::normalize_level;
pub use retention::cleanup_expired_logs;
pub use sanitize::{sanitize_for_log, sanitize_path};

pub const DEFAULT_KEEP_DAYS: u64 = 7;
const LOG_FILE_PREFIX: &str = "appscope";
const LOG_FILE_SUFFIX: &str = "log";

#[derive(Debug, Clone)]
pub struct LoggingGuard {
    log_dir: PathBuf,
    level: String,
}

impl LoggingGuard {
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn level(&self) -> &str {
        &self.level
    }
}

fn worker_guard_slot() -> &'static Mutex<Option<WorkerGuard>> {
    static SLOT: OnceLock<Mutex<Option<WorkerGuard>>> = OnceLock::new();
    SLOT.get_or_init(|| Mutex::new(None))
}

pub fn resolve_log_level() -> String {
    let env_value = std::env::var(level::LOG_LEVEL_ENV).ok();
    level::resolve_log_level_from(env_value.as_deref())
}

/// Installs the process-wide subscriber: JSON lines into a daily rolling file
/// under `log_dir`, plus a compact stderr layer in debug builds.
///
/// Calling it again after a subscriber is installed only swaps the file
/// writer guard and returns the resolved settings.
pub fn init_logging(log_dir: &Path) -> Result<LoggingGuard, AppError> {
    let log_dir = log_dir.to_path_buf();
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("创建日志目录失败: {}", log_dir.display()))
        .with_code("log_dir_create_failed", "创建日志目录失败")
        .with_ctx("logDir", log_dir.display().to_string())?;
    cleanup_expired_logs(&log_dir, DEFAULT_KEEP_DAYS)?;

    let file_appender = RollingBuilder::new()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .build(&log_dir)
        .with_context(|| format!("创建日志写入器失败: {}", log_dir.display()))
        .with_code("log_appender_create_failed", "创建日志写入器失败")
        .with_ctx("logDir", log_dir.display().to_string())?;
    let (file_writer, worker_guard) = tracing_appender::non_blocking(file_appender);

    if let Ok(mut slot) = worker_guard_slot().lock() {
        *slot = Some(worker_guard);
    }

    let level = resolve_log_level();
    if !tracing::dispatcher::has_been_set() {
        let env_filter = EnvFilter::new(level.clone());
        let file_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(file_writer)
            .with_current_span(false)
            .with_span_list(false);

        let subscriber = tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer);
        #[cfg(debug_assertions)]
        let subscriber = subscriber.with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_ansi(true)
                .with_target(true)
                .with_writer(std::io::stderr),
        );

        subscriber
            .try_init()
            .with_context(|| format!("初始化日志订阅器失败: level={level}"))
            .with_code("log_subscriber_init_failed", "初始化日志订阅器失败")
            .with_ctx("logLevel", level.clone())?;
    }

    tracing::info!(
        event = "logging_initialized",
        log_dir = %sanitize_path(&log_dir),
        level = %level
    );

    Ok(LoggingGuard { log_dir, level })
}

#[cfg(test)]
#[path = "../tests/logging/logging_tests.rs"]
mod logging_tests;
