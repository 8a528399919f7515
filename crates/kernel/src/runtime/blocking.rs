use crate::{AppError, AppResult};
use std::time::Instant;

/// Runs filesystem-bound engine work off the async executor.
///
/// A panic or cancellation of the job is mapped to an [`AppError`] so async
/// callers never observe a `JoinError`.
pub async fn run_blocking<T, F>(label: &'static str, job: F) -> AppResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> AppResult<T> + Send + 'static,
{
    let started_at = Instant::now();
    let handle = tokio::task::spawn_blocking(job);
    let joined = handle.await;
    tracing::debug!(
        event = "blocking_task_finished",
        blocking_task = label,
        elapsed_ms = started_at.elapsed().as_millis() as u64,
        joined = joined.is_ok()
    );

    match joined {
        Ok(result) => result,
        Err(error) if error.is_cancelled() => Err(AppError::new(
            "blocking_task_canceled",
            "后台任务被取消",
        )
        .with_context("blockingTask", label)),
        Err(error) if error.is_panic() => Err(AppError::new(
            "blocking_task_panicked",
            "后台任务发生 panic",
        )
        .with_context("joinError", join_error_detail(&error))
        .with_context("blockingTask", label)),
        Err(error) => Err(AppError::new("blocking_task_failed", "后台任务执行失败")
            .with_context("joinError", join_error_detail(&error))
            .with_context("blockingTask", label)),
    }
}

fn join_error_detail(error: &tokio::task::JoinError) -> String {
    let debug_text = format!("{error:?}");
    if debug_text.trim().is_empty() {
        "join error".to_string()
    } else {
        debug_text
    }
}

#[cfg(test)]
#[path = "../../tests/runtime/blocking_tests.rs"]
mod blocking_tests;
