use std::future::Future;
use std::time::Instant;

use appscope_logging::sanitize_for_log;
use kernel::run_blocking;
use protocol::{AppResult, InvokeError};

pub(crate) fn normalize_request_id(request_id: Option<String>) -> String {
    request_id
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

pub(crate) fn command_start(command: &str, request_id: &str) -> Instant {
    tracing::info!(
        event = "command_start",
        command = command,
        request_id = request_id
    );
    Instant::now()
}

pub(crate) fn command_end_ok(command: &str, request_id: &str, started_at: Instant) {
    tracing::info!(
        event = "command_end",
        command = command,
        request_id = request_id,
        ok = true,
        duration_ms = started_at.elapsed().as_millis() as u64
    );
}

pub(crate) fn command_end_error<E>(command: &str, request_id: &str, started_at: Instant, error: &E)
where
    E: Clone + Into<InvokeError>,
{
    let error: InvokeError = error.clone().into().with_request_id(request_id.to_string());
    let causes: Vec<String> = error
        .causes
        .iter()
        .map(|cause| sanitize_for_log(cause))
        .collect();
    let primary_cause = causes.first().cloned().unwrap_or_default();

    tracing::error!(
        event = "command_end",
        command = command,
        request_id = request_id,
        ok = false,
        duration_ms = started_at.elapsed().as_millis() as u64,
        error_code = error.code.as_str(),
        error_message = sanitize_for_log(&error.message),
        error_primary_cause = primary_cause.as_str(),
        error_causes_count = error.causes.len()
    );
}

pub(crate) fn run_command_sync<T, E, F>(
    command: &str,
    request_id: Option<String>,
    op: F,
) -> Result<T, InvokeError>
where
    E: Clone + Into<InvokeError>,
    F: FnOnce() -> Result<T, E>,
{
    let request_id = normalize_request_id(request_id);
    let started_at = command_start(command, &request_id);
    let result = op();
    match &result {
        Ok(_) => command_end_ok(command, &request_id, started_at),
        Err(error) => command_end_error(command, &request_id, started_at, error),
    }
    result.map_err(|error| error.into().with_request_id(request_id))
}

pub(crate) async fn run_command_async<T, E, Fut, F>(
    command: &str,
    request_id: Option<String>,
    op: F,
) -> Result<T, InvokeError>
where
    E: Clone + Into<InvokeError>,
    Fut: Future<Output = Result<T, E>>,
    F: FnOnce() -> Fut,
{
    let request_id = normalize_request_id(request_id);
    let started_at = command_start(command, &request_id);
    let result = op().await;
    match &result {
        Ok(_) => command_end_ok(command, &request_id, started_at),
        Err(error) => command_end_error(command, &request_id, started_at, error),
    }
    result.map_err(|error| error.into().with_request_id(request_id))
}

pub(crate) async fn run_blocking_command<T, F>(
    command: &str,
    request_id: Option<String>,
    blocking_label: &'static str,
    job: F,
) -> Result<T, InvokeError>
where
    T: Send + 'static,
    F: FnOnce() -> AppResult<T> + Send + 'static,
{
    run_command_async(command, request_id, move || async move {
        run_blocking(blocking_label, job).await
    })
    .await
}

#[cfg(test)]
#[path = "../../tests/commands/commands_tests.rs"]
mod commands_tests;
