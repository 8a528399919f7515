use super::*;
use protocol::AppError;

#[test]
fn request_ids_are_trimmed_or_defaulted() {
    assert_eq!(normalize_request_id(Some("  req-1 ".to_string())), "req-1");
    assert_eq!(normalize_request_id(Some("   ".to_string())), "unknown");
    assert_eq!(normalize_request_id(None), "unknown");
}

#[test]
fn sync_command_errors_carry_the_request_id() {
    let result: Result<(), InvokeError> = run_command_sync("sample_command", Some("req-7".to_string()), || {
        Err::<(), AppError>(AppError::new("audit_folder_invalid", "目录名称无效"))
    });
    let error = result.expect_err("command should fail");
    assert_eq!(error.code, "audit_folder_invalid");
    assert_eq!(error.request_id.as_deref(), Some("req-7"));
}

#[tokio::test]
async fn blocking_command_returns_the_job_value() {
    let value = run_blocking_command("sample_command", None, "sample_job", || Ok(21 * 2))
        .await
        .expect("job should succeed");
    assert_eq!(value, 42);
}
