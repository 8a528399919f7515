use super::*;

#[tokio::test]
async fn run_blocking_returns_job_value() {
    let total = run_blocking("sum_sizes", || Ok::<_, AppError>(10u64 + 5))
        .await
        .expect("blocking job should succeed");
    assert_eq!(total, 15);
}

#[tokio::test]
async fn run_blocking_passes_through_job_error() {
    let result = run_blocking::<u64, _>("measure_folder", || {
        Err(AppError::new("audit_folder_not_found", "目录不存在"))
    })
    .await;

    let error = result.expect_err("job error should surface");
    assert!(error.is("audit_folder_not_found"));
}

#[tokio::test]
async fn run_blocking_maps_panic_to_app_error() {
    let result = run_blocking::<(), _>("panic_case", || panic!("walker exploded")).await;
    let error = result.expect_err("panic should be mapped");
    assert_eq!(error.code, "blocking_task_panicked");
    assert!(
        error
            .context
            .iter()
            .any(|item| item.key == "blockingTask" && item.value == "panic_case")
    );
}
