use super::*;
use std::io::Write;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn unique_temp_dir() -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_nanos())
        .unwrap_or_default();
    std::env::temp_dir().join(format!("appscope-log-test-{nanos}"))
}

#[test]
fn should_cleanup_only_expired_logs() {
    let log_dir = unique_temp_dir();
    fs::create_dir_all(&log_dir).expect("failed to create temp log dir");

    let old_file = log_dir.join("old.log");
    let mut old_writer = fs::File::create(&old_file).expect("failed to create old log");
    writeln!(old_writer, "old").expect("failed to write old log");
    drop(old_writer);
    std::thread::sleep(Duration::from_millis(60));

    let new_file = log_dir.join("new.log");
    let mut new_writer = fs::File::create(&new_file).expect("failed to create new log");
    writeln!(new_writer, "new").expect("failed to write new log");
    drop(new_writer);

    let removed = retention::cleanup_expired_logs_with_duration(
        &log_dir,
        Duration::from_millis(30),
        SystemTime::now(),
    )
    .expect("cleanup failed");

    assert_eq!(removed, 1);
    assert!(!old_file.exists());
    assert!(new_file.exists());

    let _ = fs::remove_dir_all(log_dir);
}

#[test]
fn cleanup_of_missing_dir_is_a_no_op() {
    let log_dir = unique_temp_dir().join("never-created");
    let removed = cleanup_expired_logs(&log_dir, DEFAULT_KEEP_DAYS).expect("cleanup failed");
    assert_eq!(removed, 0);
}

#[test]
fn should_resolve_level_from_env_value() {
    assert_eq!(level::resolve_log_level_from(Some(" WARN ")), "warn");
    assert_eq!(level::resolve_log_level_from(Some("trace")), "trace");

    let fallback = if cfg!(debug_assertions) { "debug" } else { "info" };
    assert_eq!(level::resolve_log_level_from(Some("loud")), fallback);
    assert_eq!(level::resolve_log_level_from(None), fallback);
}

#[test]
fn should_sanitize_paths_to_file_name_and_hash() {
    let unix = sanitize_path("/home/demo/.local/share/AcmeEditor/");
    assert!(unix.starts_with("[path:AcmeEditor dir_hash="));

    let windows = sanitize_path(r"C:\Users\demo\AppData\Local\Acme");
    assert!(windows.starts_with("[path:Acme dir_hash="));

    assert!(sanitize_path("").starts_with("[path:unknown"));
}

#[test]
fn should_sanitize_free_text_only_when_it_looks_like_a_path() {
    assert_eq!(sanitize_for_log("  scan finished  "), "scan finished");
    assert!(sanitize_for_log("/var/lib/acme").starts_with("[path:acme"));

    let long = "x".repeat(300);
    assert!(sanitize_for_log(&long).contains("(truncated,len=300)"));
}
