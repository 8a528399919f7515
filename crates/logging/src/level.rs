pub(super) const LOG_LEVEL_ENV: &str = "APPSCOPE_LOG_LEVEL";

pub fn normalize_level(value: &str) -> Option<&'static str> {
    match value.trim().to_ascii_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" => Some("warn"),
        "error" => Some("error"),
        _ => None,
    }
}

pub(super) fn default_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

pub(super) fn resolve_log_level_from(env_value: Option<&str>) -> String {
    env_value
        .and_then(normalize_level)
        .unwrap_or_else(default_level)
        .to_string()
}
