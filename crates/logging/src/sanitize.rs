use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

const MAX_STRING_LEN: usize = 256;

fn short_hash(value: &str) -> String {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    format!("{:x}", hasher.finish())
}

fn looks_like_path(value: &str) -> bool {
    if value.starts_with("~/") || value.starts_with('/') {
        return true;
    }

    value.contains(":\\") || value.contains('\\') || value.matches('/').count() >= 2
}

fn truncate_text(value: &str, max_len: usize) -> String {
    if value.len() <= max_len {
        return value.to_string();
    }

    let mut truncated = String::new();
    for ch in value.chars() {
        if truncated.len() + ch.len_utf8() > max_len {
            break;
        }
        truncated.push(ch);
    }

    format!("{truncated}...(truncated,len={})", value.len())
}

/// Reduces a path to its last component plus a hash of the whole, so log
/// files never hold a user's directory layout.
pub fn sanitize_path(value: impl AsRef<Path>) -> String {
    let raw = value.as_ref().to_string_lossy();
    let normalized = raw.trim().trim_matches('"').trim_matches('\'');
    let trimmed = normalized.trim_end_matches(['/', '\\']);
    let file_name = trimmed
        .rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or("unknown");

    format!("[path:{} dir_hash={}]", file_name, short_hash(normalized))
}

pub fn sanitize_for_log(value: &str) -> String {
    let normalized = value.trim();
    if normalized.is_empty() {
        return String::new();
    }

    if looks_like_path(normalized) {
        return sanitize_path(normalized);
    }

    truncate_text(normalized, MAX_STRING_LEN)
}
