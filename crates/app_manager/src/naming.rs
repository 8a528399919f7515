/// Collapses runs of whitespace; `None` when nothing is left.
pub(crate) fn normalize_display_name(value: &str) -> Option<String> {
    let normalized = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.is_empty() {
        return None;
    }
    Some(normalized)
}

/// Comparison key: ASCII alphanumerics only, lowercased.
pub(crate) fn normalize_match_key(value: &str) -> String {
    value
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|ch| ch.to_ascii_lowercase())
        .collect()
}

/// Lowercased ASCII-alphanumeric words of `value`.
pub(crate) fn split_match_words(value: &str) -> Vec<String> {
    value
        .split(|ch: char| !ch.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| word.to_ascii_lowercase())
        .collect()
}

/// Offsets into `normalize_match_key(value)` where a word starts or ends.
/// Words break at separators, at lower-to-upper case changes (`GoogleChrome`),
/// before the last capital of an acronym run (`VLCPlayer`) and between
/// letters and digits. Always contains `0` and the key length.
pub(crate) fn match_key_boundaries(value: &str) -> Vec<usize> {
    let chars = value.chars().collect::<Vec<_>>();
    let mut boundaries = vec![0];
    let mut key_len = 0usize;
    let mut previous: Option<char> = None;

    for (index, &ch) in chars.iter().enumerate() {
        if !ch.is_ascii_alphanumeric() {
            if boundaries.last() != Some(&key_len) {
                boundaries.push(key_len);
            }
            previous = None;
            continue;
        }
        if let Some(prev) = previous {
            let next = chars.get(index + 1).copied();
            let breaks = (prev.is_ascii_lowercase() && ch.is_ascii_uppercase())
                || (prev.is_ascii_digit() != ch.is_ascii_digit())
                || (prev.is_ascii_uppercase()
                    && ch.is_ascii_uppercase()
                    && next.is_some_and(|next| next.is_ascii_lowercase()));
            if breaks && boundaries.last() != Some(&key_len) {
                boundaries.push(key_len);
            }
        }
        key_len += 1;
        previous = Some(ch);
    }

    if boundaries.last() != Some(&key_len) {
        boundaries.push(key_len);
    }
    boundaries
}

fn is_version_text(value: &str) -> bool {
    let trimmed = value.trim();
    let digits = trimmed
        .strip_prefix(['v', 'V'])
        .map(str::trim_start)
        .unwrap_or(trimmed);
    !digits.is_empty()
        && digits.starts_with(|ch: char| ch.is_ascii_digit())
        && digits
            .chars()
            .all(|ch| ch.is_ascii_digit() || matches!(ch, '.' | '-' | '_'))
}

/// Drops a trailing version from a product name: `Foo 1.2.3`, `Foo (1.2)`,
/// `Foo [v2.0]`, `Foo v 1.2`.
pub(crate) fn strip_version_suffix(name: &str) -> String {
    let mut current = name.trim().to_string();
    loop {
        let trimmed = current.trim_end();

        let bracketed = [('(', ')'), ('[', ']')]
            .into_iter()
            .find_map(|(open, close)| {
                let inner = trimmed.strip_suffix(close)?;
                let start = inner.rfind(open)?;
                is_version_text(&inner[start + 1..]).then(|| inner[..start].to_string())
            });
        if let Some(rest) = bracketed {
            current = rest;
            continue;
        }

        let Some(split_at) = trimmed.rfind(char::is_whitespace) else {
            break;
        };
        let (head, tail) = trimmed.split_at(split_at);
        if !is_version_text(tail) {
            break;
        }
        let head = head.trim_end();
        // `Foo v 1.2`: the bare `v` belongs to the version.
        current = match head.rsplit_once(char::is_whitespace) {
            Some((rest, marker)) if marker.eq_ignore_ascii_case("v") => rest.to_string(),
            _ => head.to_string(),
        };
    }

    let stripped = current.trim().to_string();
    if stripped.is_empty() {
        return name.trim().to_string();
    }
    stripped
}

#[cfg(test)]
#[path = "../tests/app_manager/naming_tests.rs"]
mod naming_tests;
