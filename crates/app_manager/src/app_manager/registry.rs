#![cfg_attr(not(target_os = "windows"), allow(dead_code))]

use super::*;

const SKIPPED_RELEASE_TYPES: [&str; 3] = ["update", "hotfix", "security update"];

#[cfg(target_os = "windows")]
pub(super) fn uninstall_roots() -> [(&'static str, &'static str); 3] {
    [
        (
            "HKLM",
            r"HKLM\Software\Microsoft\Windows\CurrentVersion\Uninstall",
        ),
        (
            "HKLM32",
            r"HKLM\Software\WOW6432Node\Microsoft\Windows\CurrentVersion\Uninstall",
        ),
        (
            "HKCU",
            r"HKCU\Software\Microsoft\Windows\CurrentVersion\Uninstall",
        ),
    ]
}

#[cfg(target_os = "windows")]
pub(super) fn list_uninstall_descriptors() -> AppResult<Vec<ApplicationDescriptor>> {
    let mut descriptors = Vec::new();
    let mut readable_roots = 0usize;
    for (hive, root) in uninstall_roots() {
        let output = match std::process::Command::new("reg")
            .args(["query", root, "/s"])
            .output()
        {
            Ok(output) => output,
            Err(error) => {
                tracing::debug!(
                    event = "program_registry_query_failed",
                    root = root,
                    error = error.to_string()
                );
                continue;
            }
        };
        if !output.status.success() {
            tracing::debug!(
                event = "program_registry_query_failed",
                root = root,
                status = format!("{}", output.status)
            );
            continue;
        }
        readable_roots += 1;
        let stdout = String::from_utf8_lossy(&output.stdout);
        descriptors.extend(parse_uninstall_query(hive, &stdout));
    }

    if readable_roots == 0 {
        return Err(app_error(
            EngineErrorCode::ProgramSourceFailed,
            "读取注册表卸载信息失败",
        ));
    }
    Ok(descriptors)
}

/// Parses `reg query <root> /s` output into descriptors keyed `{hive}:{subkey}`.
pub(super) fn parse_uninstall_query(hive: &str, stdout: &str) -> Vec<ApplicationDescriptor> {
    let mut descriptors = Vec::new();
    let mut current_key: Option<String> = None;
    let mut values: HashMap<String, String> = HashMap::new();

    for raw_line in stdout.lines() {
        let line = raw_line.trim_end();
        if line.trim().is_empty() {
            continue;
        }

        if !raw_line.starts_with(' ') && line.starts_with("HKEY_") {
            if let Some(key) = current_key.take() {
                descriptors.extend(descriptor_from_values(hive, &key, &values));
            }
            current_key = Some(line.trim().to_string());
            values.clear();
            continue;
        }

        if current_key.is_none() {
            continue;
        }

        if let Some((name, value)) = parse_reg_value_line(line.trim_start()) {
            values.insert(name, value);
        }
    }
    if let Some(key) = current_key {
        descriptors.extend(descriptor_from_values(hive, &key, &values));
    }
    descriptors
}

pub(super) fn parse_reg_value_line(line: &str) -> Option<(String, String)> {
    let mut parts = line.split_whitespace();
    let name = parts.next()?;
    let type_name = parts.next()?;
    if !type_name.starts_with("REG_") {
        return None;
    }
    let start = line.find(type_name)? + type_name.len();
    let value = line[start..].trim().to_string();
    Some((name.to_string(), value))
}

fn parse_registry_number(value: &str) -> Option<u64> {
    let trimmed = value.trim();
    match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => trimmed.parse::<u64>().ok(),
    }
}

fn descriptor_from_values(
    hive: &str,
    key: &str,
    values: &HashMap<String, String>,
) -> Option<ApplicationDescriptor> {
    let text = |name: &str| {
        values
            .get(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };

    let name = text("DisplayName")?;
    if text("SystemComponent").and_then(|value| parse_registry_number(&value)) == Some(1) {
        return None;
    }
    if text("ReleaseType").is_some_and(|value| {
        SKIPPED_RELEASE_TYPES.contains(&value.to_ascii_lowercase().as_str())
    }) {
        return None;
    }
    if text("ParentKeyName").is_some() || text("ParentDisplayName").is_some() {
        return None;
    }

    let subkey = key.rsplit('\\').next().unwrap_or(key);
    let estimated_bytes = text("EstimatedSize")
        .and_then(|value| parse_registry_number(&value))
        .map(|kib| kib.saturating_mul(1024))
        .unwrap_or(0);

    Some(ApplicationDescriptor {
        name,
        publisher: text("Publisher"),
        install_path: text("InstallLocation").map(|value| PathBuf::from(value.trim_matches('"'))),
        display_icon: text("DisplayIcon"),
        estimated_bytes,
        source_key: format!("{hive}:{subkey}"),
    })
}

#[cfg(test)]
#[path = "../../tests/app_manager/registry_tests.rs"]
mod registry_tests;
