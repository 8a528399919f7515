use protocol::models::{AppRecord, AuditOverview, DiskInfoDto, RootKind};

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB"];
    let mut unit_index = 0;
    let mut value = bytes as f64;

    while value >= 1024.0 && unit_index < UNITS.len() - 1 {
        value /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{value:.1} {}", UNITS[unit_index])
    }
}

/// Largest applications first, one line per app plus a total line.
pub fn render_scan_table(records: &[AppRecord]) -> String {
    let mut sorted = records.iter().collect::<Vec<_>>();
    sorted.sort_by(|left, right| {
        right
            .total_bytes
            .cmp(&left.total_bytes)
            .then_with(|| left.name.cmp(&right.name))
    });

    let mut lines = vec![
        format!(
            "{:<40} {:>12} {:>12} {:>12}",
            "APPLICATION", "TOTAL", "PROGRAM", "DATA"
        ),
        "-".repeat(79),
    ];
    let mut total = 0u64;
    for record in sorted {
        let program = record.bytes_of(RootKind::Program);
        total = total.saturating_add(record.total_bytes);
        lines.push(format!(
            "{:<40} {:>12} {:>12} {:>12}",
            truncate_name(&record.name, 40),
            format_bytes(record.total_bytes),
            format_bytes(program),
            format_bytes(record.total_bytes.saturating_sub(program))
        ));
    }
    lines.push(String::new());
    lines.push(format!(
        "apps={} total={}",
        records.len(),
        format_bytes(total)
    ));
    lines.join("\n")
}

pub fn render_audit(overview: &AuditOverview) -> String {
    let mut lines = vec![
        format!(
            "apps={} unknown_program_size={}",
            overview.app_count, overview.unknown_program_size_count
        ),
        String::new(),
        format!("{:<16} {:>10} {:>12}", "ROOT", "ASSIGNED", "UNASSIGNED"),
    ];
    for root in &overview.roots {
        lines.push(format!(
            "{:<16} {:>10} {:>12}",
            root.kind.as_str(),
            root.assigned_folders,
            root.unassigned_folders
        ));
    }

    if !overview.duplicate_install_locations.is_empty() {
        lines.push(String::new());
        lines.push("Shared install directories".to_string());
        for group in &overview.duplicate_install_locations {
            lines.push(format!("  {} <- {}", group.install_dir, group.apps.join(", ")));
        }
    }

    if !overview.unassigned_folders.is_empty() {
        lines.push(String::new());
        lines.push("Unassigned folders".to_string());
        for folder in &overview.unassigned_folders {
            lines.push(format!("  {:<16} {}", folder.kind.as_str(), folder.path));
        }
    }
    lines.join("\n")
}

pub fn render_disks(disks: &[DiskInfoDto]) -> String {
    let mut lines = vec![format!(
        "{:<24} {:>12} {:>12} {:>9}",
        "MOUNT", "TOTAL", "AVAILABLE", "REMOVABLE"
    )];
    for disk in disks {
        lines.push(format!(
            "{:<24} {:>12} {:>12} {:>9}",
            disk.mount_point,
            format_bytes(disk.total_space),
            format_bytes(disk.available_space),
            if disk.is_removable { "yes" } else { "no" }
        ));
    }
    lines.join("\n")
}

fn truncate_name(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let mut truncated = value.chars().take(max_chars.saturating_sub(3)).collect::<String>();
    truncated.push_str("...");
    truncated
}

#[cfg(test)]
#[path = "../../tests/app/report_tests.rs"]
mod report_tests;
