use super::*;
use protocol::models::{
    AppBreakdownEntry, AuditDuplicateInstallLocation, AuditRootSummary, AuditUnassignedFolder,
};

fn record(name: &str, program: u64, data: u64) -> AppRecord {
    let entry = |kind: RootKind, bytes: u64| AppBreakdownEntry {
        kind,
        label: kind.as_str().to_string(),
        bytes,
        paths: Vec::new(),
    };
    AppRecord::from_breakdown(
        format!("app.{name}"),
        name.to_string(),
        None,
        vec![entry(RootKind::Program, program), entry(RootKind::AppDataLocal, data)],
    )
}

#[test]
fn bytes_use_binary_units() {
    assert_eq!(format_bytes(0), "0 B");
    assert_eq!(format_bytes(1023), "1023 B");
    assert_eq!(format_bytes(1536), "1.5 KiB");
    assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MiB");
}

#[test]
fn scan_table_lists_largest_apps_first() {
    let table = render_scan_table(&[record("Small", 10, 0), record("Large", 2048, 1024)]);
    let lines = table.lines().collect::<Vec<_>>();
    assert!(lines[2].starts_with("Large"));
    assert!(lines[2].contains("3.0 KiB"));
    assert!(lines[3].starts_with("Small"));
    assert_eq!(lines.last().copied(), Some("apps=2 total=3.0 KiB"));
}

#[test]
fn audit_report_shows_groups_and_samples() {
    let overview = AuditOverview {
        app_count: 2,
        unknown_program_size_count: 1,
        roots: vec![AuditRootSummary {
            kind: RootKind::AppDataLocal,
            assigned_folders: 3,
            unassigned_folders: 1,
        }],
        duplicate_install_locations: vec![AuditDuplicateInstallLocation {
            install_dir: r"C:\Foo".to_string(),
            apps: vec!["Foo Editor".to_string(), "Foo Viewer".to_string()],
        }],
        unassigned_folders: vec![AuditUnassignedFolder {
            kind: RootKind::AppDataLocal,
            folder: "RandomTool".to_string(),
            path: "/home/u/.local/share/RandomTool".to_string(),
        }],
    };
    let report = render_audit(&overview);
    assert!(report.starts_with("apps=2 unknown_program_size=1"));
    assert!(report.contains(r"C:\Foo <- Foo Editor, Foo Viewer"));
    assert!(report.contains("/home/u/.local/share/RandomTool"));
}

#[test]
fn long_names_are_truncated_for_the_table() {
    let name = "A".repeat(50);
    assert_eq!(truncate_name(&name, 40).chars().count(), 40);
    assert!(truncate_name(&name, 40).ends_with("..."));
    assert_eq!(truncate_name("Acme", 40), "Acme");
}
