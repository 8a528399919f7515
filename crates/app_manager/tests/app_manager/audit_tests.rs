use super::*;
use crate::app_manager::test_support::{
    FailingSource, FixedMeasure, descriptor, empty_roots_config, engine_context, unique_temp_dir,
};

fn audit_context(config: EngineConfig, descriptors: Vec<ApplicationDescriptor>) -> EngineContext {
    EngineContext {
        source: Arc::new(StaticProgramSource::new(descriptors)),
        ..engine_context(config, Arc::new(FixedMeasure(0)))
    }
}

#[test]
fn empty_machine_reports_all_five_roots_as_zero() {
    let context = audit_context(empty_roots_config(), Vec::new());
    let overview = build_audit_overview(&context).expect("audit should succeed");

    assert_eq!(overview.app_count, 0);
    assert_eq!(overview.unknown_program_size_count, 0);
    assert!(overview.duplicate_install_locations.is_empty());
    assert!(overview.unassigned_folders.is_empty());
    let kinds = overview.roots.iter().map(|root| root.kind).collect::<Vec<_>>();
    assert_eq!(kinds, RootKind::ALL.to_vec());
    assert!(
        overview
            .roots
            .iter()
            .all(|root| root.assigned_folders == 0 && root.unassigned_folders == 0)
    );
}

#[test]
fn shared_install_dir_is_reported_once_with_both_apps() {
    let context = audit_context(
        empty_roots_config(),
        vec![
            descriptor("Foo Editor", Some(Path::new(r"C:\Foo"))),
            descriptor("Foo Viewer", Some(Path::new(r"C:\Foo\"))),
            descriptor("Bar", Some(Path::new(r"C:\Bar"))),
        ],
    );
    let overview = build_audit_overview(&context).expect("audit should succeed");

    assert_eq!(overview.duplicate_install_locations.len(), 1);
    let group = &overview.duplicate_install_locations[0];
    assert_eq!(group.install_dir, r"C:\Foo");
    assert_eq!(group.apps, vec!["Foo Editor", "Foo Viewer"]);
}

#[test]
fn unmatched_data_folders_are_sampled_and_program_children_counted() {
    let base = unique_temp_dir("appscope-audit-unassigned");
    let program_root = base.join("program");
    let local_root = base.join("local");
    for dir in [
        program_root.join("acme/bin"),
        program_root.join("orphan"),
        local_root.join("Acme"),
        local_root.join("RandomTool"),
    ] {
        fs::create_dir_all(dir).expect("create fixture dir");
    }
    let mut config = empty_roots_config();
    config.roots.program = vec![program_root.clone()];
    config.roots.app_data_local = Some(local_root.clone());
    let context = audit_context(
        config,
        vec![descriptor("Acme", Some(&program_root.join("acme/bin")))],
    );

    let overview = build_audit_overview(&context).expect("audit should succeed");
    assert_eq!(overview.roots[0].kind, RootKind::Program);
    assert_eq!(overview.roots[0].assigned_folders, 1);
    assert_eq!(overview.roots[0].unassigned_folders, 1);
    assert_eq!(overview.roots[1].kind, RootKind::AppDataLocal);
    assert_eq!(overview.roots[1].assigned_folders, 1);
    assert_eq!(overview.roots[1].unassigned_folders, 1);
    assert_eq!(
        overview.unassigned_folders,
        vec![AuditUnassignedFolder {
            kind: RootKind::AppDataLocal,
            folder: "RandomTool".to_string(),
            path: local_root.join("RandomTool").to_string_lossy().to_string(),
        }]
    );

    let again = build_audit_overview(&context).expect("second audit should succeed");
    assert_eq!(overview, again);

    let _ = fs::remove_dir_all(base);
}

#[test]
fn unassigned_sample_respects_per_root_and_total_limits() {
    let base = unique_temp_dir("appscope-audit-limits");
    let local_root = base.join("local");
    let roaming_root = base.join("roaming");
    for name in ["Alpha", "Bravo", "Charlie", "Delta"] {
        fs::create_dir_all(local_root.join(name)).expect("create local child");
        fs::create_dir_all(roaming_root.join(name)).expect("create roaming child");
    }
    let mut config = empty_roots_config();
    config.roots.app_data_local = Some(local_root);
    config.roots.app_data_roaming = Some(roaming_root);
    config.unassigned_per_root_limit = 2;
    config.unassigned_sample_limit = 3;
    let context = audit_context(config, vec![descriptor("Acme", None)]);

    let overview = build_audit_overview(&context).expect("audit should succeed");
    let sampled = overview
        .unassigned_folders
        .iter()
        .map(|item| (item.kind, item.folder.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(
        sampled,
        vec![
            (RootKind::AppDataLocal, "Alpha"),
            (RootKind::AppDataLocal, "Bravo"),
            (RootKind::AppDataRoaming, "Alpha"),
        ]
    );
    assert_eq!(overview.roots[1].unassigned_folders, 4);
    assert_eq!(overview.roots[2].unassigned_folders, 4);

    let _ = fs::remove_dir_all(base);
}

#[test]
fn apps_without_dir_or_hint_count_as_unknown_size() {
    let context = audit_context(
        empty_roots_config(),
        vec![
            descriptor("Bare", None),
            ApplicationDescriptor {
                estimated_bytes: 4096,
                ..descriptor("Hinted", None)
            },
            descriptor("Installed", Some(Path::new("/opt/installed"))),
        ],
    );
    let overview = build_audit_overview(&context).expect("audit should succeed");
    assert_eq!(overview.app_count, 3);
    assert_eq!(overview.unknown_program_size_count, 1);
}

#[test]
fn unreadable_program_source_fails_the_audit() {
    let context = EngineContext {
        source: Arc::new(FailingSource),
        ..engine_context(empty_roots_config(), Arc::new(FixedMeasure(0)))
    };
    let error = build_audit_overview(&context).expect_err("source failure");
    assert!(error.is("program_source_failed"));
}
