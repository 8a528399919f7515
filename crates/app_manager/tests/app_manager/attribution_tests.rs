use super::*;
use crate::app_manager::test_support::{
    CountingMeasure, FixedMeasure, descriptor, empty_roots_config, engine_context,
    unique_temp_dir, write_bytes,
};

#[test]
fn install_dir_and_data_folders_add_up() {
    let base = unique_temp_dir("appscope-attr-acme");
    let program_root = base.join("program");
    let local_root = base.join("local");
    write_bytes(&program_root.join("acme/acme.bin"), 10);
    write_bytes(&local_root.join("Acme/state.db"), 5);
    write_bytes(&local_root.join("Other/state.db"), 50);

    let mut config = empty_roots_config();
    config.roots.program = vec![program_root.clone()];
    config.roots.app_data_local = Some(local_root.clone());
    let context = engine_context(config, Arc::new(FsSizeMeasure::default()));
    let snapshot = RootSnapshot::capture(&context.config, &RootKind::DATA);
    let apps = prepare_apps(vec![descriptor("Acme", Some(&program_root.join("acme")))]);

    let record = attribute_app(&context, &snapshot, &apps[0]);
    assert_eq!(record.name, "Acme");
    assert_eq!(record.total_bytes, 15);
    assert_eq!(record.breakdown.len(), 2);
    assert_eq!(record.breakdown[0].kind, RootKind::Program);
    assert_eq!(record.breakdown[0].bytes, 10);
    assert_eq!(record.breakdown[0].label, kind_label(RootKind::Program));
    assert_eq!(
        record.breakdown[0].paths,
        vec![program_root.join("acme").to_string_lossy().to_string()]
    );
    assert_eq!(record.breakdown[1].kind, RootKind::AppDataLocal);
    assert_eq!(record.breakdown[1].bytes, 5);
    assert_eq!(record.bytes_of(RootKind::AppDataLocal), 5);

    let _ = fs::remove_dir_all(base);
}

#[test]
fn size_hint_stands_in_for_an_unmeasurable_install_dir() {
    let base = unique_temp_dir("appscope-attr-hint");
    let context = engine_context(empty_roots_config(), Arc::new(FsSizeMeasure::default()));
    let snapshot = RootSnapshot::capture(&context.config, &RootKind::DATA);

    let hinted = ApplicationDescriptor {
        estimated_bytes: 2048,
        ..descriptor("Acme", Some(&base.join("gone")))
    };
    let apps = prepare_apps(vec![hinted]);
    let record = attribute_app(&context, &snapshot, &apps[0]);
    assert_eq!(record.total_bytes, 2048);
    assert_eq!(record.breakdown.len(), 1);
    assert_eq!(record.breakdown[0].label, PROGRAM_ESTIMATE_LABEL);
    assert!(record.breakdown[0].paths.is_empty());

    let bare = prepare_apps(vec![descriptor("Bare", None)]);
    let record = attribute_app(&context, &snapshot, &bare[0]);
    assert_eq!(record.total_bytes, 0);
    assert!(record.breakdown.is_empty());

    let _ = fs::remove_dir_all(base);
}

#[test]
fn folder_shared_by_two_apps_is_walked_once() {
    let base = unique_temp_dir("appscope-attr-shared");
    write_bytes(&base.join("Acme/shared.bin"), 9);
    let mut config = empty_roots_config();
    config.roots.app_data_roaming = Some(base.clone());
    let measure = Arc::new(CountingMeasure::default());
    let context = engine_context(config, measure.clone());
    let snapshot = RootSnapshot::capture(&context.config, &RootKind::DATA);

    let apps = prepare_apps(vec![descriptor("Acme Editor", None), descriptor("Acme Viewer", None)]);
    assert_eq!(apps.len(), 2);
    for app in &apps {
        let record = attribute_app(&context, &snapshot, app);
        assert_eq!(record.bytes_of(RootKind::AppDataRoaming), 9);
    }
    assert_eq!(measure.calls(), 1);
    assert_eq!(context.folder_sizes.cached(RootKind::AppDataRoaming, "Acme"), Some(9));

    let _ = fs::remove_dir_all(base);
}

#[test]
fn breakdown_paths_are_largest_first_and_capped() {
    let base = unique_temp_dir("appscope-attr-paths");
    for index in 0..7usize {
        write_bytes(&base.join(format!("Acme-{index}/data.bin")), index + 1);
    }
    let mut config = empty_roots_config();
    config.roots.program_data = Some(base.clone());
    let context = engine_context(config, Arc::new(FsSizeMeasure::default()));
    let snapshot = RootSnapshot::capture(&context.config, &RootKind::DATA);
    let apps = prepare_apps(vec![descriptor("Acme", None)]);

    let record = attribute_app(&context, &snapshot, &apps[0]);
    assert_eq!(record.total_bytes, 28);
    let entry = &record.breakdown[0];
    assert_eq!(entry.kind, RootKind::ProgramData);
    assert_eq!(entry.paths.len(), MAX_BREAKDOWN_PATHS);
    assert_eq!(entry.paths[0], base.join("Acme-6").to_string_lossy().to_string());
    assert_eq!(entry.paths[4], base.join("Acme-2").to_string_lossy().to_string());

    let _ = fs::remove_dir_all(base);
}

#[test]
fn empty_matched_folders_produce_no_entry() {
    let base = unique_temp_dir("appscope-attr-empty");
    fs::create_dir_all(base.join("Acme")).expect("create acme");
    let mut config = empty_roots_config();
    config.roots.app_data_local = Some(base.clone());
    let context = engine_context(config, Arc::new(FixedMeasure(0)));
    let snapshot = RootSnapshot::capture(&context.config, &RootKind::DATA);
    let apps = prepare_apps(vec![descriptor("Acme", None)]);

    let record = attribute_app(&context, &snapshot, &apps[0]);
    assert!(record.breakdown.is_empty());

    let _ = fs::remove_dir_all(base);
}
