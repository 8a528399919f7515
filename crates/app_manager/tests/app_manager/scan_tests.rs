use super::*;
use crate::app_manager::test_support::{
    FailingSource, FixedMeasure, GatedSource, descriptor, empty_roots_config, orchestrator,
    summary_of, unique_temp_dir, write_bytes,
};

fn static_source(descriptors: Vec<ApplicationDescriptor>) -> Arc<dyn InstalledProgramSource> {
    Arc::new(StaticProgramSource::new(descriptors))
}

fn results(events: &[ScanEvent]) -> Vec<&AppRecord> {
    events
        .iter()
        .filter_map(|event| match event {
            ScanEvent::Result(record) => Some(record),
            _ => None,
        })
        .collect()
}

#[test]
fn scan_streams_records_and_finishes_once() {
    let base = unique_temp_dir("appscope-scan-acme");
    let program_root = base.join("program");
    let local_root = base.join("local");
    write_bytes(&program_root.join("acme/acme.bin"), 10);
    write_bytes(&local_root.join("Acme/cache.bin"), 5);
    let mut config = empty_roots_config();
    config.roots.program = vec![program_root.clone()];
    config.roots.app_data_local = Some(local_root);

    let scanner = orchestrator(
        config,
        static_source(vec![descriptor("Acme", Some(&program_root.join("acme")))]),
        Arc::new(FsSizeMeasure::default()),
    );
    let handle = scanner.start_scan().expect("scan should start");
    let events = handle.events().collect::<Vec<_>>();

    let records = results(&events);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].total_bytes, 15);
    assert_eq!(records[0].bytes_of(RootKind::Program), 10);
    assert_eq!(records[0].bytes_of(RootKind::AppDataLocal), 5);
    assert_eq!(events.iter().filter(|event| event.is_done()).count(), 1);
    assert_eq!(
        summary_of(&events),
        ScanSummary {
            emitted: 1,
            aborted: false,
            failed: false
        }
    );
    assert_eq!(handle.state(), ScanState::Done);
    assert_eq!(scanner.state(), ScanState::Done);

    let _ = fs::remove_dir_all(base);
}

#[test]
fn empty_machine_still_reports_done() {
    let scanner = orchestrator(
        empty_roots_config(),
        static_source(Vec::new()),
        Arc::new(FixedMeasure(0)),
    );
    let events = scanner
        .start_scan()
        .expect("scan should start")
        .events()
        .collect::<Vec<_>>();
    assert!(results(&events).is_empty());
    assert_eq!(events.iter().filter(|event| event.is_done()).count(), 1);
    assert_eq!(summary_of(&events).emitted, 0);
    assert!(matches!(
        events.first(),
        Some(ScanEvent::Progress(ScanProgress {
            phase: ScanPhase::Enumerating,
            ..
        }))
    ));
}

#[test]
fn attributing_progress_strictly_increases_with_parallel_workers() {
    let descriptors = (0..24)
        .map(|index| descriptor(&format!("Product{index:02}"), None))
        .map(|item| ApplicationDescriptor {
            estimated_bytes: 1024,
            ..item
        })
        .collect::<Vec<_>>();
    let mut config = empty_roots_config();
    config.worker_threads = Some(4);
    let scanner = orchestrator(config, static_source(descriptors), Arc::new(FixedMeasure(0)));

    let events = scanner
        .start_scan()
        .expect("scan should start")
        .events()
        .collect::<Vec<_>>();
    let currents = events
        .iter()
        .filter_map(|event| match event {
            ScanEvent::Progress(progress) if progress.phase == ScanPhase::Attributing => {
                Some(progress.current)
            }
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(currents, (0..=24).collect::<Vec<u32>>());
    assert_eq!(results(&events).len(), 24);
    assert!(events.last().is_some_and(ScanEvent::is_done));

    let last_result = events
        .iter()
        .rposition(|event| matches!(event, ScanEvent::Result(_)))
        .expect("results emitted");
    assert!(last_result < events.len() - 1);
}

#[test]
fn failing_source_ends_in_error_with_a_failed_done() {
    let scanner = orchestrator(
        empty_roots_config(),
        Arc::new(FailingSource),
        Arc::new(FixedMeasure(0)),
    );
    let handle = scanner.start_scan().expect("scan should start");
    let events = handle.events().collect::<Vec<_>>();

    assert!(events.iter().any(|event| matches!(
        event,
        ScanEvent::Progress(ScanProgress {
            phase: ScanPhase::Error,
            ..
        })
    )));
    assert_eq!(
        summary_of(&events),
        ScanSummary {
            emitted: 0,
            aborted: false,
            failed: true
        }
    );
    assert_eq!(handle.state(), ScanState::Error);

    // An errored run does not block the next one.
    assert!(scanner.start_scan().is_ok());
}

#[test]
fn second_scan_is_rejected_while_one_is_running() {
    let (source, release) = GatedSource::new(vec![descriptor("Acme", None)]);
    let scanner = orchestrator(empty_roots_config(), Arc::new(source), Arc::new(FixedMeasure(0)));

    let handle = scanner.start_scan().expect("first scan should start");
    assert!(scanner.state().is_running());
    let rejected = scanner.start_scan().expect_err("second scan must be rejected");
    assert!(rejected.is("scan_already_running"));

    release.send(()).expect("release source");
    let events = handle.events().collect::<Vec<_>>();
    assert_eq!(summary_of(&events).emitted, 1);

    release.send(()).expect("release source again");
    let again = scanner.start_scan().expect("scan after completion should start");
    assert_eq!(summary_of(&again.events().collect::<Vec<_>>()).emitted, 1);
}

#[test]
fn aborted_scan_skips_remaining_results() {
    let descriptors = (0..5)
        .map(|index| ApplicationDescriptor {
            estimated_bytes: 10,
            ..descriptor(&format!("Product{index}"), None)
        })
        .collect::<Vec<_>>();
    let (source, release) = GatedSource::new(descriptors);
    let scanner = orchestrator(empty_roots_config(), Arc::new(source), Arc::new(FixedMeasure(0)));

    let handle = scanner.start_scan().expect("scan should start");
    handle.abort();
    release.send(()).expect("release source");
    let events = handle.events().collect::<Vec<_>>();

    assert!(results(&events).is_empty());
    assert_eq!(
        summary_of(&events),
        ScanSummary {
            emitted: 0,
            aborted: true,
            failed: false
        }
    );
    assert_eq!(handle.state(), ScanState::Done);
}

#[test]
fn dropping_the_handle_lets_the_run_finish() {
    let (source, release) = GatedSource::new(vec![descriptor("Acme", None)]);
    let scanner = orchestrator(empty_roots_config(), Arc::new(source), Arc::new(FixedMeasure(0)));

    drop(scanner.start_scan().expect("scan should start"));
    release.send(()).expect("release source");

    let deadline = Instant::now() + Duration::from_secs(10);
    while scanner.state().is_running() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(scanner.state(), ScanState::Done);
}

#[test]
fn new_scan_clears_measured_folder_sizes() {
    let context = Arc::new(crate::app_manager::test_support::engine_context(
        empty_roots_config(),
        Arc::new(FixedMeasure(0)),
    ));
    context
        .folder_sizes
        .get_or_measure(RootKind::AppDataLocal, "Old", || 3);
    let scanner = ScanOrchestrator::new(context.clone());

    let events = scanner
        .start_scan()
        .expect("scan should start")
        .events()
        .collect::<Vec<_>>();
    assert!(events.last().is_some_and(ScanEvent::is_done));
    assert!(context.folder_sizes.is_empty());
}
