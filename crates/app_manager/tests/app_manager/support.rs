use super::*;
use std::sync::atomic::AtomicUsize;
use std::time::{SystemTime, UNIX_EPOCH};

pub(crate) fn unique_temp_dir(prefix: &str) -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|value| value.as_nanos())
        .unwrap_or(0);
    let dir = std::env::temp_dir().join(format!("{prefix}-{}-{now}", std::process::id()));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

pub(crate) fn write_bytes(path: &Path, len: usize) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, vec![b'x'; len]).expect("write test file");
}

pub(crate) fn descriptor(name: &str, install_path: Option<&Path>) -> ApplicationDescriptor {
    ApplicationDescriptor {
        name: name.to_string(),
        install_path: install_path.map(Path::to_path_buf),
        ..ApplicationDescriptor::default()
    }
}

pub(crate) fn empty_roots_config() -> EngineConfig {
    EngineConfig {
        roots: crate::config::RootPaths::empty(),
        ..EngineConfig::default()
    }
}

/// Delegates to the real walker and counts how often it is asked.
#[derive(Default)]
pub(crate) struct CountingMeasure {
    pub(crate) calls: AtomicUsize,
    pub(crate) inner: FsSizeMeasure,
}

impl CountingMeasure {
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SizeMeasure for CountingMeasure {
    fn measure(&self, path: &Path) -> u64 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.measure(path)
    }
}

/// Program source that always fails to enumerate.
pub(crate) struct FailingSource;

impl InstalledProgramSource for FailingSource {
    fn list(&self) -> AppResult<Vec<ApplicationDescriptor>> {
        Err(AppError::new("program_source_failed", "读取已安装程序失败"))
    }
}

pub(crate) fn engine_context(config: EngineConfig, measure: Arc<dyn SizeMeasure>) -> EngineContext {
    EngineContext {
        config,
        source: Arc::new(StaticProgramSource::default()),
        measure,
        folder_sizes: FolderSizeCache::default(),
    }
}

/// Reports a fixed size for every path without touching the disk.
pub(crate) struct FixedMeasure(pub(crate) u64);

impl SizeMeasure for FixedMeasure {
    fn measure(&self, _path: &Path) -> u64 {
        self.0
    }
}

pub(crate) fn orchestrator(
    config: EngineConfig,
    source: Arc<dyn InstalledProgramSource>,
    measure: Arc<dyn SizeMeasure>,
) -> ScanOrchestrator {
    ScanOrchestrator::new(Arc::new(EngineContext {
        source,
        ..engine_context(config, measure)
    }))
}

/// Holds `list()` until the test releases the gate.
pub(crate) struct GatedSource {
    gate: Mutex<mpsc::Receiver<()>>,
    descriptors: Vec<ApplicationDescriptor>,
}

impl GatedSource {
    pub(crate) fn new(descriptors: Vec<ApplicationDescriptor>) -> (Self, mpsc::Sender<()>) {
        let (release, gate) = mpsc::channel();
        (
            Self {
                gate: Mutex::new(gate),
                descriptors,
            },
            release,
        )
    }
}

impl InstalledProgramSource for GatedSource {
    fn list(&self) -> AppResult<Vec<ApplicationDescriptor>> {
        let _ = lock_or_recover(&self.gate).recv();
        Ok(self.descriptors.clone())
    }
}

pub(crate) fn summary_of(events: &[ScanEvent]) -> ScanSummary {
    match events.last() {
        Some(ScanEvent::Done(summary)) => *summary,
        other => panic!("last event should be Done, got {other:?}"),
    }
}
