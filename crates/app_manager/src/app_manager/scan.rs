use super::*;
use rayon::prelude::*;
use std::panic::AssertUnwindSafe;

const MESSAGE_ENUMERATING: &str = "正在枚举已安装程序";
const MESSAGE_ATTRIBUTING: &str = "正在统计应用占用";
const MESSAGE_SOURCE_FAILED: &str = "读取已安装程序失败";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Enumerating,
    Attributing,
    Done,
    Error,
}

impl ScanState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Enumerating => "enumerating",
            Self::Attributing => "attributing",
            Self::Done => "done",
            Self::Error => "error",
        }
    }

    pub fn is_running(self) -> bool {
        matches!(self, Self::Enumerating | Self::Attributing)
    }
}

/// Cooperative stop flag shared by a scan run and its consumer.
#[derive(Debug, Clone, Default)]
pub struct ScanAbort(Arc<AtomicBool>);

impl ScanAbort {
    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Consumer side of one scan run.
///
/// The channel is bounded: keep draining after `abort()` until `Done`
/// arrives, or drop the handle. Dropping it aborts the run.
#[derive(Debug)]
pub struct ScanHandle {
    receiver: mpsc::Receiver<ScanEvent>,
    abort: ScanAbort,
    state: Arc<Mutex<ScanState>>,
}

impl ScanHandle {
    /// Blocks for the next event; `None` once the run has finished.
    pub fn recv(&self) -> Option<ScanEvent> {
        self.receiver.recv().ok()
    }

    pub fn events(&self) -> mpsc::Iter<'_, ScanEvent> {
        self.receiver.iter()
    }

    pub fn abort(&self) {
        self.abort.abort();
    }

    pub fn abort_token(&self) -> ScanAbort {
        self.abort.clone()
    }

    pub fn state(&self) -> ScanState {
        *lock_or_recover(&self.state)
    }

    pub fn into_parts(self) -> (mpsc::Receiver<ScanEvent>, ScanAbort) {
        (self.receiver, self.abort)
    }
}

/// Owns the scan state machine of one engine instance. At most one run is
/// in flight; a new run clears the folder-size cache.
pub struct ScanOrchestrator {
    context: Arc<EngineContext>,
    state: Arc<Mutex<ScanState>>,
}

impl ScanOrchestrator {
    pub(crate) fn new(context: Arc<EngineContext>) -> Self {
        Self {
            context,
            state: Arc::new(Mutex::new(ScanState::Idle)),
        }
    }

    pub fn state(&self) -> ScanState {
        *lock_or_recover(&self.state)
    }

    pub fn start_scan(&self) -> AppResult<ScanHandle> {
        {
            let mut state = lock_or_recover(&self.state);
            if state.is_running() {
                tracing::info!(event = "app_scan_rejected_running", state = state.as_str());
                return Err(app_error(
                    EngineErrorCode::ScanAlreadyRunning,
                    "已有扫描正在进行",
                ));
            }
            *state = ScanState::Enumerating;
        }
        self.context.folder_sizes.clear();

        let (sender, receiver) = mpsc::sync_channel(self.context.config.event_channel_capacity());
        let abort = ScanAbort::default();
        let context = self.context.clone();
        let state = self.state.clone();
        let run_abort = abort.clone();

        let spawn_result = std::thread::Builder::new()
            .name("appscope-scan".to_string())
            .spawn(move || {
                let emitter = ScanEmitter::new(sender, run_abort);
                run_scan(&context, &state, &emitter);
            });

        if let Err(error) = spawn_result {
            *lock_or_recover(&self.state) = ScanState::Error;
            tracing::error!(event = "app_scan_spawn_failed", error = error.to_string());
            return Err(app_error(
                EngineErrorCode::ScanThreadSpawnFailed,
                "启动扫描线程失败",
            )
            .with_source(error));
        }

        Ok(ScanHandle {
            receiver,
            abort,
            state: self.state.clone(),
        })
    }
}

struct EmitterState {
    sender: Option<mpsc::SyncSender<ScanEvent>>,
    current: u32,
    emitted: u32,
}

/// Serializes everything sent to the consumer so progress stays ordered
/// across parallel workers.
struct ScanEmitter {
    inner: Mutex<EmitterState>,
    abort: ScanAbort,
}

impl ScanEmitter {
    fn new(sender: mpsc::SyncSender<ScanEvent>, abort: ScanAbort) -> Self {
        Self {
            inner: Mutex::new(EmitterState {
                sender: Some(sender),
                current: 0,
                emitted: 0,
            }),
            abort,
        }
    }

    fn send(&self, state: &mut EmitterState, event: ScanEvent) -> bool {
        let Some(sender) = state.sender.as_ref() else {
            return false;
        };
        if sender.send(event).is_ok() {
            return true;
        }
        // Receiver dropped.
        state.sender = None;
        self.abort.abort();
        false
    }

    fn progress(&self, phase: ScanPhase, current: u32, total: u32, message: &str) {
        let mut state = lock_or_recover(&self.inner);
        self.send(
            &mut state,
            ScanEvent::Progress(ScanProgress {
                phase,
                current,
                total,
                message: message.to_string(),
            }),
        );
    }

    fn record(&self, record: AppRecord, total: u32) {
        let mut state = lock_or_recover(&self.inner);
        if self.abort.is_aborted() {
            return;
        }
        let name = record.name.clone();
        if !self.send(&mut state, ScanEvent::Result(record)) {
            return;
        }
        state.emitted += 1;
        state.current += 1;
        let current = state.current;
        self.send(
            &mut state,
            ScanEvent::Progress(ScanProgress {
                phase: ScanPhase::Attributing,
                current,
                total,
                message: name,
            }),
        );
    }

    fn emitted(&self) -> u32 {
        lock_or_recover(&self.inner).emitted
    }

    fn finish(&self, failed: bool) -> ScanSummary {
        let mut state = lock_or_recover(&self.inner);
        let summary = ScanSummary {
            emitted: state.emitted,
            aborted: self.abort.is_aborted(),
            failed,
        };
        self.send(&mut state, ScanEvent::Done(summary));
        state.sender = None;
        summary
    }
}

fn run_scan(context: &EngineContext, state: &Mutex<ScanState>, emitter: &ScanEmitter) {
    let started_at = Instant::now();
    tracing::info!(event = "app_scan_started");

    let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| scan_body(context, state, emitter)));
    let failed = match outcome {
        Ok(Ok(())) => false,
        Ok(Err(error)) => {
            tracing::warn!(
                event = "app_scan_source_failed",
                code = %error.code,
                error = %error
            );
            true
        }
        Err(_) => {
            tracing::error!(event = "app_scan_panicked", emitted = emitter.emitted());
            true
        }
    };

    {
        let mut current = lock_or_recover(state);
        *current = if failed { ScanState::Error } else { ScanState::Done };
    }
    let summary = emitter.finish(failed);
    tracing::info!(
        event = "app_scan_finished",
        emitted = summary.emitted,
        aborted = summary.aborted,
        failed = summary.failed,
        elapsed_ms = started_at.elapsed().as_millis() as u64
    );
}

fn scan_body(context: &EngineContext, state: &Mutex<ScanState>, emitter: &ScanEmitter) -> AppResult<()> {
    emitter.progress(ScanPhase::Enumerating, 0, 0, MESSAGE_ENUMERATING);
    let descriptors = match context.source.list() {
        Ok(descriptors) => descriptors,
        Err(error) => {
            emitter.progress(ScanPhase::Error, 0, 0, MESSAGE_SOURCE_FAILED);
            return Err(error);
        }
    };

    let apps = prepare_apps(descriptors);
    let total = u32::try_from(apps.len()).unwrap_or(u32::MAX);
    emitter.progress(ScanPhase::Enumerating, 0, total, MESSAGE_ENUMERATING);

    let snapshot = RootSnapshot::capture(&context.config, &RootKind::DATA);
    *lock_or_recover(state) = ScanState::Attributing;
    emitter.progress(ScanPhase::Attributing, 0, total, MESSAGE_ATTRIBUTING);

    let attribute = |app: &ResolvedApp| {
        if emitter.abort.is_aborted() {
            return;
        }
        let record = attribute_app(context, &snapshot, app);
        emitter.record(record, total);
    };

    let threads = context.config.worker_threads();
    match rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|index| format!("appscope-scan-worker-{index}"))
        .build()
    {
        Ok(pool) => pool.install(|| apps.par_iter().for_each(attribute)),
        Err(error) => {
            tracing::warn!(
                event = "app_scan_pool_unavailable",
                threads,
                error = error.to_string()
            );
            apps.iter().for_each(attribute);
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/app_manager/scan_tests.rs"]
mod scan_tests;
