use crate::commands::{run_blocking_command, run_command_sync};
use appscope_app_manager::{AppScopeEngine, EngineConfig, ScanHandle, ScanState};
use protocol::InvokeError;
use protocol::models::{AuditOverview, DiskInfoDto, RootKind, ScanEvent};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Async boundary over the engine. Filesystem work runs on the blocking
/// pool and every failure crosses as an [`InvokeError`].
#[derive(Clone)]
pub struct AppScopeService {
    engine: Arc<AppScopeEngine>,
}

impl AppScopeService {
    pub fn new(engine: AppScopeEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }

    pub fn from_config(config: EngineConfig) -> Self {
        Self::new(AppScopeEngine::from_config(config))
    }

    pub fn engine(&self) -> &AppScopeEngine {
        &self.engine
    }

    pub fn scan_state(&self) -> ScanState {
        self.engine.scan_state()
    }

    /// Starts a scan and forwards its events. Dropping the receiver aborts
    /// the run. Must be called from within a tokio runtime.
    pub fn start_scan(
        &self,
        request_id: Option<String>,
    ) -> Result<mpsc::Receiver<ScanEvent>, InvokeError> {
        let handle = run_command_sync("start_scan", request_id, || self.engine.start_scan())?;
        let capacity = self.engine.config().event_channel_capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        tokio::task::spawn_blocking(move || forward_scan_events(handle, sender));
        Ok(receiver)
    }

    pub async fn get_audit_overview(
        &self,
        request_id: Option<String>,
    ) -> Result<AuditOverview, InvokeError> {
        let engine = self.engine.clone();
        run_blocking_command(
            "get_audit_overview",
            request_id,
            "audit_overview",
            move || engine.audit_overview(),
        )
        .await
    }

    pub async fn measure_folder_size(
        &self,
        kind: RootKind,
        folder: String,
        request_id: Option<String>,
    ) -> Result<u64, InvokeError> {
        let engine = self.engine.clone();
        run_blocking_command(
            "measure_folder_size",
            request_id,
            "measure_folder_size",
            move || engine.measure_folder_size(kind, &folder),
        )
        .await
    }

    pub async fn list_disks(&self, request_id: Option<String>) -> Result<Vec<DiskInfoDto>, InvokeError> {
        run_blocking_command("list_disks", request_id, "list_disks", appscope_system::list_disks)
            .await
    }
}

fn forward_scan_events(handle: ScanHandle, sender: mpsc::Sender<ScanEvent>) {
    let mut forwarded = 0usize;
    while let Some(event) = handle.recv() {
        let done = event.is_done();
        if sender.blocking_send(event).is_err() {
            tracing::info!(event = "scan_consumer_dropped", forwarded);
            handle.abort();
            // Dropping the handle disconnects the engine channel.
            return;
        }
        forwarded += 1;
        if done {
            break;
        }
    }
    tracing::debug!(event = "scan_events_forwarded", forwarded);
}

#[cfg(test)]
#[path = "../../tests/app/appscope_service_tests.rs"]
mod appscope_service_tests;
