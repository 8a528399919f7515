use super::*;

/// Disk usage attribution engine: streaming scans, coverage audits and
/// on-demand folder sizing over one configuration.
pub struct AppScopeEngine {
    context: Arc<EngineContext>,
    orchestrator: ScanOrchestrator,
}

impl AppScopeEngine {
    pub fn new(
        config: EngineConfig,
        source: Arc<dyn InstalledProgramSource>,
        measure: Arc<dyn SizeMeasure>,
    ) -> Self {
        let context = Arc::new(EngineContext {
            config,
            source,
            measure,
            folder_sizes: FolderSizeCache::default(),
        });
        Self {
            orchestrator: ScanOrchestrator::new(context.clone()),
            context,
        }
    }

    /// Platform program source and the filesystem walker.
    pub fn from_config(config: EngineConfig) -> Self {
        let source = default_program_source(&config);
        let measure = Arc::new(FsSizeMeasure::from_config(&config));
        Self::new(config, source, measure)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.context.config
    }

    pub fn start_scan(&self) -> AppResult<ScanHandle> {
        self.orchestrator.start_scan()
    }

    pub fn scan_state(&self) -> ScanState {
        self.orchestrator.state()
    }

    pub fn audit_overview(&self) -> AppResult<AuditOverview> {
        build_audit_overview(&self.context)
    }

    /// Size of one root child, measured once per scan session.
    pub fn measure_folder_size(&self, kind: RootKind, folder: &str) -> AppResult<u64> {
        let folder = validate_folder_name(folder)?;
        if let Some(bytes) = self.context.folder_sizes.cached(kind, folder) {
            return Ok(bytes);
        }
        let path = locate_folder(&self.context.config, kind, folder)?;
        let bytes = self
            .context
            .folder_sizes
            .get_or_measure(kind, folder, || self.context.measure.measure(&path));
        tracing::debug!(
            event = "folder_size_measured",
            kind = kind.as_str(),
            path = %sanitize_path(&path),
            bytes
        );
        Ok(bytes)
    }
}

#[cfg(test)]
#[path = "../../tests/app_manager/api_tests.rs"]
mod api_tests;
