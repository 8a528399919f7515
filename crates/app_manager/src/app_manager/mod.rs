use crate::config::EngineConfig;
use crate::naming::{
    match_key_boundaries, normalize_display_name, normalize_match_key, split_match_words,
    strip_version_suffix,
};
use anyhow::Context;
use appscope_logging::sanitize_path;
use protocol::models::{
    AppBreakdownEntry, AppRecord, AuditDuplicateInstallLocation, AuditOverview,
    AuditRootSummary, AuditUnassignedFolder, RootKind, ScanEvent, ScanPhase, ScanProgress,
    ScanSummary,
};
use protocol::{AppError, AppResult, ResultExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, mpsc};
use std::time::{Duration, Instant};

mod api;
mod attribution;
mod audit;
mod folder_size;
mod identity;
mod matching;
mod registry;
mod roots;
mod scan;
mod size;
mod source;

pub use api::*;
use attribution::*;
use audit::*;
pub use folder_size::FolderSizeCache;
use folder_size::*;
use identity::*;
pub use matching::{AppTokens, FolderMatch, match_folder, matches_folder};
use matching::*;
use roots::*;
pub use scan::{ScanAbort, ScanHandle, ScanOrchestrator, ScanState};
pub use size::{FsSizeMeasure, SizeMeasure};
pub use source::*;

const MAX_BREAKDOWN_PATHS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum EngineErrorCode {
    ScanAlreadyRunning,
    ScanThreadSpawnFailed,
    #[cfg_attr(not(target_os = "windows"), allow(dead_code))]
    ProgramSourceFailed,
    ProgramManifestReadFailed,
    ProgramManifestParseFailed,
    AuditFolderInvalid,
    AuditFolderNotFound,
    RootListingFailed,
    RootListingTimeout,
}

impl EngineErrorCode {
    pub(super) fn as_str(self) -> &'static str {
        match self {
            Self::ScanAlreadyRunning => "scan_already_running",
            Self::ScanThreadSpawnFailed => "scan_thread_spawn_failed",
            Self::ProgramSourceFailed => "program_source_failed",
            Self::ProgramManifestReadFailed => "program_manifest_read_failed",
            Self::ProgramManifestParseFailed => "program_manifest_parse_failed",
            Self::AuditFolderInvalid => "audit_folder_invalid",
            Self::AuditFolderNotFound => "audit_folder_not_found",
            Self::RootListingFailed => "root_listing_failed",
            Self::RootListingTimeout => "root_listing_timeout",
        }
    }
}

fn app_error(code: EngineErrorCode, message: impl Into<String>) -> AppError {
    AppError::new(code.as_str(), message.into())
}

/// Everything a scan, an audit and the on-demand sizer share.
pub(crate) struct EngineContext {
    pub(crate) config: EngineConfig,
    pub(crate) source: Arc<dyn InstalledProgramSource>,
    pub(crate) measure: Arc<dyn SizeMeasure>,
    pub(crate) folder_sizes: FolderSizeCache,
}

pub(super) fn kind_label(kind: RootKind) -> &'static str {
    match kind {
        RootKind::Program => "程序本体 (安装目录)",
        RootKind::AppDataLocal => "应用数据 (AppData/Local)",
        RootKind::AppDataRoaming => "应用数据 (AppData/Roaming)",
        RootKind::AppDataLocalLow => "应用数据 (AppData/LocalLow)",
        RootKind::ProgramData => "共享数据 (ProgramData)",
    }
}

pub(super) const PROGRAM_ESTIMATE_LABEL: &str = "程序本体 (注册表估算)";

pub(super) fn trim_trailing_separators(path: &str) -> &str {
    let trimmed = path.trim();
    let stripped = trimmed.trim_end_matches(['/', '\\']);
    if stripped.is_empty() || stripped.ends_with(':') {
        // Keep filesystem roots such as `/` or `C:\` intact.
        return &trimmed[..(stripped.len() + 1).min(trimmed.len())];
    }
    stripped
}

/// Comparison key for paths: trailing separators stripped, and
/// case/separator-folded on Windows.
pub(super) fn normalize_path_key(path: &str) -> String {
    let trimmed = trim_trailing_separators(path);
    #[cfg(target_os = "windows")]
    {
        trimmed.replace('/', "\\").to_lowercase()
    }
    #[cfg(not(target_os = "windows"))]
    {
        trimmed.to_string()
    }
}

/// True when `path_key` equals `ancestor_key` or lies beneath it.
pub(super) fn path_key_within(path_key: &str, ancestor_key: &str) -> bool {
    if ancestor_key.is_empty() {
        return false;
    }
    match path_key.strip_prefix(ancestor_key) {
        Some("") => true,
        Some(rest) => {
            rest.starts_with(['/', '\\']) || ancestor_key.ends_with(['/', '\\'])
        }
        None => false,
    }
}

pub(super) fn stable_hash(input: &str) -> String {
    let digest = blake3::hash(input.as_bytes());
    digest.to_hex().chars().take(16).collect()
}

fn lock_or_recover<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
#[path = "../../tests/app_manager/support.rs"]
mod test_support;

#[cfg(test)]
#[path = "../../tests/app_manager/paths_tests.rs"]
mod paths_tests;
