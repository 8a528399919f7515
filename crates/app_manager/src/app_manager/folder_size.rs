use super::*;
use std::path::Component;

type FolderKey = (RootKind, String);

/// Memoized folder sizes keyed by `(kind, folder)`.
///
/// Concurrent requests for one key share a single cell, so the folder is
/// walked at most once and every caller sees the same value.
#[derive(Debug, Default)]
pub struct FolderSizeCache {
    cells: Mutex<HashMap<FolderKey, Arc<OnceLock<u64>>>>,
}

impl FolderSizeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_measure<F>(&self, kind: RootKind, folder: &str, measure: F) -> u64
    where
        F: FnOnce() -> u64,
    {
        let cell = {
            let mut cells = lock_or_recover(&self.cells);
            cells
                .entry((kind, folder_cache_key(folder)))
                .or_default()
                .clone()
        };
        *cell.get_or_init(measure)
    }

    pub fn cached(&self, kind: RootKind, folder: &str) -> Option<u64> {
        let cells = lock_or_recover(&self.cells);
        cells
            .get(&(kind, folder_cache_key(folder)))
            .and_then(|cell| cell.get().copied())
    }

    pub fn clear(&self) {
        lock_or_recover(&self.cells).clear();
    }

    pub fn len(&self) -> usize {
        lock_or_recover(&self.cells).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn folder_cache_key(folder: &str) -> String {
    let trimmed = folder.trim();
    #[cfg(target_os = "windows")]
    {
        trimmed.to_lowercase()
    }
    #[cfg(not(target_os = "windows"))]
    {
        trimmed.to_string()
    }
}

/// A folder request names exactly one child of a root.
pub(super) fn validate_folder_name(folder: &str) -> AppResult<&str> {
    let trimmed = folder.trim();
    let invalid = || {
        app_error(EngineErrorCode::AuditFolderInvalid, "目录名称无效")
            .with_context("folder", folder)
    };
    if trimmed.is_empty() || trimmed.contains(['/', '\\']) {
        return Err(invalid());
    }
    let mut components = Path::new(trimmed).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(trimmed),
        _ => Err(invalid()),
    }
}

/// First configured root of `kind` that has `folder` as a directory child.
pub(super) fn locate_folder(config: &EngineConfig, kind: RootKind, folder: &str) -> AppResult<PathBuf> {
    let roots = config.roots.paths_for(kind);
    for root in &roots {
        let candidate = root.join(folder);
        if candidate.is_dir() {
            return Ok(candidate);
        }
    }
    Err(
        app_error(EngineErrorCode::AuditFolderNotFound, "目录不存在")
            .with_context("kind", kind.as_str())
            .with_context("folder", folder)
            .with_context("rootCount", roots.len().to_string()),
    )
}

#[cfg(test)]
#[path = "../../tests/app_manager/folder_size_tests.rs"]
mod folder_size_tests;
