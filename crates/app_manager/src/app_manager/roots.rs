use super::*;
use walkdir::WalkDir;

/// One immediate child folder of a directory root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct RootChild {
    pub(super) name: String,
    pub(super) path: PathBuf,
}

/// Child listings of every configured root, captured once per scan or audit.
#[derive(Debug, Clone, Default)]
pub(super) struct RootSnapshot {
    children: BTreeMap<RootKind, Vec<RootChild>>,
}

impl RootSnapshot {
    pub(super) fn capture(config: &EngineConfig, kinds: &[RootKind]) -> Self {
        let timeout = config.root_listing_timeout();
        let mut children = BTreeMap::new();
        for kind in kinds {
            let mut listed = Vec::new();
            for root in config.roots.paths_for(*kind) {
                match list_root_children(root, timeout) {
                    Ok(items) => listed.extend(items),
                    Err(error) => {
                        tracing::warn!(
                            event = "root_listing_failed",
                            kind = kind.as_str(),
                            root = %sanitize_path(root),
                            code = %error.code,
                            error = %error
                        );
                    }
                }
            }
            children.insert(*kind, listed);
        }
        Self { children }
    }

    pub(super) fn children(&self, kind: RootKind) -> &[RootChild] {
        self.children
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Lists `root` on a helper thread so a stalled mount is abandoned after
/// `timeout` instead of blocking the caller.
pub(super) fn list_root_children(root: &Path, timeout: Duration) -> AppResult<Vec<RootChild>> {
    let owned_root = root.to_path_buf();
    let (sender, receiver) = mpsc::channel();
    std::thread::Builder::new()
        .name("appscope-root-listing".to_string())
        .spawn(move || {
            let _ = sender.send(read_root_children(&owned_root));
        })
        .with_context(|| format!("启动目录枚举线程失败: {}", root.display()))
        .with_code(EngineErrorCode::RootListingFailed.as_str(), "目录枚举失败")?;

    match receiver.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            Err(app_error(EngineErrorCode::RootListingTimeout, "目录枚举超时")
                .with_path("root", root)
                .with_context("timeoutMs", timeout.as_millis().to_string()))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            Err(app_error(EngineErrorCode::RootListingFailed, "目录枚举失败").with_path("root", root))
        }
    }
}

fn read_root_children(root: &Path) -> AppResult<Vec<RootChild>> {
    let mut children = Vec::new();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) if error.depth() == 0 => {
                return Err(error)
                    .with_code(EngineErrorCode::RootListingFailed.as_str(), "目录枚举失败")
                    .with_ctx("root", root.display().to_string());
            }
            Err(error) => {
                tracing::debug!(
                    event = "root_entry_skipped",
                    root = %sanitize_path(root),
                    error = %error
                );
                continue;
            }
        };

        let is_dir = entry.file_type().is_dir()
            || (entry.path_is_symlink()
                && fs::metadata(entry.path()).is_ok_and(|meta| meta.is_dir()));
        if !is_dir {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name.trim().is_empty() {
            continue;
        }
        children.push(RootChild {
            name,
            path: entry.into_path(),
        });
    }
    Ok(children)
}

#[cfg(test)]
#[path = "../../tests/app_manager/roots_tests.rs"]
mod roots_tests;
