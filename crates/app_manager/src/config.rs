use protocol::models::RootKind;
use protocol::{AppResult, ResultExt};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_PATH_ENV: &str = "APPSCOPE_CONFIG";
const ENV_ROOT_PROGRAM: &str = "APPSCOPE_ROOT_PROGRAM";
const ENV_ROOT_APPDATA_LOCAL: &str = "APPSCOPE_ROOT_APPDATA_LOCAL";
const ENV_ROOT_APPDATA_ROAMING: &str = "APPSCOPE_ROOT_APPDATA_ROAMING";
const ENV_ROOT_APPDATA_LOCALLOW: &str = "APPSCOPE_ROOT_APPDATA_LOCALLOW";
const ENV_ROOT_PROGRAMDATA: &str = "APPSCOPE_ROOT_PROGRAMDATA";
const ENV_PROGRAM_MANIFEST: &str = "APPSCOPE_PROGRAM_MANIFEST";
const ENV_WORKER_THREADS: &str = "APPSCOPE_WORKER_THREADS";

const DEFAULT_ROOT_LISTING_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_DIR_READ_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_WALK_BUDGET_MS: u64 = 120_000;
const DEFAULT_UNASSIGNED_SAMPLE_LIMIT: usize = 200;
const DEFAULT_UNASSIGNED_PER_ROOT_LIMIT: usize = 80;
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Filesystem locations of the five directory roots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RootPaths {
    pub program: Vec<PathBuf>,
    pub app_data_local: Option<PathBuf>,
    pub app_data_roaming: Option<PathBuf>,
    pub app_data_local_low: Option<PathBuf>,
    pub program_data: Option<PathBuf>,
}

impl Default for RootPaths {
    fn default() -> Self {
        platform_default_roots()
    }
}

impl RootPaths {
    pub fn empty() -> Self {
        Self {
            program: Vec::new(),
            app_data_local: None,
            app_data_roaming: None,
            app_data_local_low: None,
            program_data: None,
        }
    }

    /// Configured locations for `kind`, in precedence order.
    pub fn paths_for(&self, kind: RootKind) -> Vec<&Path> {
        match kind {
            RootKind::Program => self.program.iter().map(PathBuf::as_path).collect(),
            RootKind::AppDataLocal => self.app_data_local.as_deref().into_iter().collect(),
            RootKind::AppDataRoaming => self.app_data_roaming.as_deref().into_iter().collect(),
            RootKind::AppDataLocalLow => self.app_data_local_low.as_deref().into_iter().collect(),
            RootKind::ProgramData => self.program_data.as_deref().into_iter().collect(),
        }
    }

    fn slot_mut(&mut self, kind: RootKind) -> Option<&mut Option<PathBuf>> {
        match kind {
            RootKind::Program => None,
            RootKind::AppDataLocal => Some(&mut self.app_data_local),
            RootKind::AppDataRoaming => Some(&mut self.app_data_roaming),
            RootKind::AppDataLocalLow => Some(&mut self.app_data_local_low),
            RootKind::ProgramData => Some(&mut self.program_data),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub roots: RootPaths,
    pub program_manifest: Option<PathBuf>,
    pub worker_threads: Option<usize>,
    pub root_listing_timeout_ms: u64,
    pub dir_read_timeout_ms: u64,
    /// `null` disables the budget.
    pub walk_budget_ms: Option<u64>,
    pub unassigned_sample_limit: usize,
    pub unassigned_per_root_limit: usize,
    pub event_channel_capacity: usize,
    pub follow_directory_symlinks: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            roots: RootPaths::default(),
            program_manifest: None,
            worker_threads: None,
            root_listing_timeout_ms: DEFAULT_ROOT_LISTING_TIMEOUT_MS,
            dir_read_timeout_ms: DEFAULT_DIR_READ_TIMEOUT_MS,
            walk_budget_ms: Some(DEFAULT_WALK_BUDGET_MS),
            unassigned_sample_limit: DEFAULT_UNASSIGNED_SAMPLE_LIMIT,
            unassigned_per_root_limit: DEFAULT_UNASSIGNED_PER_ROOT_LIMIT,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            follow_directory_symlinks: true,
        }
    }
}

impl EngineConfig {
    /// Defaults, then the config file (`path` or `APPSCOPE_CONFIG`), then
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let env_path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var_os(key));
        Ok(config)
    }

    pub fn from_file(path: &Path) -> AppResult<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))
            .with_code("config_read_failed", "读取配置文件失败")
            .with_ctx("configPath", path.display().to_string())?;
        serde_json::from_str::<Self>(&content)
            .with_context(|| format!("解析配置文件失败: {}", path.display()))
            .with_code("config_parse_failed", "配置文件格式错误")
            .with_ctx("configPath", path.display().to_string())
    }

    pub(crate) fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<OsString>,
    {
        if let Some(value) = lookup(ENV_ROOT_PROGRAM).filter(|value| !value.is_empty()) {
            self.roots.program = std::env::split_paths(&value)
                .filter(|path| !path.as_os_str().is_empty())
                .collect();
        }

        for (key, kind) in [
            (ENV_ROOT_APPDATA_LOCAL, RootKind::AppDataLocal),
            (ENV_ROOT_APPDATA_ROAMING, RootKind::AppDataRoaming),
            (ENV_ROOT_APPDATA_LOCALLOW, RootKind::AppDataLocalLow),
            (ENV_ROOT_PROGRAMDATA, RootKind::ProgramData),
        ] {
            let Some(value) = lookup(key).filter(|value| !value.is_empty()) else {
                continue;
            };
            if let Some(slot) = self.roots.slot_mut(kind) {
                *slot = Some(PathBuf::from(value));
            }
        }

        if let Some(value) = lookup(ENV_PROGRAM_MANIFEST).filter(|value| !value.is_empty()) {
            self.program_manifest = Some(PathBuf::from(value));
        }

        if let Some(threads) = lookup(ENV_WORKER_THREADS)
            .and_then(|value| value.to_str().and_then(|raw| raw.trim().parse::<usize>().ok()))
            .filter(|threads| *threads > 0)
        {
            self.worker_threads = Some(threads);
        }
    }

    pub fn root_listing_timeout(&self) -> Duration {
        Duration::from_millis(self.root_listing_timeout_ms.max(1))
    }

    pub fn dir_read_timeout(&self) -> Duration {
        Duration::from_millis(self.dir_read_timeout_ms.max(1))
    }

    pub fn walk_budget(&self) -> Option<Duration> {
        self.walk_budget_ms.map(Duration::from_millis)
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(4, usize::from))
            .max(1)
    }

    pub(crate) fn event_channel_capacity(&self) -> usize {
        self.event_channel_capacity.max(1)
    }
}

pub(crate) fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("USERPROFILE").map(PathBuf::from))
}

#[cfg(target_os = "windows")]
fn platform_default_roots() -> RootPaths {
    let env_path = |key: &str| std::env::var_os(key).map(PathBuf::from);
    let mut program = Vec::new();
    for key in ["ProgramFiles", "ProgramFiles(x86)"] {
        if let Some(path) = env_path(key)
            && !program.contains(&path)
        {
            program.push(path);
        }
    }

    RootPaths {
        program,
        app_data_local: env_path("LOCALAPPDATA"),
        app_data_roaming: env_path("APPDATA"),
        app_data_local_low: env_path("USERPROFILE")
            .map(|profile| profile.join("AppData").join("LocalLow")),
        program_data: env_path("PROGRAMDATA"),
    }
}

#[cfg(target_os = "macos")]
fn platform_default_roots() -> RootPaths {
    let home = home_dir();
    let library = |relative: &str| home.as_ref().map(|home| home.join("Library").join(relative));
    RootPaths {
        program: vec![PathBuf::from("/Applications")],
        app_data_local: library("Application Support"),
        app_data_roaming: library("Preferences"),
        app_data_local_low: library("Caches"),
        program_data: Some(PathBuf::from("/Library/Application Support")),
    }
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn platform_default_roots() -> RootPaths {
    let home = home_dir();
    let xdg = |key: &str, fallback: &str| {
        std::env::var_os(key)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .or_else(|| home.as_ref().map(|home| home.join(fallback)))
    };
    RootPaths {
        program: vec![PathBuf::from("/opt")],
        app_data_local: xdg("XDG_DATA_HOME", ".local/share"),
        app_data_roaming: xdg("XDG_CONFIG_HOME", ".config"),
        app_data_local_low: xdg("XDG_CACHE_HOME", ".cache"),
        program_data: Some(PathBuf::from("/var/lib")),
    }
}

#[cfg(test)]
#[path = "../tests/app_manager/config_tests.rs"]
mod config_tests;
