use super::*;

const BUNDLE_SCAN_MAX_DEPTH: usize = 3;
const BUNDLE_SCAN_MAX_ITEMS: usize = 500;

/// Raw installed-program record as reported by a program source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDescriptor {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_icon: Option<String>,
    /// Size hint declared by the installer, 0 when unknown.
    #[serde(default)]
    pub estimated_bytes: u64,
    #[serde(default)]
    pub source_key: String,
}

pub trait InstalledProgramSource: Send + Sync {
    /// One enumeration pass. `Err` means the source could not be read at
    /// all; unreadable individual records are skipped instead.
    fn list(&self) -> AppResult<Vec<ApplicationDescriptor>>;
}

#[derive(Debug, Clone, Default)]
pub struct StaticProgramSource {
    descriptors: Vec<ApplicationDescriptor>,
}

impl StaticProgramSource {
    pub fn new(descriptors: Vec<ApplicationDescriptor>) -> Self {
        Self { descriptors }
    }
}

impl InstalledProgramSource for StaticProgramSource {
    fn list(&self) -> AppResult<Vec<ApplicationDescriptor>> {
        Ok(self.descriptors.clone())
    }
}

/// Descriptors read from a JSON array on disk.
#[derive(Debug, Clone)]
pub struct ManifestProgramSource {
    path: PathBuf,
}

impl ManifestProgramSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl InstalledProgramSource for ManifestProgramSource {
    fn list(&self) -> AppResult<Vec<ApplicationDescriptor>> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("读取程序清单失败: {}", self.path.display()))
            .with_code(
                EngineErrorCode::ProgramManifestReadFailed.as_str(),
                "读取程序清单失败",
            )
            .with_ctx("manifestPath", self.path.display().to_string())?;
        let records = serde_json::from_str::<Vec<serde_json::Value>>(&content)
            .with_context(|| format!("解析程序清单失败: {}", self.path.display()))
            .with_code(
                EngineErrorCode::ProgramManifestParseFailed.as_str(),
                "程序清单格式错误",
            )
            .with_ctx("manifestPath", self.path.display().to_string())?;

        let mut descriptors = Vec::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            match serde_json::from_value::<ApplicationDescriptor>(record) {
                Ok(mut descriptor) => {
                    if descriptor.source_key.trim().is_empty() {
                        descriptor.source_key = format!("manifest:{index}");
                    }
                    descriptors.push(descriptor);
                }
                Err(error) => {
                    tracing::debug!(
                        event = "program_manifest_record_skipped",
                        index,
                        error = %error
                    );
                }
            }
        }
        Ok(descriptors)
    }
}

/// `.app` bundles below the given roots, as found on macOS.
#[derive(Debug, Clone)]
pub struct BundleProgramSource {
    roots: Vec<PathBuf>,
}

impl BundleProgramSource {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }
}

impl InstalledProgramSource for BundleProgramSource {
    fn list(&self) -> AppResult<Vec<ApplicationDescriptor>> {
        let mut items = Vec::new();
        let mut queue = VecDeque::new();
        let mut seen = HashSet::new();
        for root in &self.roots {
            queue.push_back((root.clone(), 0usize));
        }

        while let Some((dir, depth)) = queue.pop_front() {
            if items.len() >= BUNDLE_SCAN_MAX_ITEMS {
                break;
            }
            let Ok(entries) = fs::read_dir(&dir) else {
                continue;
            };
            let mut paths = entries
                .flatten()
                .filter(|entry| entry.file_type().is_ok_and(|kind| kind.is_dir()))
                .map(|entry| entry.path())
                .collect::<Vec<_>>();
            paths.sort();

            for path in paths {
                if items.len() >= BUNDLE_SCAN_MAX_ITEMS {
                    break;
                }
                let is_bundle = path
                    .extension()
                    .and_then(|value| value.to_str())
                    .is_some_and(|value| value.eq_ignore_ascii_case("app"));
                if is_bundle {
                    if seen.insert(normalize_path_key(&path.to_string_lossy())) {
                        items.push(bundle_descriptor(&path));
                    }
                    continue;
                }

                let hidden = path
                    .file_name()
                    .and_then(|value| value.to_str())
                    .is_some_and(|value| value.starts_with('.'));
                if !hidden && depth < BUNDLE_SCAN_MAX_DEPTH {
                    queue.push_back((path, depth + 1));
                }
            }
        }

        Ok(items)
    }
}

fn bundle_descriptor(bundle: &Path) -> ApplicationDescriptor {
    let plist = fs::read_to_string(bundle.join("Contents").join("Info.plist")).unwrap_or_default();
    let values = plist_strings(&plist);
    let stem = bundle
        .file_stem()
        .and_then(|value| value.to_str())
        .and_then(normalize_display_name)
        .unwrap_or_default();
    let name = values
        .get("CFBundleDisplayName")
        .or_else(|| values.get("CFBundleName"))
        .and_then(|value| normalize_display_name(value))
        .unwrap_or(stem);
    let bundle_id = values.get("CFBundleIdentifier").cloned();
    let publisher = bundle_id
        .as_deref()
        .and_then(|value| value.split('.').nth(1))
        .filter(|value| !value.is_empty())
        .map(ToString::to_string);

    ApplicationDescriptor {
        name,
        publisher,
        install_path: Some(bundle.to_path_buf()),
        display_icon: None,
        estimated_bytes: 0,
        source_key: format!(
            "bundle:{}",
            bundle_id.unwrap_or_else(|| bundle.to_string_lossy().to_string())
        ),
    }
}

fn plist_string_pattern() -> Option<&'static regex::Regex> {
    static PATTERN: OnceLock<Option<regex::Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            regex::Regex::new(r"<key>([^<]+)</key>\s*<string>([^<]*)</string>").ok()
        })
        .as_ref()
}

/// `<key>`/`<string>` pairs of an `Info.plist`; the first non-blank value of
/// a key wins.
pub(super) fn plist_strings(content: &str) -> HashMap<String, String> {
    let mut values = HashMap::new();
    let Some(pattern) = plist_string_pattern() else {
        return values;
    };
    for captures in pattern.captures_iter(content) {
        let (Some(key), Some(value)) = (captures.get(1), captures.get(2)) else {
            continue;
        };
        let value = value.as_str().trim();
        if value.is_empty() {
            continue;
        }
        values
            .entry(key.as_str().trim().to_string())
            .or_insert_with(|| value.to_string());
    }
    values
}

/// Uninstall entries from the three Windows registry hives.
#[cfg(target_os = "windows")]
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistryProgramSource;

#[cfg(target_os = "windows")]
impl InstalledProgramSource for RegistryProgramSource {
    fn list(&self) -> AppResult<Vec<ApplicationDescriptor>> {
        registry::list_uninstall_descriptors()
    }
}

/// Manifest when configured, otherwise the platform's own registry.
pub fn default_program_source(config: &EngineConfig) -> Arc<dyn InstalledProgramSource> {
    if let Some(path) = config.program_manifest.as_ref() {
        return Arc::new(ManifestProgramSource::new(path.clone()));
    }

    #[cfg(target_os = "windows")]
    {
        Arc::new(RegistryProgramSource)
    }
    #[cfg(target_os = "macos")]
    {
        let mut roots = config.roots.program.clone();
        if let Some(home) = crate::config::home_dir() {
            roots.push(home.join("Applications"));
        }
        Arc::new(BundleProgramSource::new(roots))
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        Arc::new(StaticProgramSource::default())
    }
}

#[cfg(test)]
#[path = "../../tests/app_manager/source_tests.rs"]
mod source_tests;
