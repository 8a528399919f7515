use super::*;

const QUALITY_INSTALL_LOCATION: u32 = 1_000;
const QUALITY_DISPLAY_ICON: u32 = 200;
const QUALITY_SIZE_HINT: u32 = 50;
const QUALITY_NAME_MAX_LEN: usize = 64;

/// A deduplicated descriptor with everything attribution needs precomputed.
#[derive(Debug, Clone)]
pub(super) struct ResolvedApp {
    pub(super) id: String,
    pub(super) name: String,
    pub(super) publisher: Option<String>,
    pub(super) install_dir: Option<PathBuf>,
    pub(super) estimated_bytes: u64,
    pub(super) tokens: AppTokens,
    source_key: String,
}

impl ResolvedApp {
    fn from_descriptor(descriptor: &ApplicationDescriptor) -> Option<Self> {
        let name = normalize_display_name(&descriptor.name)?;
        let publisher = descriptor
            .publisher
            .as_deref()
            .and_then(normalize_display_name);
        let install_dir = resolve_install_dir(descriptor);
        let id = stable_app_id(descriptor, install_dir.as_deref());
        let tokens = AppTokens::new(&name, publisher.as_deref());
        Some(Self {
            id,
            name,
            publisher,
            install_dir,
            estimated_bytes: descriptor.estimated_bytes,
            tokens,
            source_key: descriptor.source_key.clone(),
        })
    }

    pub(super) fn install_dir_key(&self) -> Option<String> {
        self.install_dir
            .as_deref()
            .map(|dir| normalize_path_key(&dir.to_string_lossy()))
            .filter(|key| !key.is_empty())
    }
}

/// `app.` plus 16 hex chars of a hash over the source key, or over
/// `name|publisher|installDir` when the source has none.
pub(super) fn stable_app_id(descriptor: &ApplicationDescriptor, install_dir: Option<&Path>) -> String {
    let source_key = descriptor.source_key.trim();
    let identity = if source_key.is_empty() {
        format!(
            "{}|{}|{}",
            descriptor.name.trim(),
            descriptor.publisher.as_deref().unwrap_or_default().trim(),
            install_dir
                .map(|dir| normalize_path_key(&dir.to_string_lossy()))
                .unwrap_or_default()
        )
    } else {
        source_key.to_string()
    };
    format!("app.{}", stable_hash(&identity))
}

/// Declared install location, else the folder named by the display icon.
pub(super) fn resolve_install_dir(descriptor: &ApplicationDescriptor) -> Option<PathBuf> {
    if let Some(path) = descriptor.install_path.as_deref() {
        let raw = path.to_string_lossy();
        let cleaned = raw.trim().trim_matches('"');
        if !cleaned.is_empty() {
            return Some(PathBuf::from(trim_trailing_separators(cleaned)));
        }
    }

    let icon = parse_display_icon(descriptor.display_icon.as_deref()?)?;
    if icon.is_dir() {
        return Some(icon);
    }
    icon.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

/// `"C:\App\app.exe",0` → `C:\App\app.exe`.
pub(super) fn parse_display_icon(value: &str) -> Option<PathBuf> {
    let trimmed = value.trim();
    let unquoted = match trimmed.strip_prefix('"') {
        Some(rest) => rest.split('"').next().unwrap_or(rest),
        None => match trimmed.rsplit_once(',') {
            Some((path, index)) if index.trim().trim_start_matches('-').parse::<i32>().is_ok() => {
                path
            }
            _ => trimmed,
        },
    };
    let cleaned = unquoted.trim();
    if cleaned.is_empty() {
        return None;
    }
    Some(PathBuf::from(cleaned))
}

fn quality_score(descriptor: &ApplicationDescriptor) -> u32 {
    let mut score = 0u32;
    if descriptor
        .install_path
        .as_ref()
        .is_some_and(|path| !path.as_os_str().is_empty())
    {
        score += QUALITY_INSTALL_LOCATION;
    }
    if descriptor
        .display_icon
        .as_deref()
        .is_some_and(|icon| !icon.trim().is_empty())
    {
        score += QUALITY_DISPLAY_ICON;
    }
    if descriptor.estimated_bytes > 0 {
        score += QUALITY_SIZE_HINT;
    }
    score + descriptor.name.chars().count().min(QUALITY_NAME_MAX_LEN) as u32
}

fn dedupe_key(descriptor: &ApplicationDescriptor) -> String {
    let name = normalize_match_key(&strip_version_suffix(&descriptor.name));
    let publisher = normalize_match_key(descriptor.publisher.as_deref().unwrap_or_default());
    let install_dir = resolve_install_dir(descriptor)
        .map(|dir| normalize_path_key(&dir.to_string_lossy()))
        .unwrap_or_default();
    format!("{name}|{publisher}|{install_dir}")
}

fn merge_descriptor(current: &mut ApplicationDescriptor, incoming: ApplicationDescriptor) {
    let incoming_wins = quality_score(&incoming) > quality_score(current);
    let estimated_bytes = current.estimated_bytes.max(incoming.estimated_bytes);
    let install_path = current.install_path.take().or(incoming.install_path.clone());
    let display_icon = current.display_icon.take().or(incoming.display_icon.clone());
    if incoming_wins {
        current.name = incoming.name;
        current.publisher = incoming.publisher;
        current.source_key = incoming.source_key;
    }
    current.estimated_bytes = estimated_bytes;
    current.install_path = install_path;
    current.display_icon = display_icon;
}

/// Drops nameless descriptors, merges duplicates and resolves the rest in a
/// deterministic `(name, sourceKey)` order.
pub(super) fn prepare_apps(descriptors: Vec<ApplicationDescriptor>) -> Vec<ResolvedApp> {
    let mut order: Vec<String> = Vec::new();
    let mut merged: HashMap<String, ApplicationDescriptor> = HashMap::new();
    for descriptor in descriptors {
        if descriptor.name.trim().is_empty() {
            continue;
        }
        let key = dedupe_key(&descriptor);
        match merged.get_mut(&key) {
            Some(current) => merge_descriptor(current, descriptor),
            None => {
                order.push(key.clone());
                merged.insert(key, descriptor);
            }
        }
    }

    let mut apps = order
        .iter()
        .filter_map(|key| merged.get(key))
        .filter_map(ResolvedApp::from_descriptor)
        .collect::<Vec<_>>();
    apps.sort_by(|left, right| {
        left.name
            .cmp(&right.name)
            .then_with(|| left.source_key.cmp(&right.source_key))
    });
    apps
}

#[cfg(test)]
#[path = "../../tests/app_manager/identity_tests.rs"]
mod identity_tests;
