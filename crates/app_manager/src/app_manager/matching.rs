use super::*;

const MIN_TOKEN_LEN: usize = 3;
const MIN_CONTAINED_WORD_LEN: usize = 4;
const MIN_PUBLISHER_TOKEN_LEN: usize = 4;
const MIN_REVERSE_CONTAINS_LEN: usize = 5;

const NAME_STOP_WORDS: [&str; 16] = [
    "windows",
    "update",
    "installer",
    "setup",
    "runtime",
    "redistributable",
    "driver",
    "tool",
    "tools",
    "plugin",
    "service",
    "sdk",
    "for",
    "and",
    "the",
    "app",
];

const PUBLISHER_STOP_WORDS: [&str; 21] = [
    "microsoft",
    "nvidia",
    "corporation",
    "corp",
    "inc",
    "ltd",
    "llc",
    "co",
    "company",
    "limited",
    "gmbh",
    "sarl",
    "pty",
    "plc",
    "software",
    "systems",
    "system",
    "technologies",
    "technology",
    "solution",
    "solutions",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderMatch {
    Exact,
    Contains,
}

/// Precomputed comparison keys for one application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppTokens {
    name_key: String,
    name_boundaries: Vec<usize>,
    name_words: Vec<String>,
    publisher_tokens: Vec<String>,
}

impl AppTokens {
    pub fn new(name: &str, publisher: Option<&str>) -> Self {
        let base_name = strip_version_suffix(name);
        let name_key = normalize_match_key(&base_name);
        let name_boundaries = match_key_boundaries(&base_name);

        let mut name_words = Vec::new();
        for word in split_match_words(&base_name) {
            if word.len() < MIN_TOKEN_LEN
                || is_numeric(&word)
                || NAME_STOP_WORDS.contains(&word.as_str())
                || name_words.contains(&word)
            {
                continue;
            }
            name_words.push(word);
        }

        let mut publisher_tokens: Vec<String> = Vec::new();
        let publisher_words = split_match_words(publisher.unwrap_or_default())
            .into_iter()
            .filter(|word| {
                word.len() >= MIN_PUBLISHER_TOKEN_LEN
                    && !is_numeric(word)
                    && !PUBLISHER_STOP_WORDS.contains(&word.as_str())
            })
            .collect::<Vec<_>>();
        for word in &publisher_words {
            if !publisher_tokens.contains(word) {
                publisher_tokens.push(word.clone());
            }
        }
        for take in [2usize, 3] {
            if publisher_words.len() >= take {
                let joined = publisher_words[..take].concat();
                if !publisher_tokens.contains(&joined) {
                    publisher_tokens.push(joined);
                }
            }
        }

        Self {
            name_key,
            name_boundaries,
            name_words,
            publisher_tokens,
        }
    }

    pub fn from_descriptor(descriptor: &ApplicationDescriptor) -> Self {
        Self::new(&descriptor.name, descriptor.publisher.as_deref())
    }

    fn has_name_tokens(&self) -> bool {
        self.name_key.len() >= MIN_TOKEN_LEN || !self.name_words.is_empty()
    }

    fn name_tokens(&self) -> impl Iterator<Item = &str> {
        let whole = (self.name_key.len() >= MIN_TOKEN_LEN).then_some(self.name_key.as_str());
        whole
            .into_iter()
            .chain(self.name_words.iter().map(String::as_str))
    }
}

fn is_numeric(value: &str) -> bool {
    value.chars().all(|ch| ch.is_ascii_digit())
}

/// `needle` occurs in `key` starting and ending on word boundaries.
fn contains_on_boundaries(key: &str, boundaries: &[usize], needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    boundaries.iter().any(|&start| {
        key.get(start..)
            .is_some_and(|rest| rest.starts_with(needle))
            && boundaries.contains(&(start + needle.len()))
    })
}

/// Decides whether a data-root child folder belongs to the application.
pub fn match_folder(tokens: &AppTokens, folder_name: &str) -> Option<FolderMatch> {
    let folder_key = normalize_match_key(folder_name);
    if folder_key.len() < MIN_TOKEN_LEN {
        return None;
    }

    if tokens.has_name_tokens() {
        if tokens.name_tokens().any(|token| token == folder_key) {
            return Some(FolderMatch::Exact);
        }
    } else if tokens
        .publisher_tokens
        .iter()
        .any(|token| *token == folder_key)
    {
        return Some(FolderMatch::Exact);
    }

    let folder_boundaries = match_key_boundaries(folder_name);
    let name_key = tokens.name_key.as_str();
    if name_key.len() >= MIN_CONTAINED_WORD_LEN
        && contains_on_boundaries(&folder_key, &folder_boundaries, name_key)
    {
        return Some(FolderMatch::Contains);
    }
    // A single word only claims folders that lead with the product's first word.
    if let Some(lead) = tokens.name_words.first()
        && lead.len() >= MIN_CONTAINED_WORD_LEN
        && folder_key.starts_with(lead.as_str())
        && folder_boundaries.contains(&lead.len())
    {
        return Some(FolderMatch::Contains);
    }
    if folder_key.len() >= MIN_REVERSE_CONTAINS_LEN
        && !NAME_STOP_WORDS.contains(&folder_key.as_str())
        && contains_on_boundaries(name_key, &tokens.name_boundaries, &folder_key)
    {
        return Some(FolderMatch::Contains);
    }
    None
}

pub fn matches_folder(descriptor: &ApplicationDescriptor, folder_name: &str) -> bool {
    match_folder(&AppTokens::from_descriptor(descriptor), folder_name).is_some()
}

/// A `program` root child is claimed when an install directory is the child
/// itself or lies beneath it.
pub(super) fn install_dir_claims(child_path: &Path, install_dir_keys: &[String]) -> bool {
    let child_key = normalize_path_key(&child_path.to_string_lossy());
    install_dir_keys
        .iter()
        .any(|dir_key| path_key_within(dir_key, &child_key))
}

#[cfg(test)]
#[path = "../../tests/app_manager/matching_tests.rs"]
mod matching_tests;
