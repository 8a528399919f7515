use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// One of the five directory roots a machine's application data lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RootKind {
    Program,
    AppDataLocal,
    AppDataRoaming,
    AppDataLocalLow,
    ProgramData,
}

impl RootKind {
    pub const ALL: [RootKind; 5] = [
        RootKind::Program,
        RootKind::AppDataLocal,
        RootKind::AppDataRoaming,
        RootKind::AppDataLocalLow,
        RootKind::ProgramData,
    ];

    pub const DATA: [RootKind; 4] = [
        RootKind::AppDataLocal,
        RootKind::AppDataRoaming,
        RootKind::AppDataLocalLow,
        RootKind::ProgramData,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Program => "program",
            Self::AppDataLocal => "appDataLocal",
            Self::AppDataRoaming => "appDataRoaming",
            Self::AppDataLocalLow => "appDataLocalLow",
            Self::ProgramData => "programData",
        }
    }

    pub fn is_data_root(self) -> bool {
        !matches!(self, Self::Program)
    }
}

impl Display for RootKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RootKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| format!("unknown root kind: {trimmed}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppBreakdownEntry {
    pub kind: RootKind,
    pub label: String,
    pub bytes: u64,
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRecord {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    pub total_bytes: u64,
    pub breakdown: Vec<AppBreakdownEntry>,
}

impl AppRecord {
    /// Builds a record whose total is always the sum of its breakdown.
    pub fn from_breakdown(
        id: String,
        name: String,
        publisher: Option<String>,
        breakdown: Vec<AppBreakdownEntry>,
    ) -> Self {
        let total_bytes = breakdown
            .iter()
            .fold(0u64, |acc, entry| acc.saturating_add(entry.bytes));
        Self {
            id,
            name,
            publisher,
            total_bytes,
            breakdown,
        }
    }

    pub fn bytes_of(&self, kind: RootKind) -> u64 {
        self.breakdown
            .iter()
            .filter(|entry| entry.kind == kind)
            .fold(0u64, |acc, entry| acc.saturating_add(entry.bytes))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScanPhase {
    Enumerating,
    Attributing,
    Done,
    Error,
}

impl ScanPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Enumerating => "enumerating",
            Self::Attributing => "attributing",
            Self::Done => "done",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanProgress {
    pub phase: ScanPhase,
    pub current: u32,
    pub total: u32,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    pub emitted: u32,
    pub aborted: bool,
    pub failed: bool,
}

/// Everything a scan run sends to its consumer. `Done` is always the last
/// event of a run and is sent exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ScanEvent {
    Progress(ScanProgress),
    Result(AppRecord),
    Done(ScanSummary),
}

impl ScanEvent {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRootSummary {
    pub kind: RootKind,
    pub assigned_folders: u32,
    pub unassigned_folders: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditDuplicateInstallLocation {
    pub install_dir: String,
    pub apps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditUnassignedFolder {
    pub kind: RootKind,
    pub folder: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditOverview {
    pub app_count: u32,
    pub unknown_program_size_count: u32,
    pub roots: Vec<AuditRootSummary>,
    pub duplicate_install_locations: Vec<AuditDuplicateInstallLocation>,
    pub unassigned_folders: Vec<AuditUnassignedFolder>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskInfoDto {
    pub name: String,
    pub mount_point: String,
    pub total_space: u64,
    pub available_space: u64,
    pub is_removable: bool,
}

#[cfg(test)]
#[path = "../tests/protocol/models_tests.rs"]
mod models_tests;
