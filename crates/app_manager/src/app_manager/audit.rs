use super::*;

/// Recomputes the coverage overview from the program source and the current
/// root listings. Nothing is measured here; unassigned folders are sized on
/// request through the folder-size cache.
pub(super) fn build_audit_overview(context: &EngineContext) -> AppResult<AuditOverview> {
    let started_at = Instant::now();
    let apps = prepare_apps(context.source.list()?);
    let snapshot = RootSnapshot::capture(&context.config, &RootKind::ALL);
    let install_dir_keys = apps
        .iter()
        .filter_map(ResolvedApp::install_dir_key)
        .collect::<Vec<_>>();

    let sample_limit = context.config.unassigned_sample_limit;
    let per_root_limit = context.config.unassigned_per_root_limit;
    let mut roots = Vec::with_capacity(RootKind::ALL.len());
    let mut unassigned_folders = Vec::new();

    for kind in RootKind::ALL {
        let mut assigned = 0u32;
        let mut unassigned = 0u32;
        let mut sampled_here = 0usize;
        for child in snapshot.children(kind) {
            let claimed = if kind.is_data_root() {
                apps.iter()
                    .any(|app| match_folder(&app.tokens, &child.name).is_some())
            } else {
                install_dir_claims(&child.path, &install_dir_keys)
            };
            if claimed {
                assigned += 1;
                continue;
            }
            unassigned += 1;
            if kind.is_data_root()
                && sampled_here < per_root_limit
                && unassigned_folders.len() < sample_limit
            {
                sampled_here += 1;
                unassigned_folders.push(AuditUnassignedFolder {
                    kind,
                    folder: child.name.clone(),
                    path: child.path.to_string_lossy().to_string(),
                });
            }
        }
        roots.push(AuditRootSummary {
            kind,
            assigned_folders: assigned,
            unassigned_folders: unassigned,
        });
    }

    let duplicate_install_locations = duplicate_install_locations(&apps);
    let unknown_program_size_count = apps
        .iter()
        .filter(|app| app.install_dir.is_none() && app.estimated_bytes == 0)
        .count();

    let overview = AuditOverview {
        app_count: u32::try_from(apps.len()).unwrap_or(u32::MAX),
        unknown_program_size_count: u32::try_from(unknown_program_size_count).unwrap_or(u32::MAX),
        roots,
        duplicate_install_locations,
        unassigned_folders,
    };
    tracing::info!(
        event = "audit_overview_built",
        app_count = overview.app_count,
        unknown_program_size_count = overview.unknown_program_size_count,
        duplicate_groups = overview.duplicate_install_locations.len(),
        unassigned_sampled = overview.unassigned_folders.len(),
        elapsed_ms = started_at.elapsed().as_millis() as u64
    );
    Ok(overview)
}

/// Install directories named by two or more differently named applications,
/// in order of first claim.
fn duplicate_install_locations(apps: &[ResolvedApp]) -> Vec<AuditDuplicateInstallLocation> {
    let mut groups: Vec<AuditDuplicateInstallLocation> = Vec::new();
    let mut index_by_key: HashMap<String, usize> = HashMap::new();

    for app in apps {
        let (Some(install_dir), Some(key)) = (app.install_dir.as_deref(), app.install_dir_key())
        else {
            continue;
        };
        let index = *index_by_key.entry(key).or_insert_with(|| {
            groups.push(AuditDuplicateInstallLocation {
                install_dir: trim_trailing_separators(&install_dir.to_string_lossy()).to_string(),
                apps: Vec::new(),
            });
            groups.len() - 1
        });
        let names = &mut groups[index].apps;
        if !names.contains(&app.name) {
            names.push(app.name.clone());
        }
    }

    groups.retain(|group| group.apps.len() >= 2);
    groups
}

#[cfg(test)]
#[path = "../../tests/app_manager/audit_tests.rs"]
mod audit_tests;
