use super::*;

/// Builds the breakdown for one application from a captured root snapshot.
///
/// Data-root folders go through the shared folder-size cache, so a folder
/// claimed by several applications is only walked once per scan.
pub(super) fn attribute_app(
    context: &EngineContext,
    snapshot: &RootSnapshot,
    app: &ResolvedApp,
) -> AppRecord {
    let mut breakdown = Vec::new();
    if let Some(entry) = program_entry(context, app) {
        breakdown.push(entry);
    }

    for kind in RootKind::DATA {
        let mut measured = Vec::new();
        for child in snapshot.children(kind) {
            if match_folder(&app.tokens, &child.name).is_none() {
                continue;
            }
            let bytes = context.folder_sizes.get_or_measure(kind, &child.name, || {
                context.measure.measure(&child.path)
            });
            measured.push((bytes, child.path.to_string_lossy().to_string()));
        }
        if let Some(entry) = data_entry(kind, measured) {
            breakdown.push(entry);
        }
    }

    AppRecord::from_breakdown(
        app.id.clone(),
        app.name.clone(),
        app.publisher.clone(),
        breakdown,
    )
}

fn program_entry(context: &EngineContext, app: &ResolvedApp) -> Option<AppBreakdownEntry> {
    if let Some(install_dir) = app.install_dir.as_deref() {
        let bytes = context.measure.measure(install_dir);
        if bytes > 0 {
            return Some(AppBreakdownEntry {
                kind: RootKind::Program,
                label: kind_label(RootKind::Program).to_string(),
                bytes,
                paths: vec![install_dir.to_string_lossy().to_string()],
            });
        }
    }

    (app.estimated_bytes > 0).then(|| AppBreakdownEntry {
        kind: RootKind::Program,
        label: PROGRAM_ESTIMATE_LABEL.to_string(),
        bytes: app.estimated_bytes,
        paths: Vec::new(),
    })
}

fn data_entry(kind: RootKind, mut measured: Vec<(u64, String)>) -> Option<AppBreakdownEntry> {
    let bytes = measured
        .iter()
        .fold(0u64, |acc, (bytes, _)| acc.saturating_add(*bytes));
    if bytes == 0 {
        return None;
    }
    measured.sort_by(|left, right| right.0.cmp(&left.0).then_with(|| left.1.cmp(&right.1)));
    Some(AppBreakdownEntry {
        kind,
        label: kind_label(kind).to_string(),
        bytes,
        paths: measured
            .into_iter()
            .filter(|(bytes, _)| *bytes > 0)
            .take(MAX_BREAKDOWN_PATHS)
            .map(|(_, path)| path)
            .collect(),
    })
}

#[cfg(test)]
#[path = "../../tests/app_manager/attribution_tests.rs"]
mod attribution_tests;
