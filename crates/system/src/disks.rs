use protocol::AppResult;
use protocol::models::DiskInfoDto;
use sysinfo::Disks;

fn non_empty_name(value: &str, mount_point: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return mount_point.to_string();
    }

    trimmed.to_string()
}

/// Mounted volumes with their capacity, ordered by mount point.
pub fn list_disks() -> AppResult<Vec<DiskInfoDto>> {
    let disks = Disks::new_with_refreshed_list();
    let mut items = disks
        .iter()
        .map(|disk| {
            let mount_point = disk.mount_point().display().to_string();
            DiskInfoDto {
                name: non_empty_name(&disk.name().to_string_lossy(), &mount_point),
                mount_point,
                total_space: disk.total_space(),
                available_space: disk.available_space(),
                is_removable: disk.is_removable(),
            }
        })
        .collect::<Vec<_>>();
    items.sort_by(|left, right| left.mount_point.cmp(&right.mount_point));

    tracing::debug!(event = "disks_listed", count = items.len());
    Ok(items)
}

#[cfg(test)]
#[path = "../tests/system/disks_tests.rs"]
mod disks_tests;
