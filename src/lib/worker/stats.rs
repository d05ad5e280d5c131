use sysinfo::{Disks, System};

use super::types::SystemUsage;

const MB: u64 = 1024 * 1024;

fn percent(part: f64, whole: f64) -> f32 {
    if whole > 0.0 {
        ((part / whole) * 10_000.0).round() as f32 / 100.0
    } else {
        0.0
    }
}

/// Reads utilisation from an already refreshed `System`. CPU usage is measured
/// against the previous refresh, so the first sample of a fresh `System` reads 0.
pub fn sample(system: &System) -> SystemUsage {
    SystemUsage {
        hostname: System::host_name().unwrap_or_default(),
        os: System::long_os_version().unwrap_or_default(),
        cpus: system.cpus().len(),
        cpu_percent: (system.global_cpu_usage() * 100.0).round() / 100.0,
        memory_total_mb: system.total_memory() / MB,
        memory_used_mb: system.used_memory() / MB,
        swap_total_mb: system.total_swap() / MB,
        swap_used_mb: system.used_swap() / MB,
        disk_percent: disk_percent(&Disks::new_with_refreshed_list()),
    }
}

fn disk_percent(disks: &Disks) -> f32 {
    let (total, available) = disks.iter().fold((0u64, 0u64), |(total, available), disk| {
        (total + disk.total_space(), available + disk.available_space())
    });
    percent(total.saturating_sub(available) as f64, total as f64)
}
