//! Host health snapshot.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use sysinfo::{Disks, MINIMUM_CPU_UPDATE_INTERVAL, System};

use crate::text::format_duration;

const GIB: u64 = 1024 * 1024 * 1024;

/// CPU, memory, root disk and uptime of the host.
#[derive(Debug, Clone, PartialEq)]
pub struct HostSnapshot {
    pub cpu_percent: f32,
    pub memory_used: u64,
    pub memory_total: u64,
    pub disk_used: u64,
    pub disk_total: u64,
    pub uptime: Duration,
}

impl HostSnapshot {
    pub fn memory_percent(&self) -> f64 {
        percent(self.memory_used, self.memory_total)
    }

    pub fn disk_percent(&self) -> f64 {
        percent(self.disk_used, self.disk_total)
    }

    pub fn cpu_line(&self) -> String {
        format!("CPU: {:.1}%", self.cpu_percent)
    }

    pub fn memory_line(&self) -> String {
        format!(
            "RAM: {:.1}% ({}/{} GB)",
            self.memory_percent(),
            self.memory_used / GIB,
            self.memory_total / GIB
        )
    }

    pub fn disk_line(&self) -> String {
        format!(
            "Disk: {:.1}% ({}/{} GB)",
            self.disk_percent(),
            self.disk_used / GIB,
            self.disk_total / GIB
        )
    }

    pub fn uptime_line(&self) -> String {
        format!("Uptime: {}", format_duration(self.uptime))
    }
}

impl fmt::Display for HostSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n{}\n{}\n{}",
            self.cpu_line(),
            self.memory_line(),
            self.disk_line(),
            self.uptime_line()
        )
    }
}

#[allow(clippy::cast_precision_loss)]
fn percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        used as f64 * 100.0 / total as f64
    }
}

/// Time since the host booted.
pub fn system_uptime() -> Duration {
    Duration::from_secs(System::uptime())
}

/// Sample the host. Takes about [`MINIMUM_CPU_UPDATE_INTERVAL`] for the CPU reading.
pub async fn collect_host_snapshot() -> HostSnapshot {
    let mut system = System::new();
    system.refresh_cpu_usage();
    tokio::time::sleep(MINIMUM_CPU_UPDATE_INTERVAL).await;
    system.refresh_cpu_usage();
    system.refresh_memory();

    let disks = Disks::new_with_refreshed_list();
    let root = disks
        .list()
        .iter()
        .find(|disk| disk.mount_point() == Path::new("/"))
        .or_else(|| disks.list().first());
    let (disk_used, disk_total) = root.map_or((0, 0), |disk| {
        (
            disk.total_space().saturating_sub(disk.available_space()),
            disk.total_space(),
        )
    });

    HostSnapshot {
        cpu_percent: system.global_cpu_usage(),
        memory_used: system.used_memory(),
        memory_total: system.total_memory(),
        disk_used,
        disk_total,
        uptime: system_uptime(),
    }
}
