//! System-wide resource gauges

use std::sync::Mutex;

use serde::Serialize;
use sysinfo::{Disks, Networks, System};

/// Point-in-time system resource usage
#[derive(Debug, Clone, Default, Serialize)]
pub struct SystemSnapshot {
    /// Global CPU utilization, 0.0-100.0
    pub cpu_percent: f32,

    /// Memory in use, bytes
    pub memory_used: u64,

    /// Total memory, bytes
    pub memory_total: u64,

    /// Disk space in use across all mounts, bytes
    pub disk_used: u64,

    /// Total disk space across all mounts, bytes
    pub disk_total: u64,

    /// Bytes received on all interfaces since boot
    pub network_rx: u64,

    /// Bytes transmitted on all interfaces since boot
    pub network_tx: u64,
}

/// Samples system resources on demand.
///
/// CPU utilization needs two refreshes to produce a meaningful value, so
/// the `System` handle is kept alive between snapshots; the first
/// snapshot after startup reads near zero.
pub struct SystemMonitor {
    system: Mutex<System>,
}

impl SystemMonitor {
    /// Create a monitor with an initial CPU baseline
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        system.refresh_memory();
        Self {
            system: Mutex::new(system),
        }
    }

    /// Take a fresh snapshot of CPU, memory, disk, and network usage
    pub fn snapshot(&self) -> SystemSnapshot {
        let (cpu_percent, memory_used, memory_total) = {
            let mut system = self.system.lock().expect("system lock");
            system.refresh_cpu_usage();
            system.refresh_memory();
            (
                system.global_cpu_usage(),
                system.used_memory(),
                system.total_memory(),
            )
        };

        let disks = Disks::new_with_refreshed_list();
        let (disk_used, disk_total) = disks.iter().fold((0, 0), |(used, total), disk| {
            (
                used + disk.total_space().saturating_sub(disk.available_space()),
                total + disk.total_space(),
            )
        });

        let networks = Networks::new_with_refreshed_list();
        let (network_rx, network_tx) = networks.iter().fold((0, 0), |(rx, tx), (_, data)| {
            (rx + data.total_received(), tx + data.total_transmitted())
        });

        SystemSnapshot {
            cpu_percent,
            memory_used,
            memory_total,
            disk_used,
            disk_total,
            network_rx,
            network_tx,
        }
    }
}

impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reports_memory() {
        let monitor = SystemMonitor::new();
        let snap = monitor.snapshot();
        assert!(snap.memory_total > 0);
        assert!(snap.memory_used <= snap.memory_total);
    }

    #[test]
    fn snapshot_disk_usage_is_consistent() {
        let monitor = SystemMonitor::new();
        let snap = monitor.snapshot();
        assert!(snap.disk_used <= snap.disk_total);
    }
}
