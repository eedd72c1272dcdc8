//! Host metric collection using sysinfo, shaped into the wire payloads.

use std::cmp::Ordering;

use sysinfo::{Disks, ProcessesToUpdate, System};

use crate::wire::{
    CpuUsageData, DiskUsageData, GeneralData, MemoryUsageData, ProcessInfo, ProcessUsageData,
};

const TOP_PROCESSES: usize = 10;

/// Persistent sysinfo handles; refreshes are targeted so a tick touches only
/// what the payload needs.
pub struct Collector {
    sys: System,
    disks: Disks,
}

impl Collector {
    pub fn new() -> Self {
        let mut sys = System::new_all();
        sys.refresh_all();
        let disks = Disks::new_with_refreshed_list();
        Self { sys, disks }
    }

    /// Static hardware info, sent once after the handshake.
    pub fn general(&mut self) -> GeneralData {
        let cpus = self.sys.cpus();
        GeneralData {
            model_name: cpus
                .first()
                .map(|c| c.brand().to_string())
                .unwrap_or_default(),
            cores: cpus.len() as i32,
            mhz: cpus.first().map(|c| c.frequency() as f64).unwrap_or(0.0),
        }
    }

    pub fn cpu(&mut self) -> CpuUsageData {
        self.sys.refresh_cpu_usage();
        CpuUsageData {
            usage: self.sys.global_cpu_usage() as f64,
            cores_usage: self
                .sys
                .cpus()
                .iter()
                .map(|c| c.cpu_usage() as f64)
                .collect(),
        }
    }

    pub fn memory(&mut self) -> MemoryUsageData {
        self.sys.refresh_memory();
        let total = self.sys.total_memory();
        let used = self.sys.used_memory();
        MemoryUsageData {
            total,
            used,
            used_percent: percent(used, total),
        }
    }

    /// Usage of the root volume; falls back to the largest mount when no "/"
    /// exists (e.g. Windows).
    pub fn disk(&mut self) -> DiskUsageData {
        self.disks.refresh(true);
        let root = self
            .disks
            .iter()
            .find(|d| d.mount_point().as_os_str() == "/")
            .or_else(|| self.disks.iter().max_by_key(|d| d.total_space()));
        match root {
            Some(disk) => {
                let total = disk.total_space();
                let free = disk.available_space();
                let used = total.saturating_sub(free);
                DiskUsageData {
                    total,
                    used,
                    free,
                    used_percent: percent(used, total),
                }
            }
            None => DiskUsageData {
                total: 0,
                used: 0,
                free: 0,
                used_percent: 0.0,
            },
        }
    }

    /// Top processes by CPU. Selection is done unsorted first so a large
    /// process table never pays a full sort.
    pub fn processes(&mut self) -> ProcessUsageData {
        self.sys.refresh_processes(ProcessesToUpdate::All, true);
        let total_memory = self.sys.total_memory();
        let mut infos: Vec<ProcessInfo> = self
            .sys
            .processes()
            .values()
            .map(|p| {
                let memory = p.memory();
                ProcessInfo {
                    pid: p.pid().as_u32() as i32,
                    name: p.name().to_string_lossy().into_owned(),
                    cpu_percent: p.cpu_usage() as f64,
                    memory_mb: memory as f64 / 1024.0 / 1024.0,
                    memory_percent: percent(memory, total_memory) as f32,
                }
            })
            .collect();

        if infos.len() > TOP_PROCESSES {
            infos.select_nth_unstable_by(TOP_PROCESSES, |a, b| {
                b.cpu_percent
                    .partial_cmp(&a.cpu_percent)
                    .unwrap_or(Ordering::Equal)
            });
            infos.truncate(TOP_PROCESSES);
        }
        infos.sort_by(|a, b| {
            b.cpu_percent
                .partial_cmp(&a.cpu_percent)
                .unwrap_or(Ordering::Equal)
        });

        ProcessUsageData { processes: infos }
    }
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}

fn percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        used as f64 / total as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_handles_zero_total() {
        assert_eq!(percent(10, 0), 0.0);
        assert_eq!(percent(50, 200), 25.0);
    }

    #[test]
    fn processes_are_capped_and_sorted() {
        let mut collector = Collector::new();
        let procs = collector.processes().processes;
        assert!(procs.len() <= TOP_PROCESSES);
        for pair in procs.windows(2) {
            assert!(pair[0].cpu_percent >= pair[1].cpu_percent);
        }
    }

    #[test]
    fn general_reports_core_count() {
        let mut collector = Collector::new();
        let general = collector.general();
        assert!(general.cores > 0);
    }
}
