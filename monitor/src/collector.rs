//! Snapshot sources (reads /proc on Linux)

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "linux")]
pub use linux::{parse_cpu_line, parse_meminfo, parse_pid_stat, LinuxSnapshotProvider};

/// Raw per-process counters captured in one poll.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSample {
    pub pid: u32,
    pub name: String,
    /// utime + stime over the process lifetime, in clock ticks.
    pub cumulative_cpu_ticks: u64,
    pub memory_resident_kb: u64,
    pub thread_count: u32,
    pub priority: i32,
    pub state: char,
}

impl ProcessSample {
    pub fn memory_mb(&self) -> f64 {
        self.memory_resident_kb as f64 / 1024.0
    }
}

/// Aggregate system counters captured in one poll.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SystemSample {
    pub cumulative_busy_ticks: u64,
    pub cumulative_idle_ticks: u64,
    pub memory_total_kb: Option<u64>,
    pub memory_available_kb: Option<u64>,
}

impl SystemSample {
    pub fn new(cumulative_busy_ticks: u64, cumulative_idle_ticks: u64) -> Self {
        Self {
            cumulative_busy_ticks,
            cumulative_idle_ticks,
            memory_total_kb: None,
            memory_available_kb: None,
        }
    }

    /// Percentage of physical memory in use, if the provider reported it.
    pub fn memory_percent(&self) -> Option<f64> {
        let total = self.memory_total_kb.filter(|t| *t > 0)?;
        let available = self.memory_available_kb?.min(total);
        Some(100.0 * (1.0 - available as f64 / total as f64))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub system: SystemSample,
    pub processes: Vec<ProcessSample>,
}

pub trait SnapshotProvider: Send + Sync {
    /// Capture a fresh snapshot. Implementations must not return cached data.
    fn snapshot(&self) -> std::io::Result<Snapshot>;
}
