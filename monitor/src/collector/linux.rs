use super::{ProcessSample, Snapshot, SnapshotProvider, SystemSample};
use std::fs;
use std::io;
use std::path::PathBuf;

pub struct LinuxSnapshotProvider {
    proc_root: PathBuf,
    page_size_kb: u64,
}

impl LinuxSnapshotProvider {
    pub fn new() -> Self {
        Self::with_root("/proc")
    }

    /// Read from an alternate procfs mount, e.g. a fixture tree in tests.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        let page_size_kb = if page_size > 0 { page_size as u64 / 1024 } else { 4 };
        Self {
            proc_root: root.into(),
            page_size_kb: page_size_kb.max(1),
        }
    }

    fn read_system(&self) -> io::Result<SystemSample> {
        let stat = fs::read_to_string(self.proc_root.join("stat"))?;
        let (busy, idle) = stat
            .lines()
            .find_map(parse_cpu_line)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "no aggregate cpu line"))?;

        let mut system = SystemSample::new(busy, idle);
        if let Ok(meminfo) = fs::read_to_string(self.proc_root.join("meminfo")) {
            let (total, available) = parse_meminfo(&meminfo);
            system.memory_total_kb = total;
            system.memory_available_kb = available;
        }
        Ok(system)
    }

    fn parse_process(&self, pid: u32) -> Option<ProcessSample> {
        let proc_dir = self.proc_root.join(pid.to_string());
        let content = fs::read_to_string(proc_dir.join("stat")).ok()?;
        let mut sample = parse_pid_stat(&content, self.page_size_kb)?;
        // /proc/<pid>/stat carries the pid too, but the directory name is authoritative
        sample.pid = pid;
        Some(sample)
    }
}

impl Default for LinuxSnapshotProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotProvider for LinuxSnapshotProvider {
    fn snapshot(&self) -> io::Result<Snapshot> {
        let system = self.read_system()?;
        let mut processes = Vec::new();
        for entry in fs::read_dir(&self.proc_root)?.flatten() {
            if let Some(name) = entry.file_name().to_str() {
                if let Ok(pid) = name.parse::<u32>() {
                    // Processes can exit between readdir and open
                    if let Some(sample) = self.parse_process(pid) {
                        processes.push(sample);
                    }
                }
            }
        }
        Ok(Snapshot { system, processes })
    }
}

/// Parse the aggregate `cpu ` line of /proc/stat into (busy, idle) ticks.
///
/// Idle is idle + iowait; busy is user + nice + system + irq + softirq + steal.
/// Guest time is already folded into user and is not added again.
pub fn parse_cpu_line(line: &str) -> Option<(u64, u64)> {
    let rest = line.strip_prefix("cpu ")?;
    let fields: Vec<u64> = rest
        .split_whitespace()
        .take(8)
        .map(|v| v.parse::<u64>().ok())
        .collect::<Option<_>>()?;
    if fields.len() < 4 {
        return None;
    }
    let field = |i: usize| fields.get(i).copied().unwrap_or(0);
    let idle = field(3).saturating_add(field(4));
    let busy = [0, 1, 2, 5, 6, 7]
        .iter()
        .fold(0u64, |acc, &i| acc.saturating_add(field(i)));
    Some((busy, idle))
}

/// Extract (MemTotal, MemAvailable) in kB, falling back to MemFree for kernels
/// without MemAvailable.
pub fn parse_meminfo(content: &str) -> (Option<u64>, Option<u64>) {
    let mut total = None;
    let mut available = None;
    let mut free = None;
    for line in content.lines() {
        let mut parts = line.split_whitespace();
        let key = parts.next();
        let value = parts.next().and_then(|v| v.parse::<u64>().ok());
        match key {
            Some("MemTotal:") => total = value,
            Some("MemAvailable:") => available = value,
            Some("MemFree:") => free = value,
            _ => {}
        }
    }
    (total, available.or(free))
}

/// Parse one /proc/<pid>/stat line.
///
/// The command name may itself contain spaces or parentheses, so it is taken
/// from between the first `(` and the last `)`.
pub fn parse_pid_stat(content: &str, page_size_kb: u64) -> Option<ProcessSample> {
    let open = content.find('(')?;
    let close = content.rfind(')')?;
    if close <= open {
        return None;
    }
    let pid: u32 = content[..open].trim().parse().ok()?;
    let name = content[open + 1..close].to_string();

    // Fields after the name, starting at field 3 (state)
    let rest: Vec<&str> = content[close + 1..].split_whitespace().collect();
    if rest.len() < 22 {
        return None;
    }
    let state = rest[0].chars().next().unwrap_or('?');
    let utime: u64 = rest[11].parse().ok()?;
    let stime: u64 = rest[12].parse().ok()?;
    let priority: i32 = rest[15].parse().unwrap_or(0);
    let thread_count: u32 = rest[17].parse().unwrap_or(1);
    let rss_pages: u64 = rest[21].parse().unwrap_or(0);

    Some(ProcessSample {
        pid,
        name: if name.is_empty() { "unknown".to_string() } else { name },
        cumulative_cpu_ticks: utime.saturating_add(stime),
        memory_resident_kb: rss_pages.saturating_mul(page_size_kb),
        thread_count,
        priority,
        state,
    })
}
