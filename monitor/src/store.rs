//! Bounded per-pid counter history

use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

pub const DEFAULT_CAPACITY: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackedProcessState {
    pub pid: u32,
    pub last_cumulative_cpu_ticks: u64,
    /// Update sequence number; lower means less recently updated.
    pub last_update: u64,
    /// Cycle in which the entry was last updated.
    pub last_cycle: u64,
}

/// What happened to a pid when its counters were recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Seen before with a non-decreasing counter.
    Delta(u64),
    /// First observation; `evicted` is the pid dropped to make room, if any.
    Inserted { evicted: Option<u32> },
    /// Counter went backwards (pid reuse or reset); baseline replaced.
    Regressed,
    /// Store full of entries already updated this cycle; not tracked.
    Untracked,
}

impl RecordOutcome {
    pub fn delta(self) -> Option<u64> {
        match self {
            RecordOutcome::Delta(d) => Some(d),
            _ => None,
        }
    }
}

/// Maps pid to its last-seen cumulative CPU ticks, holding at most
/// `capacity` entries. Past capacity, the least recently updated entry is
/// evicted before the new one goes in, unless that entry was already updated
/// in the current cycle; then the newcomer stays untracked.
#[derive(Debug)]
pub struct CounterStore {
    capacity: usize,
    entries: HashMap<u32, TrackedProcessState>,
    // (last_update, pid), oldest first
    recency: BTreeSet<(u64, u32)>,
    sequence: u64,
    cycle: u64,
}

impl CounterStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            recency: BTreeSet::new(),
            sequence: 0,
            cycle: 0,
        }
    }

    /// Start a new poll cycle. Entries updated before this call become
    /// eligible for eviction.
    pub fn begin_cycle(&mut self) -> u64 {
        self.cycle += 1;
        self.cycle
    }

    pub fn current_cycle(&self) -> u64 {
        self.cycle
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, pid: u32) -> bool {
        self.entries.contains_key(&pid)
    }

    pub fn get(&self, pid: u32) -> Option<&TrackedProcessState> {
        self.entries.get(&pid)
    }

    pub fn last_ticks(&self, pid: u32) -> Option<u64> {
        self.entries.get(&pid).map(|e| e.last_cumulative_cpu_ticks)
    }

    /// Store the new counter for `pid` and return the tick delta since the
    /// previous observation, or None when there is nothing valid to diff.
    pub fn record_and_diff(&mut self, pid: u32, cumulative_cpu_ticks: u64) -> Option<u64> {
        self.record(pid, cumulative_cpu_ticks).delta()
    }

    pub fn record(&mut self, pid: u32, cumulative_cpu_ticks: u64) -> RecordOutcome {
        self.sequence += 1;
        let seq = self.sequence;

        if let Some(entry) = self.entries.get_mut(&pid) {
            self.recency.remove(&(entry.last_update, pid));
            self.recency.insert((seq, pid));
            entry.last_update = seq;
            entry.last_cycle = self.cycle;

            let last = entry.last_cumulative_cpu_ticks;
            entry.last_cumulative_cpu_ticks = cumulative_cpu_ticks;
            return if cumulative_cpu_ticks >= last {
                RecordOutcome::Delta(cumulative_cpu_ticks - last)
            } else {
                debug!(pid, last, now = cumulative_cpu_ticks, "counter regression, resetting baseline");
                RecordOutcome::Regressed
            };
        }

        let evicted = if self.entries.len() >= self.capacity {
            match self.evict_oldest() {
                Some(pid) => Some(pid),
                None => return RecordOutcome::Untracked,
            }
        } else {
            None
        };

        self.entries.insert(
            pid,
            TrackedProcessState {
                pid,
                last_cumulative_cpu_ticks: cumulative_cpu_ticks,
                last_update: seq,
                last_cycle: self.cycle,
            },
        );
        self.recency.insert((seq, pid));
        RecordOutcome::Inserted { evicted }
    }

    /// Evict the least recently updated entry, provided it was not touched
    /// in the current cycle.
    fn evict_oldest(&mut self) -> Option<u32> {
        let &(seq, pid) = self.recency.first()?;
        if self.entries.get(&pid).map_or(false, |e| e.last_cycle == self.cycle) {
            return None;
        }
        self.recency.remove(&(seq, pid));
        self.entries.remove(&pid);
        debug!(pid, capacity = self.capacity, "counter store full, evicted oldest entry");
        Some(pid)
    }

    /// Drop every pid not present in `active`. Returns how many were removed.
    pub fn retain_only(&mut self, active: &HashSet<u32>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|pid, _| active.contains(pid));
        self.recency.retain(|(_, pid)| active.contains(pid));
        before - self.entries.len()
    }

    pub fn remove(&mut self, pid: u32) -> Option<TrackedProcessState> {
        let entry = self.entries.remove(&pid)?;
        self.recency.remove(&(entry.last_update, pid));
        Some(entry)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
    }
}

impl Default for CounterStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
