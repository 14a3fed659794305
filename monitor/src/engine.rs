//! Delta engine: cumulative tick counters to utilization percentages

use crate::baseline::{SystemBaselineTracker, SystemDelta};
use crate::store::{CounterStore, RecordOutcome};
use std::collections::HashSet;

/// Utilization of one process over the last poll interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UtilizationResult {
    pub pid: u32,
    /// In [0, 100]. Zero while `pending`.
    pub cpu_percent: f64,
    /// No valid delta exists yet for this process.
    pub pending: bool,
}

impl UtilizationResult {
    pub fn pending(pid: u32) -> Self {
        Self {
            pid,
            cpu_percent: 0.0,
            pending: true,
        }
    }
}

/// Process share of system ticks over the same interval.
///
/// Both deltas must be present and the system delta non-zero; otherwise the
/// result is pending with a zero percentage.
pub fn utilization_for(
    pid: u32,
    process_ticks_delta: Option<u64>,
    system_total_ticks_delta: Option<u64>,
) -> UtilizationResult {
    match (process_ticks_delta, system_total_ticks_delta) {
        (Some(process), Some(system)) if system > 0 => UtilizationResult {
            pid,
            cpu_percent: (100.0 * process as f64 / system as f64).clamp(0.0, 100.0),
            pending: false,
        },
        _ => UtilizationResult::pending(pid),
    }
}

/// Counters for conditions that are recovered locally and never surfaced as
/// errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub cycles: u64,
    pub snapshot_failures: u64,
    pub counter_regressions: u64,
    pub capacity_evictions: u64,
    pub exited_evictions: u64,
    /// Observations left untracked because the store was full of pids
    /// already seen in the same cycle.
    pub untracked: u64,
}

/// All state carried between polls.
#[derive(Debug)]
pub struct MonitorState {
    store: CounterStore,
    baseline: SystemBaselineTracker,
    system_delta: Option<SystemDelta>,
    diagnostics: Diagnostics,
}

impl MonitorState {
    pub fn new(capacity: usize) -> Self {
        Self {
            store: CounterStore::new(capacity),
            baseline: SystemBaselineTracker::new(),
            system_delta: None,
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn store(&self) -> &CounterStore {
        &self.store
    }

    pub fn baseline(&self) -> &SystemBaselineTracker {
        &self.baseline
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.diagnostics
    }

    pub(crate) fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    /// Delta of the most recent system update, if it produced one.
    pub fn system_delta(&self) -> Option<SystemDelta> {
        self.system_delta
    }

    pub fn update_system(&mut self, busy_ticks: u64, idle_ticks: u64) -> Option<SystemDelta> {
        self.system_delta = self.baseline.update(busy_ticks, idle_ticks);
        self.system_delta
    }

    /// Mark the start of a poll cycle for eviction purposes.
    pub fn begin_cycle(&mut self) -> u64 {
        self.store.begin_cycle()
    }

    /// Forget pids that are gone from the latest process list.
    pub fn reconcile(&mut self, active: &HashSet<u32>) {
        let removed = self.store.retain_only(active);
        self.diagnostics.exited_evictions += removed as u64;
    }

    /// Record one process's counters and compute its utilization against the
    /// current system delta. Call `begin_cycle` and `update_system` first in
    /// each cycle.
    pub fn observe(&mut self, pid: u32, cumulative_cpu_ticks: u64) -> UtilizationResult {
        let outcome = self.store.record(pid, cumulative_cpu_ticks);
        match outcome {
            RecordOutcome::Regressed => self.diagnostics.counter_regressions += 1,
            RecordOutcome::Inserted { evicted: Some(_) } => self.diagnostics.capacity_evictions += 1,
            RecordOutcome::Untracked => self.diagnostics.untracked += 1,
            _ => {}
        }
        utilization_for(pid, outcome.delta(), self.system_delta.map(|d| d.total))
    }
}

impl Default for MonitorState {
    fn default() -> Self {
        Self::new(crate::store::DEFAULT_CAPACITY)
    }
}
