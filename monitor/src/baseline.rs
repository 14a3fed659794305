//! Aggregate system CPU baseline

use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemBaselineState {
    pub last_busy_ticks: u64,
    pub last_idle_ticks: u64,
    pub has_baseline: bool,
}

/// Busy and total tick deltas over one poll interval. `total` is never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemDelta {
    pub busy: u64,
    pub total: u64,
}

impl SystemDelta {
    pub fn percent(&self) -> f64 {
        system_percent(self.busy, self.total)
    }
}

#[derive(Debug, Default)]
pub struct SystemBaselineTracker {
    state: SystemBaselineState,
}

impl SystemBaselineTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SystemBaselineState {
        self.state
    }

    /// Feed the latest cumulative counters. Returns the deltas since the
    /// stored baseline, or None on the first call and whenever the total did
    /// not advance.
    pub fn update(&mut self, busy_ticks: u64, idle_ticks: u64) -> Option<SystemDelta> {
        let total = busy_ticks.saturating_add(idle_ticks);
        if !self.state.has_baseline {
            self.store(busy_ticks, idle_ticks);
            return None;
        }

        let last_total = self.state.last_busy_ticks.saturating_add(self.state.last_idle_ticks);
        if total < last_total {
            debug!(last_total, total, "system counters went backwards, resetting baseline");
            self.store(busy_ticks, idle_ticks);
            return None;
        }
        let total_delta = total - last_total;
        if total_delta == 0 {
            return None;
        }

        let busy_delta = busy_ticks.saturating_sub(self.state.last_busy_ticks);
        self.store(busy_ticks, idle_ticks);
        Some(SystemDelta {
            busy: busy_delta,
            total: total_delta,
        })
    }

    fn store(&mut self, busy_ticks: u64, idle_ticks: u64) {
        self.state = SystemBaselineState {
            last_busy_ticks: busy_ticks,
            last_idle_ticks: idle_ticks,
            has_baseline: true,
        };
    }
}

/// `100 * busy / total`, clamped to [0, 100]. Zero when `total` is zero.
pub fn system_percent(busy_delta: u64, total_delta: u64) -> f64 {
    if total_delta == 0 {
        return 0.0;
    }
    (100.0 * busy_delta as f64 / total_delta as f64).clamp(0.0, 100.0)
}
