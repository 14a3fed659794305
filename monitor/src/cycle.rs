//! Sampling cycle: snapshot in, ranked assessments out

use crate::collector::{ProcessSample, Snapshot, SnapshotProvider};
use crate::detector::{self, RecommendationTier, RiskAssessment};
use crate::engine::{Diagnostics, MonitorState, UtilizationResult};
use crate::error::{MonitorError, Result};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct RankedProcess {
    pub sample: ProcessSample,
    pub utilization: UtilizationResult,
    pub assessment: RiskAssessment,
}

impl RankedProcess {
    pub fn pid(&self) -> u32 {
        self.sample.pid
    }

    pub fn cpu_percent(&self) -> f64 {
        self.utilization.cpu_percent
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// 1-based count of successful cycles.
    pub cycle: u64,
    pub system_cpu_percent: Option<f64>,
    pub system_memory_percent: Option<f64>,
    /// Descending CPU percent, ties by ascending pid.
    pub processes: Vec<RankedProcess>,
}

impl CycleReport {
    pub fn assessments(&self) -> impl Iterator<Item = &RiskAssessment> {
        self.processes.iter().map(|p| &p.assessment)
    }

    pub fn samples(&self) -> impl Iterator<Item = &ProcessSample> {
        self.processes.iter().map(|p| &p.sample)
    }

    pub fn top(&self, n: usize) -> &[RankedProcess] {
        &self.processes[..n.min(self.processes.len())]
    }

    pub fn count_tier(&self, n: usize, tier: RecommendationTier) -> usize {
        self.top(n).iter().filter(|p| p.assessment.tier == tier).count()
    }

    pub fn has_high_risk(&self) -> bool {
        self.assessments().any(|a| a.tier == RecommendationTier::High)
    }
}

/// Total order for the ranking: CPU percent descending, then pid ascending.
pub fn rank_order(a: &RankedProcess, b: &RankedProcess) -> Ordering {
    b.cpu_percent()
        .total_cmp(&a.cpu_percent())
        .then_with(|| a.pid().cmp(&b.pid()))
}

/// Owns the state carried across polls. One cycle runs to completion before
/// the next begins; `&mut self` keeps every store write serialized.
#[derive(Debug)]
pub struct Monitor {
    state: MonitorState,
    cycle: u64,
    capacity_warned: bool,
}

impl Monitor {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: MonitorState::new(capacity),
            cycle: 0,
            capacity_warned: false,
        }
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.state.diagnostics()
    }

    pub fn cycles_completed(&self) -> u64 {
        self.cycle
    }

    pub fn run_cycle(&mut self, snapshot: Snapshot) -> Result<CycleReport> {
        if snapshot.processes.is_empty() {
            self.state.diagnostics_mut().snapshot_failures += 1;
            return Err(MonitorError::SnapshotUnavailable(
                "snapshot contained no processes".to_string(),
            ));
        }

        let capacity = self.state.store().capacity();
        if snapshot.processes.len() > capacity && !self.capacity_warned {
            self.capacity_warned = true;
            warn!(
                processes = snapshot.processes.len(),
                capacity,
                "more processes than tracking capacity, the excess stays pending"
            );
        }

        let active: HashSet<u32> = snapshot.processes.iter().map(|p| p.pid).collect();
        self.state.begin_cycle();
        self.state.reconcile(&active);

        let system = snapshot.system;
        let system_cpu_percent = self
            .state
            .update_system(system.cumulative_busy_ticks, system.cumulative_idle_ticks)
            .map(|d| d.percent());

        let mut processes: Vec<RankedProcess> = snapshot
            .processes
            .into_iter()
            .map(|sample| {
                let utilization = self.state.observe(sample.pid, sample.cumulative_cpu_ticks);
                let assessment = detector::score(
                    sample.pid,
                    &sample.name,
                    utilization.cpu_percent,
                    sample.memory_mb(),
                    sample.thread_count,
                );
                RankedProcess {
                    sample,
                    utilization,
                    assessment,
                }
            })
            .collect();
        processes.sort_by(rank_order);

        self.cycle += 1;
        self.state.diagnostics_mut().cycles = self.cycle;
        debug!(
            cycle = self.cycle,
            processes = processes.len(),
            tracked = self.state.store().len(),
            "cycle complete"
        );

        Ok(CycleReport {
            cycle: self.cycle,
            system_cpu_percent,
            system_memory_percent: system.memory_percent(),
            processes,
        })
    }

    /// Take a snapshot on the blocking pool and run a cycle over it. A provider
    /// error, panic or timeout abandons the cycle as `SnapshotUnavailable`.
    pub async fn poll<P>(&mut self, provider: Arc<P>, timeout: Duration) -> Result<CycleReport>
    where
        P: SnapshotProvider + ?Sized + 'static,
    {
        let task = tokio::task::spawn_blocking(move || provider.snapshot());
        let reason = match tokio::time::timeout(timeout, task).await {
            Ok(Ok(Ok(snapshot))) => return self.run_cycle(snapshot),
            Ok(Ok(Err(e))) => format!("provider failed: {}", e),
            Ok(Err(e)) => format!("provider task failed: {}", e),
            Err(_) => format!("provider timed out after {:?}", timeout),
        };
        debug!("{}", reason);
        self.state.diagnostics_mut().snapshot_failures += 1;
        Err(MonitorError::SnapshotUnavailable(reason))
    }
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new(crate::store::DEFAULT_CAPACITY)
    }
}
