use riskmon::collector::{ProcessSample, Snapshot, SnapshotProvider, SystemSample};
use riskmon::detector::RecommendationTier;
use riskmon::{Monitor, MonitorError};
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn sample(pid: u32, ticks: u64) -> ProcessSample {
    ProcessSample {
        pid,
        name: format!("proc-{}", pid),
        cumulative_cpu_ticks: ticks,
        memory_resident_kb: 10 * 1024,
        thread_count: 1,
        priority: 20,
        state: 'R',
    }
}

fn snapshot(busy: u64, idle: u64, processes: &[(u32, u64)]) -> Snapshot {
    Snapshot {
        system: SystemSample::new(busy, idle),
        processes: processes.iter().map(|&(pid, ticks)| sample(pid, ticks)).collect(),
    }
}

fn pids(report: &riskmon::CycleReport) -> Vec<u32> {
    report.processes.iter().map(|p| p.pid()).collect()
}

#[test]
fn test_two_cycle_end_to_end() {
    let mut monitor = Monitor::new(500);

    let first = monitor.run_cycle(snapshot(1000, 1000, &[(10, 500), (20, 300)])).unwrap();
    assert_eq!(first.cycle, 1);
    assert!(first.system_cpu_percent.is_none());
    for process in &first.processes {
        assert_eq!(process.cpu_percent(), 0.0);
        assert!(process.utilization.pending);
    }

    let second = monitor.run_cycle(snapshot(1100, 1100, &[(10, 700), (20, 320)])).unwrap();
    assert_eq!(second.cycle, 2);
    assert_eq!(pids(&second), vec![10, 20]);
    assert!((second.processes[0].cpu_percent() - 100.0).abs() < 1e-9);
    assert!((second.processes[1].cpu_percent() - 10.0).abs() < 1e-9);
    assert!((second.system_cpu_percent.unwrap() - 50.0).abs() < 1e-9);
}

#[test]
fn test_ties_break_by_ascending_pid() {
    let mut monitor = Monitor::new(500);
    monitor.run_cycle(snapshot(0, 0, &[(30, 0), (5, 0), (17, 0), (2, 0)])).unwrap();
    let report = monitor
        .run_cycle(snapshot(50, 50, &[(30, 10), (5, 10), (17, 20), (2, 0)]))
        .unwrap();
    assert_eq!(pids(&report), vec![17, 5, 30, 2]);

    // Identical input, identical order
    let mut again = Monitor::new(500);
    again.run_cycle(snapshot(0, 0, &[(2, 0), (17, 0), (5, 0), (30, 0)])).unwrap();
    let repeat = again
        .run_cycle(snapshot(50, 50, &[(2, 0), (17, 20), (5, 10), (30, 10)]))
        .unwrap();
    assert_eq!(pids(&repeat), pids(&report));
}

#[test]
fn test_first_cycle_is_sorted_by_pid() {
    let mut monitor = Monitor::new(500);
    let report = monitor.run_cycle(snapshot(0, 0, &[(9, 1), (3, 1), (6, 1)])).unwrap();
    assert_eq!(pids(&report), vec![3, 6, 9]);
}

#[test]
fn test_empty_snapshot_is_unavailable() {
    let mut monitor = Monitor::new(500);
    let err = monitor.run_cycle(snapshot(10, 10, &[])).unwrap_err();
    assert!(matches!(err, MonitorError::SnapshotUnavailable(_)));
    assert_eq!(monitor.cycles_completed(), 0);
    assert_eq!(monitor.diagnostics().snapshot_failures, 1);
    // Baseline untouched: the next real cycle is still a first cycle
    let report = monitor.run_cycle(snapshot(10, 10, &[(1, 1)])).unwrap();
    assert!(report.system_cpu_percent.is_none());
}

#[test]
fn test_exited_processes_are_forgotten() {
    let mut monitor = Monitor::new(500);
    monitor.run_cycle(snapshot(0, 0, &[(1, 100), (2, 100)])).unwrap();
    monitor.run_cycle(snapshot(50, 50, &[(1, 150)])).unwrap();
    assert!(!monitor.state().store().contains(2));
    assert_eq!(monitor.diagnostics().exited_evictions, 1);

    // Pid 2 coming back is a new process
    let report = monitor.run_cycle(snapshot(100, 100, &[(1, 200), (2, 5)])).unwrap();
    let two = report.processes.iter().find(|p| p.pid() == 2).unwrap();
    assert!(two.utilization.pending);
}

#[test]
fn test_pid_reuse_reports_no_data() {
    let mut monitor = Monitor::new(500);
    monitor.run_cycle(snapshot(0, 0, &[(4, 9000)])).unwrap();
    let report = monitor.run_cycle(snapshot(100, 100, &[(4, 3)])).unwrap();
    assert!(report.processes[0].utilization.pending);
    assert_eq!(report.processes[0].cpu_percent(), 0.0);
    assert_eq!(monitor.diagnostics().counter_regressions, 1);
}

#[test]
fn test_stable_set_larger_than_capacity_keeps_full_store_reporting() {
    let capacity = 50;
    let mut monitor = Monitor::new(capacity);
    for round in 1..=6u64 {
        let processes: Vec<(u32, u64)> = (1..=60u32).map(|pid| (pid, round * pid as u64)).collect();
        let report = monitor.run_cycle(snapshot(round * 10_000, round * 10_000, &processes)).unwrap();
        assert_eq!(report.processes.len(), 60);
        assert!(monitor.state().store().len() <= capacity);
        if round >= 2 {
            let reporting = report.processes.iter().filter(|p| !p.utilization.pending).count();
            assert!(reporting >= capacity, "round {}: only {} processes reporting", round, reporting);
        }
    }
    let diagnostics = monitor.diagnostics();
    assert_eq!(diagnostics.capacity_evictions, 0);
    assert_eq!(diagnostics.untracked, 6 * 10);
}

#[test]
fn test_values_stay_bounded_over_many_cycles() {
    let mut monitor = Monitor::new(64);
    let mut busy = 0u64;
    let mut idle = 0u64;
    for round in 0..200u64 {
        busy += (round * 7) % 13;
        idle += (round * 3) % 5;
        let processes: Vec<(u32, u64)> = (0..100u32)
            .map(|i| (i + (round as u32 % 3) * 100, (round * (i as u64 + 1) * 31) % 997))
            .collect();
        let report = monitor.run_cycle(snapshot(busy, idle, &processes)).unwrap();
        assert!(monitor.state().store().len() <= 64);
        for process in &report.processes {
            let cpu = process.cpu_percent();
            let risk = process.assessment.risk_score;
            assert!((0.0..=100.0).contains(&cpu), "cpu {} out of range", cpu);
            assert!((0.0..=100.0).contains(&risk), "risk {} out of range", risk);
        }
        for pair in report.processes.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(a.cpu_percent() > b.cpu_percent() || (a.cpu_percent() == b.cpu_percent() && a.pid() < b.pid()));
        }
    }
}

#[test]
fn test_samples_and_assessments_are_aligned() {
    let mut monitor = Monitor::new(500);
    monitor.run_cycle(snapshot(0, 0, &[(1, 0), (2, 0), (3, 0)])).unwrap();
    let report = monitor.run_cycle(snapshot(100, 0, &[(1, 10), (2, 90), (3, 40)])).unwrap();
    let samples: Vec<u32> = report.samples().map(|s| s.pid).collect();
    let assessed: Vec<u32> = report.assessments().map(|a| a.pid).collect();
    assert_eq!(samples, assessed);
    assert_eq!(samples.len(), 3);
    assert_eq!(report.processes[0].assessment.tier, RecommendationTier::Medium);
}

struct SequenceProvider {
    step: AtomicU64,
}

impl SnapshotProvider for SequenceProvider {
    fn snapshot(&self) -> io::Result<Snapshot> {
        let step = self.step.fetch_add(1, Ordering::SeqCst);
        Ok(snapshot(step * 100, step * 100, &[(1, step * 50)]))
    }
}

struct FailingProvider;

impl SnapshotProvider for FailingProvider {
    fn snapshot(&self) -> io::Result<Snapshot> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "no access"))
    }
}

struct SlowProvider;

impl SnapshotProvider for SlowProvider {
    fn snapshot(&self) -> io::Result<Snapshot> {
        std::thread::sleep(Duration::from_millis(500));
        Ok(snapshot(0, 0, &[(1, 0)]))
    }
}

#[tokio::test]
async fn test_poll_runs_cycles() {
    let provider = Arc::new(SequenceProvider { step: AtomicU64::new(1) });
    let mut monitor = Monitor::new(500);
    monitor.poll(provider.clone(), Duration::from_secs(5)).await.unwrap();
    let report = monitor.poll(provider, Duration::from_secs(5)).await.unwrap();
    assert_eq!(report.cycle, 2);
    // 50 process ticks over 200 system ticks
    assert!((report.processes[0].cpu_percent() - 25.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_poll_provider_error_is_unavailable() {
    let mut monitor = Monitor::new(500);
    let err = monitor
        .poll(Arc::new(FailingProvider), Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, MonitorError::SnapshotUnavailable(_)));
    assert_eq!(monitor.diagnostics().snapshot_failures, 1);
}

#[tokio::test]
async fn test_poll_timeout_is_unavailable() {
    let mut monitor = Monitor::new(500);
    let provider: Arc<dyn SnapshotProvider> = Arc::new(SlowProvider);
    let err = monitor
        .poll(provider, Duration::from_millis(20))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("timed out"));
    assert_eq!(monitor.cycles_completed(), 0);
}
