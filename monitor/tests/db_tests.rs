use riskmon::collector::{ProcessSample, Snapshot, SystemSample};
use riskmon::db::Database;
use riskmon::journal::CycleLog;
use riskmon::{CycleReport, Monitor};
use tempfile::tempdir;

fn report_with(count: u32) -> CycleReport {
    let processes = |scale: u64| {
        (1..=count)
            .map(|pid| ProcessSample {
                pid,
                name: format!("worker-{}", pid),
                cumulative_cpu_ticks: pid as u64 * scale,
                memory_resident_kb: 4096,
                thread_count: 2,
                priority: 20,
                state: 'S',
            })
            .collect()
    };
    let mut monitor = Monitor::new(500);
    monitor
        .run_cycle(Snapshot { system: SystemSample::new(0, 0), processes: processes(1) })
        .unwrap();
    monitor
        .run_cycle(Snapshot { system: SystemSample::new(500, 500), processes: processes(2) })
        .unwrap()
}

#[test]
fn test_create_database() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("nested/test.db");
    let db = Database::open(&db_path).unwrap();
    db.init_schema().unwrap();
    // Schema creation is idempotent
    db.init_schema().unwrap();
    assert!(db_path.exists());
}

#[test]
fn test_insert_and_query_cycle() {
    let dir = tempdir().unwrap();
    let mut db = Database::open(&dir.path().join("test.db")).unwrap();
    db.init_schema().unwrap();

    let report = report_with(20);
    let id = db.insert_cycle(&report, 1_700_000_000).unwrap();

    let cycles = db.recent_cycles(10).unwrap();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].id, id);
    assert_eq!(cycles[0].cycle, 2);
    assert_eq!(cycles[0].process_count, 20);
    assert!((cycles[0].system_cpu.unwrap() - 50.0).abs() < 1e-9);

    // Only the top 15 are stored, in rank order
    let rows = db.assessments_for_cycle(id).unwrap();
    assert_eq!(rows.len(), 15);
    assert_eq!(rows[0].rank, 1);
    assert_eq!(rows[0].pid, 20);
    assert!(!rows[0].pending);
    assert!(rows.windows(2).all(|w| w[0].cpu_percent >= w[1].cpu_percent));
}

#[test]
fn test_cleanup_removes_old_cycles() {
    let dir = tempdir().unwrap();
    let mut db = Database::open(&dir.path().join("test.db")).unwrap();
    db.init_schema().unwrap();
    let report = report_with(3);
    let old = db.insert_cycle(&report, 1_000).unwrap();
    db.record(&report, chrono::Local::now()).unwrap();

    assert_eq!(db.cleanup_old_data(7).unwrap(), 1);
    let cycles = db.recent_cycles(10).unwrap();
    assert_eq!(cycles.len(), 1);
    assert!(db.assessments_for_cycle(old).unwrap().is_empty());
}
