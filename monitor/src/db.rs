//! SQLite cycle history

use crate::cycle::CycleReport;
use crate::journal::{CycleLog, CycleSummary, LOG_WINDOW};
use chrono::{DateTime, Local};
use rusqlite::{params, Connection};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

pub struct Database {
    conn: Connection,
}

#[derive(Debug, Clone)]
pub struct CycleRecord {
    pub id: i64,
    pub cycle: u64,
    pub timestamp: i64,
    pub process_count: u32,
    pub high_risk: u32,
    pub medium_risk: u32,
    pub average_cpu: f64,
    pub total_memory_mb: f64,
    pub system_cpu: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct AssessmentRecord {
    pub rank: u32,
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f64,
    pub pending: bool,
    pub memory_mb: f64,
    pub thread_count: u32,
    pub risk_score: f64,
    pub bottleneck: String,
    pub tier: String,
}

impl Database {
    pub fn open(path: &Path) -> rusqlite::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    pub fn init_schema(&self) -> rusqlite::Result<()> {
        self.conn.execute_batch(include_str!("../schema.sql"))
    }

    fn now() -> i64 {
        SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
    }

    /// Store the cycle summary plus the top-ranked assessments in one
    /// transaction. Returns the new cycle row id.
    pub fn insert_cycle(&mut self, report: &CycleReport, timestamp: i64) -> rusqlite::Result<i64> {
        let summary = CycleSummary::from_report(report);
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO cycles (cycle, timestamp, process_count, high_risk, medium_risk, average_cpu, total_memory_mb, system_cpu)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                report.cycle as i64,
                timestamp,
                summary.analyzed as i64,
                summary.high_risk as i64,
                summary.medium_risk as i64,
                summary.average_cpu,
                summary.total_memory_mb,
                report.system_cpu_percent,
            ],
        )?;
        let cycle_id = tx.last_insert_rowid();
        {
            let mut stmt = tx.prepare(
                "INSERT INTO assessments (cycle_id, rank, pid, name, cpu_percent, pending, memory_mb, thread_count, risk_score, bottleneck, tier)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for (rank, process) in report.top(LOG_WINDOW).iter().enumerate() {
                stmt.execute(params![
                    cycle_id,
                    rank as i64 + 1,
                    process.sample.pid,
                    process.sample.name,
                    process.cpu_percent(),
                    process.utilization.pending,
                    process.sample.memory_mb(),
                    process.sample.thread_count,
                    process.assessment.risk_score,
                    process.assessment.bottleneck.as_str(),
                    process.assessment.tier.as_str(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(cycle_id)
    }

    pub fn recent_cycles(&self, limit: u32) -> rusqlite::Result<Vec<CycleRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, cycle, timestamp, process_count, high_risk, medium_risk, average_cpu, total_memory_mb, system_cpu
             FROM cycles ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok(CycleRecord {
                id: row.get(0)?,
                cycle: row.get::<_, i64>(1)? as u64,
                timestamp: row.get(2)?,
                process_count: row.get(3)?,
                high_risk: row.get(4)?,
                medium_risk: row.get(5)?,
                average_cpu: row.get(6)?,
                total_memory_mb: row.get(7)?,
                system_cpu: row.get(8)?,
            })
        })?;
        rows.collect()
    }

    pub fn assessments_for_cycle(&self, cycle_id: i64) -> rusqlite::Result<Vec<AssessmentRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT rank, pid, name, cpu_percent, pending, memory_mb, thread_count, risk_score, bottleneck, tier
             FROM assessments WHERE cycle_id = ?1 ORDER BY rank ASC",
        )?;
        let rows = stmt.query_map(params![cycle_id], |row| {
            Ok(AssessmentRecord {
                rank: row.get(0)?,
                pid: row.get(1)?,
                name: row.get(2)?,
                cpu_percent: row.get(3)?,
                pending: row.get::<_, i32>(4)? != 0,
                memory_mb: row.get(5)?,
                thread_count: row.get(6)?,
                risk_score: row.get(7)?,
                bottleneck: row.get(8)?,
                tier: row.get(9)?,
            })
        })?;
        rows.collect()
    }

    /// Delete cycles (and their assessments) older than `days`. Returns the
    /// number of cycle rows removed.
    pub fn cleanup_old_data(&self, days: u32) -> rusqlite::Result<usize> {
        let cutoff = Self::now() - (days as i64 * 86400);
        self.conn.execute(
            "DELETE FROM assessments WHERE cycle_id IN (SELECT id FROM cycles WHERE timestamp < ?1)",
            params![cutoff],
        )?;
        self.conn.execute("DELETE FROM cycles WHERE timestamp < ?1", params![cutoff])
    }
}

impl CycleLog for Database {
    fn record(&mut self, report: &CycleReport, timestamp: DateTime<Local>) -> anyhow::Result<()> {
        self.insert_cycle(report, timestamp.timestamp())?;
        Ok(())
    }
}
