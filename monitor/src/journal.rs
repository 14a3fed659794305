//! Periodic analysis log writers

use crate::cycle::CycleReport;
use crate::dashboard::{recommendation, TIMESTAMP_FORMAT};
use crate::detector::RecommendationTier;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// How many of the top-ranked processes each log entry covers.
pub const LOG_WINDOW: usize = 15;

/// Receives every Nth cycle report. Path and rotation are up to the
/// implementation.
pub trait CycleLog: Send {
    fn record(&mut self, report: &CycleReport, timestamp: DateTime<Local>) -> Result<()>;
}

/// Aggregates over the first `LOG_WINDOW` ranked processes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleSummary {
    pub analyzed: usize,
    pub high_risk: usize,
    pub medium_risk: usize,
    pub average_cpu: f64,
    pub total_memory_mb: f64,
}

impl CycleSummary {
    pub fn from_report(report: &CycleReport) -> Self {
        let window = report.top(LOG_WINDOW);
        let total_cpu: f64 = window.iter().map(|p| p.cpu_percent()).sum();
        let total_memory_mb = window.iter().map(|p| p.sample.memory_mb()).sum();
        Self {
            analyzed: report.processes.len(),
            high_risk: report.count_tier(LOG_WINDOW, RecommendationTier::High),
            medium_risk: report.count_tier(LOG_WINDOW, RecommendationTier::Medium),
            average_cpu: if window.is_empty() { 0.0 } else { total_cpu / window.len() as f64 },
            total_memory_mb,
        }
    }
}

/// Append-only plain text log.
pub struct TextLog {
    path: PathBuf,
}

impl TextLog {
    pub fn new(path: &Path) -> Self {
        Self { path: path.to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format_entry(report: &CycleReport, timestamp: DateTime<Local>) -> String {
        let summary = CycleSummary::from_report(report);
        let mut entry = format!(
            "\nAnalysis Cycle #{} at {}\n{}\n",
            report.cycle,
            timestamp.format(TIMESTAMP_FORMAT),
            "═".repeat(56)
        );
        for process in report.top(LOG_WINDOW) {
            if process.assessment.tier == RecommendationTier::High {
                entry.push_str(&format!(
                    "HIGH RISK: PID {} - {}\n",
                    process.sample.pid,
                    recommendation(process)
                ));
            }
        }
        entry.push_str(&format!(
            "\nStatistics:\n   • Total processes analyzed: {}\n   • High-risk processes: {}\n   • Medium-risk processes: {}\n   • Average CPU usage (top {}): {:.1}%\n   • Total memory used (top {}): {:.1} MB\n",
            summary.analyzed,
            summary.high_risk,
            summary.medium_risk,
            LOG_WINDOW,
            summary.average_cpu,
            LOG_WINDOW,
            summary.total_memory_mb,
        ));
        entry
    }
}

impl CycleLog for TextLog {
    fn record(&mut self, report: &CycleReport, timestamp: DateTime<Local>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating log directory {}", parent.display()))?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening {}", self.path.display()))?;
        file.write_all(Self::format_entry(report, timestamp).as_bytes())?;
        Ok(())
    }
}
