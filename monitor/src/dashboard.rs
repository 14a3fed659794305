//! Terminal dashboard rendering

use crate::cycle::{CycleReport, RankedProcess};
use crate::detector::{RecommendationTier, HIGH_RISK_THRESHOLD, MEDIUM_RISK_THRESHOLD};
use chrono::{DateTime, Local};
use std::fmt::Write;

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[1;1H";
const RESET: &str = "\x1b[0m";
const RED: &str = "\x1b[91m";
const YELLOW: &str = "\x1b[93m";
const GREEN: &str = "\x1b[92m";

const NAME_WIDTH: usize = 20;
const BAR_CELLS: usize = 20;
const RECOMMENDATION_WINDOW: usize = 5;
const RECOMMENDATION_MIN_RISK: f64 = 50.0;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Advice text for a ranked process, chosen by its recommendation tier.
pub fn recommendation(process: &RankedProcess) -> String {
    let cpu = process.cpu_percent();
    let memory_mb = process.sample.memory_mb();
    match process.assessment.tier {
        RecommendationTier::High if cpu > 80.0 => format!(
            "HIGH CPU: {:.1}%. Consider: 1) Check for infinite loops 2) Optimize algorithms 3) Add CPU limits",
            cpu
        ),
        RecommendationTier::High if memory_mb > 500.0 => format!(
            "HIGH MEMORY: {:.1} MB. Check for memory leaks, reduce cache size",
            memory_mb
        ),
        RecommendationTier::High => "HIGH RISK: Investigate process behavior".to_string(),
        RecommendationTier::Medium => format!(
            "MEDIUM RISK: Monitor {} (PID: {}). Current CPU: {:.1}%, Memory: {:.1} MB",
            process.sample.name, process.sample.pid, cpu, memory_mb
        ),
        RecommendationTier::Normal => format!(
            "Normal: {} is operating within expected parameters",
            process.sample.name
        ),
    }
}

fn risk_color(risk_score: f64) -> &'static str {
    if risk_score > HIGH_RISK_THRESHOLD {
        RED
    } else if risk_score > MEDIUM_RISK_THRESHOLD {
        YELLOW
    } else {
        GREEN
    }
}

fn truncate(name: &str, width: usize) -> String {
    name.chars().take(width).collect()
}

/// 20-cell bar, one cell per 5%; denser glyphs under heavier load.
pub fn cpu_bar(cpu_percent: f64) -> String {
    let filled = ((cpu_percent.clamp(0.0, 100.0) / 5.0) as usize).min(BAR_CELLS);
    let glyph = if cpu_percent > 80.0 {
        '█'
    } else if cpu_percent > 50.0 {
        '▓'
    } else {
        '░'
    };
    let mut bar = String::with_capacity(BAR_CELLS * 3);
    bar.extend(std::iter::repeat(glyph).take(filled));
    bar.extend(std::iter::repeat(' ').take(BAR_CELLS - filled));
    bar
}

/// Render one full frame. `rows` caps the table; `next_update_secs` is only
/// shown in the footer.
pub fn render_dashboard(
    report: &CycleReport,
    rows: usize,
    next_update_secs: u64,
    now: DateTime<Local>,
) -> String {
    let mut out = String::new();
    out.push_str(CLEAR_SCREEN);
    render_header(&mut out, report, now);
    render_table(&mut out, report.top(rows));
    render_summary(&mut out, report, rows);
    render_recommendations(&mut out, report);
    let _ = writeln!(out, "\nNext update in {} seconds | Press Ctrl+C to exit", next_update_secs);
    out
}

fn render_header(out: &mut String, report: &CycleReport, now: DateTime<Local>) {
    let _ = writeln!(out, "╔{}╗", "═".repeat(66));
    let _ = writeln!(out, "║ {:<64} ║", "PROCESS RISK MONITOR - LIVE DASHBOARD");
    let _ = writeln!(out, "╚{}╝", "═".repeat(66));
    let _ = writeln!(
        out,
        "Time: {} | Cycle: {} | Processes: {}\n",
        now.format(TIMESTAMP_FORMAT),
        report.cycle,
        report.processes.len()
    );
}

fn render_table(out: &mut String, rows: &[RankedProcess]) {
    out.push_str("┌───────┬──────────────────────┬────────┬────────────┬─────────┬────────┬──────────────┐\n");
    out.push_str("│ PID   │ Process              │ CPU%   │ Memory(MB) │ Threads │ Risk   │ Bottleneck   │\n");
    out.push_str("├───────┼──────────────────────┼────────┼────────────┼─────────┼────────┼──────────────┤\n");
    for process in rows {
        let cpu = if process.utilization.pending {
            "--".to_string()
        } else {
            format!("{:.1}", process.cpu_percent())
        };
        let risk = process.assessment.risk_score;
        let _ = writeln!(
            out,
            "│ {:<5} │ {:<20} │ {:>6} │ {:>10.1} │ {:>7} │ {}{:>6.1}{} │ {:<12} │",
            process.sample.pid,
            truncate(&process.sample.name, NAME_WIDTH),
            cpu,
            process.sample.memory_mb(),
            process.sample.thread_count,
            risk_color(risk),
            risk,
            RESET,
            process.assessment.bottleneck,
        );
    }
    out.push_str("└───────┴──────────────────────┴────────┴────────────┴─────────┴────────┴──────────────┘\n");
}

fn render_summary(out: &mut String, report: &CycleReport, rows: usize) {
    out.push_str("\nSYSTEM SUMMARY:\n");
    match report.system_cpu_percent {
        Some(cpu) => {
            let _ = writeln!(out, "   CPU Usage: {:.1}% [{}]", cpu, cpu_bar(cpu));
        }
        None => out.push_str("   CPU Usage: collecting baseline...\n"),
    }
    if let Some(memory) = report.system_memory_percent {
        let _ = writeln!(out, "   Memory Usage: {:.1}%", memory);
    }

    out.push_str("\nINSIGHTS:\n");
    let shown = report.top(rows);
    let high_risk = report.count_tier(rows, RecommendationTier::High);
    let total_cpu: f64 = shown.iter().map(|p| p.cpu_percent()).sum();
    let pending = report.processes.iter().filter(|p| p.utilization.pending).count();
    if high_risk > 0 {
        let _ = writeln!(out, "   Found {} high-risk processes requiring attention", high_risk);
    } else if total_cpu > 50.0 {
        let _ = writeln!(out, "   System under moderate load ({:.1}% total CPU)", total_cpu);
    } else {
        out.push_str("   System operating normally\n");
    }
    if pending > 0 {
        let _ = writeln!(out, "   {} processes pending a second sample", pending);
    }
}

fn render_recommendations(out: &mut String, report: &CycleReport) {
    out.push_str("\nTOP RECOMMENDATIONS:\n");
    out.push_str(&"─".repeat(70));
    out.push('\n');
    let mut shown = 0;
    for process in report.top(RECOMMENDATION_WINDOW) {
        if process.assessment.risk_score > RECOMMENDATION_MIN_RISK {
            let _ = writeln!(out, "• {}", recommendation(process));
            shown += 1;
        }
    }
    if shown == 0 {
        out.push_str("No critical issues detected.\n");
    }
}
