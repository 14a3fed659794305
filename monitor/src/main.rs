use anyhow::{Context, Result};
use riskmon::{
    collector::SnapshotProvider,
    config::{Config, LogBackend},
    cycle::{CycleReport, Monitor},
    dashboard,
    db::Database,
    journal::{CycleLog, TextLog},
};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(target_os = "linux")]
fn default_provider() -> Result<Arc<dyn SnapshotProvider>> {
    Ok(Arc::new(riskmon::collector::LinuxSnapshotProvider::new()))
}

#[cfg(not(target_os = "linux"))]
fn default_provider() -> Result<Arc<dyn SnapshotProvider>> {
    anyhow::bail!("no snapshot provider available for this platform")
}

fn open_log(config: &Config) -> Result<Option<Box<dyn CycleLog>>> {
    if !config.log.enabled {
        return Ok(None);
    }
    match config.log.backend {
        LogBackend::Text => {
            info!("Writing analysis log to {}", config.log.text_path.display());
            Ok(Some(Box::new(TextLog::new(&config.log.text_path))))
        }
        LogBackend::Sqlite => {
            let path = config.database_path();
            let db = Database::open(&path)
                .with_context(|| format!("opening history database {}", path.display()))?;
            db.init_schema()?;
            let removed = db.cleanup_old_data(config.log.retention_days)?;
            info!("Recording history to {} ({} expired cycles removed)", path.display(), removed);
            Ok(Some(Box::new(db)))
        }
    }
}

fn load_config() -> Config {
    let config_path = Config::config_path();
    if config_path.exists() {
        Config::load(&config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}, using defaults", e);
            Config::default()
        })
    } else {
        info!("No config file found, using defaults");
        Config::default()
    }
}

fn show(report: &CycleReport, config: &Config, next_update_secs: u64) {
    if !config.display.enabled {
        return;
    }
    let frame = dashboard::render_dashboard(report, config.display.rows, next_update_secs, chrono::Local::now());
    let mut stdout = std::io::stdout().lock();
    if let Err(e) = stdout.write_all(frame.as_bytes()).and_then(|_| stdout.flush()) {
        error!("Failed to draw dashboard: {}", e);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    info!("riskmon starting...");

    let config = load_config();
    let provider = default_provider()?;
    let mut log = open_log(&config)?;
    let mut monitor = Monitor::new(config.tracking.capacity);

    let normal = Duration::from_secs(config.general.refresh_interval_secs);
    let alert = Duration::from_secs(config.general.alert_interval_secs);
    let timeout = Duration::from_millis(config.general.snapshot_timeout_ms);

    let mut interval = tokio::time::interval(normal);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut in_alert_mode = false;
    let mut consecutive_failures = 0u32;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutting down...");
                break;
            }
            _ = interval.tick() => {}
        }

        let report = match monitor.poll(Arc::clone(&provider), timeout).await {
            Ok(report) => {
                consecutive_failures = 0;
                report
            }
            Err(e) => {
                consecutive_failures += 1;
                warn!("Skipping cycle: {} ({} in a row)", e, consecutive_failures);
                if consecutive_failures >= config.general.max_consecutive_failures {
                    error!("Could not collect process data, giving up");
                    return Err(e.into());
                }
                continue;
            }
        };

        // Adaptive interval: faster while anything is high risk
        let had_alert = report.has_high_risk();
        if had_alert != in_alert_mode {
            in_alert_mode = had_alert;
            let period = if had_alert { alert } else { normal };
            interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            if had_alert {
                info!("Entering alert mode - increased sampling rate");
            } else {
                info!("Exiting alert mode - normal sampling rate");
            }
        }

        let next_update = if in_alert_mode { alert } else { normal };
        show(&report, &config, next_update.as_secs());

        if report.cycle % config.log.every_cycles == 0 {
            if let Some(log) = log.as_mut() {
                if let Err(e) = log.record(&report, chrono::Local::now()) {
                    error!("Failed to write analysis log: {:#}", e);
                }
            }
        }
    }

    let diagnostics = monitor.diagnostics();
    info!(
        cycles = diagnostics.cycles,
        snapshot_failures = diagnostics.snapshot_failures,
        counter_regressions = diagnostics.counter_regressions,
        capacity_evictions = diagnostics.capacity_evictions,
        exited_evictions = diagnostics.exited_evictions,
        untracked = diagnostics.untracked,
        "Final statistics"
    );
    Ok(())
}
