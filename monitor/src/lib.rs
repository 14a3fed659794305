//! Process risk monitor: tick-delta CPU utilization, risk scoring and a
//! ranked terminal dashboard.

pub mod baseline;
pub mod collector;
pub mod config;
pub mod cycle;
pub mod dashboard;
pub mod db;
pub mod detector;
pub mod engine;
pub mod error;
pub mod journal;
pub mod store;

pub use cycle::{CycleReport, Monitor, RankedProcess};
pub use error::MonitorError;
