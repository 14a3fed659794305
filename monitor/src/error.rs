//! Error types for the sampling engine

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    /// The snapshot provider failed, timed out, or returned no processes.
    /// Never retried internally.
    #[error("snapshot unavailable: {0}")]
    SnapshotUnavailable(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, MonitorError>;
