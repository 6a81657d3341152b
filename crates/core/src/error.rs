use std::time::Duration;
use thiserror::Error;

/// Top-level error type used across the entire workspace.
///
/// Sensor failures never show up here: they are absorbed per field and
/// encoded as absent values in the [`Sample`](crate::sample::Sample).
#[derive(Debug, Error)]
pub enum MonitorError {
    /// `append` was called on a full or frozen run window.
    #[error("run window is at capacity ({capacity} samples) or already stopped")]
    CapacityExceeded { capacity: usize },

    #[error("sample timestamp {got:?} does not follow previous timestamp {last:?}")]
    NonMonotonicTimestamp { last: Duration, got: Duration },

    #[error("sample range {start}..{end} is out of bounds for {len} samples")]
    InvalidRange { start: usize, end: usize, len: usize },

    #[error("a monitoring run is already in progress")]
    AlreadyRunning,

    #[error("engine error: {0}")]
    Engine(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("report error: {0}")]
    Report(String),

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

pub type Result<T, E = MonitorError> = std::result::Result<T, E>;

/// Why a single probe produced no reading for a tick.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProbeError {
    /// The sensor does not exist on this host; permanent for the run.
    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// One-off failure; the next tick tries again.
    #[error("failed: {0}")]
    Failed(String),

    /// The previous call for this probe is still in flight.
    #[error("previous sample still in flight")]
    Busy,
}

impl ProbeError {
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
