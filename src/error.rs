use std::io;
use thiserror::Error;

/// Custom error type for diskwatch
#[derive(Error, Debug)]
pub enum DiskWatchError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A single unit's refresh failed; the unit counts as unknown for this cycle.
    #[error("Backend error for {unit}: {message}")]
    Backend { unit: String, message: String },

    #[error("Refresh of {unit} timed out after {secs}s")]
    UnitTimeout { unit: String, secs: u64 },

    /// A removal or lookup referenced a unit that is not in the inventory.
    #[error("Unknown storage unit: {0}")]
    UnknownUnit(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Refresh interval must be at least one minute (got {0})")]
    InvalidInterval(u32),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Health monitor is not running")]
    MonitorStopped,

    #[error("{0}")]
    Other(String),
}

/// Result type alias for diskwatch
pub type Result<T> = std::result::Result<T, DiskWatchError>;

impl DiskWatchError {
    /// Create a backend error for the given unit
    pub fn backend<U: Into<String>, S: Into<String>>(unit: U, msg: S) -> Self {
        DiskWatchError::Backend {
            unit: unit.into(),
            message: msg.into(),
        }
    }

    pub fn unit_timeout<U: Into<String>>(unit: U, secs: u64) -> Self {
        DiskWatchError::UnitTimeout {
            unit: unit.into(),
            secs,
        }
    }

    pub fn unknown_unit<S: Into<String>>(unit: S) -> Self {
        DiskWatchError::UnknownUnit(unit.into())
    }

    pub fn invalid_command<S: Into<String>>(msg: S) -> Self {
        DiskWatchError::InvalidCommand(msg.into())
    }

    pub fn notification<S: Into<String>>(msg: S) -> Self {
        DiskWatchError::Notification(msg.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        DiskWatchError::Other(msg.into())
    }

    /// True for errors that only affect the current refresh cycle of one unit.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DiskWatchError::Backend { .. } | DiskWatchError::UnitTimeout { .. }
        )
    }
}
