//! Error types for agrox-core.
//!
//! Hardware errors fall into two classes that the acquisition loop treats
//! very differently:
//!
//! | Error Type | Acquisition policy |
//! |------------|--------------------|
//! | [`Error::Transient`] | Log, back off, read again on the next pass |
//! | [`Error::Hardware`] from the sensor | Fatal to acquisition, full cleanup |
//! | [`Error::Hardware`] from the camera | Camera disabled for the process lifetime |
//! | [`Error::Timeout`] | Same as `Hardware` for the device that timed out |
//! | [`Error::Unavailable`] | Device absent at startup |
//!
//! Use [`Error::is_transient`] rather than matching variants directly.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by hardware capabilities.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Expected protocol noise (checksum mismatch, missed edge, busy bus).
    #[error("{device}: transient fault: {reason}")]
    Transient {
        /// The device that reported the fault.
        device: String,
        /// What went wrong.
        reason: String,
    },

    /// Unexpected hardware failure.
    #[error("{device}: hardware fault: {reason}")]
    Hardware {
        /// The device that failed.
        device: String,
        /// What went wrong.
        reason: String,
    },

    /// The device is not present on this system.
    #[error("Device unavailable: {0}")]
    Unavailable(String),

    /// Operation timed out.
    #[error("Operation '{operation}' timed out after {duration:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The timeout duration.
        duration: Duration,
    },

    /// I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create a transient fault.
    pub fn transient(device: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Transient {
            device: device.into(),
            reason: reason.into(),
        }
    }

    /// Create a hardware fault.
    pub fn hardware(device: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Hardware {
            device: device.into(),
            reason: reason.into(),
        }
    }

    /// Create a timeout error with operation context.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Whether this error belongs to the recoverable class.
    ///
    /// Only [`Error::Transient`] qualifies. Everything else means the device
    /// cannot be trusted any more.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// Result type alias using agrox-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
