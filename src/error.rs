//! Error types and handling for Faraday
//!
//! This module defines the error types used throughout the application,
//! including the typed session fault that crosses the RPC boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for Faraday operations
pub type Result<T> = std::result::Result<T, FaradayError>;

/// Typed fault detail returned for any state or validation failure.
///
/// Mirrors the wire contract: a human-readable reason, the offending row
/// index when the failure is row-scoped, and the vehicle the session (if
/// any) belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultInfo {
    /// Why the call failed
    pub reason: String,

    /// Offending row index for row-scoped failures
    pub row_index: Option<u32>,

    /// Vehicle id of the session the fault relates to
    pub vehicle_id: Option<String>,
}

impl FaultInfo {
    /// Create a new fault detail
    pub fn new<S: Into<String>>(reason: S, row_index: Option<u32>, vehicle_id: Option<String>) -> Self {
        Self {
            reason: reason.into(),
            row_index,
            vehicle_id,
        }
    }
}

/// Main error type for Faraday
#[derive(Debug, Error)]
pub enum FaradayError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Session state errors (already active, no active session, mismatch);
    /// fatal to the call, session state unchanged
    #[error("State error: {}", fault.reason)]
    State { fault: FaultInfo },

    /// Per-sample validation errors; row-scoped and recoverable
    #[error("Validation error: {}", fault.reason)]
    Validation { fault: FaultInfo },

    /// Transport/channel errors between client and service
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Timeout errors
    #[error("Timeout error: {message}")]
    Timeout { message: String },

    /// Client-local parse errors for malformed source rows
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Generic errors with context
    #[error("Error: {message}")]
    Generic { message: String },
}

impl FaradayError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        FaradayError::Config {
            message: message.into(),
        }
    }

    /// Create a new session state error
    pub fn state<S: Into<String>>(reason: S, vehicle_id: Option<String>) -> Self {
        FaradayError::State {
            fault: FaultInfo::new(reason, None, vehicle_id),
        }
    }

    /// Create a new validation error for a specific row
    pub fn validation<S: Into<String>>(
        reason: S,
        row_index: Option<u32>,
        vehicle_id: Option<String>,
    ) -> Self {
        FaradayError::Validation {
            fault: FaultInfo::new(reason, row_index, vehicle_id),
        }
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        FaradayError::Transport {
            message: message.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        FaradayError::Timeout {
            message: message.into(),
        }
    }

    /// Create a new parse error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        FaradayError::Parse {
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        FaradayError::Io {
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn generic<S: Into<String>>(message: S) -> Self {
        FaradayError::Generic {
            message: message.into(),
        }
    }

    /// Typed fault detail, if this error carries one
    pub fn fault(&self) -> Option<&FaultInfo> {
        match self {
            FaradayError::State { fault } | FaradayError::Validation { fault } => Some(fault),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FaradayError {
    fn from(err: std::io::Error) -> Self {
        FaradayError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for FaradayError {
    fn from(err: serde_yaml::Error) -> Self {
        FaradayError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for FaradayError {
    fn from(err: serde_json::Error) -> Self {
        FaradayError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<chrono::ParseError> for FaradayError {
    fn from(err: chrono::ParseError) -> Self {
        FaradayError::parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = FaradayError::config("test config error");
        assert!(matches!(err, FaradayError::Config { .. }));

        let err = FaradayError::state("Session already active.", Some("EV1".into()));
        assert!(matches!(err, FaradayError::State { .. }));

        let err = FaradayError::validation("Voltage RMS must be > 0.", Some(4), None);
        assert!(matches!(err, FaradayError::Validation { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = FaradayError::transport("channel aborted");
        assert_eq!(format!("{}", err), "Transport error: channel aborted");

        let err = FaradayError::validation("Invalid Timestamp.", Some(7), None);
        assert_eq!(format!("{}", err), "Validation error: Invalid Timestamp.");
    }

    #[test]
    fn test_fault_accessor() {
        let err = FaradayError::validation("Frequency must be > 0.", Some(2), Some("EV1".into()));
        let fault = err.fault().unwrap();
        assert_eq!(fault.row_index, Some(2));
        assert_eq!(fault.vehicle_id.as_deref(), Some("EV1"));

        assert!(FaradayError::transport("boom").fault().is_none());
    }
}
