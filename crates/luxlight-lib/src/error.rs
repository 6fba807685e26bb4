//! Unified error type for the luxlight-lib crate.
//!
//! [`LuxlightError`] wraps the module-specific errors (`DeviceError`,
//! `TransportError`, `ProtocolError`, `ValueError`) plus I/O and config
//! failures. `From` impls let `?` propagate across module boundaries.

use std::fmt;

use crate::codec::ProtocolError;
use crate::controller::DeviceError;
use crate::led::ValueError;
use crate::transport::TransportError;

#[derive(Debug)]
pub enum LuxlightError {
    /// Controller operation failed.
    Device(DeviceError),
    /// USB HID transport failure outside a controller operation.
    Transport(TransportError),
    /// Malformed device report.
    Protocol(ProtocolError),
    /// Invalid input value (color, speed, brightness, ...).
    Value(ValueError),
    /// Standard I/O error (config persistence, thread spawn).
    Io(std::io::Error),
    /// Configuration validation error.
    Config(String),
}

impl fmt::Display for LuxlightError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LuxlightError::Device(e) => write!(f, "{e}"),
            LuxlightError::Transport(e) => write!(f, "{e}"),
            LuxlightError::Protocol(e) => write!(f, "{e}"),
            LuxlightError::Value(e) => write!(f, "{e}"),
            LuxlightError::Io(e) => write!(f, "I/O error: {e}"),
            LuxlightError::Config(e) => write!(f, "Config error: {e}"),
        }
    }
}

impl std::error::Error for LuxlightError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LuxlightError::Device(e) => Some(e),
            LuxlightError::Transport(e) => Some(e),
            LuxlightError::Protocol(e) => Some(e),
            LuxlightError::Value(e) => Some(e),
            LuxlightError::Io(e) => Some(e),
            LuxlightError::Config(_) => None,
        }
    }
}

impl From<DeviceError> for LuxlightError {
    fn from(e: DeviceError) -> Self {
        LuxlightError::Device(e)
    }
}

impl From<TransportError> for LuxlightError {
    fn from(e: TransportError) -> Self {
        LuxlightError::Transport(e)
    }
}

impl From<ProtocolError> for LuxlightError {
    fn from(e: ProtocolError) -> Self {
        LuxlightError::Protocol(e)
    }
}

impl From<ValueError> for LuxlightError {
    fn from(e: ValueError) -> Self {
        LuxlightError::Value(e)
    }
}

impl From<std::io::Error> for LuxlightError {
    fn from(e: std::io::Error) -> Self {
        LuxlightError::Io(e)
    }
}

/// Crate-level Result alias using [`LuxlightError`].
pub type Result<T> = std::result::Result<T, LuxlightError>;
