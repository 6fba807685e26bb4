//! Connection state machine.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error(String),
}

/// Inputs that move the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    OpenStarted,
    OpenSucceeded,
    /// Open failed because no matching device is attached.
    NotFound,
    OpenFailed(String),
    Detached,
    /// Consecutive I/O failures reached the fault threshold.
    FaultLimit(String),
    Reset,
}

impl ConnectionState {
    /// Next state for `event`, or `None` if the event does not apply here.
    pub fn transition(&self, event: &ConnectionEvent) -> Option<ConnectionState> {
        use ConnectionEvent as E;
        use ConnectionState as S;
        match (self, event) {
            (S::Disconnected, E::OpenStarted) => Some(S::Connecting),
            (S::Connecting, E::OpenSucceeded) => Some(S::Connected),
            (S::Connecting, E::NotFound) => Some(S::Disconnected),
            (S::Connecting, E::OpenFailed(reason)) => Some(S::Error(reason.clone())),
            (S::Connecting | S::Connected, E::Detached) => Some(S::Disconnected),
            (S::Connected, E::FaultLimit(reason)) => Some(S::Error(reason.clone())),
            (S::Connected | S::Error(_), E::Reset) => Some(S::Disconnected),
            (S::Error(_), E::Detached) => Some(S::Disconnected),
            _ => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ConnectionState::Error(_))
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Error(reason) => write!(f, "error: {reason}"),
        }
    }
}
