//! Error handling for the panel core
//!
//! Provides the error types shared by the coordination layer:
//! - Control errors (operator actions rejected or failed)
//! - Channel errors (transport to the machine)
//!
//! All error types use `thiserror` for ergonomic error handling.

use crate::data::{OperationKind, OperatorAction, SessionPhase};
use thiserror::Error;

/// Control error type
///
/// Raised when an operator action cannot be carried out. Every variant is
/// terminal to the single action that caused it; nothing is retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    /// The action is not in the enabled set for the current state
    #[error("{action} is not permitted while {phase}")]
    ActionNotPermitted {
        /// The rejected action.
        action: OperatorAction,
        /// Phase at the time of the request.
        phase: SessionPhase,
    },

    /// Another operation is still waiting for its acknowledgment
    #[error("{pending} is still in progress")]
    OperationInProgress {
        /// Kind of the outstanding operation.
        pending: OperationKind,
    },

    /// The machine reported failure for an operation
    #[error("{kind} failed: {reason}")]
    CommandFailure {
        /// The failed operation.
        kind: OperationKind,
        /// Reason reported by the machine.
        reason: String,
    },

    /// The transport to the machine broke
    #[error("Channel fault: {reason}")]
    ChannelFault {
        /// Reason for the fault.
        reason: String,
    },

    /// Console input is not a single instruction line
    #[error("Invalid console line: {reason}")]
    InvalidLine {
        /// Why the input was rejected.
        reason: String,
    },
}

impl ControlError {
    /// Whether the session survives this error
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ControlError::ChannelFault { .. })
    }
}

/// Channel error type
///
/// Returned by command channels when a command cannot be handed to the
/// transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// Transport is not available
    #[error("Channel unavailable: {reason}")]
    Unavailable {
        /// The reason the transport is unavailable.
        reason: String,
    },

    /// Channel was shut down
    #[error("Channel closed")]
    Closed,
}

impl From<ChannelError> for ControlError {
    fn from(err: ChannelError) -> Self {
        ControlError::ChannelFault {
            reason: err.to_string(),
        }
    }
}

/// Result type using ControlError
pub type Result<T> = std::result::Result<T, ControlError>;
