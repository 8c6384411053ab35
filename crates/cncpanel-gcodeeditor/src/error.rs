//! Error types for the instruction buffer.

use cncpanel_core::SessionPhase;
use thiserror::Error;

/// Errors related to instruction buffer operations.
///
/// The buffer is left unchanged whenever one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    /// The text is not well-formed line-oriented text.
    #[error("Invalid encoding at line {line}, column {column}: {reason}")]
    InvalidEncoding {
        line: usize,
        column: usize,
        reason: String,
    },

    /// The machine is consuming or moving; the program cannot change.
    #[error("Program is locked while {phase}")]
    BufferLocked { phase: SessionPhase },
}

/// Result type alias for buffer operations.
pub type BufferResult<T> = Result<T, BufferError>;
