//! Display snapshots and operator notices
//!
//! A snapshot is the read-only projection a surface renders. It is rebuilt
//! from scratch after every handled event, so surfaces never hold on to
//! panel state of their own.

use chrono::{DateTime, Utc};
use cncpanel_core::{ActionSet, OperatorAction, PendingOperation, SessionPhase};
use serde::Serialize;
use std::fmt;

/// Severity of a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoticeLevel::Info => write!(f, "info"),
            NoticeLevel::Success => write!(f, "ok"),
            NoticeLevel::Warning => write!(f, "warning"),
            NoticeLevel::Error => write!(f, "error"),
        }
    }
}

/// Message surfaced to the operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            at: Utc::now(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.message)
    }
}

/// What the surface shows of the instruction buffer
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ProgramView {
    pub text: String,
    pub line_count: usize,
    pub instruction_count: usize,
    pub dirty: bool,
    pub source_name: Option<String>,
}

/// Read-only projection of the panel state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplaySnapshot {
    pub phase: SessionPhase,
    pub pending: Option<PendingOperation>,
    pub enabled: ActionSet,
    pub program: ProgramView,
    /// Program line last reported by the machine (0-based)
    pub active_line: Option<usize>,
    pub fault_reason: Option<String>,
    /// Latest notice, if any was raised yet
    pub notice: Option<Notice>,
}

impl DisplaySnapshot {
    pub fn is_enabled(&self, action: OperatorAction) -> bool {
        self.enabled.contains(action)
    }
}

impl fmt::Display for DisplaySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.phase)?;
        if let Some(pending) = &self.pending {
            write!(f, " | waiting for {}", pending.kind)?;
        }
        if let Some(line) = self.active_line {
            write!(f, " | line {}/{}", line + 1, self.program.line_count)?;
        }
        if let Some(reason) = &self.fault_reason {
            write!(f, " | fault: {}", reason)?;
        }
        write!(f, " | enabled {}", self.enabled)
    }
}
