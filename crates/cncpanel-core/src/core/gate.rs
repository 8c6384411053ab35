//! Action gate
//!
//! Decides which operator actions are enabled. The result depends only on
//! the session phase, whether an operation is pending and whether the
//! instruction buffer holds any instruction. Rendering surfaces reflect the
//! gate's output and never compute enablement themselves.

use crate::data::{ActionSet, OperatorAction, SessionPhase};

/// Everything the gate looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GateInput {
    pub phase: SessionPhase,
    pub pending: bool,
    pub buffer_empty: bool,
}

impl GateInput {
    pub fn new(phase: SessionPhase, pending: bool, buffer_empty: bool) -> Self {
        Self {
            phase,
            pending,
            buffer_empty,
        }
    }

    /// Enabled actions for this input
    pub fn enabled(&self) -> ActionSet {
        enabled_actions(self.phase, self.pending, self.buffer_empty)
    }
}

/// Compute the enabled action set
pub fn enabled_actions(phase: SessionPhase, pending: bool, buffer_empty: bool) -> ActionSet {
    use OperatorAction::*;

    let mut set = ActionSet::empty();

    if phase == SessionPhase::Faulted {
        return set.with(Reset);
    }

    if phase.is_settled() && !pending {
        set.insert(Load);
        set.insert(HomeXyz);
        set.insert(ProbeZ);
        set.insert(EditBuffer);
    }

    if phase == SessionPhase::Ready && !pending && !buffer_empty {
        set.insert(Start);
    }

    if phase == SessionPhase::Paused {
        set.insert(Continue);
    }

    if phase != SessionPhase::Idle {
        set.insert(Stop);
    }

    if matches!(phase, SessionPhase::Ready | SessionPhase::Paused) {
        set.insert(SendLine);
    }

    set
}
