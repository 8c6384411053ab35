//! Data models for the panel session
//!
//! This module provides:
//! - Session phases tracked for the machine
//! - Operation kinds and the single pending operation
//! - Operator actions and the enabled-action set produced by the gate
//! - Command acknowledgments reported by the machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifecycle phase of the machine as tracked by the panel
///
/// Exactly one phase is active at a time. Only the session state machine
/// changes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SessionPhase {
    /// No program accepted by the machine
    #[default]
    Idle,
    /// Program sent, waiting for the machine to accept it
    Loading,
    /// Program accepted, machine idle
    Ready,
    /// Machine is consuming the program
    Running,
    /// Program execution held by the machine
    Paused,
    /// Homing cycle in progress
    Homing,
    /// Z probing in progress
    Probing,
    /// Stop requested, waiting for the machine to confirm
    Stopping,
    /// Fatal condition; only an operator reset leaves this phase
    Faulted,
}

impl SessionPhase {
    /// All phases, in declaration order
    pub const ALL: [SessionPhase; 9] = [
        SessionPhase::Idle,
        SessionPhase::Loading,
        SessionPhase::Ready,
        SessionPhase::Running,
        SessionPhase::Paused,
        SessionPhase::Homing,
        SessionPhase::Probing,
        SessionPhase::Stopping,
        SessionPhase::Faulted,
    ];

    /// Whether the machine is actively moving under panel control
    pub fn is_motion(&self) -> bool {
        matches!(
            self,
            SessionPhase::Running | SessionPhase::Homing | SessionPhase::Probing
        )
    }

    /// Whether the machine is settled and can accept setup operations
    pub fn is_settled(&self) -> bool {
        matches!(self, SessionPhase::Idle | SessionPhase::Ready)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Idle => write!(f, "Idle"),
            SessionPhase::Loading => write!(f, "Loading"),
            SessionPhase::Ready => write!(f, "Ready"),
            SessionPhase::Running => write!(f, "Running"),
            SessionPhase::Paused => write!(f, "Paused"),
            SessionPhase::Homing => write!(f, "Homing"),
            SessionPhase::Probing => write!(f, "Probing"),
            SessionPhase::Stopping => write!(f, "Stopping"),
            SessionPhase::Faulted => write!(f, "Faulted"),
        }
    }
}

/// Kind of an operation that is sent to the machine and acknowledged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    /// Transfer the program to the machine
    Load,
    /// Begin executing the program
    Start,
    /// Resume a paused program
    Continue,
    /// Abort whatever the machine is doing
    Stop,
    /// Home all three axes
    HomeXyz,
    /// Probe the work surface along Z
    ProbeZ,
    /// Execute a single ad-hoc line
    SendLine,
}

impl OperationKind {
    /// The operator action that issues this operation
    pub fn action(&self) -> OperatorAction {
        match self {
            OperationKind::Load => OperatorAction::Load,
            OperationKind::Start => OperatorAction::Start,
            OperationKind::Continue => OperatorAction::Continue,
            OperationKind::Stop => OperatorAction::Stop,
            OperationKind::HomeXyz => OperatorAction::HomeXyz,
            OperationKind::ProbeZ => OperatorAction::ProbeZ,
            OperationKind::SendLine => OperatorAction::SendLine,
        }
    }

    /// Whether this operation consumes the instruction buffer as the active program
    pub fn consumes_program(&self) -> bool {
        matches!(self, OperationKind::Start | OperationKind::Continue)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.action(), f)
    }
}

/// Operator-facing action, one per panel control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatorAction {
    Load,
    Start,
    Continue,
    Stop,
    HomeXyz,
    ProbeZ,
    SendLine,
    EditBuffer,
    /// Operator acknowledgment of a fault
    Reset,
}

impl OperatorAction {
    /// All actions, in display order
    pub const ALL: [OperatorAction; 9] = [
        OperatorAction::Load,
        OperatorAction::Start,
        OperatorAction::Continue,
        OperatorAction::Stop,
        OperatorAction::HomeXyz,
        OperatorAction::ProbeZ,
        OperatorAction::SendLine,
        OperatorAction::EditBuffer,
        OperatorAction::Reset,
    ];

    /// Operation issued by this action, if it sends one
    pub fn operation(&self) -> Option<OperationKind> {
        match self {
            OperatorAction::Load => Some(OperationKind::Load),
            OperatorAction::Start => Some(OperationKind::Start),
            OperatorAction::Continue => Some(OperationKind::Continue),
            OperatorAction::Stop => Some(OperationKind::Stop),
            OperatorAction::HomeXyz => Some(OperationKind::HomeXyz),
            OperatorAction::ProbeZ => Some(OperationKind::ProbeZ),
            OperatorAction::SendLine => Some(OperationKind::SendLine),
            OperatorAction::EditBuffer | OperatorAction::Reset => None,
        }
    }

    fn bit(&self) -> u16 {
        1 << (*self as u16)
    }
}

impl fmt::Display for OperatorAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatorAction::Load => write!(f, "Load"),
            OperatorAction::Start => write!(f, "Start"),
            OperatorAction::Continue => write!(f, "Continue"),
            OperatorAction::Stop => write!(f, "Stop"),
            OperatorAction::HomeXyz => write!(f, "Home XYZ"),
            OperatorAction::ProbeZ => write!(f, "Probe Z"),
            OperatorAction::SendLine => write!(f, "Send line"),
            OperatorAction::EditBuffer => write!(f, "Edit program"),
            OperatorAction::Reset => write!(f, "Reset"),
        }
    }
}

/// Set of operator actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ActionSet(u16);

impl ActionSet {
    /// Empty set
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Add an action
    pub fn insert(&mut self, action: OperatorAction) {
        self.0 |= action.bit();
    }

    /// Builder form of [`ActionSet::insert`]
    pub fn with(mut self, action: OperatorAction) -> Self {
        self.insert(action);
        self
    }

    /// Check membership
    pub fn contains(&self, action: OperatorAction) -> bool {
        self.0 & action.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterate the contained actions in display order
    pub fn iter(&self) -> impl Iterator<Item = OperatorAction> + '_ {
        OperatorAction::ALL
            .into_iter()
            .filter(move |action| self.contains(*action))
    }
}

impl FromIterator<OperatorAction> for ActionSet {
    fn from_iter<T: IntoIterator<Item = OperatorAction>>(iter: T) -> Self {
        iter.into_iter()
            .fold(ActionSet::empty(), |set, action| set.with(action))
    }
}

impl fmt::Display for ActionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.iter().map(|a| a.to_string()).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

/// The single in-flight operation awaiting acknowledgment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOperation {
    /// Correlation id for logs
    pub id: Uuid,
    /// What was issued
    pub kind: OperationKind,
    /// When it was issued
    pub issued_at: DateTime<Utc>,
}

impl PendingOperation {
    /// Create a pending operation issued now
    pub fn new(kind: OperationKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            issued_at: Utc::now(),
        }
    }

    /// Time elapsed since the operation was issued, relative to `now`
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.issued_at
    }
}

impl fmt::Display for PendingOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind, &self.id.to_string()[..8])
    }
}

/// Result reported by the machine for an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AckOutcome {
    Success,
    Failure(String),
}

impl AckOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AckOutcome::Success)
    }
}

/// Acknowledgment of a previously issued operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgment {
    /// Operation kind this acknowledgment answers
    pub correlates_to: OperationKind,
    /// Outcome
    pub outcome: AckOutcome,
}

impl Acknowledgment {
    pub fn success(kind: OperationKind) -> Self {
        Self {
            correlates_to: kind,
            outcome: AckOutcome::Success,
        }
    }

    pub fn failure(kind: OperationKind, reason: impl Into<String>) -> Self {
        Self {
            correlates_to: kind,
            outcome: AckOutcome::Failure(reason.into()),
        }
    }
}

impl fmt::Display for Acknowledgment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            AckOutcome::Success => write!(f, "{} ok", self.correlates_to),
            AckOutcome::Failure(reason) => write!(f, "{} failed: {}", self.correlates_to, reason),
        }
    }
}
