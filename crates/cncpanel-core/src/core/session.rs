//! Machine session state machine
//!
//! Authoritative model of what the machine is doing. Operations are
//! registered with [`MachineSession::begin`] before their command is sent,
//! and machine events are folded in with [`MachineSession::apply`].
//!
//! At most one operation is pending at a time. `Stop` is the exception: it
//! is accepted while another operation is outstanding and replaces it.

use crate::core::event::ChannelEvent;
use crate::core::gate::enabled_actions;
use crate::data::{
    AckOutcome, Acknowledgment, ActionSet, OperationKind, PendingOperation, SessionPhase,
};
use crate::error::ControlError;
use serde::Serialize;

/// What applying an event meant for the operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TransitionOutcome {
    /// State advanced normally
    Applied,
    /// Event did not correlate with the session and was dropped
    Ignored,
    /// The machine reported failure for an operation
    CommandFailed {
        kind: OperationKind,
        reason: String,
    },
    /// The machine held the program
    Paused { reason: Option<String> },
    /// The machine finished the program
    Completed { message: Option<String> },
    /// The session is now faulted
    Faulted { reason: String },
}

/// Result of a state machine step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub from: SessionPhase,
    pub to: SessionPhase,
    pub outcome: TransitionOutcome,
}

impl Transition {
    fn new(from: SessionPhase, to: SessionPhase, outcome: TransitionOutcome) -> Self {
        Self { from, to, outcome }
    }

    /// Whether the phase changed
    pub fn phase_changed(&self) -> bool {
        self.from != self.to
    }
}

/// Session state owned by the panel controller
#[derive(Debug, Clone, Default)]
pub struct MachineSession {
    phase: SessionPhase,
    pending: Option<PendingOperation>,
    active_line: Option<usize>,
    fault_reason: Option<String>,
}

impl MachineSession {
    /// Create a session in `Idle`
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn pending(&self) -> Option<&PendingOperation> {
        self.pending.as_ref()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Program line last reported by the machine
    pub fn active_line(&self) -> Option<usize> {
        self.active_line
    }

    /// Reason for the current fault, if faulted
    pub fn fault_reason(&self) -> Option<&str> {
        self.fault_reason.as_deref()
    }

    /// Actions enabled for the current session state
    pub fn enabled_actions(&self, buffer_empty: bool) -> ActionSet {
        enabled_actions(self.phase, self.has_pending(), buffer_empty)
    }

    /// Register an operation that is about to be sent
    ///
    /// Applies the issue-time transition and records the pending operation.
    /// The caller sends the command only if this succeeds.
    pub fn begin(&mut self, kind: OperationKind) -> Result<PendingOperation, ControlError> {
        let from = self.phase;
        let target = Self::issue_target(kind, from).ok_or(ControlError::ActionNotPermitted {
            action: kind.action(),
            phase: from,
        })?;

        match (&self.pending, kind) {
            (Some(pending), OperationKind::Stop) => {
                tracing::info!("Stop preempts pending {}", pending);
            }
            (Some(pending), _) => {
                return Err(ControlError::OperationInProgress {
                    pending: pending.kind,
                });
            }
            (None, _) => {}
        }

        let operation = PendingOperation::new(kind);
        self.pending = Some(operation.clone());
        self.phase = target;
        if kind == OperationKind::Start {
            self.active_line = None;
        }

        tracing::info!(
            operation = %operation,
            "Issued {}: {} -> {}",
            kind,
            from,
            target
        );
        Ok(operation)
    }

    /// Phase entered when `kind` is issued from `phase`, if legal
    fn issue_target(kind: OperationKind, phase: SessionPhase) -> Option<SessionPhase> {
        use SessionPhase::*;

        match (kind, phase) {
            (OperationKind::Load, Idle | Ready) => Some(Loading),
            (OperationKind::HomeXyz, Idle | Ready) => Some(Homing),
            (OperationKind::ProbeZ, Idle | Ready) => Some(Probing),
            (OperationKind::Start, Ready) => Some(Running),
            (OperationKind::Continue, Paused) => Some(Running),
            (OperationKind::SendLine, Ready | Paused) => Some(phase),
            (OperationKind::Stop, Idle | Faulted) => None,
            (OperationKind::Stop, _) => Some(Stopping),
            _ => None,
        }
    }

    /// Fold a machine event into the session
    pub fn apply(&mut self, event: &ChannelEvent) -> Transition {
        match event {
            ChannelEvent::Acknowledgment(ack) => self.apply_ack(ack),
            ChannelEvent::Progress { line } => self.apply_progress(*line),
            ChannelEvent::Paused { reason } => self.apply_pause(reason.clone()),
            ChannelEvent::Completed { message } => self.apply_completed(message.clone()),
            ChannelEvent::Fault { reason } => self.fault(reason.clone()),
        }
    }

    /// Force the session into `Faulted`
    ///
    /// Used for channel faults, including a send that failed at the
    /// transport level.
    pub fn fault(&mut self, reason: impl Into<String>) -> Transition {
        let reason = reason.into();
        let from = self.phase;
        if let Some(pending) = self.pending.take() {
            tracing::debug!("Dropping pending {} on fault", pending);
        }
        self.phase = SessionPhase::Faulted;
        self.fault_reason = Some(reason.clone());
        tracing::error!("Session faulted from {}: {}", from, reason);
        Transition::new(from, self.phase, TransitionOutcome::Faulted { reason })
    }

    /// Operator-acknowledged recovery from `Faulted`
    pub fn reset(&mut self) -> Result<Transition, ControlError> {
        if self.phase != SessionPhase::Faulted {
            return Err(ControlError::ActionNotPermitted {
                action: crate::data::OperatorAction::Reset,
                phase: self.phase,
            });
        }
        self.pending = None;
        self.active_line = None;
        self.fault_reason = None;
        self.phase = SessionPhase::Idle;
        tracing::info!("Session reset: Faulted -> Idle");
        Ok(Transition::new(
            SessionPhase::Faulted,
            SessionPhase::Idle,
            TransitionOutcome::Applied,
        ))
    }

    fn apply_ack(&mut self, ack: &Acknowledgment) -> Transition {
        let from = self.phase;
        let correlates = self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.kind == ack.correlates_to);
        if !correlates {
            tracing::debug!("Ignoring stale acknowledgment '{}' in {}", ack, from);
            return Transition::new(from, from, TransitionOutcome::Ignored);
        }
        self.pending = None;

        let kind = ack.correlates_to;
        match &ack.outcome {
            AckOutcome::Success => {
                self.phase = match kind {
                    OperationKind::Load | OperationKind::HomeXyz | OperationKind::ProbeZ => {
                        SessionPhase::Ready
                    }
                    OperationKind::Stop => {
                        self.active_line = None;
                        SessionPhase::Idle
                    }
                    OperationKind::Start | OperationKind::Continue | OperationKind::SendLine => {
                        from
                    }
                };
                tracing::info!("{} acknowledged: {} -> {}", kind, from, self.phase);
                Transition::new(from, self.phase, TransitionOutcome::Applied)
            }
            AckOutcome::Failure(reason) => match kind {
                OperationKind::SendLine => {
                    tracing::warn!("Console line rejected by machine: {}", reason);
                    Transition::new(
                        from,
                        from,
                        TransitionOutcome::CommandFailed {
                            kind,
                            reason: reason.clone(),
                        },
                    )
                }
                OperationKind::Load => {
                    tracing::warn!("Program rejected by machine: {}", reason);
                    self.phase = SessionPhase::Idle;
                    Transition::new(
                        from,
                        self.phase,
                        TransitionOutcome::CommandFailed {
                            kind,
                            reason: reason.clone(),
                        },
                    )
                }
                _ => self.fault(format!("{} failed: {}", kind, reason)),
            },
        }
    }

    /// Clear a pending Start/Continue once the machine shows it is executing
    fn settle_program_pending(&mut self) {
        if self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.kind.consumes_program())
        {
            self.pending = None;
        }
    }

    fn apply_progress(&mut self, line: usize) -> Transition {
        let phase = self.phase;
        match phase {
            SessionPhase::Running => {
                self.settle_program_pending();
                self.active_line = Some(line);
                Transition::new(phase, phase, TransitionOutcome::Applied)
            }
            SessionPhase::Paused | SessionPhase::Stopping => {
                self.active_line = Some(line);
                Transition::new(phase, phase, TransitionOutcome::Applied)
            }
            _ => {
                tracing::debug!("Ignoring progress for line {} in {}", line, phase);
                Transition::new(phase, phase, TransitionOutcome::Ignored)
            }
        }
    }

    fn apply_pause(&mut self, reason: Option<String>) -> Transition {
        let from = self.phase;
        if from != SessionPhase::Running {
            tracing::debug!("Ignoring pause in {}", from);
            return Transition::new(from, from, TransitionOutcome::Ignored);
        }
        self.settle_program_pending();
        self.phase = SessionPhase::Paused;
        tracing::info!("Machine paused: {}", reason.as_deref().unwrap_or("no reason"));
        Transition::new(from, self.phase, TransitionOutcome::Paused { reason })
    }

    fn apply_completed(&mut self, message: Option<String>) -> Transition {
        let from = self.phase;
        if from != SessionPhase::Running {
            tracing::debug!("Ignoring completion in {}", from);
            return Transition::new(from, from, TransitionOutcome::Ignored);
        }
        self.settle_program_pending();
        self.phase = SessionPhase::Ready;
        tracing::info!("Program completed");
        Transition::new(from, self.phase, TransitionOutcome::Completed { message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::OperatorAction;
    use proptest::prelude::*;

    fn ack_ok(kind: OperationKind) -> ChannelEvent {
        ChannelEvent::Acknowledgment(Acknowledgment::success(kind))
    }

    fn ack_err(kind: OperationKind, reason: &str) -> ChannelEvent {
        ChannelEvent::Acknowledgment(Acknowledgment::failure(kind, reason))
    }

    fn ready_session() -> MachineSession {
        let mut session = MachineSession::new();
        session.begin(OperationKind::Load).unwrap();
        session.apply(&ack_ok(OperationKind::Load));
        assert_eq!(session.phase(), SessionPhase::Ready);
        session
    }

    fn running_session() -> MachineSession {
        let mut session = ready_session();
        session.begin(OperationKind::Start).unwrap();
        session.apply(&ack_ok(OperationKind::Start));
        session
    }

    #[test]
    fn test_starts_idle() {
        let session = MachineSession::new();
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(!session.has_pending());
        assert_eq!(session.active_line(), None);
    }

    #[test]
    fn test_load_round_trip() {
        let mut session = MachineSession::new();
        let op = session.begin(OperationKind::Load).unwrap();
        assert_eq!(op.kind, OperationKind::Load);
        assert_eq!(session.phase(), SessionPhase::Loading);
        assert!(session.has_pending());

        let t = session.apply(&ack_ok(OperationKind::Load));
        assert_eq!(t.from, SessionPhase::Loading);
        assert_eq!(t.to, SessionPhase::Ready);
        assert!(!session.has_pending());
    }

    #[test]
    fn test_load_failure_returns_to_idle() {
        let mut session = MachineSession::new();
        session.begin(OperationKind::Load).unwrap();
        let t = session.apply(&ack_err(OperationKind::Load, "syntax error"));
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(matches!(t.outcome, TransitionOutcome::CommandFailed { .. }));
    }

    #[test]
    fn test_start_pending_until_ack() {
        let mut session = ready_session();
        session.begin(OperationKind::Start).unwrap();
        assert_eq!(session.phase(), SessionPhase::Running);
        assert_eq!(session.pending().map(|p| p.kind), Some(OperationKind::Start));

        let t = session.apply(&ack_ok(OperationKind::Start));
        assert_eq!(t.to, SessionPhase::Running);
        assert!(!session.has_pending());
    }

    #[test]
    fn test_progress_clears_start_pending() {
        let mut session = ready_session();
        session.begin(OperationKind::Start).unwrap();
        session.apply(&ChannelEvent::Progress { line: 3 });
        assert!(!session.has_pending());
        assert_eq!(session.active_line(), Some(3));

        // The late ack no longer correlates
        let t = session.apply(&ack_ok(OperationKind::Start));
        assert_eq!(t.outcome, TransitionOutcome::Ignored);
    }

    #[test]
    fn test_second_operation_rejected_while_pending() {
        let mut session = ready_session();
        session.begin(OperationKind::SendLine).unwrap();
        let err = session.begin(OperationKind::HomeXyz).unwrap_err();
        assert_eq!(
            err,
            ControlError::OperationInProgress {
                pending: OperationKind::SendLine
            }
        );
        assert_eq!(session.phase(), SessionPhase::Ready);
    }

    #[test]
    fn test_stop_preempts_pending() {
        let mut session = MachineSession::new();
        session.begin(OperationKind::HomeXyz).unwrap();
        let op = session.begin(OperationKind::Stop).unwrap();
        assert_eq!(session.phase(), SessionPhase::Stopping);
        assert_eq!(session.pending(), Some(&op));

        // Late homing ack is stale
        let t = session.apply(&ack_ok(OperationKind::HomeXyz));
        assert_eq!(t.outcome, TransitionOutcome::Ignored);
        assert_eq!(session.phase(), SessionPhase::Stopping);

        session.apply(&ack_ok(OperationKind::Stop));
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(!session.has_pending());
    }

    #[test]
    fn test_stop_not_allowed_from_idle() {
        let mut session = MachineSession::new();
        assert_eq!(
            session.begin(OperationKind::Stop),
            Err(ControlError::ActionNotPermitted {
                action: OperatorAction::Stop,
                phase: SessionPhase::Idle
            })
        );
    }

    #[test]
    fn test_homing_failure_faults() {
        let mut session = MachineSession::new();
        session.begin(OperationKind::HomeXyz).unwrap();
        let t = session.apply(&ack_err(OperationKind::HomeXyz, "limit switch"));
        assert_eq!(session.phase(), SessionPhase::Faulted);
        assert!(matches!(t.outcome, TransitionOutcome::Faulted { .. }));
        assert_eq!(session.fault_reason(), Some("Home XYZ failed: limit switch"));
    }

    #[test]
    fn test_stop_failure_faults() {
        let mut session = running_session();
        session.begin(OperationKind::Stop).unwrap();
        assert_eq!(session.phase(), SessionPhase::Stopping);

        let t = session.apply(&ack_err(OperationKind::Stop, "spindle still turning"));
        assert_eq!(t.from, SessionPhase::Stopping);
        assert_eq!(session.phase(), SessionPhase::Faulted);
        assert!(!session.has_pending());
        assert_eq!(session.fault_reason(), Some("Stop failed: spindle still turning"));
    }

    #[test]
    fn test_start_failure_faults() {
        let mut session = ready_session();
        session.begin(OperationKind::Start).unwrap();
        assert_eq!(session.phase(), SessionPhase::Running);

        let t = session.apply(&ack_err(OperationKind::Start, "door open"));
        assert!(matches!(t.outcome, TransitionOutcome::Faulted { .. }));
        assert_eq!(session.phase(), SessionPhase::Faulted);
        assert!(!session.has_pending());
        assert_eq!(session.fault_reason(), Some("Start failed: door open"));
    }

    #[test]
    fn test_continue_failure_faults() {
        let mut session = running_session();
        session.apply(&ChannelEvent::Paused { reason: None });
        session.begin(OperationKind::Continue).unwrap();

        session.apply(&ack_err(OperationKind::Continue, "tool not seated"));
        assert_eq!(session.phase(), SessionPhase::Faulted);
        assert!(!session.has_pending());
        assert_eq!(session.fault_reason(), Some("Continue failed: tool not seated"));
    }

    #[test]
    fn test_probe_success_readies() {
        let mut session = MachineSession::new();
        session.begin(OperationKind::ProbeZ).unwrap();
        assert_eq!(session.phase(), SessionPhase::Probing);
        session.apply(&ack_ok(OperationKind::ProbeZ));
        assert_eq!(session.phase(), SessionPhase::Ready);
    }

    #[test]
    fn test_pause_and_continue() {
        let mut session = running_session();
        let t = session.apply(&ChannelEvent::Paused {
            reason: Some("Please insert tool #2".to_string()),
        });
        assert_eq!(session.phase(), SessionPhase::Paused);
        assert_eq!(
            t.outcome,
            TransitionOutcome::Paused {
                reason: Some("Please insert tool #2".to_string())
            }
        );

        session.begin(OperationKind::Continue).unwrap();
        assert_eq!(session.phase(), SessionPhase::Running);
        session.apply(&ack_ok(OperationKind::Continue));
        assert!(!session.has_pending());
    }

    #[test]
    fn test_send_line_keeps_phase() {
        let mut session = running_session();
        session.apply(&ChannelEvent::Paused { reason: None });
        session.begin(OperationKind::SendLine).unwrap();
        assert_eq!(session.phase(), SessionPhase::Paused);

        let t = session.apply(&ack_err(OperationKind::SendLine, "bad word"));
        assert_eq!(session.phase(), SessionPhase::Paused);
        assert!(!session.has_pending());
        assert!(matches!(t.outcome, TransitionOutcome::CommandFailed { .. }));
    }

    #[test]
    fn test_completion_returns_to_ready() {
        let mut session = running_session();
        session.apply(&ChannelEvent::Progress { line: 9 });
        let t = session.apply(&ChannelEvent::Completed { message: None });
        assert_eq!(t.to, SessionPhase::Ready);
        assert_eq!(session.active_line(), Some(9));
    }

    #[test]
    fn test_channel_fault_clears_pending() {
        let mut session = MachineSession::new();
        session.begin(OperationKind::HomeXyz).unwrap();
        session.apply(&ChannelEvent::Fault {
            reason: "serial port vanished".to_string(),
        });
        assert_eq!(session.phase(), SessionPhase::Faulted);
        assert!(!session.has_pending());
        assert_eq!(
            session.enabled_actions(false),
            ActionSet::empty().with(OperatorAction::Reset)
        );
    }

    #[test]
    fn test_reset_only_from_faulted() {
        let mut session = MachineSession::new();
        assert!(session.reset().is_err());

        session.fault("boom");
        let t = session.reset().unwrap();
        assert_eq!(t.to, SessionPhase::Idle);
        assert_eq!(session.fault_reason(), None);
    }

    fn event_strategy() -> impl Strategy<Value = Step> {
        let kinds = vec![
            OperationKind::Load,
            OperationKind::Start,
            OperationKind::Continue,
            OperationKind::Stop,
            OperationKind::HomeXyz,
            OperationKind::ProbeZ,
            OperationKind::SendLine,
        ];
        prop_oneof![
            proptest::sample::select(kinds.clone()).prop_map(Step::Begin),
            proptest::sample::select(kinds.clone()).prop_map(|k| Step::Event(ack_ok(k))),
            proptest::sample::select(kinds).prop_map(|k| Step::Event(ack_err(k, "nope"))),
            (0usize..50).prop_map(|line| Step::Event(ChannelEvent::Progress { line })),
            Just(Step::Event(ChannelEvent::Paused { reason: None })),
            Just(Step::Event(ChannelEvent::Completed { message: None })),
            Just(Step::Event(ChannelEvent::Fault {
                reason: "lost".to_string()
            })),
            Just(Step::Reset),
        ]
    }

    #[derive(Debug, Clone)]
    enum Step {
        Begin(OperationKind),
        Event(ChannelEvent),
        Reset,
    }

    proptest! {
        #[test]
        fn prop_single_pending_except_stop(steps in proptest::collection::vec(event_strategy(), 0..60)) {
            let mut session = MachineSession::new();
            for step in steps {
                match step {
                    Step::Begin(kind) => {
                        let before = session.pending().cloned();
                        match session.begin(kind) {
                            Ok(op) => {
                                // A begin that succeeds over an outstanding op must be Stop
                                if before.is_some() {
                                    prop_assert_eq!(kind, OperationKind::Stop);
                                }
                                prop_assert_eq!(session.pending(), Some(&op));
                            }
                            Err(_) => prop_assert_eq!(session.pending().cloned(), before),
                        }
                    }
                    Step::Event(event) => {
                        session.apply(&event);
                    }
                    Step::Reset => {
                        let _ = session.reset();
                    }
                }
                if session.phase() == SessionPhase::Faulted {
                    prop_assert!(!session.has_pending());
                }
                if session.phase() == SessionPhase::Idle {
                    prop_assert!(!session.has_pending());
                }
            }
        }
    }
}
