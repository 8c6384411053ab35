//! Panel controller
//!
//! Turns operator intents into commands and machine events into state. The
//! controller owns the session, the instruction buffer and the command
//! channel; it is driven from a single task, so none of them need locking.
//!
//! Every operator action goes through the same steps:
//! 1. the action must be in the enabled set,
//! 2. no other operation may be pending, unless the action is Stop,
//! 3. the pending operation is recorded, then the command is sent.
//!
//! After each handled intent or event a fresh [`DisplaySnapshot`] is pushed
//! to every registered surface.

use crate::error::{PanelError, PanelResult};
use crate::snapshot::{DisplaySnapshot, Notice, ProgramView};
use crate::surface::RenderSurface;
use chrono::{DateTime, Utc};
use cncpanel_communication::{CommandChannel, MachineCommand};
use cncpanel_core::{
    enabled_actions, Acknowledgment, ChannelEvent, ControlError, MachineSession,
    OperationKind, OperatorAction, OperatorIntent, Transition, TransitionOutcome,
};
use cncpanel_gcodeeditor::InstructionBuffer;
use cncpanel_settings::PanelSettings;
use std::collections::VecDeque;
use std::time::Duration;

/// Reason attached to acknowledgments synthesized by the watchdog
pub const ACK_TIMEOUT_REASON: &str = "acknowledgment timed out";

const DEFAULT_NOTICE_HISTORY: usize = 20;

pub struct PanelController {
    session: MachineSession,
    buffer: InstructionBuffer,
    channel: Box<dyn CommandChannel>,
    surfaces: Vec<Box<dyn RenderSurface>>,
    notices: VecDeque<Notice>,
    notice_history: usize,
}

impl PanelController {
    pub fn new(channel: Box<dyn CommandChannel>) -> Self {
        Self {
            session: MachineSession::new(),
            buffer: InstructionBuffer::new(),
            channel,
            surfaces: Vec::new(),
            notices: VecDeque::new(),
            notice_history: DEFAULT_NOTICE_HISTORY,
        }
    }

    pub fn from_settings(channel: Box<dyn CommandChannel>, settings: &PanelSettings) -> Self {
        let mut controller = Self::new(channel);
        controller.notice_history = settings.notice_history.max(1);
        controller
    }

    /// Register a surface and render the current state on it right away
    pub fn add_surface(&mut self, mut surface: Box<dyn RenderSurface>) {
        surface.render(&self.snapshot());
        self.surfaces.push(surface);
    }

    pub fn session(&self) -> &MachineSession {
        &self.session
    }

    pub fn buffer(&self) -> &InstructionBuffer {
        &self.buffer
    }

    /// Recent notices, oldest first
    pub fn notices(&self) -> impl Iterator<Item = &Notice> {
        self.notices.iter()
    }

    /// Build the current display projection
    pub fn snapshot(&self) -> DisplaySnapshot {
        DisplaySnapshot {
            phase: self.session.phase(),
            pending: self.session.pending().cloned(),
            enabled: self.session.enabled_actions(self.buffer.is_empty()),
            program: ProgramView {
                text: self.buffer.text(),
                line_count: self.buffer.line_count(),
                instruction_count: self.buffer.instruction_count(),
                dirty: self.buffer.is_dirty(),
                source_name: self.buffer.source_name().map(str::to_string),
            },
            active_line: self.session.active_line(),
            fault_reason: self.session.fault_reason().map(str::to_string),
            notice: self.notices.back().cloned(),
        }
    }

    /// Handle one operator intent
    ///
    /// Rejections and failures are reported to the surfaces as notices and
    /// also returned to the caller.
    pub fn handle_intent(&mut self, intent: OperatorIntent) -> PanelResult<()> {
        tracing::debug!("Operator intent: {:?}", intent);
        let result = self.apply_intent(intent);

        let notice = match &result {
            Ok(notice) => notice.clone(),
            Err(err) if err.is_recoverable() => {
                tracing::warn!("Operator action rejected: {}", err);
                Some(Notice::warning(err.to_string()))
            }
            Err(err) => {
                tracing::error!("Operator action failed: {}", err);
                Some(Notice::error(err.to_string()))
            }
        };
        self.publish(notice);
        result.map(|_| ())
    }

    /// Fold a machine event into the session and refresh the surfaces
    pub fn on_channel_event(&mut self, event: ChannelEvent) -> Transition {
        tracing::debug!("Channel event: {}", event);
        let transition = self.session.apply(&event);

        let notice = match &transition.outcome {
            TransitionOutcome::Applied => match &event {
                ChannelEvent::Acknowledgment(ack) => match ack.correlates_to {
                    OperationKind::Load => Some(Notice::success("Program loaded")),
                    OperationKind::HomeXyz | OperationKind::ProbeZ | OperationKind::Stop => {
                        Some(Notice::success(ack.to_string()))
                    }
                    _ => None,
                },
                _ => None,
            },
            TransitionOutcome::Ignored => None,
            TransitionOutcome::CommandFailed { kind, reason } => {
                let err = ControlError::CommandFailure {
                    kind: *kind,
                    reason: reason.clone(),
                };
                Some(Notice::warning(err.to_string()))
            }
            TransitionOutcome::Paused { reason } => Some(Notice::warning(
                reason.clone().unwrap_or_else(|| "Machine paused".to_string()),
            )),
            TransitionOutcome::Completed { message } => Some(Notice::success(
                message.clone().unwrap_or_else(|| "Program completed".to_string()),
            )),
            TransitionOutcome::Faulted { reason } => {
                Some(Notice::error(format!("Machine fault: {}", reason)))
            }
        };

        self.publish(notice);
        transition
    }

    /// Fail the pending operation if it has waited longer than `timeout`
    ///
    /// The failure is fed through [`on_channel_event`] exactly as if the
    /// machine had reported it. Returns the resulting transition, if any.
    ///
    /// [`on_channel_event`]: PanelController::on_channel_event
    pub fn expire_pending(&mut self, timeout: Duration, now: DateTime<Utc>) -> Option<Transition> {
        let pending = self.session.pending()?;
        let limit = chrono::Duration::from_std(timeout).ok()?;
        if pending.age(now) < limit {
            return None;
        }

        tracing::warn!("No acknowledgment for {} after {:?}", pending, timeout);
        let ack = Acknowledgment::failure(pending.kind, ACK_TIMEOUT_REASON);
        Some(self.on_channel_event(ChannelEvent::Acknowledgment(ack)))
    }

    fn apply_intent(&mut self, intent: OperatorIntent) -> PanelResult<Option<Notice>> {
        match intent {
            OperatorIntent::ButtonPressed(action) => self.press(action),
            OperatorIntent::TextSubmitted(text) => {
                self.send_line(&text)?;
                Ok(None)
            }
            OperatorIntent::ProgramOpened { text, source_name } => {
                self.load_program(&text, source_name)?;
                Ok(None)
            }
            OperatorIntent::BufferEdited(text) => {
                self.authorize(OperatorAction::EditBuffer)?;
                self.buffer.edit(&text, self.session.phase())?;
                Ok(None)
            }
        }
    }

    fn press(&mut self, action: OperatorAction) -> PanelResult<Option<Notice>> {
        match action {
            OperatorAction::Load => {
                let text = self.buffer.text();
                let source_name = self.buffer.source_name().map(str::to_string);
                self.load_program(&text, source_name)?;
            }
            OperatorAction::Start => {
                let text = self.buffer.text();
                self.dispatch(OperationKind::Start, MachineCommand::Start { text })?;
            }
            OperatorAction::Continue => {
                self.dispatch(OperationKind::Continue, MachineCommand::Continue)?;
            }
            OperatorAction::Stop => self.dispatch(OperationKind::Stop, MachineCommand::Stop)?,
            OperatorAction::HomeXyz => {
                self.dispatch(OperationKind::HomeXyz, MachineCommand::HomeXyz)?;
            }
            OperatorAction::ProbeZ => {
                self.dispatch(OperationKind::ProbeZ, MachineCommand::ProbeZ)?;
            }
            OperatorAction::SendLine => {
                return Err(ControlError::InvalidLine {
                    reason: "no console line given".to_string(),
                }
                .into());
            }
            // Editing happens through BufferEdited; the button only checks the gate
            OperatorAction::EditBuffer => self.authorize(action)?,
            OperatorAction::Reset => return self.reset().map(Some),
        }
        Ok(None)
    }

    /// Check the action against the gate and the pending operation
    fn authorize(&self, action: OperatorAction) -> Result<(), ControlError> {
        let phase = self.session.phase();
        let buffer_empty = self.buffer.is_empty();
        let pending = self
            .session
            .pending()
            .filter(|_| action != OperatorAction::Stop);

        if self.session.enabled_actions(buffer_empty).contains(action) {
            return match pending {
                Some(op) => Err(ControlError::OperationInProgress { pending: op.kind }),
                None => Ok(()),
            };
        }

        // Would the action be enabled if nothing were pending?
        match pending {
            Some(op) if enabled_actions(phase, false, buffer_empty).contains(action) => {
                Err(ControlError::OperationInProgress { pending: op.kind })
            }
            _ => {
                tracing::debug!("{} not in enabled set while {}", action, phase);
                Err(ControlError::ActionNotPermitted { action, phase })
            }
        }
    }

    /// Register the operation and send its command
    fn dispatch(&mut self, kind: OperationKind, command: MachineCommand) -> PanelResult<()> {
        self.authorize(kind.action())?;
        let operation = self.session.begin(kind)?;

        tracing::info!(
            operation = %operation,
            channel = self.channel.name(),
            "Sending {}",
            command
        );
        if let Err(err) = self.channel.send(command) {
            let fault = ControlError::from(err);
            self.session.fault(fault.to_string());
            return Err(fault.into());
        }

        if kind.consumes_program() {
            self.buffer.mark_clean();
        }
        Ok(())
    }

    /// Replace the buffer with `text` and transfer it to the machine
    fn load_program(&mut self, text: &str, source_name: Option<String>) -> PanelResult<()> {
        self.authorize(OperatorAction::Load)?;
        self.buffer.load(text, source_name)?;
        let text = self.buffer.text();
        self.dispatch(OperationKind::Load, MachineCommand::Load { text })
    }

    fn send_line(&mut self, input: &str) -> PanelResult<()> {
        let line = input.trim();
        if line.is_empty() {
            return Err(ControlError::InvalidLine {
                reason: "line is empty".to_string(),
            }
            .into());
        }
        if line.contains(['\n', '\r']) {
            return Err(ControlError::InvalidLine {
                reason: "only one line can be sent at a time".to_string(),
            }
            .into());
        }
        self.dispatch(
            OperationKind::SendLine,
            MachineCommand::SendLine {
                line: line.to_string(),
            },
        )
    }

    /// Operator-acknowledged recovery from a fault
    ///
    /// The machine is asked to reset first; if that cannot be sent the
    /// session stays faulted.
    fn reset(&mut self) -> PanelResult<Notice> {
        self.authorize(OperatorAction::Reset)?;
        self.channel
            .send(MachineCommand::Reset)
            .map_err(|err| PanelError::from(ControlError::from(err)))?;
        self.session.reset()?;
        Ok(Notice::info("Session reset"))
    }

    fn publish(&mut self, notice: Option<Notice>) {
        if let Some(notice) = &notice {
            if self.notices.len() == self.notice_history {
                self.notices.pop_front();
            }
            self.notices.push_back(notice.clone());
        }

        let snapshot = self.snapshot();
        for surface in &mut self.surfaces {
            if let Some(notice) = &notice {
                surface.notify(notice);
            }
            surface.render(&snapshot);
        }
    }
}

impl std::fmt::Debug for PanelController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanelController")
            .field("session", &self.session)
            .field("buffer", &self.buffer)
            .field("channel", &self.channel.name())
            .field("surfaces", &self.surfaces.len())
            .finish()
    }
}
