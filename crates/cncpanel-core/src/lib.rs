//! # CNC Panel Core
//!
//! Core types and coordination logic for the CNC panel.
//! Provides the session state machine, the action gate, the shared data
//! model and the serialized event queue that the panel controller consumes.

pub mod core;
pub mod data;
pub mod error;

pub use self::core::{
    enabled_actions, event_queue, ChannelEvent, EventReceiver, EventSender, GateInput,
    MachineSession, OperatorIntent, PanelEvent, Transition, TransitionOutcome,
};

pub use data::{
    AckOutcome, Acknowledgment, ActionSet, OperationKind, OperatorAction, PendingOperation,
    SessionPhase,
};

pub use error::{ChannelError, ControlError, Result};
