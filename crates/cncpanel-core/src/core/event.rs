//! Event system for the panel
//!
//! Provides:
//! - Inbound machine events delivered by command channels
//! - Operator intents forwarded by rendering surfaces
//! - The serialized panel event queue merging both streams

use crate::data::{Acknowledgment, OperatorAction};
use crate::error::ChannelError;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Event reported by the machine through a command channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelEvent {
    /// An issued operation was acknowledged
    Acknowledgment(Acknowledgment),
    /// The machine started executing a program line (0-based)
    Progress {
        /// Index of the program line being executed.
        line: usize,
    },
    /// The machine held the program on its own
    Paused {
        /// Message for the operator, e.g. a tool change request.
        reason: Option<String>,
    },
    /// The machine finished the program
    Completed {
        /// Optional completion message.
        message: Option<String>,
    },
    /// The transport broke; always fatal
    Fault {
        /// Description of the fault.
        reason: String,
    },
}

impl std::fmt::Display for ChannelEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelEvent::Acknowledgment(ack) => write!(f, "Ack: {}", ack),
            ChannelEvent::Progress { line } => write!(f, "Progress: line {}", line + 1),
            ChannelEvent::Paused { reason: Some(r) } => write!(f, "Paused: {}", r),
            ChannelEvent::Paused { reason: None } => write!(f, "Paused"),
            ChannelEvent::Completed { message: Some(m) } => write!(f, "Completed: {}", m),
            ChannelEvent::Completed { message: None } => write!(f, "Completed"),
            ChannelEvent::Fault { reason } => write!(f, "Fault: {}", reason),
        }
    }
}

/// Raw operator intent forwarded by a rendering surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorIntent {
    /// A panel control was pressed
    ButtonPressed(OperatorAction),
    /// A console line was submitted
    TextSubmitted(String),
    /// A program was opened from storage
    ProgramOpened {
        /// Program text.
        text: String,
        /// Where it came from, usually a file name.
        source_name: Option<String>,
    },
    /// The program text was edited in place
    BufferEdited(String),
}

/// One entry of the serialized panel event stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelEvent {
    Intent(OperatorIntent),
    Channel(ChannelEvent),
    /// Stop consuming events
    Shutdown,
}

/// Producer side of the panel event queue
///
/// Cloned into every surface and channel that feeds the panel.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<PanelEvent>,
}

impl EventSender {
    /// Enqueue an event
    pub fn send(&self, event: PanelEvent) -> Result<(), ChannelError> {
        self.tx.send(event).map_err(|_| ChannelError::Closed)
    }

    /// Forward an operator intent
    pub fn submit(&self, intent: OperatorIntent) -> Result<(), ChannelError> {
        self.send(PanelEvent::Intent(intent))
    }

    /// Deliver a machine event
    pub fn deliver(&self, event: ChannelEvent) -> Result<(), ChannelError> {
        self.send(PanelEvent::Channel(event))
    }

    /// Ask the consumer to stop
    pub fn shutdown(&self) -> Result<(), ChannelError> {
        self.send(PanelEvent::Shutdown)
    }

    /// Whether the consumer side is gone
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer side of the panel event queue
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::UnboundedReceiver<PanelEvent>,
}

impl EventReceiver {
    /// Wait for the next event; `None` once every sender is dropped
    pub async fn recv(&mut self) -> Option<PanelEvent> {
        self.rx.recv().await
    }

    /// Take the next event if one is queued
    pub fn try_recv(&mut self) -> Option<PanelEvent> {
        self.rx.try_recv().ok()
    }
}

/// Create the serialized panel event queue
pub fn event_queue() -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, EventReceiver { rx })
}
