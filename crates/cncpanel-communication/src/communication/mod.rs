//! Command channel abstraction
//!
//! A command channel hands discrete commands to the machine. Sending is
//! fire-and-forget: it fails only when the transport is unavailable, and the
//! machine's answer arrives later as a [`ChannelEvent`] on the panel's event
//! queue.
//!
//! [`ChannelEvent`]: cncpanel_core::ChannelEvent

pub mod loopback;

use cncpanel_core::{ChannelError, OperationKind};
use serde::{Deserialize, Serialize};

pub use loopback::LoopbackChannel;

/// Command directed at the machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum MachineCommand {
    /// Transfer a program
    Load { text: String },
    /// Execute a program from the beginning
    Start { text: String },
    /// Resume a held program
    Continue,
    /// Abort the current activity
    Stop,
    /// Home X, Y and Z
    HomeXyz,
    /// Probe along Z
    ProbeZ,
    /// Execute one ad-hoc line
    SendLine { line: String },
    /// Clear a fault on the machine side
    Reset,
}

impl MachineCommand {
    /// Operation this command answers to; `Reset` is not acknowledged
    pub fn kind(&self) -> Option<OperationKind> {
        match self {
            MachineCommand::Load { .. } => Some(OperationKind::Load),
            MachineCommand::Start { .. } => Some(OperationKind::Start),
            MachineCommand::Continue => Some(OperationKind::Continue),
            MachineCommand::Stop => Some(OperationKind::Stop),
            MachineCommand::HomeXyz => Some(OperationKind::HomeXyz),
            MachineCommand::ProbeZ => Some(OperationKind::ProbeZ),
            MachineCommand::SendLine { .. } => Some(OperationKind::SendLine),
            MachineCommand::Reset => None,
        }
    }
}

impl std::fmt::Display for MachineCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MachineCommand::Load { text } => write!(f, "Load ({} lines)", text.lines().count()),
            MachineCommand::Start { text } => {
                write!(f, "Start ({} lines)", text.lines().count())
            }
            MachineCommand::Continue => write!(f, "Continue"),
            MachineCommand::Stop => write!(f, "Stop"),
            MachineCommand::HomeXyz => write!(f, "Home XYZ"),
            MachineCommand::ProbeZ => write!(f, "Probe Z"),
            MachineCommand::SendLine { line } => write!(f, "Send '{}'", line),
            MachineCommand::Reset => write!(f, "Reset"),
        }
    }
}

/// Outbound side of the transport to the machine
pub trait CommandChannel: Send {
    /// Hand a command to the transport without waiting for the machine
    fn send(&mut self, command: MachineCommand) -> Result<(), ChannelError>;

    /// Name for logs
    fn name(&self) -> &str {
        "channel"
    }
}
