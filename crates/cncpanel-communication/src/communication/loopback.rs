//! Loopback channel
//!
//! Records every command instead of talking to a machine. Clones share the
//! same record, so a test can keep one handle while the panel owns another.
//! Acknowledgments are delivered by whoever drives the panel's event queue.

use super::{CommandChannel, MachineCommand};
use cncpanel_core::ChannelError;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Default)]
struct LoopbackState {
    sent: Vec<MachineCommand>,
    unavailable: Option<String>,
}

/// Command channel that only records what it was asked to send
#[derive(Debug, Clone, Default)]
pub struct LoopbackChannel {
    state: Arc<Mutex<LoopbackState>>,
}

impl LoopbackChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands sent so far, oldest first
    pub fn sent(&self) -> Vec<MachineCommand> {
        self.state.lock().sent.clone()
    }

    /// Most recently sent command
    pub fn last_sent(&self) -> Option<MachineCommand> {
        self.state.lock().sent.last().cloned()
    }

    /// Forget recorded commands
    pub fn clear(&self) {
        self.state.lock().sent.clear();
    }

    /// Make every following send fail with `Unavailable`
    pub fn disconnect(&self, reason: impl Into<String>) {
        self.state.lock().unavailable = Some(reason.into());
    }

    /// Accept sends again
    pub fn reconnect(&self) {
        self.state.lock().unavailable = None;
    }
}

impl CommandChannel for LoopbackChannel {
    fn send(&mut self, command: MachineCommand) -> Result<(), ChannelError> {
        let mut state = self.state.lock();
        if let Some(reason) = &state.unavailable {
            return Err(ChannelError::Unavailable {
                reason: reason.clone(),
            });
        }
        tracing::debug!("loopback <- {}", command);
        state.sent.push(command);
        Ok(())
    }

    fn name(&self) -> &str {
        "loopback"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_through_clones() {
        let probe = LoopbackChannel::new();
        let mut channel = probe.clone();

        channel.send(MachineCommand::HomeXyz).unwrap();
        channel
            .send(MachineCommand::SendLine {
                line: "M114".to_string(),
            })
            .unwrap();

        assert_eq!(probe.sent().len(), 2);
        assert_eq!(
            probe.last_sent(),
            Some(MachineCommand::SendLine {
                line: "M114".to_string()
            })
        );
    }

    #[test]
    fn test_disconnect() {
        let probe = LoopbackChannel::new();
        let mut channel = probe.clone();
        probe.disconnect("cable pulled");

        assert_eq!(
            channel.send(MachineCommand::Stop),
            Err(ChannelError::Unavailable {
                reason: "cable pulled".to_string()
            })
        );
        assert!(probe.sent().is_empty());

        probe.reconnect();
        assert!(channel.send(MachineCommand::Stop).is_ok());
    }
}
