//! Error handling for the panel
//!
//! `PanelError` is what the controller hands back for a rejected or failed
//! operator intent. It wraps the errors of the layers underneath without
//! changing their messages.

use cncpanel_core::{ChannelError, ControlError};
use cncpanel_gcodeeditor::BufferError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PanelError {
    #[error(transparent)]
    Control(#[from] ControlError),

    #[error(transparent)]
    Buffer(#[from] BufferError),

    #[error(transparent)]
    Channel(#[from] ChannelError),
}

impl PanelError {
    /// Whether the session survives this error
    ///
    /// Only channel faults end the session; everything else is reported to
    /// the operator and the panel carries on.
    pub fn is_recoverable(&self) -> bool {
        match self {
            PanelError::Control(err) => err.is_recoverable(),
            PanelError::Buffer(_) => true,
            PanelError::Channel(_) => false,
        }
    }
}

pub type PanelResult<T> = std::result::Result<T, PanelError>;
