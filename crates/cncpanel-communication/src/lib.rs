//! # CNC Panel Communication
//!
//! Command channels connecting the panel to a machine.
//!
//! - **CommandChannel**: fire-and-forget outbound commands
//! - **LoopbackChannel**: records commands, for tests and dry runs
//! - **EmulatorChannel**: a simulated machine running on tokio tasks
//!
//! Replies never come back through the channel itself. They are delivered as
//! [`cncpanel_core::ChannelEvent`]s on the panel's event queue.

pub mod communication;
pub mod emulator;

pub use communication::{CommandChannel, LoopbackChannel, MachineCommand};
pub use emulator::{EmulatorChannel, EmulatorConfig};
