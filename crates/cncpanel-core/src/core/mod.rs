//! Panel coordination primitives
//!
//! - `event`: machine events, operator intents and the serialized queue
//! - `gate`: the action gate
//! - `session`: the machine session state machine

pub mod event;
pub mod gate;
pub mod session;

pub use event::{event_queue, ChannelEvent, EventReceiver, EventSender, OperatorIntent, PanelEvent};
pub use gate::{enabled_actions, GateInput};
pub use session::{MachineSession, Transition, TransitionOutcome};
