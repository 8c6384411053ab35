//! # CNC Panel UI
//!
//! The operator-facing half of the panel, independent of any toolkit:
//!
//! - **PanelController**: gates operator actions, mutates the buffer and
//!   issues commands
//! - **PanelRuntime**: the serialized event loop driving the controller
//! - **RenderSurface**: what a display must implement; `BroadcastSurface`
//!   republishes updates for async observers
//! - **DisplaySnapshot** / **Notice**: what surfaces are given to show

pub mod controller;
pub mod error;
pub mod runtime;
pub mod snapshot;
pub mod surface;

pub use controller::{PanelController, ACK_TIMEOUT_REASON};
pub use error::{PanelError, PanelResult};
pub use runtime::PanelRuntime;
pub use snapshot::{DisplaySnapshot, Notice, NoticeLevel, ProgramView};
pub use surface::{BroadcastSurface, RenderSurface, SurfaceUpdate};
