//! # CNC Panel G-Code Editor
//!
//! Instruction buffer for the panel's program.
//!
//! - **InstructionBuffer**: the loaded or edited program, its dirty flag and
//!   source name, with phase-aware edit locking
//! - **TextBuffer**: rope-based text storage behind it
//!
//! ```rust,ignore
//! use cncpanel_gcodeeditor::InstructionBuffer;
//!
//! let mut buffer = InstructionBuffer::new();
//! buffer.load("G0 X0\nG1 X10\n", Some("part.gcode".into()))?;
//! assert_eq!(buffer.line_count(), 2);
//! ```

pub mod error;
mod instruction_buffer;
mod text_buffer;

pub use error::{BufferError, BufferResult};
pub use instruction_buffer::InstructionBuffer;
pub use text_buffer::TextBuffer;
