//! Instruction buffer
//!
//! Holds the program the operator loaded or edited, plus its dirty flag and
//! source name. The buffer is owned by the panel controller; surfaces only
//! ever see copies of its text.

use crate::error::{BufferError, BufferResult};
use crate::text_buffer::TextBuffer;
use cncpanel_core::SessionPhase;

/// The panel's current program
#[derive(Debug, Clone, Default)]
pub struct InstructionBuffer {
    text: TextBuffer,
    dirty: bool,
    source_name: Option<String>,
}

impl InstructionBuffer {
    /// Create an empty, clean buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the content with a freshly loaded program
    ///
    /// Clears the dirty flag and records where the program came from.
    pub fn load(&mut self, text: &str, source_name: Option<String>) -> BufferResult<()> {
        validate(text)?;
        self.text = TextBuffer::from(text);
        self.dirty = false;
        self.source_name = source_name;
        tracing::debug!(
            "Loaded {} lines from {}",
            self.text.len_lines(),
            self.source_name.as_deref().unwrap_or("<unnamed>")
        );
        Ok(())
    }

    /// Load raw bytes, rejecting anything that is not UTF-8
    pub fn load_bytes(&mut self, bytes: &[u8], source_name: Option<String>) -> BufferResult<()> {
        let text = std::str::from_utf8(bytes).map_err(|err| {
            let valid = &bytes[..err.valid_up_to()];
            // The valid prefix is UTF-8 by construction
            let prefix = std::str::from_utf8(valid).unwrap_or_default();
            let (line, column) = position_after(prefix);
            BufferError::InvalidEncoding {
                line,
                column,
                reason: "invalid UTF-8 sequence".to_string(),
            }
        })?;
        self.load(text, source_name)
    }

    /// Replace the content with edited text
    ///
    /// Refused while the machine is running, homing or probing.
    pub fn edit(&mut self, new_text: &str, phase: SessionPhase) -> BufferResult<()> {
        if phase.is_motion() {
            return Err(BufferError::BufferLocked { phase });
        }
        validate(new_text)?;
        self.text = TextBuffer::from(new_text);
        self.dirty = true;
        Ok(())
    }

    /// Record that the machine consumed the buffer as its active program
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn source_name(&self) -> Option<&str> {
        self.source_name.as_deref()
    }

    /// Full program text
    pub fn text(&self) -> String {
        self.text.to_string()
    }

    /// A single line without terminator
    pub fn line(&self, idx: usize) -> Option<String> {
        self.text.line(idx)
    }

    /// All lines without terminators
    pub fn lines(&self) -> Vec<String> {
        self.text.lines()
    }

    pub fn line_count(&self) -> usize {
        self.text.len_lines()
    }

    /// Number of lines with actual content
    pub fn instruction_count(&self) -> usize {
        self.text.count_non_blank()
    }

    /// True when there is nothing the machine could execute
    pub fn is_empty(&self) -> bool {
        self.instruction_count() == 0
    }
}

/// 1-based line and column just past `prefix`
fn position_after(prefix: &str) -> (usize, usize) {
    let line = prefix.matches('\n').count() + 1;
    let column = prefix
        .rsplit('\n')
        .next()
        .map(|tail| tail.chars().count() + 1)
        .unwrap_or(1);
    (line, column)
}

/// Check that text is line-oriented: no control characters besides tab and
/// line terminators, and only `\n` / `\r\n` as terminators.
fn validate(text: &str) -> BufferResult<()> {
    let mut line = 1;
    let mut column = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        let reason = match c {
            '\n' => {
                line += 1;
                column = 1;
                continue;
            }
            '\r' if chars.peek() == Some(&'\n') => None,
            '\r' => Some("bare carriage return".to_string()),
            '\t' => None,
            '\u{2028}' | '\u{2029}' => Some(format!("line separator U+{:04X}", c as u32)),
            c if c.is_control() => Some(format!("control character U+{:04X}", c as u32)),
            _ => None,
        };

        if let Some(reason) = reason {
            return Err(BufferError::InvalidEncoding {
                line,
                column,
                reason,
            });
        }
        column += 1;
    }
    Ok(())
}
