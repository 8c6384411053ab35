//! Rope storage for program text

use ropey::Rope;
use std::fmt;

/// Rope-backed program text
///
/// Lines are exposed without their terminators. A trailing newline does not
/// start an extra line.
#[derive(Clone, Default)]
pub struct TextBuffer {
    rope: Rope,
}

impl TextBuffer {
    /// Create a new empty text buffer
    pub fn new() -> Self {
        Self { rope: Rope::new() }
    }

    /// Get the total length in chars
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    /// Number of text lines
    pub fn len_lines(&self) -> usize {
        let lines = self.rope.len_lines();
        if self.rope.len_chars() == 0 {
            0
        } else if self.ends_with_newline() {
            lines - 1
        } else {
            lines
        }
    }

    /// Get a line of text without its terminator
    pub fn line(&self, line_idx: usize) -> Option<String> {
        if line_idx < self.len_lines() {
            Some(strip_terminator(self.rope.line(line_idx).to_string()))
        } else {
            None
        }
    }

    /// All lines without terminators
    pub fn lines(&self) -> Vec<String> {
        (0..self.len_lines())
            .map(|idx| strip_terminator(self.rope.line(idx).to_string()))
            .collect()
    }

    /// Count lines that carry something other than whitespace
    pub fn count_non_blank(&self) -> usize {
        self.rope
            .lines()
            .filter(|line| line.chars().any(|c| !c.is_whitespace()))
            .count()
    }

    fn ends_with_newline(&self) -> bool {
        let len = self.rope.len_chars();
        len > 0 && self.rope.char(len - 1) == '\n'
    }
}

fn strip_terminator(mut line: String) -> String {
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    line
}

impl From<&str> for TextBuffer {
    fn from(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
        }
    }
}

impl fmt::Display for TextBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rope)
    }
}

impl fmt::Debug for TextBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextBuffer")
            .field("chars", &self.len_chars())
            .field("lines", &self.len_lines())
            .finish()
    }
}
