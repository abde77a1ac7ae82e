//! Text overlay for operators.

use std::fmt::{Display, Write as _};

/// Accumulates `key: value` lines until rendered.
#[derive(Debug, Default, Clone)]
pub struct DebugOverlay {
    lines: Vec<String>,
}

impl DebugOverlay {
    /// Creates an empty overlay.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a raw line.
    pub fn add_line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Appends `key: value`.
    pub fn add_value(&mut self, key: &str, value: impl Display) {
        self.lines.push(format!("{key}: {value}"));
    }

    /// Number of pending lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Joins pending lines and clears the buffer.
    pub fn render(&mut self) -> String {
        let mut text = String::new();
        for line in self.lines.drain(..) {
            let _ = writeln!(text, "{line}");
        }
        text
    }
}
