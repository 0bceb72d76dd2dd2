//! Extraction of firmware diagnostic text from the line stream.
//!
//! The firmware prints its log through the same link as the data records,
//! colored with ANSI foreground codes (`ESC[0;3<digit>m`) and terminated by a
//! style reset (`ESC[0m`). Untagged lines are appended here verbatim; on
//! drain the color codes are removed and the text is split on the reset
//! marker. Text after the last reset marker is kept for the next drain.

use crate::types::LogLine;

/// ANSI style reset that terminates a log entry
pub const ANSI_RESET: &str = "\u{1b}[0m";

const COLOR_PREFIX: &str = "\u{1b}[0;3";

/// Accumulates untagged text until it can be split into log lines
#[derive(Debug, Default)]
pub struct LogExtractor {
    pending: String,
}

impl LogExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the text of one untagged line
    pub fn push(&mut self, text: &str) {
        self.pending.push_str(text);
    }

    /// Whether any text is waiting, terminated or not
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Take every log line terminated by a reset marker, in arrival order.
    /// An unterminated tail stays buffered.
    pub fn drain(&mut self) -> Vec<LogLine> {
        let text = strip_color_codes(&self.pending);
        let (complete, tail) = match text.rfind(ANSI_RESET) {
            Some(idx) => text.split_at(idx + ANSI_RESET.len()),
            None => ("", text.as_str()),
        };

        let lines = complete
            .split(ANSI_RESET)
            .filter(|segment| !segment.is_empty())
            .map(LogLine::from)
            .collect();

        self.pending = tail.to_string();
        lines
    }
}

/// Remove every `ESC[0;3<digit>m` foreground color sequence
pub fn strip_color_codes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find(COLOR_PREFIX) {
        out.push_str(&rest[..idx]);
        let after = &rest[idx + COLOR_PREFIX.len()..];
        let mut chars = after.chars();
        match (chars.next(), chars.next()) {
            (Some(digit), Some('m')) if digit.is_ascii_digit() => {
                rest = &after[2..];
            }
            _ => {
                out.push_str(COLOR_PREFIX);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
