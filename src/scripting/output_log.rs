/// `scripting/output_log.rs` — bounded script output log
///
/// Holds the last `OUTPUT_LOG_MAX_MESSAGES` lines printed by a script or
/// raised as errors. Two flavours exist:
///   * `SharedOutputLog` — the lock-free ring written by the audio thread
///     and polled by the control thread.
///   * `OutputLog` — a plain deque for single-threaded use (tests, tooling).

use std::{collections::VecDeque, fmt};

use serde::{Deserialize, Serialize};

use crate::audio::ring_buffer::RingBuffer;

pub const OUTPUT_LOG_MAX_MESSAGES: usize = 20;

/// Bytes of message text kept per entry. Longer messages are truncated.
pub const LOG_TEXT_CAPACITY: usize = 512;

pub type SharedOutputLog = RingBuffer<LogEntry, OUTPUT_LOG_MAX_MESSAGES>;

// ── LogKind ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    #[default]
    Text,
    Error,
}

impl LogKind {
    /// Numeric code used by the editor front-end (`0` text, `1` error).
    pub fn code(self) -> u8 {
        match self {
            LogKind::Text => 0,
            LogKind::Error => 1,
        }
    }
}

// ── LogText ───────────────────────────────────────────────────────────────────

/// Inline, fixed-capacity UTF-8 text so a log entry is a plain `Copy` value.
#[derive(Clone, Copy)]
pub struct LogText {
    bytes: [u8; LOG_TEXT_CAPACITY],
    len: u16,
}

impl LogText {
    pub fn new(text: &str) -> Self {
        let mut end = text.len().min(LOG_TEXT_CAPACITY);
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        let mut bytes = [0u8; LOG_TEXT_CAPACITY];
        bytes[..end].copy_from_slice(&text.as_bytes()[..end]);
        Self { bytes, len: end as u16 }
    }

    pub fn as_str(&self) -> &str {
        // Only ever filled from a `&str` cut on a char boundary.
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or_default()
    }
}

impl Default for LogText {
    fn default() -> Self {
        Self { bytes: [0u8; LOG_TEXT_CAPACITY], len: 0 }
    }
}

impl PartialEq for LogText {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl fmt::Debug for LogText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

// ── LogEntry ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LogEntry {
    pub text: LogText,
    pub kind: LogKind,
}

impl LogEntry {
    pub fn text(message: &str) -> Self {
        Self { text: LogText::new(message), kind: LogKind::Text }
    }

    pub fn error(message: &str) -> Self {
        Self { text: LogText::new(message), kind: LogKind::Error }
    }

    pub fn as_str(&self) -> &str {
        self.text.as_str()
    }
}

/// Owned form handed to the control surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogMessage {
    pub text: String,
    pub kind: LogKind,
}

impl From<&LogEntry> for LogMessage {
    fn from(entry: &LogEntry) -> Self {
        Self { text: entry.as_str().to_string(), kind: entry.kind }
    }
}

// ── OutputLog ─────────────────────────────────────────────────────────────────

/// Not thread-safe. Use `SharedOutputLog` across threads.
#[derive(Debug, Default)]
pub struct OutputLog {
    messages: VecDeque<LogMessage>,
}

impl OutputLog {
    pub fn new() -> Self {
        Self { messages: VecDeque::with_capacity(OUTPUT_LOG_MAX_MESSAGES) }
    }

    pub fn add(&mut self, message: LogMessage) {
        if self.messages.len() == OUTPUT_LOG_MAX_MESSAGES {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn front(&self) -> Option<&LogMessage> {
        self.messages.front()
    }

    pub fn back(&self) -> Option<&LogMessage> {
        self.messages.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogMessage> {
        self.messages.iter()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_text_truncates_on_char_boundary() {
        let long = "é".repeat(LOG_TEXT_CAPACITY);
        let text = LogText::new(&long);
        assert!(text.as_str().len() <= LOG_TEXT_CAPACITY);
        assert!(text.as_str().chars().all(|c| c == 'é'));
        assert_eq!(LogText::new("hello").as_str(), "hello");
    }

    #[test]
    fn output_log_keeps_most_recent() {
        let mut log = OutputLog::new();
        for i in 0..25 {
            log.add(LogMessage { text: i.to_string(), kind: LogKind::Text });
        }
        assert_eq!(log.len(), OUTPUT_LOG_MAX_MESSAGES);
        assert_eq!(log.front().unwrap().text, "5");
        assert_eq!(log.back().unwrap().text, "24");
    }

    #[test]
    fn shared_log_round_trip() {
        let log = SharedOutputLog::new();
        log.add(LogEntry::text("hello"));
        log.add(LogEntry::error("boom"));
        let entries = log.read();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].as_str(), "hello");
        assert_eq!(entries[0].kind, LogKind::Text);
        assert_eq!(entries[1].as_str(), "boom");
        assert_eq!(entries[1].kind, LogKind::Error);
    }

    #[test]
    fn kind_codes_match_front_end() {
        assert_eq!(LogKind::Text.code(), 0);
        assert_eq!(LogKind::Error.code(), 1);
    }
}
