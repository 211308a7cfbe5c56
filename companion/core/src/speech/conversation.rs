//! Scripted Conversations
//!
//! A conversation is a fixed list of lines spoken one after another. The
//! queue keeps an index cursor; the coordinator advances it from a timer after
//! each line ends, so no two lines ever overlap.

use std::time::Duration;

/// Seconds of display per character of a conversation line
const SECONDS_PER_CHAR: f64 = 0.1;

/// Shortest display time of a conversation line
const MIN_LINE_SECS: f64 = 2.0;

/// Longest display time of a conversation line
const MAX_LINE_SECS: f64 = 4.0;

/// Display duration of one conversation line
///
/// `clamp(chars * 0.1, 2.0, 4.0)` seconds.
#[must_use]
pub fn conversation_line_duration(text: &str) -> Duration {
    let chars = text.chars().count() as f64;
    Duration::from_secs_f64((chars * SECONDS_PER_CHAR).clamp(MIN_LINE_SECS, MAX_LINE_SECS))
}

/// Identifier of one conversation run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConversationToken(pub u64);

/// A sequential queue of lines with an index cursor
#[derive(Clone, Debug)]
pub struct Conversation {
    token: ConversationToken,
    lines: Vec<String>,
    cursor: usize,
}

impl Conversation {
    /// Create a conversation; empty lines are dropped
    #[must_use]
    pub fn new(token: ConversationToken, lines: Vec<String>) -> Self {
        let lines = lines
            .into_iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        Self {
            token,
            lines,
            cursor: 0,
        }
    }

    /// Token of this run
    #[must_use]
    pub fn token(&self) -> ConversationToken {
        self.token
    }

    /// Take the next line and its display duration, moving the cursor
    pub fn next_line(&mut self) -> Option<(String, Duration)> {
        let line = self.lines.get(self.cursor)?.clone();
        self.cursor += 1;
        let duration = conversation_line_duration(&line);
        Some((line, duration))
    }

    /// Lines already handed out
    #[must_use]
    pub fn spoken(&self) -> usize {
        self.cursor
    }

    /// Total lines
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the script has no lines at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Whether every line has been handed out
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.cursor >= self.lines.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_duration_is_clamped() {
        assert_eq!(conversation_line_duration(&"a".repeat(5)), Duration::from_secs(2));
        assert_eq!(conversation_line_duration(&"a".repeat(20)), Duration::from_secs(2));
        assert_eq!(conversation_line_duration(&"a".repeat(100)), Duration::from_secs(4));
    }

    #[test]
    fn test_line_duration_between_bounds() {
        let d = conversation_line_duration(&"a".repeat(30));
        assert!((d.as_secs_f64() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_duration_counts_characters_not_bytes() {
        // 25 multi-byte characters
        let d = conversation_line_duration(&"ü".repeat(25));
        assert!((d.as_secs_f64() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_cursor_walks_lines_in_order() {
        let mut c = Conversation::new(
            ConversationToken(1),
            vec!["Hello!".into(), "  ".into(), "How are you?".into()],
        );
        assert_eq!(c.len(), 2);
        assert_eq!(c.next_line().map(|(l, _)| l).as_deref(), Some("Hello!"));
        assert!(!c.is_finished());
        assert_eq!(c.next_line().map(|(l, _)| l).as_deref(), Some("How are you?"));
        assert!(c.is_finished());
        assert!(c.next_line().is_none());
        assert_eq!(c.spoken(), 2);
    }
}
