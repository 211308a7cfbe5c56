//! Timer Queue
//!
//! Deadlines owned by the coordination loop. The loop sleeps until the
//! earliest one (or until an event arrives), then pops everything due. Nothing
//! here blocks.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use tokio::time::Instant;

use crate::speech::{ConversationToken, SpeechToken};

/// What a timer does when it fires
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimerKind {
    /// The speech bubble's display duration ran out
    SpeechExpiry(SpeechToken),
    /// Speak the next line of a conversation
    ConversationAdvance(ConversationToken),
    /// Held-key repeat
    MovementTick,
}

/// Ordered set of pending deadlines
#[derive(Debug, Default)]
pub struct TimerQueue {
    heap: BinaryHeap<Reverse<(Instant, u64, TimerKind)>>,
    seq: u64,
}

impl TimerQueue {
    /// Create an empty queue
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a deadline; timers with equal deadlines fire in insertion order
    pub fn schedule(&mut self, at: Instant, kind: TimerKind) {
        self.seq += 1;
        self.heap.push(Reverse((at, self.seq, kind)));
    }

    /// Drop every timer matching `pred`
    pub fn cancel_where(&mut self, mut pred: impl FnMut(&TimerKind) -> bool) {
        self.heap.retain(|Reverse((_, _, kind))| !pred(kind));
    }

    /// Whether any pending timer matches `pred`
    #[must_use]
    pub fn contains(&self, mut pred: impl FnMut(&TimerKind) -> bool) -> bool {
        self.heap.iter().any(|Reverse((_, _, kind))| pred(kind))
    }

    /// Earliest deadline
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.heap.peek().map(|Reverse((at, _, _))| *at)
    }

    /// Remove and return the earliest timer due at `now`
    pub fn pop_due(&mut self, now: Instant) -> Option<TimerKind> {
        match self.heap.peek() {
            Some(Reverse((at, _, _))) if *at <= now => self.heap.pop().map(|Reverse((_, _, k))| k),
            _ => None,
        }
    }

    /// Number of pending timers
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether no timers are pending
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_pops_in_deadline_order() {
        let mut timers = TimerQueue::new();
        let t0 = Instant::now();
        timers.schedule(t0 + Duration::from_millis(30), TimerKind::MovementTick);
        timers.schedule(t0 + Duration::from_millis(10), TimerKind::SpeechExpiry(SpeechToken(1)));

        assert_eq!(timers.next_deadline(), Some(t0 + Duration::from_millis(10)));
        assert_eq!(timers.pop_due(t0), None);
        assert_eq!(
            timers.pop_due(t0 + Duration::from_millis(40)),
            Some(TimerKind::SpeechExpiry(SpeechToken(1)))
        );
        assert_eq!(timers.pop_due(t0 + Duration::from_millis(40)), Some(TimerKind::MovementTick));
        assert!(timers.is_empty());
    }

    #[test]
    fn test_equal_deadlines_keep_insertion_order() {
        let mut timers = TimerQueue::new();
        let t0 = Instant::now();
        timers.schedule(t0, TimerKind::MovementTick);
        timers.schedule(t0, TimerKind::SpeechExpiry(SpeechToken(1)));
        assert_eq!(timers.pop_due(t0), Some(TimerKind::MovementTick));
    }

    #[test]
    fn test_cancel_where() {
        let mut timers = TimerQueue::new();
        let t0 = Instant::now();
        timers.schedule(t0, TimerKind::MovementTick);
        timers.schedule(t0, TimerKind::ConversationAdvance(ConversationToken(2)));

        timers.cancel_where(|k| matches!(k, TimerKind::MovementTick));
        assert_eq!(timers.len(), 1);
        assert!(!timers.contains(|k| *k == TimerKind::MovementTick));
    }
}
