//! Held Keys
//!
//! Most terminals never report key releases, only repeated presses. The
//! tracker turns that stream back into press/release pairs: a key counts as
//! released once its repeats stop arriving. Terminals that do report releases
//! bypass the timeout.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use companion_core::Direction;

/// Wait before the terminal's auto-repeat kicks in
pub const INITIAL_GRACE: Duration = Duration::from_millis(600);

/// Wait between auto-repeats
pub const REPEAT_GRACE: Duration = Duration::from_millis(150);

#[derive(Clone, Copy, Debug)]
struct Held {
    last_seen: Instant,
    repeated: bool,
}

/// Arrow keys currently considered down
#[derive(Debug, Default)]
pub struct KeyTracker {
    held: HashMap<Direction, Held>,
}

impl KeyTracker {
    /// No keys held
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A press or repeat arrived; true when the key was not already down
    pub fn press(&mut self, dir: Direction, now: Instant) -> bool {
        match self.held.get_mut(&dir) {
            Some(held) => {
                held.last_seen = now;
                held.repeated = true;
                false
            }
            None => {
                self.held.insert(
                    dir,
                    Held {
                        last_seen: now,
                        repeated: false,
                    },
                );
                true
            }
        }
    }

    /// An explicit release arrived; true when the key was down
    pub fn release(&mut self, dir: Direction) -> bool {
        self.held.remove(&dir).is_some()
    }

    /// Keys whose repeats stopped by `now`; they are forgotten
    pub fn expire(&mut self, now: Instant) -> Vec<Direction> {
        let mut released: Vec<Direction> = self
            .held
            .iter()
            .filter(|(_, held)| now >= held.last_seen + grace(held))
            .map(|(dir, _)| *dir)
            .collect();
        released.sort_by_key(|d| *d as u8);
        for dir in &released {
            self.held.remove(dir);
        }
        released
    }

    /// Keys still down
    #[must_use]
    pub fn is_held(&self, dir: Direction) -> bool {
        self.held.contains_key(&dir)
    }
}

fn grace(held: &Held) -> Duration {
    if held.repeated {
        REPEAT_GRACE
    } else {
        INITIAL_GRACE
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_repeats_do_not_repress() {
        let now = Instant::now();
        let mut keys = KeyTracker::new();
        assert!(keys.press(Direction::Left, now));
        assert!(!keys.press(Direction::Left, now + Duration::from_millis(30)));
        assert!(keys.is_held(Direction::Left));
    }

    #[test]
    fn test_single_press_survives_until_repeat_delay() {
        let now = Instant::now();
        let mut keys = KeyTracker::new();
        keys.press(Direction::Up, now);

        assert!(keys.expire(now + Duration::from_millis(500)).is_empty());
        assert_eq!(keys.expire(now + INITIAL_GRACE), vec![Direction::Up]);
        assert!(!keys.is_held(Direction::Up));
    }

    #[test]
    fn test_repeating_key_releases_quickly_after_last_repeat() {
        let now = Instant::now();
        let mut keys = KeyTracker::new();
        keys.press(Direction::Right, now);
        let last = now + Duration::from_millis(700);
        keys.press(Direction::Right, last);

        assert!(keys.expire(last + Duration::from_millis(100)).is_empty());
        assert_eq!(keys.expire(last + REPEAT_GRACE), vec![Direction::Right]);
    }

    #[test]
    fn test_explicit_release() {
        let now = Instant::now();
        let mut keys = KeyTracker::new();
        keys.press(Direction::Down, now);
        assert!(keys.release(Direction::Down));
        assert!(!keys.release(Direction::Down));
        assert!(keys.expire(now + INITIAL_GRACE).is_empty());
    }
}
