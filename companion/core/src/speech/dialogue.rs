//! Dialogue Book
//!
//! Everything the character knows how to say: greetings by time of day,
//! jokes, facts and short scripted conversations. The book is built once and
//! injected into the coordinator; picks are random.

use chrono::Timelike;
use rand::seq::SliceRandom;

/// Lines the character can say
#[derive(Clone, Debug)]
pub struct DialogueBook {
    /// Greetings for 05:00–11:59
    pub morning: Vec<String>,
    /// Greetings for 12:00–17:59
    pub afternoon: Vec<String>,
    /// Greetings for 18:00–21:59
    pub evening: Vec<String>,
    /// Greetings for 22:00–04:59
    pub night: Vec<String>,
    /// Jokes
    pub jokes: Vec<String>,
    /// Facts
    pub facts: Vec<String>,
    /// Scripted conversations, each a list of lines
    pub conversations: Vec<Vec<String>>,
}

/// Part of the day a greeting belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DayPart {
    /// 05:00–11:59
    Morning,
    /// 12:00–17:59
    Afternoon,
    /// 18:00–21:59
    Evening,
    /// 22:00–04:59
    Night,
}

impl DayPart {
    /// Day part for an hour of the day (0–23)
    #[must_use]
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => Self::Morning,
            12..=17 => Self::Afternoon,
            18..=21 => Self::Evening,
            _ => Self::Night,
        }
    }

    /// Day part of the local clock
    #[must_use]
    pub fn now() -> Self {
        Self::from_hour(chrono::Local::now().hour())
    }
}

fn lines(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

impl Default for DialogueBook {
    fn default() -> Self {
        Self {
            morning: lines(&[
                "Good morning! Did you sleep well?",
                "Morning! I already stretched all my fluff.",
                "Rise and shine! Coffee first, windows later.",
            ]),
            afternoon: lines(&[
                "Good afternoon! How is your day going?",
                "Hello again! Lunch was a while ago, right?",
                "Afternoon! Perfect time for a little walk.",
            ]),
            evening: lines(&[
                "Good evening! Time to slow down a bit.",
                "Evening already? The day went by fast.",
            ]),
            night: lines(&[
                "It's late! Don't forget to rest.",
                "Psst... it's the middle of the night.",
            ]),
            jokes: lines(&[
                "Why did the window go to therapy? Too many panes.",
                "I tried to catch fog yesterday. Mist.",
                "What do you call a sleepy fluffball? A snooze-ball.",
                "Why don't edges ever argue? They always meet at the corner.",
            ]),
            facts: lines(&[
                "Cats sleep for about two thirds of their lives.",
                "Honey never spoils if it is sealed.",
                "A group of flamingos is called a flamboyance.",
                "Octopuses have three hearts.",
            ]),
            conversations: vec![
                lines(&[
                    "Hey, can I tell you something?",
                    "I like walking on top of your windows.",
                    "It feels like a tiny mountain range.",
                    "Just don't close them while I'm up there!",
                ]),
                lines(&[
                    "Do you ever wonder what the desktop looks like at night?",
                    "I do. It's very quiet.",
                    "Except for the fans. They hum a lot.",
                ]),
            ],
        }
    }
}

impl DialogueBook {
    /// Greetings for a day part
    #[must_use]
    pub fn greetings(&self, part: DayPart) -> &[String] {
        match part {
            DayPart::Morning => &self.morning,
            DayPart::Afternoon => &self.afternoon,
            DayPart::Evening => &self.evening,
            DayPart::Night => &self.night,
        }
    }

    /// A greeting for the current local time
    #[must_use]
    pub fn greeting(&self) -> Option<String> {
        self.greeting_for(DayPart::now())
    }

    /// A greeting for a given day part
    #[must_use]
    pub fn greeting_for(&self, part: DayPart) -> Option<String> {
        pick(self.greetings(part))
    }

    /// A random joke
    #[must_use]
    pub fn joke(&self) -> Option<String> {
        pick(&self.jokes)
    }

    /// A random fact
    #[must_use]
    pub fn fact(&self) -> Option<String> {
        pick(&self.facts)
    }

    /// A random conversation script
    #[must_use]
    pub fn conversation(&self) -> Option<Vec<String>> {
        self.conversations.choose(&mut rand::thread_rng()).cloned()
    }

    /// Sample line for a newly chosen voice
    #[must_use]
    pub fn voice_sample(voice: super::VoiceType) -> String {
        format!("Hi! This is my {} voice.", voice.label().to_lowercase())
    }
}

fn pick(items: &[String]) -> Option<String> {
    items.choose(&mut rand::thread_rng()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_parts_cover_every_hour() {
        assert_eq!(DayPart::from_hour(0), DayPart::Night);
        assert_eq!(DayPart::from_hour(5), DayPart::Morning);
        assert_eq!(DayPart::from_hour(11), DayPart::Morning);
        assert_eq!(DayPart::from_hour(12), DayPart::Afternoon);
        assert_eq!(DayPart::from_hour(18), DayPart::Evening);
        assert_eq!(DayPart::from_hour(22), DayPart::Night);
    }

    #[test]
    fn test_picks_come_from_the_book() {
        let book = DialogueBook::default();
        let joke = book.joke().expect("joke");
        assert!(book.jokes.contains(&joke));
        let greeting = book.greeting_for(DayPart::Evening).expect("greeting");
        assert!(book.evening.contains(&greeting));
        assert!(book.conversation().is_some_and(|c| c.len() >= 2));
    }

    #[test]
    fn test_empty_book_picks_nothing() {
        let book = DialogueBook {
            jokes: Vec::new(),
            ..DialogueBook::default()
        };
        assert!(book.joke().is_none());
    }
}
