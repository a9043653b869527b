use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Per-character delays used while revealing streamed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealSchedule {
    pub whitespace_ms: u64,
    pub punctuation_ms: u64,
    pub opening_ms: u64,
    pub base_ms: u64,
    /// Characters at the start of a message that use `opening_ms`.
    pub opening_chars: usize,
}

impl Default for RevealSchedule {
    fn default() -> Self {
        Self {
            whitespace_ms: 3,
            punctuation_ms: 25,
            opening_ms: 40,
            base_ms: 12,
            opening_chars: 10,
        }
    }
}

impl RevealSchedule {
    /// Delay before showing `ch`, the `index`-th character of the message.
    pub fn delay_for(&self, ch: char, index: usize) -> Duration {
        let ms = match ch {
            ' ' | '\n' => self.whitespace_ms,
            '.' | '!' | '?' | ',' | ';' | ':' => self.punctuation_ms,
            _ if index < self.opening_chars => self.opening_ms,
            _ => self.base_ms,
        };
        Duration::from_millis(ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealState {
    /// Everything received so far is on screen.
    Idle,
    /// The next character appears at `due`.
    Revealing { due: Instant },
}

/// Replays received text one character at a time.
///
/// The animator only tracks how much of the source is visible; the source
/// itself stays owned by the message, so the visible text is always a prefix
/// of the latest content.
#[derive(Debug)]
pub struct RevealAnimator {
    schedule: RevealSchedule,
    state: RevealState,
    /// Byte offset into the source.
    shown: usize,
    /// Characters revealed so far.
    shown_chars: usize,
    cancelled: bool,
}

impl RevealAnimator {
    pub fn new(schedule: RevealSchedule) -> Self {
        Self {
            schedule,
            state: RevealState::Idle,
            shown: 0,
            shown_chars: 0,
            cancelled: false,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> RevealState {
        self.state
    }

    #[cfg(test)]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Advance against the latest `source`. Returns the time until the next
    /// step is due, or `None` when nothing is pending.
    pub fn update(&mut self, source: &str, streaming: bool, now: Instant) -> Option<Duration> {
        if self.cancelled {
            return None;
        }

        if self.shown > source.len() {
            // Source was replaced by something shorter.
            self.shown = floor_char_boundary(source, source.len());
            self.shown_chars = source[..self.shown].chars().count();
        }

        if !streaming {
            self.shown = source.len();
            self.shown_chars = source.chars().count();
            self.state = RevealState::Idle;
            return None;
        }

        let mut due = match self.state {
            RevealState::Revealing { due } => due,
            RevealState::Idle => {
                let next = source[self.shown..].chars().next()?;
                now + self.schedule.delay_for(next, self.shown_chars)
            }
        };

        while due <= now {
            let Some(ch) = source[self.shown..].chars().next() else {
                break;
            };
            self.shown += ch.len_utf8();
            self.shown_chars += 1;

            match source[self.shown..].chars().next() {
                Some(next) => due += self.schedule.delay_for(next, self.shown_chars),
                None => break,
            }
        }

        if self.shown >= source.len() {
            self.state = RevealState::Idle;
            None
        } else {
            self.state = RevealState::Revealing { due };
            Some(due.saturating_duration_since(now))
        }
    }

    /// Portion of `source` currently visible.
    pub fn displayed<'a>(&self, source: &'a str) -> &'a str {
        let end = floor_char_boundary(source, self.shown.min(source.len()));
        &source[..end]
    }

    /// Drop any pending step. A cancelled animator never advances again.
    pub fn cancel(&mut self) {
        self.state = RevealState::Idle;
        self.cancelled = true;
    }
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}
