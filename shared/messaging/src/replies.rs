//! Canned bot replies and the simulated latency that goes with them.
//!
//! Replies come from an ordered rule table: the first rule with a keyword
//! contained in the lowercased input wins. Selection is pure once the wall
//! clock is supplied, so the same input and time always give the same reply.

use chrono::{Local, NaiveTime};
use rand::Rng;
use std::time::Duration;

/// Reply for empty input.
pub const CONFUSED_REPLY: &str = "Huh?";

/// What a matching rule answers with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyTemplate {
    Fixed(&'static str),
    /// `It's HH:MM.` rendered from the supplied clock.
    ClockTime,
}

impl ReplyTemplate {
    fn render(&self, now: NaiveTime) -> String {
        match self {
            ReplyTemplate::Fixed(text) => (*text).to_string(),
            ReplyTemplate::ClockTime => format!("It's {}.", now.format("%H:%M")),
        }
    }
}

/// A keyword set mapped to a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyRule {
    pub keywords: &'static [&'static str],
    pub template: ReplyTemplate,
}

impl ReplyRule {
    fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|k| lowered.contains(k))
    }
}

/// Ordered rule table. Order is significant.
#[derive(Debug, Clone)]
pub struct ReplyTable {
    rules: Vec<ReplyRule>,
}

impl ReplyTable {
    pub fn new(rules: Vec<ReplyRule>) -> Self {
        Self { rules }
    }

    /// Pick the reply for `input` as of `now`.
    pub fn select(&self, input: &str, now: NaiveTime) -> String {
        if input.is_empty() {
            return CONFUSED_REPLY.to_string();
        }
        let lowered = input.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&lowered))
            .map(|rule| rule.template.render(now))
            .unwrap_or_else(|| format!("You said: {}. That's interesting!", input))
    }
}

impl Default for ReplyTable {
    fn default() -> Self {
        Self::new(vec![
            ReplyRule {
                keywords: &["hello", "hi"],
                template: ReplyTemplate::Fixed("Hello! How can I help you today?"),
            },
            ReplyRule {
                keywords: &["time"],
                template: ReplyTemplate::ClockTime,
            },
            ReplyRule {
                keywords: &["joke"],
                template: ReplyTemplate::Fixed(
                    "Why do programmers prefer dark mode? Because light attracts bugs. 🐛",
                ),
            },
            ReplyRule {
                keywords: &["weather"],
                template: ReplyTemplate::Fixed(
                    "Sun is shining in this demo world ☀️ — pretend it's warm!",
                ),
            },
            ReplyRule {
                keywords: &["help"],
                template: ReplyTemplate::Fixed(
                    "Try: 'Tell me a joke', 'What is the time', or 'Export chat'.",
                ),
            },
        ])
    }
}

/// Reply for `input` using the default table and the local wall clock.
pub fn select_reply(input: &str) -> String {
    ReplyTable::default().select(input, Local::now().time())
}

/// Simulated latencies for one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingPolicy {
    /// Minimum delay before an outgoing message is marked sent.
    pub send_latency: Duration,
    /// Upper bound (exclusive) of the random extra send delay.
    pub send_jitter: Duration,
    /// Fixed part of the typing delay.
    pub typing_base: Duration,
    pub typing_per_word: Duration,
    pub typing_max: Duration,
}

impl TimingPolicy {
    /// Delay before the outgoing message flips to sent.
    pub fn send_delay(&self) -> Duration {
        self.send_delay_with(&mut rand::thread_rng())
    }

    pub fn send_delay_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let jitter_ms = self.send_jitter.as_millis() as u64;
        let extra = if jitter_ms == 0 {
            0
        } else {
            rng.gen_range(0..jitter_ms)
        };
        self.send_latency.saturating_add(Duration::from_millis(extra))
    }

    /// "Typing time" for a reply, growing with its word count up to a cap.
    pub fn typing_delay(&self, reply: &str) -> Duration {
        let words = reply.split_whitespace().count().max(1) as u32;
        self.typing_per_word
            .saturating_mul(words)
            .saturating_add(self.typing_base)
            .min(self.typing_max)
    }
}

impl Default for TimingPolicy {
    fn default() -> Self {
        Self {
            send_latency: Duration::from_millis(250),
            send_jitter: Duration::from_millis(400),
            typing_base: Duration::from_millis(1200),
            typing_per_word: Duration::from_millis(90),
            typing_max: Duration::from_millis(3000),
        }
    }
}
