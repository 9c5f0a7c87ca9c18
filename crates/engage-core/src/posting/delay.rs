//! Human-like delay patterns for posting operations (§4.8).
//!
//! A poster applies these before submitting a reply so automated posting
//! doesn't arrive at a suspiciously constant cadence: reading the original
//! content, typing a response, and a final review each take some amount of
//! simulated time, all with natural jitter layered on top.

use rand::Rng;
use std::time::Duration;

/// Typing speed, in words-per-minute ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingSpeed {
    Slow,
    Average,
    Fast,
}

impl TypingSpeed {
    fn wpm_range(self) -> (f64, f64) {
        match self {
            TypingSpeed::Slow => (30.0, 50.0),
            TypingSpeed::Average => (40.0, 70.0),
            TypingSpeed::Fast => (60.0, 90.0),
        }
    }
}

/// Reading comprehension level, in words-per-minute ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComprehensionLevel {
    Skim,
    Normal,
    Careful,
}

impl ComprehensionLevel {
    fn wpm_range(self) -> (f64, f64) {
        match self {
            ComprehensionLevel::Skim => (300.0, 450.0),
            ComprehensionLevel::Normal => (200.0, 300.0),
            ComprehensionLevel::Careful => (100.0, 200.0),
        }
    }
}

/// Average characters per word, used to convert text length to a word count.
const CHARS_PER_WORD: f64 = 5.0;

/// Seconds it would take a human to type `text_length` characters, including
/// thinking pauses and typo-correction time. Never returns less than 3s.
pub fn typing_delay(text_length: usize, speed: TypingSpeed) -> Duration {
    let mut rng = rand::thread_rng();
    let words = text_length as f64 / CHARS_PER_WORD;
    let (min_wpm, max_wpm) = speed.wpm_range();
    let wpm = rng.gen_range(min_wpm..=max_wpm);
    let base_time = (words / wpm) * 60.0;

    let pause_count = ((words / 20.0) as u32).max(1);
    let thinking_time: f64 = (0..pause_count).map(|_| rng.gen_range(1.0..=4.0)).sum();

    let typo_time = rng.gen_range(0.0..=(words * 0.1).max(0.0001));

    let total = (base_time + thinking_time + typo_time) * rng.gen_range(0.9..=1.1);
    Duration::from_secs_f64(total.max(3.0))
}

/// Seconds it would take a human to read and comprehend `text_length`
/// characters, plus focus/scroll time. Never returns less than 5s.
pub fn reading_delay(text_length: usize, level: ComprehensionLevel) -> Duration {
    let mut rng = rand::thread_rng();
    let words = text_length as f64 / CHARS_PER_WORD;
    let (min_wpm, max_wpm) = level.wpm_range();
    let wpm = rng.gen_range(min_wpm..=max_wpm);
    let base_time = (words / wpm) * 60.0;

    let scroll_time = if words > 100.0 { rng.gen_range(1.0..=3.0) } else { 0.0 };
    let focus_time = rng.gen_range(2.0..=5.0);

    Duration::from_secs_f64((base_time + scroll_time + focus_time).max(5.0))
}

/// Full read-then-respond delay: reading the original post, typing a reply,
/// navigating to the reply box, and a final review pass before submitting.
pub fn human_like_delay(
    original_text_length: usize,
    response_text_length: usize,
    include_navigation: bool,
) -> Duration {
    let mut rng = rand::thread_rng();
    let reading = reading_delay(original_text_length, ComprehensionLevel::Normal);
    let typing = typing_delay(response_text_length, TypingSpeed::Average);
    let navigation = if include_navigation {
        Duration::from_secs_f64(rng.gen_range(3.0..=8.0))
    } else {
        Duration::ZERO
    };
    let review = Duration::from_secs_f64(rng.gen_range(2.0..=5.0));

    reading + typing + navigation + review
}

/// Apply +/- `jitter_fraction` random jitter to a delay.
pub fn jitter(base: Duration, jitter_fraction: f64) -> Duration {
    let base_secs = base.as_secs_f64();
    let spread = base_secs * jitter_fraction;
    let mut rng = rand::thread_rng();
    let jittered = base_secs + rng.gen_range(-spread..=spread);
    Duration::from_secs_f64(jittered.max(0.0))
}

/// Delay between consecutive posts, triangularly distributed around the
/// midpoint of `[min, max]` so most gaps cluster near the middle rather than
/// spreading uniformly.
pub fn inter_post_delay(min: Duration, max: Duration) -> Duration {
    let min_s = min.as_secs_f64();
    let max_s = max.as_secs_f64().max(min_s);
    let mode = (min_s + max_s) / 2.0;
    let mut rng = rand::thread_rng();
    let u: f64 = rng.gen_range(0.0..=1.0);
    let f = (mode - min_s) / (max_s - min_s).max(f64::EPSILON);
    let base = if u < f {
        min_s + (u * (max_s - min_s) * (mode - min_s)).sqrt()
    } else {
        max_s - ((1.0 - u) * (max_s - min_s) * (max_s - mode)).sqrt()
    };
    jitter(Duration::from_secs_f64(base), 0.1)
}

/// Remaining cooldown before it's safe to post to the same subreddit again.
/// Zero once `previous_post_age >= min_gap`.
pub fn subreddit_cooldown_delay(previous_post_age: Duration, min_gap: Duration) -> Duration {
    if previous_post_age >= min_gap {
        return Duration::ZERO;
    }
    jitter(min_gap - previous_post_age, 0.1)
}

/// A multiplier reflecting how posting speed naturally varies over the day:
/// slower late at night, a touch faster during the morning rush, normal
/// through the day, and a little slower in the evening.
pub fn time_of_day_multiplier(hour: u32) -> f64 {
    let mut rng = rand::thread_rng();
    if !(6..23).contains(&hour) {
        rng.gen_range(1.2..=1.5)
    } else if (7..9).contains(&hour) {
        rng.gen_range(0.9..=1.0)
    } else if (9..18).contains(&hour) {
        rng.gen_range(0.95..=1.05)
    } else {
        rng.gen_range(1.0..=1.15)
    }
}
