//! Rendering of dates, identifiers and guessed intents for chat replies.

use crate::messages::{ALL_DAY, CONFIRM_PROMPT};
use chrono::{DateTime, FixedOffset, NaiveDate};
use chronobot_ai::{Intent, Slots};
use chronobot_integration::EventTime;
use std::fmt::Write;

/// Visible prefix length of event identifiers.
const SHORT_ID_LEN: usize = 8;

/// `27.11.2025 15:00`, in the timestamp's own offset.
#[must_use]
pub fn datetime(at: &DateTime<FixedOffset>) -> String {
    at.format("%d.%m.%Y %H:%M").to_string()
}

/// `27.11.2025`.
#[must_use]
pub fn date(day: NaiveDate) -> String {
    day.format("%d.%m.%Y").to_string()
}

/// `15:00`, or the all-day label.
#[must_use]
pub fn time_of_day(time: &EventTime) -> String {
    match time {
        EventTime::DateTime(at) => at.format("%H:%M").to_string(),
        EventTime::AllDay(_) => ALL_DAY.to_string(),
    }
}

/// Date and time, or date with the all-day label.
#[must_use]
pub fn event_time(time: &EventTime) -> String {
    match time {
        EventTime::DateTime(at) => datetime(at),
        EventTime::AllDay(day) => format!("{}, {ALL_DAY}", date(*day)),
    }
}

/// First eight characters of an identifier followed by `...`.
#[must_use]
pub fn short_id(id: &str) -> String {
    let prefix: String = id.chars().take(SHORT_ID_LEN).collect();
    format!("{prefix}...")
}

fn action(intent: Intent) -> &'static str {
    match intent {
        Intent::Create => "создать событие",
        Intent::List => "показать события",
        Intent::Delete => "удалить событие",
        Intent::Unknown => "выполнить действие",
    }
}

/// Human-readable summary of a guess, ending with the yes/no prompt.
#[must_use]
pub fn confirmation(intent: Intent, slots: &Slots) -> String {
    let mut text = format!("Я правильно понял, что нужно {}?", action(intent));

    // Writing to a String cannot fail.
    if let Some(title) = &slots.title {
        let _ = write!(text, "\nНазвание: {title}");
    }
    if let Some(start) = &slots.start {
        let _ = write!(text, "\nВремя начала: {}", datetime(start));
    }
    if let Some(end) = &slots.end {
        let _ = write!(text, "\nВремя окончания: {}", datetime(end));
    }
    if let Some(day) = slots.date {
        let _ = write!(text, "\nДата: {}", date(day));
    }
    if let Some(location) = &slots.location {
        let _ = write!(text, "\nМесто: {location}");
    }
    if let Some(participants) = &slots.participants {
        let _ = write!(text, "\nУчастники: {}", participants.join(", "));
    }

    text.push_str("\n\n");
    text.push_str(CONFIRM_PROMPT);
    text
}
