//! Calendar event types shared by every backend.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// An event to be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    /// Event title.
    pub title: String,
    /// Start time.
    pub start: DateTime<FixedOffset>,
    /// End time. Backends reject an end that precedes the start.
    pub end: DateTime<FixedOffset>,
    /// Free-text description.
    pub description: Option<String>,
    /// Free-text location.
    pub location: Option<String>,
    /// Attendee email addresses.
    pub attendees: Vec<String>,
}

impl NewEvent {
    /// Creates an event with no optional fields.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            title: title.into(),
            start,
            end,
            description: None,
            location: None,
            attendees: Vec::new(),
        }
    }
}

/// When an event starts or ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTime {
    /// A specific instant.
    DateTime(DateTime<FixedOffset>),
    /// An all-day event on the given date.
    AllDay(NaiveDate),
}

impl EventTime {
    /// Returns the calendar date in the event's own offset.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::DateTime(at) => at.date_naive(),
            Self::AllDay(date) => *date,
        }
    }

    /// Returns the wall-clock time, all-day events sorting at midnight.
    #[must_use]
    pub fn naive_local(&self) -> NaiveDateTime {
        match self {
            Self::DateTime(at) => at.naive_local(),
            Self::AllDay(date) => date.and_time(chrono::NaiveTime::MIN),
        }
    }
}

/// An event as read back from a calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Backend-assigned identifier.
    pub id: String,
    /// Title, which calendars allow to be absent.
    pub summary: Option<String>,
    /// Start time.
    pub start: EventTime,
    /// End time, if known.
    pub end: Option<EventTime>,
    /// Link to the event in the calendar UI.
    pub link: Option<String>,
}

/// Result of a successful create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedEvent {
    /// Backend-assigned identifier.
    pub id: String,
    /// Title as stored.
    pub summary: String,
    /// Start time.
    pub start: DateTime<FixedOffset>,
    /// End time.
    pub end: DateTime<FixedOffset>,
    /// Link to the event in the calendar UI.
    pub link: Option<String>,
}
