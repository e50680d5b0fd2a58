//! In-memory calendar.
//!
//! Used by tests across the workspace and by the bot when
//! `calendar.backend = "memory"`. Call counters let tests assert how often
//! the dispatcher touched the calendar.

use crate::calendar::CalendarBackend;
use crate::error::CalendarError;
use crate::event::{CalendarEvent, CreatedEvent, EventTime, NewEvent};
use async_trait::async_trait;
use chrono::NaiveDate;
use rootcause::Report;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[derive(Debug, Default)]
struct State {
    events: HashMap<String, CalendarEvent>,
    next_id: u64,
    fail_with: Option<CalendarError>,
    created: Vec<NewEvent>,
    list_calls: usize,
    deleted: Vec<String>,
}

/// Calendar backed by a map. Clones share the same events.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCalendar {
    state: Arc<Mutex<State>>,
}

impl InMemoryCalendar {
    /// Creates an empty calendar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a calendar holding the given events.
    #[must_use]
    pub fn with_events(events: impl IntoIterator<Item = CalendarEvent>) -> Self {
        let calendar = Self::new();
        for event in events {
            calendar.insert(event);
        }
        calendar
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores an event as-is.
    pub fn insert(&self, event: CalendarEvent) {
        self.state().events.insert(event.id.clone(), event);
    }

    /// Makes every subsequent call fail with `error`, or succeed again with `None`.
    pub fn fail_with(&self, error: Option<CalendarError>) {
        self.state().fail_with = error;
    }

    /// Returns every event passed to `create`, in call order.
    #[must_use]
    pub fn created(&self) -> Vec<NewEvent> {
        self.state().created.clone()
    }

    /// Returns every identifier passed to `delete`, in call order.
    #[must_use]
    pub fn deleted(&self) -> Vec<String> {
        self.state().deleted.clone()
    }

    /// Number of `list` calls, including those made by `find_by_title`.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.state().list_calls
    }

    /// Total number of calls of any kind.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        let state = self.state();
        state.created.len() + state.list_calls + state.deleted.len()
    }

    /// Returns true if an event with this identifier is stored.
    #[must_use]
    pub fn contains(&self, event_id: &str) -> bool {
        self.state().events.contains_key(event_id)
    }
}

#[async_trait]
impl CalendarBackend for InMemoryCalendar {
    async fn create(&self, event: NewEvent) -> Result<CreatedEvent, Report<CalendarError>> {
        let mut state = self.state();
        state.created.push(event.clone());
        if let Some(err) = state.fail_with.clone() {
            return Err(err.into());
        }
        if event.end < event.start {
            return Err(CalendarError::InvalidParameters {
                operation: "create".to_string(),
                reason: "end precedes start".to_string(),
            }
            .into());
        }

        state.next_id += 1;
        let id = format!("mem{:08}", state.next_id);
        let link = format!("memory://events/{id}");
        state.events.insert(
            id.clone(),
            CalendarEvent {
                id: id.clone(),
                summary: Some(event.title.clone()),
                start: EventTime::DateTime(event.start),
                end: Some(EventTime::DateTime(event.end)),
                link: Some(link.clone()),
            },
        );
        debug!(event_id = %id, title = %event.title, "stored event");

        Ok(CreatedEvent {
            id,
            summary: event.title,
            start: event.start,
            end: event.end,
            link: Some(link),
        })
    }

    async fn list(&self, date: NaiveDate) -> Result<Vec<CalendarEvent>, Report<CalendarError>> {
        let mut state = self.state();
        state.list_calls += 1;
        if let Some(err) = state.fail_with.clone() {
            return Err(err.into());
        }

        let mut events: Vec<CalendarEvent> = state
            .events
            .values()
            .filter(|event| event.start.date() == date)
            .cloned()
            .collect();
        events.sort_by_key(|event| event.start.naive_local());
        Ok(events)
    }

    async fn delete(&self, event_id: &str) -> Result<(), Report<CalendarError>> {
        let mut state = self.state();
        state.deleted.push(event_id.to_string());
        if let Some(err) = state.fail_with.clone() {
            return Err(err.into());
        }

        match state.events.remove(event_id) {
            Some(_) => Ok(()),
            None => Err(CalendarError::NotFound {
                event_id: event_id.to_string(),
            }
            .into()),
        }
    }
}
