//! Calendar backend trait.
//!
//! Every calendar implementation provides the same three operations so the
//! dispatcher never knows which service it is talking to.

use crate::error::CalendarError;
use crate::event::{CalendarEvent, CreatedEvent, NewEvent};
use async_trait::async_trait;
use chrono::NaiveDate;
use rootcause::Report;

/// Trait for calendar backends.
#[async_trait]
pub trait CalendarBackend: Send + Sync {
    /// Creates an event.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the event or is unreachable.
    async fn create(&self, event: NewEvent) -> Result<CreatedEvent, Report<CalendarError>>;

    /// Lists events on a local calendar day, ordered by start.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable.
    async fn list(&self, date: NaiveDate) -> Result<Vec<CalendarEvent>, Report<CalendarError>>;

    /// Deletes an event by identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the event does not exist or the backend is
    /// unreachable.
    async fn delete(&self, event_id: &str) -> Result<(), Report<CalendarError>>;

    /// Finds events on `date` whose title contains `title`, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns an error if listing fails.
    async fn find_by_title(
        &self,
        title: &str,
        date: NaiveDate,
    ) -> Result<Vec<CalendarEvent>, Report<CalendarError>> {
        let needle = title.to_lowercase();
        let events = self.list(date).await?;
        Ok(events
            .into_iter()
            .filter(|event| {
                event
                    .summary
                    .as_deref()
                    .is_some_and(|summary| summary.to_lowercase().contains(&needle))
            })
            .collect())
    }
}
