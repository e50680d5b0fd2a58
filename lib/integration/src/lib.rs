//! Calendar integrations for chronobot.
//!
//! This crate provides:
//!
//! - **Calendar trait**: the create/list/delete contract the dispatcher relies on
//! - **Google Calendar**: REST v3 backend with OAuth refresh-token access
//! - **In-memory calendar**: offline backend used by tests and local runs

pub mod calendar;
pub mod credential;
pub mod error;
pub mod event;
pub mod google;
pub mod memory;

pub use calendar::CalendarBackend;
pub use credential::{AccessToken, OAuthCredentials, TokenSource};
pub use error::{CalendarError, CredentialError};
pub use event::{CalendarEvent, CreatedEvent, EventTime, NewEvent};
pub use google::{GoogleCalendarClient, GoogleCalendarConfig};
pub use memory::InMemoryCalendar;
