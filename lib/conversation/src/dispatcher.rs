//! Action dispatcher.
//!
//! Executes create, list and delete against the calendar and renders the
//! reply. Calendar failures are logged and turned into a generic message;
//! nothing is retried.

use crate::format;
use crate::messages;
use chrono::{FixedOffset, NaiveDate, Offset, TimeDelta, Utc};
use chronobot_ai::{Intent, Slots};
use chronobot_integration::{CalendarBackend, NewEvent};
use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// Default event length when the user gives no end time.
pub const DEFAULT_EVENT_DURATION: Duration = Duration::from_secs(60 * 60);

/// What the dispatcher wants the engine to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Send this text; the dialogue is over.
    Reply(String),
    /// Ask before deleting the single event a title search found.
    ConfirmDelete {
        /// The event to delete on "yes".
        event_id: String,
        /// The question to send.
        prompt: String,
    },
}

impl Dispatch {
    fn reply(text: impl Into<String>) -> Self {
        Self::Reply(text.into())
    }
}

/// Runs calendar operations on behalf of the dialogue engine.
#[derive(Clone)]
pub struct ActionDispatcher {
    calendar: Arc<dyn CalendarBackend>,
    default_duration: TimeDelta,
    utc_offset: FixedOffset,
}

impl std::fmt::Debug for ActionDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionDispatcher")
            .field("default_duration", &self.default_duration)
            .field("utc_offset", &self.utc_offset)
            .finish_non_exhaustive()
    }
}

impl ActionDispatcher {
    /// Creates a dispatcher with a one-hour default duration and UTC as the
    /// local offset.
    #[must_use]
    pub fn new(calendar: Arc<dyn CalendarBackend>) -> Self {
        Self {
            calendar,
            default_duration: TimeDelta::hours(1),
            utc_offset: Utc.fix(),
        }
    }

    /// Sets the duration used when a create request has no end.
    #[must_use]
    pub fn with_default_duration(mut self, duration: Duration) -> Self {
        match TimeDelta::from_std(duration) {
            Ok(duration) => self.default_duration = duration,
            Err(_) => warn!(?duration, "default event duration out of range, keeping previous"),
        }
        self
    }

    /// Sets the offset that defines "today".
    #[must_use]
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.utc_offset).date_naive()
    }

    /// Runs the action for `intent`. Unknown intents get the help text.
    pub async fn dispatch(&self, intent: Intent, slots: &Slots) -> Dispatch {
        match intent {
            Intent::Create => Dispatch::Reply(self.create(slots).await),
            Intent::List => Dispatch::Reply(self.list(slots).await),
            Intent::Delete => self.delete(slots).await,
            Intent::Unknown => Dispatch::reply(messages::NOT_UNDERSTOOD),
        }
    }

    /// Creates an event from the slots.
    #[instrument(skip_all)]
    pub async fn create(&self, slots: &Slots) -> String {
        let (title, start) = match (&slots.title, slots.start) {
            (Some(title), Some(start)) => (title, start),
            (title, start) => {
                let mut missing = Vec::new();
                if title.is_none() {
                    missing.push("название");
                }
                if start.is_none() {
                    missing.push("время начала");
                }
                return format!(
                    "Для создания события необходимо указать {}. Пожалуйста, уточните эти данные.",
                    missing.join(" и ")
                );
            }
        };

        let end = match slots.end {
            Some(end) => end,
            None => match start.checked_add_signed(self.default_duration) {
                Some(end) => end,
                None => {
                    warn!(%start, "default end time overflows");
                    return messages::CREATE_FAILED.to_string();
                }
            },
        };
        let (attendees, names): (Vec<String>, Vec<String>) = slots
            .participants
            .iter()
            .flatten()
            .cloned()
            .partition(|p| p.contains('@'));

        let description = match (&slots.description, names.is_empty()) {
            (description, true) => description.clone(),
            (Some(description), false) => {
                Some(format!("{description}\nУчастники: {}", names.join(", ")))
            }
            (None, false) => Some(format!("Участники: {}", names.join(", "))),
        };

        let event = NewEvent {
            title: title.clone(),
            start,
            end,
            description,
            location: slots.location.clone(),
            attendees,
        };

        let created = match self.calendar.create(event).await {
            Ok(created) => created,
            Err(report) => {
                error!(error = %report, "failed to create event");
                return messages::CREATE_FAILED.to_string();
            }
        };
        info!(event_id = %created.id, "event created");

        let mut text = format!(
            "✅ Событие создано!\n\n📅 {title}\n🕐 {}\n",
            format::datetime(&start)
        );
        // Writing to a String cannot fail.
        if let Some(location) = &slots.location {
            let _ = writeln!(text, "📍 {location}");
        }
        if let Some(participants) = &slots.participants {
            let _ = writeln!(text, "👥 Участники: {}", participants.join(", "));
        }
        let _ = write!(text, "\nID события: {}", created.id);
        if let Some(link) = &created.link {
            let _ = write!(text, "\n🔗 {link}");
        }
        text
    }

    /// Lists events for the slots' target day.
    #[instrument(skip_all)]
    pub async fn list(&self, slots: &Slots) -> String {
        let Some(day) = slots.target_date() else {
            return messages::LIST_NEEDS_DATE.to_string();
        };

        let events = match self.calendar.list(day).await {
            Ok(events) => events,
            Err(report) => {
                error!(error = %report, %day, "failed to list events");
                return messages::LIST_FAILED.to_string();
            }
        };

        if events.is_empty() {
            return format!("📅 На {} нет запланированных событий.", format::date(day));
        }

        let mut text = format!("📅 События на {}:\n", format::date(day));
        for (index, event) in events.iter().enumerate() {
            let _ = write!(
                text,
                "\n{}. 🕐 {} - {}\n   ID: {}\n",
                index + 1,
                format::time_of_day(&event.start),
                event.summary.as_deref().unwrap_or(messages::UNTITLED),
                format::short_id(&event.id)
            );
        }
        text.truncate(text.trim_end().len());
        text
    }

    /// Deletes by identifier, or searches by title and asks before deleting.
    #[instrument(skip_all)]
    pub async fn delete(&self, slots: &Slots) -> Dispatch {
        if let Some(event_id) = &slots.event_id {
            return Dispatch::Reply(self.delete_by_id(event_id).await);
        }

        let Some(title) = &slots.title else {
            return Dispatch::reply(messages::DELETE_NEEDS_TITLE);
        };
        let day = slots.target_date().unwrap_or_else(|| self.today());

        let matches = match self.calendar.find_by_title(title, day).await {
            Ok(matches) => matches,
            Err(report) => {
                error!(error = %report, %day, "failed to search events");
                return Dispatch::reply(messages::DELETE_SEARCH_FAILED);
            }
        };

        match matches.as_slice() {
            [] => Dispatch::Reply(format!(
                "Не найдено событий с названием '{title}' на {}.",
                format::date(day)
            )),
            [event] => Dispatch::ConfirmDelete {
                event_id: event.id.clone(),
                prompt: format!(
                    "Найдено событие:\n\n📅 {}\n🕐 {}\n\n{}",
                    event.summary.as_deref().unwrap_or(messages::UNTITLED),
                    format::event_time(&event.start),
                    messages::DELETE_CONFIRM_PROMPT
                ),
            },
            candidates => {
                let mut text = format!("Найдено несколько событий с названием '{title}':\n\n");
                for (index, event) in candidates.iter().enumerate() {
                    let _ = writeln!(
                        text,
                        "{}. {} (ID: {})",
                        index + 1,
                        event.summary.as_deref().unwrap_or(messages::UNTITLED),
                        format::short_id(&event.id)
                    );
                }
                text.push_str("\nПожалуйста, укажите ID события для удаления.");
                Dispatch::Reply(text)
            }
        }
    }

    /// Deletes an event without asking.
    pub async fn delete_by_id(&self, event_id: &str) -> String {
        self.remove(event_id, messages::DELETE_FAILED).await
    }

    /// Deletes an event the user named by its identifier. A failure hints
    /// that the identifier may be wrong.
    pub async fn delete_literal_id(&self, event_id: &str) -> String {
        self.remove(event_id, messages::DELETE_ID_FAILED).await
    }

    #[instrument(skip(self, failure))]
    async fn remove(&self, event_id: &str, failure: &str) -> String {
        match self.calendar.delete(event_id).await {
            Ok(()) => {
                info!("event deleted");
                messages::DELETED.to_string()
            }
            Err(report) => {
                error!(error = %report, "failed to delete event");
                failure.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use chronobot_integration::{CalendarError, CalendarEvent, EventTime, InMemoryCalendar};

    fn at(rfc3339: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(rfc3339).expect("valid timestamp")
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn event(id: &str, summary: &str, start: &str) -> CalendarEvent {
        CalendarEvent {
            id: id.to_string(),
            summary: Some(summary.to_string()),
            start: EventTime::DateTime(at(start)),
            end: None,
            link: None,
        }
    }

    fn dispatcher(calendar: &InMemoryCalendar) -> ActionDispatcher {
        ActionDispatcher::new(Arc::new(calendar.clone()))
            .with_utc_offset(FixedOffset::east_opt(3 * 3600).expect("valid offset"))
    }

    #[tokio::test]
    async fn create_defaults_end_and_formats_reply() {
        let calendar = InMemoryCalendar::new();
        let slots = Slots {
            title: Some("Встреча".to_string()),
            start: Some(at("2025-11-27T15:00:00+03:00")),
            ..Default::default()
        };

        let reply = dispatcher(&calendar).create(&slots).await;

        let created = calendar.created();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].end, at("2025-11-27T16:00:00+03:00"));
        assert!(reply.contains("Встреча"));
        assert!(reply.contains("27.11.2025 15:00"));
        assert!(reply.contains("ID события: mem"));
        assert!(reply.contains("🔗 memory://events/"));
    }

    #[tokio::test]
    async fn create_with_overflowing_duration_fails_softly() {
        let calendar = InMemoryCalendar::new();
        let dispatcher = dispatcher(&calendar)
            .with_default_duration(Duration::from_secs(1_000_000_000_000 * 60));

        let reply = dispatcher
            .create(&Slots {
                title: Some("Встреча".to_string()),
                start: Some(at("2025-11-27T15:00:00+03:00")),
                ..Default::default()
            })
            .await;

        assert_eq!(reply, messages::CREATE_FAILED);
        assert_eq!(calendar.total_calls(), 0);
    }

    #[tokio::test]
    async fn out_of_range_duration_keeps_default() {
        let calendar = InMemoryCalendar::new();
        let dispatcher = dispatcher(&calendar).with_default_duration(Duration::from_secs(u64::MAX));

        dispatcher
            .create(&Slots {
                title: Some("Встреча".to_string()),
                start: Some(at("2025-11-27T15:00:00+03:00")),
                ..Default::default()
            })
            .await;

        assert_eq!(calendar.created()[0].end, at("2025-11-27T16:00:00+03:00"));
    }

    #[tokio::test]
    async fn create_respects_explicit_end_and_custom_duration() {
        let calendar = InMemoryCalendar::new();
        let dispatcher =
            dispatcher(&calendar).with_default_duration(Duration::from_secs(30 * 60));

        dispatcher
            .create(&Slots {
                title: Some("a".to_string()),
                start: Some(at("2025-11-27T15:00:00+03:00")),
                ..Default::default()
            })
            .await;
        dispatcher
            .create(&Slots {
                title: Some("b".to_string()),
                start: Some(at("2025-11-27T15:00:00+03:00")),
                end: Some(at("2025-11-27T18:00:00+03:00")),
                ..Default::default()
            })
            .await;

        let created = calendar.created();
        assert_eq!(created[0].end, at("2025-11-27T15:30:00+03:00"));
        assert_eq!(created[1].end, at("2025-11-27T18:00:00+03:00"));
    }

    #[tokio::test]
    async fn create_partitions_participants() {
        let calendar = InMemoryCalendar::new();
        let slots = Slots {
            title: Some("Встреча".to_string()),
            start: Some(at("2025-11-27T15:00:00+03:00")),
            description: Some("Квартальный план".to_string()),
            participants: Some(vec![
                "Вадим".to_string(),
                "olga@example.com".to_string(),
                "Пётр".to_string(),
            ]),
            ..Default::default()
        };

        let reply = dispatcher(&calendar).create(&slots).await;

        let created = calendar.created();
        assert_eq!(created[0].attendees, ["olga@example.com"]);
        assert_eq!(
            created[0].description.as_deref(),
            Some("Квартальный план\nУчастники: Вадим, Пётр")
        );
        assert!(reply.contains("👥 Участники: Вадим, olga@example.com, Пётр"));
    }

    #[tokio::test]
    async fn create_with_only_emails_keeps_description() {
        let calendar = InMemoryCalendar::new();
        dispatcher(&calendar)
            .create(&Slots {
                title: Some("Созвон".to_string()),
                start: Some(at("2025-11-27T15:00:00+03:00")),
                participants: Some(vec!["a@example.com".to_string()]),
                ..Default::default()
            })
            .await;

        assert!(calendar.created()[0].description.is_none());
    }

    #[tokio::test]
    async fn create_names_missing_slots_without_calling_calendar() {
        let calendar = InMemoryCalendar::new();
        let dispatcher = dispatcher(&calendar);

        let both = dispatcher.create(&Slots::default()).await;
        assert!(both.contains("название и время начала"));

        let no_start = dispatcher
            .create(&Slots {
                title: Some("Встреча".to_string()),
                ..Default::default()
            })
            .await;
        assert!(no_start.contains("указать время начала."));

        assert_eq!(calendar.total_calls(), 0);
    }

    #[tokio::test]
    async fn create_failure_hides_cause() {
        let calendar = InMemoryCalendar::new();
        calendar.fail_with(Some(CalendarError::ConnectionFailed {
            reason: "dns lookup failed".to_string(),
        }));

        let reply = dispatcher(&calendar)
            .create(&Slots {
                title: Some("Встреча".to_string()),
                start: Some(at("2025-11-27T15:00:00+03:00")),
                ..Default::default()
            })
            .await;

        assert_eq!(reply, messages::CREATE_FAILED);
        assert!(!reply.contains("dns"));
    }

    #[tokio::test]
    async fn list_without_date_asks_for_one() {
        let calendar = InMemoryCalendar::new();
        let reply = dispatcher(&calendar).list(&Slots::default()).await;
        assert_eq!(reply, messages::LIST_NEEDS_DATE);
        assert_eq!(calendar.total_calls(), 0);
    }

    #[tokio::test]
    async fn list_uses_start_date_when_date_missing() {
        let calendar =
            InMemoryCalendar::with_events([event("evt-aaaaaaaa-1", "Обед", "2025-11-27T13:00:00+03:00")]);
        let reply = dispatcher(&calendar)
            .list(&Slots {
                start: Some(at("2025-11-27T09:00:00+03:00")),
                ..Default::default()
            })
            .await;
        assert!(reply.contains("Обед"));
    }

    #[tokio::test]
    async fn list_renders_numbered_events() {
        let calendar = InMemoryCalendar::with_events([
            event("abcdefgh12345", "Стендап", "2025-11-27T10:00:00+03:00"),
            event("zyxwvuts98765", "Обед", "2025-11-27T13:00:00+03:00"),
        ]);
        calendar.insert(CalendarEvent {
            id: "allday000001".to_string(),
            summary: None,
            start: EventTime::AllDay(day(2025, 11, 27)),
            end: None,
            link: None,
        });

        let reply = dispatcher(&calendar)
            .list(&Slots {
                date: Some(day(2025, 11, 27)),
                ..Default::default()
            })
            .await;

        assert!(reply.starts_with("📅 События на 27.11.2025:"));
        assert!(reply.contains("1. 🕐 весь день - Без названия\n   ID: allday00..."));
        assert!(reply.contains("2. 🕐 10:00 - Стендап\n   ID: abcdefgh..."));
        assert!(reply.contains("3. 🕐 13:00 - Обед\n   ID: zyxwvuts..."));
        assert!(!reply.ends_with('\n'));
    }

    #[tokio::test]
    async fn list_empty_day() {
        let calendar = InMemoryCalendar::new();
        let reply = dispatcher(&calendar)
            .list(&Slots {
                date: Some(day(2025, 11, 27)),
                ..Default::default()
            })
            .await;
        assert_eq!(reply, "📅 На 27.11.2025 нет запланированных событий.");
    }

    #[tokio::test]
    async fn list_failure_is_not_reported_as_empty() {
        let calendar = InMemoryCalendar::new();
        calendar.fail_with(Some(CalendarError::Timeout));
        let reply = dispatcher(&calendar)
            .list(&Slots {
                date: Some(day(2025, 11, 27)),
                ..Default::default()
            })
            .await;
        assert_eq!(reply, messages::LIST_FAILED);
    }

    #[tokio::test]
    async fn delete_by_id_skips_confirmation() {
        let calendar =
            InMemoryCalendar::with_events([event("e1", "Встреча", "2025-11-27T15:00:00+03:00")]);

        let outcome = dispatcher(&calendar)
            .delete(&Slots {
                event_id: Some("e1".to_string()),
                ..Default::default()
            })
            .await;

        assert_eq!(outcome, Dispatch::Reply(messages::DELETED.to_string()));
        assert!(!calendar.contains("e1"));
    }

    #[tokio::test]
    async fn delete_by_unknown_id_fails() {
        let calendar = InMemoryCalendar::new();
        let reply = dispatcher(&calendar).delete_by_id("nope").await;
        assert_eq!(reply, messages::DELETE_FAILED);
    }

    #[tokio::test]
    async fn failed_literal_id_delete_asks_to_check_id() {
        let calendar = InMemoryCalendar::new();
        let reply = dispatcher(&calendar).delete_literal_id("nope").await;
        assert_eq!(reply, messages::DELETE_ID_FAILED);
        assert_eq!(calendar.deleted(), ["nope"]);
    }

    #[tokio::test]
    async fn literal_id_delete_succeeds() {
        let calendar =
            InMemoryCalendar::with_events([event("e1", "Встреча", "2025-11-27T15:00:00+03:00")]);
        let reply = dispatcher(&calendar).delete_literal_id("e1").await;
        assert_eq!(reply, messages::DELETED);
        assert!(!calendar.contains("e1"));
    }

    #[tokio::test]
    async fn delete_requires_title() {
        let calendar = InMemoryCalendar::new();
        let outcome = dispatcher(&calendar).delete(&Slots::default()).await;
        assert_eq!(outcome, Dispatch::reply(messages::DELETE_NEEDS_TITLE));
        assert_eq!(calendar.total_calls(), 0);
    }

    #[tokio::test]
    async fn delete_single_match_asks_first() {
        let calendar = InMemoryCalendar::with_events([event(
            "e1",
            "Встреча с Вадимом",
            "2025-11-27T15:00:00+03:00",
        )]);

        let outcome = dispatcher(&calendar)
            .delete(&Slots {
                title: Some("вадим".to_string()),
                date: Some(day(2025, 11, 27)),
                ..Default::default()
            })
            .await;

        let Dispatch::ConfirmDelete { event_id, prompt } = outcome else {
            panic!("expected confirmation, got {outcome:?}");
        };
        assert_eq!(event_id, "e1");
        assert!(prompt.contains("Встреча с Вадимом"));
        assert!(prompt.contains("27.11.2025 15:00"));
        assert!(prompt.ends_with(messages::DELETE_CONFIRM_PROMPT));
        assert!(calendar.deleted().is_empty());
        assert!(calendar.contains("e1"));
    }

    #[tokio::test]
    async fn delete_multiple_matches_enumerates() {
        let calendar = InMemoryCalendar::with_events([
            event("first-event-id", "Встреча утро", "2025-11-27T09:00:00+03:00"),
            event("second-event-id", "Встреча вечер", "2025-11-27T19:00:00+03:00"),
        ]);

        let outcome = dispatcher(&calendar)
            .delete(&Slots {
                title: Some("Встреча".to_string()),
                date: Some(day(2025, 11, 27)),
                ..Default::default()
            })
            .await;

        let Dispatch::Reply(text) = outcome else {
            panic!("expected a plain reply");
        };
        assert!(text.contains("1. Встреча утро (ID: first-ev...)"));
        assert!(text.contains("2. Встреча вечер (ID: second-e...)"));
        assert!(calendar.deleted().is_empty());
    }

    #[tokio::test]
    async fn delete_without_date_searches_today() {
        let offset = FixedOffset::east_opt(3 * 3600).expect("valid offset");
        let now = Utc::now().with_timezone(&offset);
        let calendar = InMemoryCalendar::with_events([CalendarEvent {
            id: "today1".to_string(),
            summary: Some("Йога".to_string()),
            start: EventTime::DateTime(now),
            end: None,
            link: None,
        }]);

        let outcome = dispatcher(&calendar)
            .delete(&Slots {
                title: Some("йога".to_string()),
                ..Default::default()
            })
            .await;

        assert!(matches!(outcome, Dispatch::ConfirmDelete { .. }));
    }

    #[tokio::test]
    async fn delete_no_match() {
        let calendar = InMemoryCalendar::new();
        let outcome = dispatcher(&calendar)
            .delete(&Slots {
                title: Some("Встреча".to_string()),
                date: Some(day(2025, 11, 27)),
                ..Default::default()
            })
            .await;
        assert_eq!(
            outcome,
            Dispatch::reply("Не найдено событий с названием 'Встреча' на 27.11.2025.")
        );
    }

    #[tokio::test]
    async fn unknown_intent_gets_help() {
        let calendar = InMemoryCalendar::new();
        let outcome = dispatcher(&calendar)
            .dispatch(Intent::Unknown, &Slots::default())
            .await;
        assert_eq!(outcome, Dispatch::reply(messages::NOT_UNDERSTOOD));
        assert_eq!(calendar.total_calls(), 0);
    }
}
