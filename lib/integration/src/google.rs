//! Google Calendar API v3 backend.

use crate::calendar::CalendarBackend;
use crate::credential::{OAuthCredentials, TokenSource};
use crate::error::CalendarError;
use crate::event::{CalendarEvent, CreatedEvent, EventTime, NewEvent};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};
use reqwest::{StatusCode, Url};
use rootcause::Report;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Default API base.
pub const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Settings for the Google Calendar backend.
#[derive(Debug, Clone)]
pub struct GoogleCalendarConfig {
    /// API base URL.
    pub api_base: String,
    /// Calendar to operate on (`primary` for the user's main calendar).
    pub calendar_id: String,
    /// IANA zone name sent along with created events.
    pub timezone: String,
    /// Offset that defines the local day for listings.
    pub utc_offset: FixedOffset,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl GoogleCalendarConfig {
    /// Creates a configuration for the given calendar.
    #[must_use]
    pub fn new(
        calendar_id: impl Into<String>,
        timezone: impl Into<String>,
        utc_offset: FixedOffset,
    ) -> Self {
        Self {
            api_base: CALENDAR_API_BASE.to_string(),
            calendar_id: calendar_id.into(),
            timezone: timezone.into(),
            utc_offset,
            timeout: Duration::from_secs(30),
        }
    }

    /// Overrides the API base URL.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Overrides the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Calendar backend for Google Calendar.
#[derive(Debug)]
pub struct GoogleCalendarClient {
    http: reqwest::Client,
    config: GoogleCalendarConfig,
    tokens: TokenSource,
}

impl GoogleCalendarClient {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are incomplete, the API base is
    /// not a URL, or the HTTP client cannot be built.
    pub fn new(
        config: GoogleCalendarConfig,
        credentials: OAuthCredentials,
    ) -> Result<Self, Report<CalendarError>> {
        Url::parse(&config.api_base).map_err(|e| CalendarError::InvalidParameters {
            operation: "configure".to_string(),
            reason: format!("invalid API base: {e}"),
        })?;

        let tokens = TokenSource::new(credentials).map_err(|e| {
            CalendarError::AuthenticationFailed {
                reason: e.to_string(),
            }
        })?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CalendarError::ConnectionFailed {
                reason: format!("HTTP client error: {e}"),
            })?;

        Ok(Self {
            http,
            config,
            tokens,
        })
    }

    /// Returns the token source, e.g. to prime it.
    #[must_use]
    pub fn tokens(&self) -> &TokenSource {
        &self.tokens
    }

    fn events_url(&self, event_id: Option<&str>) -> Result<Url, CalendarError> {
        let mut url =
            Url::parse(&self.config.api_base).map_err(|e| CalendarError::InvalidParameters {
                operation: "url".to_string(),
                reason: e.to_string(),
            })?;
        {
            let mut segments =
                url.path_segments_mut()
                    .map_err(|()| CalendarError::InvalidParameters {
                        operation: "url".to_string(),
                        reason: "API base cannot have a path".to_string(),
                    })?;
            segments
                .pop_if_empty()
                .extend(["calendars", self.config.calendar_id.as_str(), "events"]);
            if let Some(id) = event_id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    async fn execute(
        &self,
        operation: &'static str,
        event_id: Option<&str>,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, CalendarError> {
        let token = self
            .tokens
            .access_token()
            .await
            .map_err(|e| CalendarError::AuthenticationFailed {
                reason: e.to_string(),
            })?;

        let response = request.bearer_auth(token).send().await.map_err(|e| {
            warn!(error = %e, operation, "calendar request failed");
            if e.is_timeout() {
                CalendarError::Timeout
            } else {
                CalendarError::ConnectionFailed {
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        let body = response.text().await.unwrap_or_default();
        warn!(operation, status = %status, body = %body, "calendar API returned error");

        if status == StatusCode::UNAUTHORIZED {
            self.tokens.invalidate().await;
        }
        Err(status_error(
            operation,
            event_id,
            status,
            retry_after_secs,
            body,
        ))
    }
}

/// Maps a non-success status to a calendar error.
fn status_error(
    operation: &str,
    event_id: Option<&str>,
    status: StatusCode,
    retry_after_secs: Option<u64>,
    body: String,
) -> CalendarError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CalendarError::AuthenticationFailed {
            reason: format!("HTTP {status}"),
        },
        StatusCode::TOO_MANY_REQUESTS => CalendarError::RateLimited { retry_after_secs },
        StatusCode::NOT_FOUND | StatusCode::GONE if event_id.is_some() => CalendarError::NotFound {
            event_id: event_id.unwrap_or_default().to_string(),
        },
        StatusCode::BAD_REQUEST => CalendarError::InvalidParameters {
            operation: operation.to_string(),
            reason: body,
        },
        _ => CalendarError::ProtocolError {
            reason: format!("HTTP {status}: {body}"),
        },
    }
}

/// Returns `[00:00, next 00:00)` of `date` in `offset`.
fn day_window(
    date: NaiveDate,
    offset: FixedOffset,
) -> Option<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
    let start = offset
        .from_local_datetime(&date.and_time(chrono::NaiveTime::MIN))
        .single()?;
    let end = start.checked_add_days(chrono::Days::new(1))?;
    Some((start, end))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InsertEvent<'a> {
    summary: &'a str,
    start: WireTimeOut<'a>,
    end: WireTimeOut<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attendees: Vec<Attendee<'a>>,
}

impl<'a> InsertEvent<'a> {
    fn new(event: &'a NewEvent, timezone: &'a str) -> Self {
        Self {
            summary: &event.title,
            start: WireTimeOut {
                date_time: event.start.to_rfc3339(),
                time_zone: timezone,
            },
            end: WireTimeOut {
                date_time: event.end.to_rfc3339(),
                time_zone: timezone,
            },
            description: event.description.as_deref(),
            location: event.location.as_deref(),
            attendees: event
                .attendees
                .iter()
                .map(|email| Attendee { email })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireTimeOut<'a> {
    date_time: String,
    time_zone: &'a str,
}

#[derive(Debug, Serialize)]
struct Attendee<'a> {
    email: &'a str,
}

#[derive(Debug, Deserialize)]
struct WireEventList {
    #[serde(default)]
    items: Vec<WireEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEvent {
    id: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    start: Option<WireTimeIn>,
    #[serde(default)]
    end: Option<WireTimeIn>,
    #[serde(default)]
    html_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTimeIn {
    #[serde(default)]
    date_time: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    date: Option<NaiveDate>,
}

impl WireTimeIn {
    fn event_time(&self) -> Option<EventTime> {
        self.date_time
            .map(EventTime::DateTime)
            .or(self.date.map(EventTime::AllDay))
    }
}

impl WireEvent {
    fn into_calendar_event(self) -> Option<CalendarEvent> {
        let start = self.start.as_ref().and_then(WireTimeIn::event_time)?;
        Some(CalendarEvent {
            start,
            end: self.end.as_ref().and_then(WireTimeIn::event_time),
            id: self.id,
            summary: self.summary,
            link: self.html_link,
        })
    }
}

fn parse_event_list(body: &str) -> Result<Vec<CalendarEvent>, CalendarError> {
    let list: WireEventList =
        serde_json::from_str(body).map_err(|e| CalendarError::ProtocolError {
            reason: format!("invalid event list: {e}"),
        })?;

    Ok(list
        .items
        .into_iter()
        .filter_map(|item| {
            let id = item.id.clone();
            let event = item.into_calendar_event();
            if event.is_none() {
                warn!(event_id = %id, "skipping event without start time");
            }
            event
        })
        .collect())
}

#[async_trait]
impl CalendarBackend for GoogleCalendarClient {
    #[instrument(skip(self, event), fields(calendar = %self.config.calendar_id))]
    async fn create(&self, event: NewEvent) -> Result<CreatedEvent, Report<CalendarError>> {
        let url = self.events_url(None)?;
        let body = InsertEvent::new(&event, &self.config.timezone);
        let response = self
            .execute("create", None, self.http.post(url).json(&body))
            .await?;

        let created: WireEvent = response
            .json()
            .await
            .map_err(|e| CalendarError::ProtocolError {
                reason: format!("invalid insert response: {e}"),
            })?;
        info!(event_id = %created.id, title = %event.title, "created calendar event");

        Ok(CreatedEvent {
            id: created.id,
            summary: created.summary.unwrap_or(event.title),
            start: event.start,
            end: event.end,
            link: created.html_link,
        })
    }

    #[instrument(skip(self), fields(calendar = %self.config.calendar_id))]
    async fn list(&self, date: NaiveDate) -> Result<Vec<CalendarEvent>, Report<CalendarError>> {
        let (time_min, time_max) =
            day_window(date, self.config.utc_offset).ok_or_else(|| {
                CalendarError::InvalidParameters {
                    operation: "list".to_string(),
                    reason: format!("no local day window for {date}"),
                }
            })?;

        let url = self.events_url(None)?;
        let request = self.http.get(url).query(&[
            ("timeMin", time_min.to_rfc3339()),
            ("timeMax", time_max.to_rfc3339()),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
        ]);
        let response = self.execute("list", None, request).await?;

        let body = response
            .text()
            .await
            .map_err(|e| CalendarError::ConnectionFailed {
                reason: e.to_string(),
            })?;
        let events = parse_event_list(&body)?;
        info!(count = events.len(), %date, "listed calendar events");
        Ok(events)
    }

    #[instrument(skip(self), fields(calendar = %self.config.calendar_id))]
    async fn delete(&self, event_id: &str) -> Result<(), Report<CalendarError>> {
        let url = self.events_url(Some(event_id))?;
        self.execute("delete", Some(event_id), self.http.delete(url))
            .await?;
        info!(event_id, "deleted calendar event");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn msk() -> FixedOffset {
        FixedOffset::east_opt(3 * 3600).expect("valid offset")
    }

    fn client(calendar_id: &str) -> GoogleCalendarClient {
        GoogleCalendarClient::new(
            GoogleCalendarConfig::new(calendar_id, "Europe/Moscow", msk()),
            OAuthCredentials::new("id", "secret", "refresh"),
        )
        .expect("valid client")
    }

    #[test]
    fn events_url_escapes_calendar_id() {
        let client = client("team@group.calendar.google.com");
        let url = client.events_url(Some("abc123")).expect("url");
        assert_eq!(
            url.as_str(),
            "https://www.googleapis.com/calendar/v3/calendars/team@group.calendar.google.com/events/abc123"
        );

        let hashed = self::client("a#b").events_url(None).expect("url");
        assert!(hashed.as_str().ends_with("/calendars/a%23b/events"));
    }

    #[test]
    fn invalid_api_base_is_rejected() {
        let result = GoogleCalendarClient::new(
            GoogleCalendarConfig::new("primary", "Europe/Moscow", msk()).with_api_base("nope"),
            OAuthCredentials::new("id", "secret", "refresh"),
        );
        assert!(result.is_err());
    }

    #[test]
    fn insert_body_shape() {
        let mut event = NewEvent::new(
            "Встреча",
            DateTime::parse_from_rfc3339("2025-11-27T15:00:00+03:00").expect("valid"),
            DateTime::parse_from_rfc3339("2025-11-27T16:00:00+03:00").expect("valid"),
        );
        event.description = Some("Участники: Вадим".to_string());
        event.attendees = vec!["vadim@example.com".to_string()];

        let body = serde_json::to_value(InsertEvent::new(&event, "Europe/Moscow")).expect("json");
        assert_eq!(
            body,
            json!({
                "summary": "Встреча",
                "start": {"dateTime": "2025-11-27T15:00:00+03:00", "timeZone": "Europe/Moscow"},
                "end": {"dateTime": "2025-11-27T16:00:00+03:00", "timeZone": "Europe/Moscow"},
                "description": "Участники: Вадим",
                "attendees": [{"email": "vadim@example.com"}]
            })
        );
    }

    #[test]
    fn day_window_spans_local_day() {
        let date = NaiveDate::from_ymd_opt(2025, 11, 27).expect("valid");
        let (start, end) = day_window(date, msk()).expect("window");
        assert_eq!(start.to_rfc3339(), "2025-11-27T00:00:00+03:00");
        assert_eq!(end.to_rfc3339(), "2025-11-28T00:00:00+03:00");
    }

    #[test]
    fn parses_timed_and_all_day_events() {
        let body = json!({
            "items": [
                {
                    "id": "allday1",
                    "summary": "Праздник",
                    "start": {"date": "2025-11-27"},
                    "end": {"date": "2025-11-28"}
                },
                {
                    "id": "timed1",
                    "start": {"dateTime": "2025-11-27T15:00:00+03:00"},
                    "htmlLink": "https://calendar.google.com/event?eid=x"
                },
                {"id": "broken"}
            ]
        })
        .to_string();

        let events = parse_event_list(&body).expect("valid list");
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0].start,
            EventTime::AllDay(NaiveDate::from_ymd_opt(2025, 11, 27).expect("valid"))
        );
        assert!(events[1].summary.is_none());
        assert!(matches!(events[1].start, EventTime::DateTime(_)));
        assert!(events[1].link.is_some());
    }

    #[test]
    fn empty_list_body() {
        assert!(parse_event_list("{}").expect("valid").is_empty());
        assert!(parse_event_list("<html>").is_err());
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            status_error("delete", Some("e1"), StatusCode::GONE, None, String::new()),
            CalendarError::NotFound {
                event_id: "e1".to_string()
            }
        );
        assert!(matches!(
            status_error("list", None, StatusCode::NOT_FOUND, None, String::new()),
            CalendarError::ProtocolError { .. }
        ));
        assert_eq!(
            status_error("list", None, StatusCode::TOO_MANY_REQUESTS, Some(30), String::new()),
            CalendarError::RateLimited {
                retry_after_secs: Some(30)
            }
        );
        assert!(matches!(
            status_error("create", None, StatusCode::BAD_REQUEST, None, "bad end".into()),
            CalendarError::InvalidParameters { .. }
        ));
        assert!(matches!(
            status_error("create", None, StatusCode::FORBIDDEN, None, String::new()),
            CalendarError::AuthenticationFailed { .. }
        ));
    }
}
