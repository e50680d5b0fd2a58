//! Telegram front end for the chronobot calendar assistant.
//!
//! Wires configuration into the classifier, the calendar backend and the
//! conversation driver, then runs the receive loop.

pub mod config;
pub mod error;
pub mod runner;
pub mod telegram;

use crate::config::{BotConfig, CalendarBackendKind, CalendarConfig, LlmConfig};
use crate::error::StartupError;
use chrono::FixedOffset;
use chronobot_ai::{
    IntentClassifier, LlmIntentClassifier, OpenAiCompatibleBackend, OpenAiConfig,
    PromptTemplate,
};
use chronobot_conversation::{ActionDispatcher, ContextStore, ConversationDriver, DialogueEngine};
use chronobot_integration::{
    CalendarBackend, GoogleCalendarClient, GoogleCalendarConfig, InMemoryCalendar,
    OAuthCredentials,
};
use rootcause::Report;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Builds the intent classifier.
///
/// # Errors
///
/// Returns an error if the LLM backend rejects its configuration.
pub fn build_classifier(
    llm: &LlmConfig,
    utc_offset: FixedOffset,
) -> Result<Arc<dyn IntentClassifier>, Report<StartupError>> {
    let backend = OpenAiCompatibleBackend::new(
        OpenAiConfig::new(&llm.api_key, &llm.model)
            .with_api_url(&llm.api_url)
            .with_timeout(Duration::from_secs(llm.timeout_seconds))
            .with_app_title("chronobot"),
    )
    .map_err(|e| StartupError::Backend {
        component: "LLM backend",
        reason: e.to_string(),
    })?;

    let prompt = PromptTemplate::load_or_default(&llm.prompt_path);
    let classifier = LlmIntentClassifier::new(backend, prompt)
        .with_temperature(llm.temperature)
        .with_utc_offset(utc_offset);
    Ok(Arc::new(classifier))
}

/// Builds the calendar backend selected by configuration.
///
/// # Errors
///
/// Returns an error if Google credentials are missing or the client cannot
/// be built.
pub fn build_calendar(
    calendar: &CalendarConfig,
) -> Result<Arc<dyn CalendarBackend>, Report<StartupError>> {
    match calendar.backend {
        CalendarBackendKind::Memory => {
            warn!("using the in-memory calendar; events are lost on restart");
            Ok(Arc::new(InMemoryCalendar::new()))
        }
        CalendarBackendKind::Google => {
            let credentials = OAuthCredentials::new(
                calendar.client_id.clone().unwrap_or_default(),
                calendar.client_secret.clone().unwrap_or_default(),
                calendar.refresh_token.clone().unwrap_or_default(),
            );
            let config = GoogleCalendarConfig::new(
                &calendar.calendar_id,
                &calendar.timezone,
                calendar.utc_offset()?,
            )
            .with_timeout(Duration::from_secs(calendar.timeout_seconds));

            let client = GoogleCalendarClient::new(config, credentials).map_err(|e| {
                StartupError::Backend {
                    component: "Google Calendar client",
                    reason: e.to_string(),
                }
            })?;
            Ok(Arc::new(client))
        }
    }
}

/// Assembles the conversation driver from configured collaborators.
#[must_use]
pub fn build_driver(
    config: &BotConfig,
    classifier: Arc<dyn IntentClassifier>,
    calendar: Arc<dyn CalendarBackend>,
    utc_offset: FixedOffset,
) -> ConversationDriver {
    let dispatcher = ActionDispatcher::new(calendar)
        .with_default_duration(config.dialogue.default_event_duration())
        .with_utc_offset(utc_offset);
    let store = ContextStore::new(config.dialogue.pending_ttl());
    let engine = DialogueEngine::new(classifier, dispatcher, store)
        .with_threshold(config.dialogue.confidence_threshold);

    info!(
        threshold = config.dialogue.confidence_threshold,
        pending_ttl_seconds = config.dialogue.pending_ttl_seconds,
        "conversation driver ready"
    );
    ConversationDriver::new(engine)
}
