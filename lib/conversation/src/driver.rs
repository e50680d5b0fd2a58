//! Conversation driver.
//!
//! The single entry point for inbound messages. Messages for one
//! conversation are handled one at a time; different conversations proceed
//! concurrently.

use crate::command::{Command, is_literal_event_id};
use crate::engine::DialogueEngine;
use crate::messages;
use chrono::NaiveDate;
use chronobot_ai::{Intent, IntentResult, Slots};
use chronobot_core::ConversationId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, instrument};

type LockMap = HashMap<ConversationId, Arc<tokio::sync::Mutex<()>>>;

/// Routes messages to the dialogue engine under per-conversation locks.
#[derive(Debug, Clone)]
pub struct ConversationDriver {
    engine: DialogueEngine,
    locks: Arc<Mutex<LockMap>>,
}

impl ConversationDriver {
    /// Creates a driver around an engine.
    #[must_use]
    pub fn new(engine: DialogueEngine) -> Self {
        Self {
            engine,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The wrapped engine.
    #[must_use]
    pub fn engine(&self) -> &DialogueEngine {
        &self.engine
    }

    fn locks(&self) -> MutexGuard<'_, LockMap> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_for(&self, conversation: &ConversationId) -> Arc<tokio::sync::Mutex<()>> {
        self.locks()
            .entry(conversation.clone())
            .or_default()
            .clone()
    }

    /// Handles one inbound message and returns the reply. Never fails.
    #[instrument(skip_all, fields(%conversation))]
    pub async fn handle(&self, conversation: &ConversationId, text: &str) -> String {
        let lock = self.lock_for(conversation);
        let _guard = lock.lock().await;

        match Command::parse(text) {
            Command::Start | Command::Help => messages::GREETING.to_string(),
            Command::Add("") => messages::ADD_USAGE.to_string(),
            Command::Add(request) => self.engine.respond(conversation, request).await,
            Command::View("") => messages::VIEW_USAGE.to_string(),
            Command::View(argument) => match NaiveDate::parse_from_str(argument, "%Y-%m-%d") {
                Ok(day) => {
                    let result = IntentResult::confirmed(
                        Intent::List,
                        Slots {
                            date: Some(day),
                            ..Default::default()
                        },
                    );
                    self.engine.respond_with(conversation, text, result).await
                }
                Err(_) => {
                    let request = format!("покажи события на {argument}");
                    self.engine.respond(conversation, &request).await
                }
            },
            Command::Delete("") => messages::DELETE_USAGE.to_string(),
            Command::Delete(argument) if is_literal_event_id(argument) => {
                self.engine.delete_literal_id(argument).await
            }
            Command::Delete(argument) => {
                let request = format!("удали {argument}");
                self.engine.respond(conversation, &request).await
            }
            Command::Text(text) => self.engine.respond(conversation, text).await,
        }
    }

    /// Drops expired pending states and idle conversation locks. Returns the
    /// number of expired states removed.
    pub fn sweep(&self) -> usize {
        let expired = self.engine.store().sweep();
        let mut locks = self.locks();
        let before = locks.len();
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        debug!(
            expired,
            idle_locks = before - locks.len(),
            "swept conversation state"
        );
        expired
    }
}
