//! Dialogue engine.
//!
//! Decides, for each inbound message, whether it continues a pending dialogue
//! or starts a fresh one, and what to store for the next turn.

use crate::context::ContextStore;
use crate::dispatcher::{ActionDispatcher, Dispatch};
use crate::format;
use crate::messages;
use crate::reply::YesNo;
use crate::state::{PendingEntry, PendingState};
use chronobot_ai::{Intent, IntentClassifier, IntentResult, Slots};
use chronobot_core::ConversationId;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Confidence below which a guess is confirmed with the user first.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.80;

/// The per-message state machine.
#[derive(Clone)]
pub struct DialogueEngine {
    classifier: Arc<dyn IntentClassifier>,
    dispatcher: ActionDispatcher,
    store: ContextStore,
    threshold: f64,
}

impl std::fmt::Debug for DialogueEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogueEngine")
            .field("dispatcher", &self.dispatcher)
            .field("store", &self.store)
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}

impl DialogueEngine {
    /// Creates an engine with the default confidence threshold.
    #[must_use]
    pub fn new(
        classifier: Arc<dyn IntentClassifier>,
        dispatcher: ActionDispatcher,
        store: ContextStore,
    ) -> Self {
        Self {
            classifier,
            dispatcher,
            store,
            threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }

    /// Sets the confidence threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// The store holding pending states.
    #[must_use]
    pub fn store(&self) -> &ContextStore {
        &self.store
    }

    /// Handles a free-form message.
    #[instrument(skip_all, fields(%conversation))]
    pub async fn respond(&self, conversation: &ConversationId, text: &str) -> String {
        if let Some(entry) = self.store.get(conversation) {
            return self.resume(conversation, entry, text).await;
        }

        match self.classifier.classify(text).await {
            Ok(result) => self.evaluate(conversation, result).await,
            Err(report) => {
                warn!(error = %report, "classification failed");
                messages::TRY_REPHRASING.to_string()
            }
        }
    }

    /// Handles a message whose intent is already known.
    ///
    /// A pending state still takes precedence: `text` is then treated as the
    /// reply to it.
    #[instrument(skip_all, fields(%conversation))]
    pub async fn respond_with(
        &self,
        conversation: &ConversationId,
        text: &str,
        result: IntentResult,
    ) -> String {
        match self.store.get(conversation) {
            Some(entry) => self.resume(conversation, entry, text).await,
            None => self.evaluate(conversation, result).await,
        }
    }

    /// Deletes an event by identifier, ignoring and keeping any pending state.
    pub async fn delete_literal_id(&self, event_id: &str) -> String {
        self.dispatcher.delete_literal_id(event_id).await
    }

    /// Applies the fresh-evaluation rules to a classifier result.
    pub async fn evaluate(&self, conversation: &ConversationId, result: IntentResult) -> String {
        let IntentResult {
            intent,
            confidence,
            slots,
            clarify,
        } = result;
        info!(intent = intent.as_str(), confidence, "evaluating intent");

        if clarify.is_needed() {
            if let Some(first) = clarify.questions().first().cloned() {
                self.store.set(
                    conversation,
                    PendingState::AwaitingClarification {
                        intent,
                        slots,
                        questions: clarify.into_questions(),
                        cursor: 0,
                    },
                );
                return first;
            }
        }

        if confidence < self.threshold {
            let prompt = format::confirmation(intent, &slots);
            self.store.set(
                conversation,
                PendingState::AwaitingIntentConfirmation { intent, slots },
            );
            return prompt;
        }

        self.act(conversation, intent, &slots).await
    }

    async fn act(&self, conversation: &ConversationId, intent: Intent, slots: &Slots) -> String {
        match self.dispatcher.dispatch(intent, slots).await {
            Dispatch::Reply(text) => text,
            Dispatch::ConfirmDelete { event_id, prompt } => {
                self.store.set(
                    conversation,
                    PendingState::AwaitingDeleteConfirmation { event_id },
                );
                prompt
            }
        }
    }

    /// Interprets `reply` against the stored state.
    pub async fn resume(
        &self,
        conversation: &ConversationId,
        entry: PendingEntry,
        reply: &str,
    ) -> String {
        debug!(pending = %entry.id, kind = entry.state.kind(), "resuming dialogue");

        match entry.state {
            PendingState::AwaitingDeleteConfirmation { event_id } => {
                match YesNo::parse(reply) {
                    YesNo::Yes => {
                        self.store.clear(conversation);
                        self.dispatcher.delete_by_id(&event_id).await
                    }
                    YesNo::No => {
                        self.store.clear(conversation);
                        messages::DELETE_CANCELLED.to_string()
                    }
                    YesNo::Unrecognized => messages::ANSWER_YES_OR_NO.to_string(),
                }
            }
            PendingState::AwaitingIntentConfirmation { intent, slots } => {
                match YesNo::parse(reply) {
                    YesNo::Yes => {
                        self.store.clear(conversation);
                        let confirmed = IntentResult::confirmed(intent, slots);
                        self.act(conversation, confirmed.intent, &confirmed.slots)
                            .await
                    }
                    YesNo::No => {
                        self.store.clear(conversation);
                        messages::RESTATE_WITH_DETAIL.to_string()
                    }
                    YesNo::Unrecognized => messages::ANSWER_YES_OR_NO.to_string(),
                }
            }
            PendingState::AwaitingClarification {
                intent,
                slots,
                questions,
                cursor,
            } => {
                let next = cursor + 1;
                let Some(question) = questions.get(next).cloned() else {
                    self.store.clear(conversation);
                    return messages::CLARIFICATIONS_DONE.to_string();
                };
                self.store.set(
                    conversation,
                    PendingState::AwaitingClarification {
                        intent,
                        slots,
                        questions,
                        cursor: next,
                    },
                );
                question
            }
        }
    }
}
