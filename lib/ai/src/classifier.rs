//! Intent classification over an LLM backend.

use crate::backend::LlmBackend;
use crate::error::ClassifierError;
use crate::extract::extract_json;
use crate::intent::IntentResult;
use crate::prompt::PromptTemplate;
use async_trait::async_trait;
use chrono::{FixedOffset, Utc};
use chronobot_core::LlmInvocationId;
use rootcause::Report;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Turns one free-text utterance into a structured intent guess.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    /// Classifies an utterance.
    ///
    /// # Errors
    ///
    /// Any failure (transport, malformed output, schema violation) means
    /// there is no result for this utterance.
    async fn classify(&self, utterance: &str) -> Result<IntentResult, Report<ClassifierError>>;
}

/// Classifier that prompts an LLM with few-shot examples and validates the
/// JSON it returns.
#[derive(Debug)]
pub struct LlmIntentClassifier<B> {
    backend: B,
    prompt: PromptTemplate,
    temperature: f32,
    utc_offset: Option<FixedOffset>,
}

impl<B: LlmBackend> LlmIntentClassifier<B> {
    /// Creates a classifier with the given backend and prompt template.
    #[must_use]
    pub fn new(backend: B, prompt: PromptTemplate) -> Self {
        Self {
            backend,
            prompt,
            temperature: 0.3,
            utc_offset: None,
        }
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Tells the model what "today" is in the given offset.
    #[must_use]
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = Some(offset);
        self
    }
}

/// Validates model output as an intent result.
///
/// # Errors
///
/// Returns an error if no JSON is found or it does not match the schema.
pub fn parse_intent_result(
    invocation_id: LlmInvocationId,
    content: &str,
) -> Result<IntentResult, ClassifierError> {
    let json = extract_json(content).ok_or(ClassifierError::NoJson { invocation_id })?;
    serde_json::from_str(json).map_err(|e| ClassifierError::SchemaViolation {
        invocation_id,
        reason: e.to_string(),
    })
}

fn preview(utterance: &str) -> String {
    utterance.chars().take(50).collect()
}

#[async_trait]
impl<B: LlmBackend> IntentClassifier for LlmIntentClassifier<B> {
    #[instrument(skip_all, fields(invocation_id = tracing::field::Empty))]
    async fn classify(&self, utterance: &str) -> Result<IntentResult, Report<ClassifierError>> {
        let invocation_id = LlmInvocationId::new();
        tracing::Span::current().record("invocation_id", tracing::field::display(invocation_id));

        let today = self
            .utc_offset
            .map(|offset| Utc::now().with_timezone(&offset).date_naive());
        let request = self
            .prompt
            .build_request(utterance, today)
            .with_temperature(self.temperature);

        info!(utterance = %preview(utterance), model = %self.backend.model(), "classifying");
        let started = Instant::now();

        let response = self.backend.generate(&request).await.map_err(|e| {
            warn!(error = %e, "classifier backend failed");
            ClassifierError::Backend {
                invocation_id,
                reason: e.to_string(),
            }
        })?;

        let result = parse_intent_result(invocation_id, &response.content).map_err(|e| {
            warn!(error = %e, content = %response.content, "unusable classifier output");
            e
        })?;

        info!(
            intent = %result.intent,
            confidence = result.confidence,
            clarify = result.clarify.is_needed(),
            latency_ms = started.elapsed().as_millis() as u64,
            "classified"
        );
        Ok(result)
    }
}
