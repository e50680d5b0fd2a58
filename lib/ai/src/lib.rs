//! Intent classification for chronobot.
//!
//! This crate provides:
//!
//! - **Intent Result**: the structured guess for one user utterance
//! - **LLM backend**: a provider-neutral completion interface plus an
//!   OpenAI-compatible HTTP implementation
//! - **Classifier**: few-shot prompting, JSON extraction and validation that
//!   turn free text into an [`IntentResult`]

pub mod backend;
pub mod classifier;
pub mod error;
pub mod extract;
pub mod intent;
pub mod openai;
pub mod prompt;

pub use backend::{LlmBackend, LlmMessage, LlmRequest, LlmResponse, MessageRole, TokenUsage};
pub use classifier::{IntentClassifier, LlmIntentClassifier};
pub use error::{ClassifierError, LlmError, PromptError};
pub use intent::{Clarification, Intent, IntentResult, Slots};
pub use openai::{OpenAiCompatibleBackend, OpenAiConfig};
pub use prompt::{FewShotExample, PromptTemplate};
