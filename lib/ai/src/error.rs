//! Error types for the AI crate.
//!
//! Errors are carried as rootcause reports:
//! - `LlmError`: Low-level LLM backend operations
//! - `PromptError`: Prompt template loading
//! - `ClassifierError`: Turning a completion into an intent result

use chronobot_core::LlmInvocationId;
use std::fmt;

/// Errors from LLM backend operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// Request failed before a response was received.
    RequestFailed { reason: String },
    /// The endpoint answered with a non-success status.
    BadStatus { status: u16, body: String },
    /// Response parsing failed.
    ResponseParseFailed { reason: String },
    /// The completion contained no content.
    EmptyResponse,
    /// Timeout waiting for response.
    Timeout,
    /// Rate limit exceeded.
    RateLimited { retry_after_secs: Option<u64> },
    /// Invalid configuration.
    InvalidConfig { reason: String },
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestFailed { reason } => {
                write!(f, "LLM request failed: {reason}")
            }
            Self::BadStatus { status, body } => {
                write!(f, "LLM endpoint returned status {status}: {body}")
            }
            Self::ResponseParseFailed { reason } => {
                write!(f, "failed to parse LLM response: {reason}")
            }
            Self::EmptyResponse => write!(f, "LLM returned an empty completion"),
            Self::Timeout => write!(f, "LLM request timed out"),
            Self::RateLimited { retry_after_secs } => {
                if let Some(secs) = retry_after_secs {
                    write!(f, "rate limited, retry after {secs}s")
                } else {
                    write!(f, "rate limited")
                }
            }
            Self::InvalidConfig { reason } => {
                write!(f, "invalid LLM configuration: {reason}")
            }
        }
    }
}

impl std::error::Error for LlmError {}

/// Errors from prompt template operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptError {
    /// The template file could not be read.
    ReadFailed { path: String, reason: String },
    /// The template file is not a valid template.
    ParseFailed { path: String, reason: String },
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFailed { path, reason } => {
                write!(f, "failed to read prompt template '{path}': {reason}")
            }
            Self::ParseFailed { path, reason } => {
                write!(f, "failed to parse prompt template '{path}': {reason}")
            }
        }
    }
}

impl std::error::Error for PromptError {}

/// Errors from intent classification.
///
/// Every variant means "no result": the caller must treat the utterance as
/// not understood.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifierError {
    /// The LLM backend failed.
    Backend {
        invocation_id: LlmInvocationId,
        reason: String,
    },
    /// No JSON object could be found in the completion.
    NoJson { invocation_id: LlmInvocationId },
    /// The JSON did not match the intent result schema.
    SchemaViolation {
        invocation_id: LlmInvocationId,
        reason: String,
    },
}

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend {
                invocation_id,
                reason,
            } => {
                write!(f, "classifier call {invocation_id} failed: {reason}")
            }
            Self::NoJson { invocation_id } => {
                write!(f, "classifier call {invocation_id} returned no JSON object")
            }
            Self::SchemaViolation {
                invocation_id,
                reason,
            } => {
                write!(
                    f,
                    "classifier call {invocation_id} returned an invalid intent result: {reason}"
                )
            }
        }
    }
}

impl std::error::Error for ClassifierError {}
