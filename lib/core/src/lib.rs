//! Core domain types and utilities for chronobot.
//!
//! This crate provides the foundational types, error handling, and shared
//! identifiers used throughout the calendar assistant.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ConversationId, LlmInvocationId, ParseIdError, PendingId};
