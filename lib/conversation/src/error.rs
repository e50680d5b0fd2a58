//! Error types for the conversation crate.

use chronobot_core::ConversationId;
use std::fmt;

/// Errors from a message transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Fetching inbound messages failed.
    ReceiveFailed { reason: String },
    /// Delivering a reply failed.
    SendFailed {
        conversation: ConversationId,
        reason: String,
    },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReceiveFailed { reason } => {
                write!(f, "failed to receive messages: {reason}")
            }
            Self::SendFailed {
                conversation,
                reason,
            } => {
                write!(f, "failed to send reply to {conversation}: {reason}")
            }
        }
    }
}

impl std::error::Error for TransportError {}
