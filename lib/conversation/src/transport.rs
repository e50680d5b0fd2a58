//! Message transport seam.

use crate::error::TransportError;
use async_trait::async_trait;
use chronobot_core::ConversationId;
use rootcause::Report;

/// One inbound text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    /// Who sent it; replies go back here.
    pub conversation: ConversationId,
    /// The message text.
    pub text: String,
}

impl Inbound {
    /// Creates an inbound message.
    pub fn new(conversation: impl Into<ConversationId>, text: impl Into<String>) -> Self {
        Self {
            conversation: conversation.into(),
            text: text.into(),
        }
    }
}

/// A chat transport: a source of inbound messages and a sink for replies.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Waits for the next batch of messages. An empty batch is not an error.
    async fn receive(&self) -> Result<Vec<Inbound>, Report<TransportError>>;

    /// Sends a reply to a conversation.
    async fn send(
        &self,
        conversation: &ConversationId,
        text: &str,
    ) -> Result<(), Report<TransportError>>;
}
