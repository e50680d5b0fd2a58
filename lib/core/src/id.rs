//! Strongly-typed ID types for domain entities.
//!
//! Internally generated IDs use ULID, providing both uniqueness and temporal
//! ordering. Conversation identities come from the message transport and are
//! kept as opaque strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Error returned when parsing an ID from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse.
    pub id_type: &'static str,
    /// The reason for the parse failure.
    pub reason: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {}: {}", self.id_type, self.reason)
    }
}

impl std::error::Error for ParseIdError {}

/// Macro to generate a strongly-typed ID wrapper around ULID.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Ulid);

        impl $name {
            /// Creates a new ID with a randomly generated ULID.
            #[must_use]
            pub fn new() -> Self {
                Self(Ulid::new())
            }

            /// Returns the underlying ULID.
            #[must_use]
            pub const fn as_ulid(&self) -> Ulid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}_{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let ulid_str = s.strip_prefix(concat!($prefix, "_")).unwrap_or(s);

                Ulid::from_str(ulid_str)
                    .map(Self)
                    .map_err(|e| ParseIdError {
                        id_type: stringify!($name),
                        reason: e.to_string(),
                    })
            }
        }
    };
}

define_id!(
    /// Identifier of one stored pending dialogue state.
    ///
    /// A fresh ID is minted every time a state is stored, so two states for
    /// the same conversation are always distinguishable in logs.
    PendingId,
    "pend"
);

define_id!(
    /// Unique identifier for a single classifier invocation.
    LlmInvocationId,
    "llm"
);

/// Stable identifier for one end user's chat session.
///
/// The value is whatever the transport uses to address the chat (for
/// Telegram, the numeric chat id rendered as a string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// Creates a conversation ID from a transport-specific string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the conversation ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for ConversationId {
    fn from(chat_id: i64) -> Self {
        Self(chat_id.to_string())
    }
}

impl From<&str> for ConversationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_id_display_format() {
        let id = PendingId::new();
        assert!(id.to_string().starts_with("pend_"));
    }

    #[test]
    fn parse_with_and_without_prefix() {
        let id = LlmInvocationId::new();
        let parsed: LlmInvocationId = id.to_string().parse().expect("should parse");
        assert_eq!(id, parsed);

        let raw: LlmInvocationId = id.as_ulid().to_string().parse().expect("should parse");
        assert_eq!(id, raw);
    }

    #[test]
    fn parse_invalid_ulid() {
        let err = "not_a_ulid".parse::<PendingId>().unwrap_err();
        assert_eq!(err.id_type, "PendingId");
    }

    #[test]
    fn pending_ids_are_unique() {
        assert_ne!(PendingId::new(), PendingId::new());
    }

    #[test]
    fn conversation_id_from_chat_id() {
        let id = ConversationId::from(-100_123_i64);
        assert_eq!(id.as_str(), "-100123");
        assert_eq!(id, ConversationId::new("-100123"));
    }

    #[test]
    fn conversation_id_serde_is_transparent() {
        let id = ConversationId::from("42");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"42\"");
    }
}
