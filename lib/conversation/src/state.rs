//! Pending dialogue state.
//!
//! A conversation holds at most one pending state. Storing a new one always
//! replaces the old; nothing is queued.

use chrono::{DateTime, TimeDelta, Utc};
use chronobot_ai::{Intent, Slots};
use chronobot_core::PendingId;

/// What the bot is waiting for from the user.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingState {
    /// Walking through clarifying questions.
    AwaitingClarification {
        /// The guessed intent.
        intent: Intent,
        /// Slots extracted so far.
        slots: Slots,
        /// Questions, in the order they are asked.
        questions: Vec<String>,
        /// Index of the question most recently asked.
        cursor: usize,
    },
    /// Waiting for yes/no on a low-confidence guess.
    AwaitingIntentConfirmation {
        /// The guessed intent.
        intent: Intent,
        /// The guessed slots.
        slots: Slots,
    },
    /// Waiting for yes/no before deleting an event found by title.
    AwaitingDeleteConfirmation {
        /// Calendar identifier of the event to delete.
        event_id: String,
    },
}

impl PendingState {
    /// Short name for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AwaitingClarification { .. } => "awaiting_clarification",
            Self::AwaitingIntentConfirmation { .. } => "awaiting_intent_confirmation",
            Self::AwaitingDeleteConfirmation { .. } => "awaiting_delete_confirmation",
        }
    }
}

/// A stored pending state with its bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEntry {
    /// Fresh for every stored state, for log correlation.
    pub id: PendingId,
    /// The state itself.
    pub state: PendingState,
    /// When the state was stored.
    pub created_at: DateTime<Utc>,
    /// When the state stops being honored.
    pub expires_at: DateTime<Utc>,
}

impl PendingEntry {
    /// Wraps a state that lives for `ttl` from `now`.
    #[must_use]
    pub fn new(state: PendingState, now: DateTime<Utc>, ttl: TimeDelta) -> Self {
        Self {
            id: PendingId::new(),
            state,
            created_at: now,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Returns true once `now` has reached the expiry time.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_expiry_boundary() {
        let now = Utc::now();
        let entry = PendingEntry::new(
            PendingState::AwaitingDeleteConfirmation {
                event_id: "abc".to_string(),
            },
            now,
            TimeDelta::seconds(900),
        );

        assert!(!entry.is_expired(now));
        assert!(!entry.is_expired(now + TimeDelta::seconds(899)));
        assert!(entry.is_expired(now + TimeDelta::seconds(900)));
    }

    #[test]
    fn entries_get_distinct_ids() {
        let now = Utc::now();
        let state = PendingState::AwaitingIntentConfirmation {
            intent: Intent::List,
            slots: Slots::default(),
        };
        let a = PendingEntry::new(state.clone(), now, TimeDelta::seconds(1));
        let b = PendingEntry::new(state, now, TimeDelta::seconds(1));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn kinds() {
        let clarification = PendingState::AwaitingClarification {
            intent: Intent::Create,
            slots: Slots::default(),
            questions: vec!["Когда?".to_string()],
            cursor: 0,
        };
        assert_eq!(clarification.kind(), "awaiting_clarification");
        assert_eq!(
            PendingState::AwaitingDeleteConfirmation {
                event_id: "e".to_string()
            }
            .kind(),
            "awaiting_delete_confirmation"
        );
    }
}
