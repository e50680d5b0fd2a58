//! Conversation context store.
//!
//! Maps each conversation to at most one pending dialogue state. Entries
//! live for a fixed TTL: an expired entry is treated as absent on read and
//! removed by the periodic sweep. Nothing is persisted, so a restart drops
//! every pending dialogue.

use crate::state::{PendingEntry, PendingState};
use chrono::{DateTime, TimeDelta, Utc};
use chronobot_core::{ConversationId, PendingId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

/// Default lifetime of a pending state.
pub const DEFAULT_PENDING_TTL: Duration = Duration::from_secs(900);

/// Keyed store of pending dialogue states. Clones share the same map.
#[derive(Debug, Clone)]
pub struct ContextStore {
    entries: Arc<Mutex<HashMap<ConversationId, PendingEntry>>>,
    ttl: TimeDelta,
}

impl Default for ContextStore {
    fn default() -> Self {
        Self::new(DEFAULT_PENDING_TTL)
    }
}

impl ContextStore {
    /// Creates an empty store whose entries live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            ttl: TimeDelta::from_std(ttl).unwrap_or_else(|_| TimeDelta::days(365)),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<ConversationId, PendingEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the live pending entry for a conversation.
    #[must_use]
    pub fn get(&self, conversation: &ConversationId) -> Option<PendingEntry> {
        self.get_at(conversation, Utc::now())
    }

    fn get_at(&self, conversation: &ConversationId, now: DateTime<Utc>) -> Option<PendingEntry> {
        let mut entries = self.entries();
        let entry = entries.get(conversation)?;
        if !entry.is_expired(now) {
            return Some(entry.clone());
        }

        debug!(%conversation, pending = %entry.id, "pending state expired");
        entries.remove(conversation);
        None
    }

    /// Stores a state, replacing any previous one.
    pub fn set(&self, conversation: &ConversationId, state: PendingState) -> PendingId {
        self.set_at(conversation, state, Utc::now())
    }

    fn set_at(
        &self,
        conversation: &ConversationId,
        state: PendingState,
        now: DateTime<Utc>,
    ) -> PendingId {
        let entry = PendingEntry::new(state, now, self.ttl);
        let id = entry.id;
        debug!(%conversation, pending = %id, kind = entry.state.kind(), "storing pending state");
        self.entries().insert(conversation.clone(), entry);
        id
    }

    /// Removes the state for a conversation, returning it.
    pub fn clear(&self, conversation: &ConversationId) -> Option<PendingEntry> {
        self.entries().remove(conversation)
    }

    /// Removes every expired entry, returning how many were removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Utc::now())
    }

    fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Number of stored entries, expired ones included until swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}
