//! Checkpoints
//!
//! Persisted snapshots of a conversation's [`State`], keyed by conversation
//! id. The store is the only state shared across turns; the in-memory store
//! keeps serialized snapshots with unbounded retention.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AgentError, Result};
use crate::state::State;

/// Unique conversation identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(s: &str) -> Self {
        Self::from_string(s)
    }
}

/// A saved snapshot of one conversation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub conversation_id: ConversationId,

    pub state: State,

    /// Starts at 1 and grows by one on every save
    pub version: u64,

    pub saved_at: DateTime<Utc>,
}

/// Checkpoint persistence backend
///
/// A missing checkpoint is `Ok(None)`, not an error. Backend failures are
/// reported as `AgentError::CheckpointUnavailable`.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Load the latest checkpoint for a conversation
    async fn load(&self, id: &ConversationId) -> Result<Option<Checkpoint>>;

    /// Save a new snapshot, overwriting the previous one
    async fn save(&self, id: &ConversationId, state: &State) -> Result<Checkpoint>;

    /// Forget a conversation
    async fn delete(&self, id: &ConversationId) -> Result<()>;

    /// Ids of every stored conversation, sorted
    async fn list(&self) -> Result<Vec<ConversationId>>;
}

/// In-memory checkpoint store (for development/testing)
#[derive(Default)]
pub struct MemoryCheckpointStore {
    entries: RwLock<HashMap<ConversationId, String>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

fn decode(raw: &str) -> Result<Checkpoint> {
    serde_json::from_str(raw)
        .map_err(|e| AgentError::CheckpointUnavailable(format!("corrupt checkpoint: {e}")))
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(&self, id: &ConversationId) -> Result<Option<Checkpoint>> {
        let entries = self.entries.read().await;
        entries.get(id).map(|raw| decode(raw)).transpose()
    }

    async fn save(&self, id: &ConversationId, state: &State) -> Result<Checkpoint> {
        let mut entries = self.entries.write().await;
        let previous = match entries.get(id) {
            Some(raw) => decode(raw)?.version,
            None => 0,
        };

        let checkpoint = Checkpoint {
            conversation_id: id.clone(),
            state: state.clone(),
            version: previous + 1,
            saved_at: Utc::now(),
        };
        let raw = serde_json::to_string(&checkpoint)
            .map_err(|e| AgentError::CheckpointUnavailable(format!("serialize: {e}")))?;
        entries.insert(id.clone(), raw);

        tracing::debug!(conversation = %id, version = checkpoint.version, "Checkpoint saved");
        Ok(checkpoint)
    }

    async fn delete(&self, id: &ConversationId) -> Result<()> {
        self.entries.write().await.remove(id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ConversationId>> {
        let mut ids: Vec<_> = self.entries.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use crate::state::StateUpdate;

    #[tokio::test]
    async fn test_missing_is_none() {
        let store = MemoryCheckpointStore::new();
        assert!(store.load(&"nope".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let store = MemoryCheckpointStore::new();
        let id = ConversationId::new();
        let state = State::from_user("Hi!").merge(StateUpdate::new().field("user_name", "Alex"));

        let saved = store.save(&id, &state).await.unwrap();
        assert_eq!(saved.version, 1);

        let loaded = store.load(&id).await.unwrap().unwrap();
        assert_eq!(loaded.state, state);
        assert_eq!(loaded.conversation_id, id);
    }

    #[tokio::test]
    async fn test_save_overwrites_and_versions() {
        let store = MemoryCheckpointStore::new();
        let id = ConversationId::from_string("conversation-1");

        store.save(&id, &State::from_user("one")).await.unwrap();
        let state = State::from_messages([Message::user("one"), Message::assistant("two")]);
        let second = store.save(&id, &state).await.unwrap();

        assert_eq!(second.version, 2);
        assert_eq!(store.load(&id).await.unwrap().unwrap().state.len(), 2);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_conversations_are_independent() {
        let store = MemoryCheckpointStore::new();
        store.save(&"b".into(), &State::from_user("b")).await.unwrap();
        store.save(&"a".into(), &State::from_user("a")).await.unwrap();

        assert_eq!(
            store.list().await.unwrap(),
            vec![ConversationId::from("a"), ConversationId::from("b")]
        );

        store.delete(&"a".into()).await.unwrap();
        assert!(store.load(&"a".into()).await.unwrap().is_none());
        assert_eq!(
            store.load(&"b".into()).await.unwrap().unwrap().state.history()[0].content(),
            "b"
        );
    }
}
