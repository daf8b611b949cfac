//! Checkpointed conversations
//!
//! A [`ConversationRunner`] drives one turn at a time for a conversation id:
//! load the last checkpoint (or start fresh), append the user's input, run
//! the agent to a terminal phase and save. Turns for the same id are
//! serialized; different ids run independently.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::checkpoint::{CheckpointStore, ConversationId};
use crate::error::Result;
use crate::message::Message;
use crate::reasoning::{Agent, Termination};
use crate::state::{State, StateUpdate};

/// Field holding the conversation id inside a fresh state
pub const CONVERSATION_ID_FIELD: &str = "conversation_id";

/// Result of one conversational turn
#[derive(Clone, Debug)]
pub struct TurnOutcome {
    pub answer: String,

    /// State as saved after the turn
    pub state: State,

    pub termination: Termination,

    /// Checkpoint version written by this turn
    pub version: u64,

    /// Whether the turn continued an existing checkpoint
    pub resumed: bool,
}

/// Runs an agent over checkpointed conversations
pub struct ConversationRunner {
    agent: Arc<Agent>,
    store: Arc<dyn CheckpointStore>,
    locks: Mutex<HashMap<ConversationId, Arc<Mutex<()>>>>,
}

impl ConversationRunner {
    pub fn new(agent: Arc<Agent>, store: Arc<dyn CheckpointStore>) -> Self {
        Self {
            agent,
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn store(&self) -> &dyn CheckpointStore {
        self.store.as_ref()
    }

    /// Run one turn of a conversation.
    ///
    /// The checkpoint is written only after the loop reaches a terminal
    /// phase. A failed or cancelled turn leaves the previous checkpoint as it
    /// was.
    pub async fn turn(&self, id: &ConversationId, input: &str) -> Result<TurnOutcome> {
        let lock = self.lock_for(id).await;
        let outcome = {
            let _guard = lock.lock().await;
            self.run_turn(id, input).await
        };
        drop(lock);
        self.release(id).await;
        outcome
    }

    async fn run_turn(&self, id: &ConversationId, input: &str) -> Result<TurnOutcome> {
        let (state, resumed) = match self.store.load(id).await? {
            Some(checkpoint) => {
                tracing::debug!(
                    conversation = %id,
                    version = checkpoint.version,
                    history = checkpoint.state.len(),
                    "Resuming conversation"
                );
                (checkpoint.state, true)
            }
            None => {
                tracing::debug!(conversation = %id, "Starting conversation");
                let fresh = State::new().merge(StateUpdate::new().field(CONVERSATION_ID_FIELD, id.as_str()));
                (fresh, false)
            }
        };

        let state = state.merge(StateUpdate::new().message(Message::user(input)));
        let outcome = self.agent.run(state).await?;
        let checkpoint = self.store.save(id, &outcome.state).await?;

        tracing::info!(
            conversation = %id,
            version = checkpoint.version,
            resumed,
            "Turn complete"
        );

        Ok(TurnOutcome {
            answer: outcome.answer,
            state: outcome.state,
            termination: outcome.termination,
            version: checkpoint.version,
            resumed,
        })
    }

    /// Saved state of a conversation, if any
    pub async fn state(&self, id: &ConversationId) -> Result<Option<State>> {
        Ok(self.store.load(id).await?.map(|c| c.state))
    }

    /// Drop a conversation's checkpoint so the next turn starts fresh
    pub async fn reset(&self, id: &ConversationId) -> Result<()> {
        let lock = self.lock_for(id).await;
        let deleted = {
            let _guard = lock.lock().await;
            self.store.delete(id).await
        };
        drop(lock);
        self.release(id).await;
        deleted
    }

    async fn lock_for(&self, id: &ConversationId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(id.clone()).or_default().clone()
    }

    /// Forget the id's lock once no turn holds or waits on it
    async fn release(&self, id: &ConversationId) {
        let mut locks = self.locks.lock().await;
        if locks.get(id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::{Checkpoint, MemoryCheckpointStore};
    use crate::error::AgentError;
    use crate::message::Role;
    use crate::mock::ScriptedReasoner;
    use crate::reasoner::ReasonerOutput;
    use crate::tool::{ParameterSchema, ToolCall, ToolRegistry, ToolSchema};
    use async_trait::async_trait;
    use std::time::Duration;

    fn runner(reasoner: Arc<ScriptedReasoner>, store: Arc<MemoryCheckpointStore>) -> ConversationRunner {
        let agent = Agent::builder()
            .reasoner(reasoner)
            .system_prompt("You are a helpful assistant with memory.")
            .build()
            .unwrap();
        ConversationRunner::new(Arc::new(agent), store)
    }

    #[tokio::test]
    async fn test_resume_extends_saved_history() {
        let store = Arc::new(MemoryCheckpointStore::new());
        let reasoner = Arc::new(ScriptedReasoner::new(vec![
            ReasonerOutput::answer("Hello Alex!"),
            ReasonerOutput::answer("Your name is Alex."),
        ]));
        let runner = runner(reasoner.clone(), store.clone());
        let id = ConversationId::from_string("thread-1");

        let first = runner.turn(&id, "Hi, I'm Alex").await.unwrap();
        assert!(!first.resumed);
        assert_eq!(first.version, 1);
        assert_eq!(first.state.field_str(CONVERSATION_ID_FIELD), "thread-1");
        assert_eq!(first.state.len(), 3);

        let second = runner.turn(&id, "What's my name?").await.unwrap();
        assert!(second.resumed);
        assert_eq!(second.version, 2);
        assert_eq!(second.answer, "Your name is Alex.");

        // saved history, then the new input, then the new answer
        assert_eq!(&second.state.history()[..3], first.state.history());
        assert_eq!(second.state.history()[3], Message::user("What's my name?"));
        assert_eq!(second.state.history()[4].role(), Role::Assistant);

        // the system prompt is stored once
        let systems = second.state.history().iter().filter(|m| m.is_system()).count();
        assert_eq!(systems, 1);

        let seen = reasoner.histories().await;
        assert_eq!(seen[1].len(), 4);
    }

    #[tokio::test]
    async fn test_failed_turn_saves_nothing() {
        let store = Arc::new(MemoryCheckpointStore::new());
        let reasoner = Arc::new(
            ScriptedReasoner::new(vec![ReasonerOutput::answer("first")])
                .then_fail(AgentError::RateLimited("slow down".into())),
        );
        let runner = runner(reasoner, store.clone());
        let id = ConversationId::new();

        runner.turn(&id, "one").await.unwrap();
        let err = runner.turn(&id, "two").await.unwrap_err();
        assert!(matches!(err, AgentError::RateLimited(_)));

        let saved = store.load(&id).await.unwrap().unwrap();
        assert_eq!(saved.version, 1);
        assert_eq!(saved.state.len(), 3);
    }

    #[tokio::test]
    async fn test_conversations_are_isolated() {
        let store = Arc::new(MemoryCheckpointStore::new());
        let reasoner = Arc::new(ScriptedReasoner::repeating(ReasonerOutput::answer("ok")));
        let runner = runner(reasoner, store.clone());

        runner.turn(&"a".into(), "for a").await.unwrap();
        runner.turn(&"a".into(), "again a").await.unwrap();
        let b = runner.turn(&"b".into(), "for b").await.unwrap();

        assert!(!b.resumed);
        assert_eq!(b.state.len(), 3);
        assert_eq!(runner.state(&"a".into()).await.unwrap().unwrap().len(), 5);

        runner.reset(&"a".into()).await.unwrap();
        assert!(runner.state(&"a".into()).await.unwrap().is_none());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_turns_are_serialized() {
        let store = Arc::new(MemoryCheckpointStore::new());
        let reasoner = Arc::new(
            ScriptedReasoner::repeating(ReasonerOutput::answer("ok"))
                .with_delay(Duration::from_millis(20)),
        );
        let runner = runner(reasoner.clone(), store.clone());
        let id = ConversationId::from_string("shared");

        let (first, second) = tokio::join!(runner.turn(&id, "one"), runner.turn(&id, "two"));
        let (first, second) = (first.unwrap(), second.unwrap());

        let mut versions = vec![first.version, second.version];
        versions.sort_unstable();
        assert_eq!(versions, vec![1, 2]);

        // the later turn built on the earlier turn's checkpoint
        let saved = store.load(&id).await.unwrap().unwrap();
        assert_eq!(saved.version, 2);
        assert_eq!(saved.state.len(), 5);
        let inputs: Vec<&str> = saved
            .state
            .history()
            .iter()
            .filter(|m| m.role() == Role::User)
            .map(Message::content)
            .collect();
        assert_eq!(inputs.len(), 2);
        assert!(inputs.contains(&"one") && inputs.contains(&"two"));

        let seen = reasoner.histories().await;
        assert_eq!(seen[1].len(), 4);
        assert!(runner.locks.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_reset_releases_lock() {
        let store = Arc::new(MemoryCheckpointStore::new());
        let reasoner = Arc::new(ScriptedReasoner::repeating(ReasonerOutput::answer("ok")));
        let runner = runner(reasoner, store);
        let id = ConversationId::new();

        runner.turn(&id, "hello").await.unwrap();
        runner.reset(&id).await.unwrap();
        assert!(runner.locks.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_search_bound_resets_each_turn() {
        let mut tools = ToolRegistry::new();
        tools.register_fn(
            ToolSchema::new("web_search", "Search the web")
                .param(ParameterSchema::string("query", "The search query")),
            |_| Ok("results".into()),
        );
        let search = |id: &str| ToolCall::new("web_search").with_id(id).arg("query", "q");
        let reasoner = Arc::new(ScriptedReasoner::new(vec![
            ReasonerOutput::invoke(vec![search("a1")]),
            ReasonerOutput::invoke(vec![search("a2")]),
            ReasonerOutput::answer("first answer"),
            ReasonerOutput::invoke(vec![search("b1")]),
            ReasonerOutput::answer("second answer"),
        ]));
        let agent = Agent::builder()
            .reasoner(reasoner)
            .tools(tools)
            .bound("web_search", 2)
            .build()
            .unwrap();
        let runner = ConversationRunner::new(Arc::new(agent), Arc::new(MemoryCheckpointStore::new()));
        let id = ConversationId::new();

        let first = runner.turn(&id, "first").await.unwrap();
        assert_eq!(first.termination, Termination::Answered);
        assert_eq!(first.state.tracked_calls(), 2);

        let second = runner.turn(&id, "second").await.unwrap();
        assert_eq!(second.termination, Termination::Answered);
        assert_eq!(second.answer, "second answer");
        assert_eq!(second.state.tracked_calls(), 1);
    }

    struct DownStore;

    #[async_trait]
    impl CheckpointStore for DownStore {
        async fn load(&self, _id: &ConversationId) -> Result<Option<Checkpoint>> {
            Err(AgentError::CheckpointUnavailable("connection reset".into()))
        }

        async fn save(&self, _id: &ConversationId, _state: &State) -> Result<Checkpoint> {
            Err(AgentError::CheckpointUnavailable("connection reset".into()))
        }

        async fn delete(&self, _id: &ConversationId) -> Result<()> {
            Ok(())
        }

        async fn list(&self) -> Result<Vec<ConversationId>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_store_failure_surfaces() {
        let reasoner = Arc::new(ScriptedReasoner::repeating(ReasonerOutput::answer("ok")));
        let agent = Agent::builder().reasoner(reasoner.clone()).build().unwrap();
        let runner = ConversationRunner::new(Arc::new(agent), Arc::new(DownStore));

        let err = runner.turn(&"x".into(), "hello").await.unwrap_err();
        assert!(matches!(err, AgentError::CheckpointUnavailable(_)));
        assert!(err.is_retryable());
        assert_eq!(reasoner.calls(), 0);
    }
}
