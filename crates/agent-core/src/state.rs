//! Loop State
//!
//! The record threaded through every step of the loop. `history` only ever
//! grows; every other field is a scalar that the latest update overwrites.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::Message;

/// Accumulating state of one conversation
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    #[serde(default)]
    history: Vec<Message>,

    /// Calls made to the bound-tracked tool category during the current turn
    #[serde(default)]
    tracked_calls: u32,

    /// Named scalar fields (cached identity, conversation id, ...)
    #[serde(default)]
    fields: BTreeMap<String, Value>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a state from an initial set of messages
    pub fn from_messages(messages: impl IntoIterator<Item = Message>) -> Self {
        Self {
            history: messages.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Shorthand for a state holding a single user message
    pub fn from_user(content: impl Into<String>) -> Self {
        Self::from_messages([Message::user(content)])
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.history.last()
    }

    pub const fn tracked_calls(&self) -> u32 {
        self.tracked_calls
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// String field, empty when absent or not a string
    pub fn field_str(&self, key: &str) -> &str {
        self.fields.get(key).and_then(Value::as_str).unwrap_or_default()
    }

    pub const fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    pub fn has_system_message(&self) -> bool {
        self.history.iter().any(Message::is_system)
    }

    /// Prepend a system message unless history already holds one.
    ///
    /// This is the only operation that places a message anywhere but the end.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        if !self.has_system_message() {
            self.history.insert(0, Message::system(prompt));
        }
        self
    }

    /// Merge a partial update: messages are appended in order, every scalar
    /// present in the update replaces the current value, the rest carry over.
    #[must_use]
    pub fn merge(mut self, update: StateUpdate) -> Self {
        self.apply(update);
        self
    }

    /// In-place form of [`State::merge`]
    pub fn apply(&mut self, update: StateUpdate) {
        let StateUpdate {
            messages,
            tracked_calls,
            fields,
        } = update;

        self.history.extend(messages);
        if let Some(count) = tracked_calls {
            self.tracked_calls = count;
        }
        self.fields.extend(fields);
    }
}

/// Partial update produced by one step
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StateUpdate {
    messages: Vec<Message>,
    tracked_calls: Option<u32>,
    fields: BTreeMap<String, Value>,
}

impl StateUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    #[must_use]
    pub fn messages(mut self, messages: impl IntoIterator<Item = Message>) -> Self {
        self.messages.extend(messages);
        self
    }

    #[must_use]
    pub const fn tracked_calls(mut self, count: u32) -> Self {
        self.tracked_calls = Some(count);
        self
    }

    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Fold another update into this one, keeping message order
    #[must_use]
    pub fn and(mut self, other: Self) -> Self {
        self.messages.extend(other.messages);
        if other.tracked_calls.is_some() {
            self.tracked_calls = other.tracked_calls;
        }
        self.fields.extend(other.fields);
        self
    }

    pub fn pending_messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.tracked_calls.is_none() && self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> State {
        State::from_messages([Message::user("hi"), Message::assistant("hello")])
            .merge(StateUpdate::new().tracked_calls(1).field("user_name", "Alex"))
    }

    #[test]
    fn test_merge_appends_history_in_order() {
        let state = sample();
        let update = StateUpdate::new()
            .message(Message::user("again"))
            .message(Message::assistant("again!"));
        let expected_len = state.len() + update.pending_messages().len();

        let merged = state.clone().merge(update);
        assert_eq!(merged.len(), expected_len);
        assert_eq!(&merged.history()[..state.len()], state.history());
        assert_eq!(merged.history()[2], Message::user("again"));
        assert_eq!(merged.history()[3], Message::assistant("again!"));
    }

    #[test]
    fn test_merge_keeps_duplicates() {
        let msg = Message::tool("call-1", "web_search", "same");
        let merged = State::new().merge(StateUpdate::new().message(msg.clone()).message(msg));
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_scalar_updates_leave_history_untouched() {
        let state = sample();
        let merged = state
            .clone()
            .merge(StateUpdate::new().tracked_calls(2))
            .merge(StateUpdate::new().field("user_name", "Sam"))
            .merge(StateUpdate::new());

        assert_eq!(merged.history(), state.history());
        assert_eq!(merged.tracked_calls(), 2);
        assert_eq!(merged.field_str("user_name"), "Sam");
    }

    #[test]
    fn test_absent_fields_carry_over_and_default() {
        let merged = sample().merge(StateUpdate::new().field("conversation_id", "c-1"));
        assert_eq!(merged.tracked_calls(), 1);
        assert_eq!(merged.field_str("user_name"), "Alex");
        assert_eq!(State::new().field_str("user_name"), "");
        assert_eq!(State::new().tracked_calls(), 0);
    }

    #[test]
    fn test_system_prompt_prepended_once() {
        let state = State::from_user("hi")
            .with_system_prompt("be helpful")
            .with_system_prompt("be helpful");
        assert_eq!(state.len(), 2);
        assert!(state.history()[0].is_system());
        assert_eq!(state.history()[1], Message::user("hi"));
    }

    #[test]
    fn test_update_and() {
        let combined = StateUpdate::new()
            .message(Message::user("a"))
            .tracked_calls(1)
            .and(StateUpdate::new().message(Message::user("b")).field("k", 1));
        let state = State::new().merge(combined);
        assert_eq!(state.history()[0].content(), "a");
        assert_eq!(state.history()[1].content(), "b");
        assert_eq!(state.tracked_calls(), 1);
        assert_eq!(state.field("k"), Some(&Value::from(1)));
    }

    #[test]
    fn test_state_serde() {
        let state = sample();
        let json = serde_json::to_string(&state).unwrap();
        let back: State = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
