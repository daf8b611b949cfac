//! Preset Agents
//!
//! Three configurations of the same loop:
//!
//! | preset   | tools                                   | temperature | limits             |
//! |----------|-----------------------------------------|-------------|--------------------|
//! | simple   | calculator, get_word_length             | 0.0         | none               |
//! | research | web_search, analyze_content             | 0.3         | `web_search` bound |
//! | memory   | preferences, reminders, summary         | 0.7         | checkpointed turns |

use std::sync::Arc;

use agent_core::tool::{CalculatorTool, WordLengthTool};
use agent_core::{
    Agent, CheckpointStore, ConversationRunner, Message, Reasoner, Result, State, StateUpdate,
    StepHook, ToolCall, ToolResult,
};

use crate::error::DemoError;
use crate::search::SearchBackend;
use crate::svckit::{
    AnalyzeContentTool, GetSummaryTool, Notebook, SAVE_USER_PREFERENCE, SavePreferenceTool,
    SetReminderTool, WEB_SEARCH, WebSearchTool,
};
use crate::{CONVERSATIONAL_SYSTEM_PROMPT, RESEARCH_SYSTEM_PROMPT};

/// Default number of searches a research run may make
pub const DEFAULT_MAX_SEARCHES: u32 = 3;

/// State field holding the remembered user name
pub const USER_NAME_FIELD: &str = "user_name";

/// Calculator and word-length tools, deterministic sampling, no system prompt
pub fn simple_agent(reasoner: Arc<dyn Reasoner>) -> Result<Agent> {
    Agent::builder()
        .reasoner(reasoner)
        .tool(CalculatorTool)
        .tool(WordLengthTool)
        .temperature(0.0)
        .build()
}

/// Search-and-analyze agent that stops searching after `max_searches`
pub fn research_agent(
    reasoner: Arc<dyn Reasoner>,
    backend: Arc<dyn SearchBackend>,
    max_searches: u32,
) -> Result<Agent> {
    if max_searches == 0 {
        return Err(DemoError::Config("max_searches must be at least 1".into()).into());
    }

    Agent::builder()
        .reasoner(reasoner)
        .tool(WebSearchTool::new(backend))
        .tool(AnalyzeContentTool)
        .system_prompt(RESEARCH_SYSTEM_PROMPT)
        .temperature(0.3)
        .bound(WEB_SEARCH, max_searches)
        .build()
}

/// Conversational agent that remembers the user across checkpointed turns
pub fn memory_agent(
    reasoner: Arc<dyn Reasoner>,
    store: Arc<dyn CheckpointStore>,
    notebook: &Notebook,
) -> Result<ConversationRunner> {
    let agent = Agent::builder()
        .reasoner(reasoner)
        .tool(SavePreferenceTool::new(notebook.clone()))
        .tool(SetReminderTool::new(notebook.clone()))
        .tool(GetSummaryTool::new(notebook.clone()))
        .system_prompt(CONVERSATIONAL_SYSTEM_PROMPT)
        .temperature(0.7)
        .hook(Arc::new(UserNameHook))
        .build()?;

    Ok(ConversationRunner::new(Arc::new(agent), store))
}

/// Caches the user's name from `save_user_preference` and reminds the
/// reasoner of it on every step
pub struct UserNameHook;

impl StepHook for UserNameHook {
    fn context(&self, state: &State) -> Vec<Message> {
        let name = state.field_str(USER_NAME_FIELD);
        if name.is_empty() || state.len() <= 1 {
            return Vec::new();
        }
        vec![Message::system(format!(
            "Note: The user's name is {name}. Use this naturally in conversation."
        ))]
    }

    fn after_act(&self, _state: &State, calls: &[ToolCall], _results: &[ToolResult]) -> StateUpdate {
        let name = calls
            .iter()
            .filter(|c| c.name == SAVE_USER_PREFERENCE)
            .filter(|c| c.str_arg("preference_type") == Some("name"))
            .find_map(|c| c.str_arg("value"));

        match name {
            Some(name) => {
                tracing::debug!(name, "Remembering user name");
                StateUpdate::new().field(USER_NAME_FIELD, name)
            }
            None => StateUpdate::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::mock::ScriptedReasoner;
    use agent_core::{ConversationId, ForceReason, MemoryCheckpointStore, ReasonerOutput, Role, Termination};

    use crate::search::MockSearchBackend;

    fn search(id: &str, query: &str) -> ToolCall {
        ToolCall::new(WEB_SEARCH).with_id(id).arg("query", query)
    }

    #[tokio::test]
    async fn test_simple_agent_calculates() {
        let reasoner = Arc::new(ScriptedReasoner::new(vec![
            ReasonerOutput::invoke(vec![
                ToolCall::new("calculator").with_id("c1").arg("expression", "25 * 4 + 10"),
            ]),
            ReasonerOutput::answer("25 * 4 + 10 = 110"),
        ]));
        let agent = simple_agent(reasoner.clone()).unwrap();

        let outcome = agent.ask("What is 25 * 4 + 10?").await.unwrap();
        assert_eq!(outcome.answer, "25 * 4 + 10 = 110");
        assert_eq!(outcome.state.history()[2].content(), "The result is: 110");
        assert_eq!(reasoner.tool_counts().await, vec![2, 2]);
        assert!(!outcome.state.has_system_message());
    }

    #[tokio::test]
    async fn test_simple_agent_word_length() {
        let reasoner = Arc::new(ScriptedReasoner::new(vec![
            ReasonerOutput::invoke(vec![
                ToolCall::new("get_word_length").arg("word", "LangGraph"),
            ]),
            ReasonerOutput::answer("9"),
        ]));
        let agent = simple_agent(reasoner).unwrap();

        let outcome = agent.ask("How long is 'LangGraph'?").await.unwrap();
        assert_eq!(
            outcome.state.history()[2].content(),
            "The word 'LangGraph' has 9 characters"
        );
    }

    #[tokio::test]
    async fn test_research_within_bound() {
        let reasoner = Arc::new(ScriptedReasoner::new(vec![
            ReasonerOutput::invoke(vec![search("s1", "LangGraph features")]),
            ReasonerOutput::invoke(vec![search("s2", "LangGraph persistence")]),
            ReasonerOutput::answer("LangGraph is a library for stateful agents."),
        ]));
        let agent = research_agent(reasoner, Arc::new(MockSearchBackend::new()), 2).unwrap();

        let outcome = agent
            .ask("What is LangGraph and what are its key features?")
            .await
            .unwrap();

        let roles: Vec<Role> = outcome.state.history().iter().map(Message::role).collect();
        assert_eq!(
            roles,
            vec![
                Role::System,
                Role::User,
                Role::Assistant,
                Role::Tool,
                Role::Assistant,
                Role::Tool,
                Role::Assistant,
            ]
        );
        assert_eq!(outcome.state.history()[0].content(), RESEARCH_SYSTEM_PROMPT);
        assert!(outcome.state.history()[3].content().starts_with("LangGraph is a library"));
        assert_eq!(outcome.state.tracked_calls(), 2);
        assert_eq!(outcome.termination, Termination::Answered);
    }

    #[tokio::test]
    async fn test_research_bound_forces_answer() {
        let reasoner = Arc::new(
            ScriptedReasoner::new(vec![
                ReasonerOutput::invoke(vec![search("s1", "agentic ai")]),
                ReasonerOutput::invoke(vec![search("s2", "agentic ai patterns")]),
                ReasonerOutput::invoke(vec![search("s3", "agentic ai vs chatbots")]),
                ReasonerOutput::invoke(vec![search("s4", "one more")]),
                ReasonerOutput::answer("Agentic AI plans, acts and adapts."),
            ]),
        );
        let agent = research_agent(
            reasoner.clone(),
            Arc::new(MockSearchBackend::new()),
            DEFAULT_MAX_SEARCHES,
        )
        .unwrap();

        let outcome = agent.ask("Explain agentic AI").await.unwrap();
        assert_eq!(outcome.answer, "Agentic AI plans, acts and adapts.");
        assert_eq!(outcome.state.tracked_calls(), DEFAULT_MAX_SEARCHES);
        assert_eq!(
            outcome.termination,
            Termination::Forced(ForceReason::BoundReached {
                tool: WEB_SEARCH.into(),
                limit: DEFAULT_MAX_SEARCHES,
            })
        );
        // the fourth search is never executed
        assert!(!outcome
            .state
            .history()
            .iter()
            .any(|m| m.tool_call_id() == Some("s4")));
        assert_eq!(reasoner.tool_counts().await.last(), Some(&0));
    }

    #[test]
    fn test_research_agent_needs_a_search_budget() {
        let reasoner = Arc::new(ScriptedReasoner::repeating(ReasonerOutput::answer("none")));
        let result = research_agent(reasoner, Arc::new(MockSearchBackend::new()), 0);
        assert!(matches!(result, Err(agent_core::AgentError::Config(_))));
    }

    #[tokio::test]
    async fn test_analyze_content_does_not_count() {
        let reasoner = Arc::new(ScriptedReasoner::new(vec![
            ReasonerOutput::invoke(vec![
                ToolCall::new("analyze_content")
                    .arg("content", "LangGraph supports cycles.")
                    .arg("focus", "technical details"),
            ]),
            ReasonerOutput::answer("done"),
        ]));
        let agent = research_agent(reasoner, Arc::new(MockSearchBackend::new()), 1).unwrap();

        let outcome = agent.ask("Analyze this").await.unwrap();
        assert_eq!(outcome.state.tracked_calls(), 0);
        assert_eq!(outcome.termination, Termination::Answered);
    }

    #[tokio::test]
    async fn test_memory_agent_remembers_name_across_turns() {
        let reasoner = Arc::new(ScriptedReasoner::new(vec![
            ReasonerOutput::invoke(vec![
                ToolCall::new(SAVE_USER_PREFERENCE)
                    .arg("preference_type", "name")
                    .arg("value", "Alex"),
            ]),
            ReasonerOutput::answer("Nice to meet you, Alex!"),
            ReasonerOutput::answer("You're Alex, and you're learning about agentic AI."),
        ]));
        let store = Arc::new(MemoryCheckpointStore::new());
        let notebook = Notebook::new();
        let runner = memory_agent(reasoner.clone(), store.clone(), &notebook).unwrap();
        let id = ConversationId::from_string("demo-conversation");

        let first = runner
            .turn(&id, "Hi! My name is Alex and I'm learning about agentic AI.")
            .await
            .unwrap();
        assert_eq!(first.state.field_str(USER_NAME_FIELD), "Alex");
        assert_eq!(notebook.preference("name").await.as_deref(), Some("Alex"));

        let second = runner.turn(&id, "What have we discussed so far?").await.unwrap();
        assert!(second.resumed);
        assert_eq!(second.state.field_str(USER_NAME_FIELD), "Alex");
        assert_eq!(second.state.field_str("conversation_id"), "demo-conversation");

        let seen = reasoner.histories().await;
        // no name is known on the very first call
        assert!(!seen[0].iter().any(|m| m.content().starts_with("Note:")));
        let last = seen.last().unwrap();
        assert_eq!(last[0].content(), CONVERSATIONAL_SYSTEM_PROMPT);
        assert_eq!(
            last[1].content(),
            "Note: The user's name is Alex. Use this naturally in conversation."
        );

        // the injected note never reaches the checkpoint
        let saved = store.load(&id).await.unwrap().unwrap();
        assert!(!saved.state.history().iter().any(|m| m.content().starts_with("Note:")));
    }

    #[test]
    fn test_name_hook_ignores_other_preferences() {
        let calls = vec![
            ToolCall::new(SAVE_USER_PREFERENCE)
                .arg("preference_type", "interest")
                .arg("value", "LangGraph"),
        ];
        let update = UserNameHook.after_act(&State::new(), &calls, &[]);
        assert!(update.is_empty());
    }
}
