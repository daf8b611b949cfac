//! Reasoning Loop
//!
//! Implements the reason → act → observe cycle as an explicit state machine:
//!
//! ```text
//!            ┌──────────── tool results merged ◄──────────┐
//!            ▼                                            │
//!       REASONING ── invocations, within bound ──► ACTING ┘
//!            │  \
//!   no calls │   \ invocations, bound reached
//!            ▼    ▼
//!          DONE  DONE_FORCED (one extra call, no tools)
//! ```
//!
//! The loop works on its own copy of the state and only hands it back once a
//! terminal phase is reached, so an aborted turn leaves nothing half-merged.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::executor::{into_message, ToolExecutor};
use crate::message::Message;
use crate::reasoner::{GenerationOptions, Reasoner, ReasonerOutput};
use crate::state::{State, StateUpdate};
use crate::tool::{ToolCall, ToolRegistry, ToolResult, ToolSchema};

/// Instruction appended for the forced final call
pub const DEFAULT_SYNTHESIS_PROMPT: &str = "You have completed your research. Now provide a comprehensive final answer based on all the information gathered.";

/// Ceiling on calls to one named tool within a run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolBound {
    /// Tool whose invocations are counted
    pub tool: String,

    /// Maximum number of counted invocations
    pub limit: u32,
}

impl ToolBound {
    pub fn new(tool: impl Into<String>, limit: u32) -> Self {
        Self {
            tool: tool.into(),
            limit,
        }
    }

    fn reached(&self, count: u32) -> bool {
        count >= self.limit
    }

    fn count_in(&self, calls: &[ToolCall]) -> u32 {
        let n = calls.iter().filter(|c| c.name == self.tool).count();
        u32::try_from(n).unwrap_or(u32::MAX)
    }
}

/// Agent configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// System prompt placed at the start of a fresh history
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Instruction for the forced final call
    #[serde(default = "default_synthesis_prompt")]
    pub synthesis_prompt: String,

    /// Generation options
    #[serde(default)]
    pub generation: GenerationOptions,

    /// Category bound on one tool
    #[serde(default)]
    pub bound: Option<ToolBound>,

    /// Cap on acting rounds regardless of tool name
    #[serde(default)]
    pub max_iterations: Option<usize>,

    /// Run the invocations of one message concurrently
    #[serde(default)]
    pub parallel_tools: bool,

    /// Deadline for each reasoner call and each tool invocation
    #[serde(default, with = "opt_secs")]
    pub step_timeout: Option<Duration>,
}

fn default_synthesis_prompt() -> String {
    DEFAULT_SYNTHESIS_PROMPT.into()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: None,
            synthesis_prompt: default_synthesis_prompt(),
            generation: GenerationOptions::default(),
            bound: None,
            max_iterations: None,
            parallel_tools: false,
            step_timeout: None,
        }
    }
}

impl AgentConfig {
    /// Defaults overlaid with `AGENT_*` environment variables.
    ///
    /// Unset or unparsable variables keep the default.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(model) = std::env::var("AGENT_MODEL") {
            config.generation.model = model;
        }
        if let Some(t) = env_parse("AGENT_TEMPERATURE") {
            config.generation.temperature = t;
        }
        if let Some(n) = env_parse("AGENT_MAX_ITERATIONS") {
            config.max_iterations = Some(n);
        }
        if let Some(p) = env_parse("AGENT_PARALLEL_TOOLS") {
            config.parallel_tools = p;
        }
        if let Some(secs) = env_parse("AGENT_STEP_TIMEOUT_SECS") {
            config.step_timeout = Some(Duration::from_secs(secs));
        }

        config
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

mod opt_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&d.as_secs_f64()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let secs = Option::<f64>::deserialize(d)?;
        Ok(secs.filter(|s| *s > 0.0).map(Duration::from_secs_f64))
    }
}

/// Per-agent customisation of the loop
///
/// `context` contributes messages shown to the reasoner right after the
/// system prompt, for that call only. `after_act` turns a finished acting
/// round into scalar updates.
pub trait StepHook: Send + Sync {
    fn context(&self, _state: &State) -> Vec<Message> {
        Vec::new()
    }

    fn after_act(&self, _state: &State, _calls: &[ToolCall], _results: &[ToolResult]) -> StateUpdate {
        StateUpdate::new()
    }
}

/// Why a run stopped reasoning without a natural answer
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ForceReason {
    /// The tracked tool reached its bound
    BoundReached { tool: String, limit: u32 },
    /// The acting-round cap was hit
    IterationLimit(usize),
}

/// Terminal phase of a run
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Termination {
    /// DONE: the reasoner answered without tools
    Answered,
    /// DONE_FORCED: a synthesis call closed the run
    Forced(ForceReason),
}

/// Result of a completed run
#[derive(Clone, Debug)]
pub struct Outcome {
    /// Final state, including the final assistant message
    pub state: State,

    /// Final answer text
    pub answer: String,

    pub termination: Termination,

    /// REASONING steps taken, not counting a forced synthesis call
    pub reasoning_steps: usize,
}

impl Outcome {
    pub const fn was_forced(&self) -> bool {
        matches!(self.termination, Termination::Forced(_))
    }
}

/// The loop controller
pub struct Agent {
    reasoner: Arc<dyn Reasoner>,
    executor: ToolExecutor,
    hooks: Vec<Arc<dyn StepHook>>,
    config: AgentConfig,
}

impl Agent {
    /// Create a new agent
    pub fn new(
        reasoner: Arc<dyn Reasoner>,
        tools: Arc<ToolRegistry>,
        config: AgentConfig,
    ) -> Self {
        let executor = ToolExecutor::new(tools)
            .parallel(config.parallel_tools)
            .timeout(config.step_timeout);

        Self {
            reasoner,
            executor,
            hooks: Vec::new(),
            config,
        }
    }

    /// Create with default configuration
    pub fn with_defaults(reasoner: Arc<dyn Reasoner>, tools: Arc<ToolRegistry>) -> Self {
        Self::new(reasoner, tools, AgentConfig::default())
    }

    pub fn builder() -> AgentBuilder {
        AgentBuilder::new()
    }

    /// Attach a step hook
    #[must_use]
    pub fn with_hook(mut self, hook: Arc<dyn StepHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Run the loop from the given state until a terminal phase.
    ///
    /// One run is one turn: the bound counter starts from zero regardless of
    /// what a resumed state carries. Reasoner failures end the run and are
    /// returned as-is; tool failures stay inside the loop as tool messages.
    pub async fn run(&self, state: State) -> Result<Outcome> {
        let mut state = match &self.config.system_prompt {
            Some(prompt) => state.with_system_prompt(prompt.as_str()),
            None => state,
        };
        state.apply(StateUpdate::new().tracked_calls(0));
        let tools = self.executor.registry().schemas();
        let mut steps = 0usize;
        let mut rounds = 0usize;

        loop {
            steps += 1;
            tracing::debug!(
                step = steps,
                history = state.len(),
                tracked = state.tracked_calls(),
                "Reasoning"
            );

            let output = self.reason(&state, &tools).await?;
            let (content, calls) = match output {
                ReasonerOutput::Answer { content } => {
                    tracing::info!(steps, "Agent providing final answer");
                    return Ok(self.finish(state, content, Termination::Answered, steps));
                }
                ReasonerOutput::Invocations { content, calls } => (content, calls),
            };

            if let Some(reason) = self.exhausted(&state, rounds) {
                tracing::warn!(?reason, "Limit reached, forcing final answer");
                let content = self.synthesize(&state).await?;
                return Ok(self.finish(state, content, Termination::Forced(reason), steps));
            }

            let calls = assign_ids(calls);
            for call in &calls {
                tracing::debug!(tool = %call.name, id = %call.id, "Agent requested tool");
            }

            let update = self.act(&state, content, calls).await;
            state.apply(update);
            rounds += 1;
        }
    }

    /// Run until completion or until `cancel` resolves, whichever is first.
    ///
    /// On cancellation the in-flight step is dropped along with the working
    /// copy of the state and `AgentError::Cancelled` is returned.
    pub async fn run_until<F>(&self, state: State, cancel: F) -> Result<Outcome>
    where
        F: Future<Output = ()> + Send,
    {
        tokio::select! {
            outcome = self.run(state) => outcome,
            () = cancel => {
                tracing::info!("Run cancelled");
                Err(AgentError::Cancelled)
            }
        }
    }

    /// Run with a single user question on a fresh state
    pub async fn ask(&self, question: &str) -> Result<Outcome> {
        self.run(State::from_user(question)).await
    }

    fn exhausted(&self, state: &State, rounds: usize) -> Option<ForceReason> {
        if let Some(bound) = &self.config.bound {
            if bound.reached(state.tracked_calls()) {
                return Some(ForceReason::BoundReached {
                    tool: bound.tool.clone(),
                    limit: bound.limit,
                });
            }
        }
        match self.config.max_iterations {
            Some(max) if rounds >= max => Some(ForceReason::IterationLimit(max)),
            _ => None,
        }
    }

    /// ACTING: execute the calls and build the single update for this round
    async fn act(&self, state: &State, content: String, calls: Vec<ToolCall>) -> StateUpdate {
        let results = self.executor.run(&calls).await;

        let mut update = StateUpdate::new();
        if let Some(bound) = &self.config.bound {
            let counted = bound.count_in(&calls);
            if counted > 0 {
                update = update.tracked_calls(state.tracked_calls().saturating_add(counted));
            }
        }
        for hook in &self.hooks {
            update = update.and(hook.after_act(state, &calls, &results));
        }

        StateUpdate::new()
            .message(Message::assistant_with_calls(content, calls))
            .messages(results.into_iter().map(into_message))
            .and(update)
    }

    /// History as shown to the reasoner, with hook context after the system prompt
    fn view(&self, state: &State) -> Vec<Message> {
        let context: Vec<Message> = self.hooks.iter().flat_map(|h| h.context(state)).collect();
        let history = state.history();
        if context.is_empty() {
            return history.to_vec();
        }

        let split = history.iter().take_while(|m| m.is_system()).count();
        let mut messages = Vec::with_capacity(history.len() + context.len());
        messages.extend_from_slice(&history[..split]);
        messages.extend(context);
        messages.extend_from_slice(&history[split..]);
        messages
    }

    async fn reason(&self, state: &State, tools: &[ToolSchema]) -> Result<ReasonerOutput> {
        let messages = self.view(state);
        self.timed(self.reasoner.decide(&messages, tools, &self.config.generation))
            .await
    }

    /// DONE_FORCED: one extra call with no tools and a synthesis instruction
    async fn synthesize(&self, state: &State) -> Result<String> {
        let mut messages = self.view(state);
        messages.push(Message::system(self.config.synthesis_prompt.as_str()));

        let output = self
            .timed(self.reasoner.decide(&messages, &[], &self.config.generation))
            .await?;
        if !output.is_final() {
            tracing::warn!(
                dropped = output.calls().len(),
                "Reasoner requested tools during synthesis, ignoring"
            );
        }
        Ok(output.content().to_string())
    }

    async fn timed<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match self.config.step_timeout {
            Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
                AgentError::Timeout {
                    what: format!("reasoner '{}'", self.reasoner.name()),
                    after: limit,
                }
            })?,
            None => fut.await,
        }
    }

    fn finish(&self, state: State, answer: String, termination: Termination, steps: usize) -> Outcome {
        let state = state.merge(StateUpdate::new().message(Message::assistant(answer.as_str())));
        tracing::info!(
            reasoner = self.reasoner.name(),
            history = state.len(),
            tracked = state.tracked_calls(),
            forced = matches!(termination, Termination::Forced(_)),
            "Run complete"
        );
        Outcome {
            state,
            answer,
            termination,
            reasoning_steps: steps,
        }
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        self.executor.registry()
    }

    /// Get configuration
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// Give every call an id, keeping ids the reasoner assigned
fn assign_ids(calls: Vec<ToolCall>) -> Vec<ToolCall> {
    calls
        .into_iter()
        .map(|mut call| {
            if call.id.is_empty() {
                call.id = format!("call_{}", uuid::Uuid::new_v4().simple());
            }
            call
        })
        .collect()
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    reasoner: Option<Arc<dyn Reasoner>>,
    tools: ToolRegistry,
    hooks: Vec<Arc<dyn StepHook>>,
    config: AgentConfig,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            reasoner: None,
            tools: ToolRegistry::new(),
            hooks: Vec::new(),
            config: AgentConfig::default(),
        }
    }

    #[must_use]
    pub fn reasoner(mut self, reasoner: Arc<dyn Reasoner>) -> Self {
        self.reasoner = Some(reasoner);
        self
    }

    #[must_use]
    pub fn tool<T: crate::tool::Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.register(tool);
        self
    }

    #[must_use]
    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    #[must_use]
    pub fn hook(mut self, hook: Arc<dyn StepHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    #[must_use]
    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    #[must_use]
    pub fn synthesis_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.synthesis_prompt = prompt.into();
        self
    }

    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.generation.model = model.into();
        self
    }

    #[must_use]
    pub const fn temperature(mut self, temp: f32) -> Self {
        self.config.generation.temperature = temp;
        self
    }

    #[must_use]
    pub fn bound(mut self, tool: impl Into<String>, limit: u32) -> Self {
        self.config.bound = Some(ToolBound::new(tool, limit));
        self
    }

    #[must_use]
    pub const fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = Some(max);
        self
    }

    #[must_use]
    pub const fn parallel_tools(mut self, parallel: bool) -> Self {
        self.config.parallel_tools = parallel;
        self
    }

    #[must_use]
    pub const fn step_timeout(mut self, timeout: Duration) -> Self {
        self.config.step_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<Agent> {
        let reasoner = self
            .reasoner
            .ok_or_else(|| AgentError::Config("Reasoner is required".into()))?;

        if let Some(bound) = &self.config.bound {
            if !self.tools.contains(&bound.tool) {
                tracing::warn!(tool = %bound.tool, "Bound set on a tool that is not registered");
            }
        }

        let mut agent = Agent::new(reasoner, Arc::new(self.tools), self.config);
        agent.hooks = self.hooks;
        Ok(agent)
    }
}
