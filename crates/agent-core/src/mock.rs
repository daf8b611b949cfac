//! Scripted reasoner for tests and offline runs.
//!
//! Replays a queue of outputs (or errors) one per call, optionally falling
//! back to a repeated output once the queue is empty. Every history it is
//! shown is recorded so tests can check exactly what the model saw.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::reasoner::{GenerationOptions, Reasoner, ReasonerOutput};
use crate::tool::ToolSchema;

/// A reasoner that returns a scripted sequence of outputs
pub struct ScriptedReasoner {
    script: Mutex<VecDeque<Result<ReasonerOutput>>>,
    fallback: Option<ReasonerOutput>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    histories: Mutex<Vec<Vec<Message>>>,
    tool_counts: Mutex<Vec<usize>>,
}

impl ScriptedReasoner {
    /// Return each output once, in order
    pub fn new(outputs: Vec<ReasonerOutput>) -> Self {
        Self {
            script: Mutex::new(outputs.into_iter().map(Ok).collect()),
            fallback: None,
            delay: None,
            calls: AtomicUsize::new(0),
            histories: Mutex::new(Vec::new()),
            tool_counts: Mutex::new(Vec::new()),
        }
    }

    /// Return the same output on every call
    pub fn repeating(output: ReasonerOutput) -> Self {
        let mut reasoner = Self::new(Vec::new());
        reasoner.fallback = Some(output);
        reasoner
    }

    /// Queue an error after the scripted outputs
    #[must_use]
    pub fn then_fail(mut self, error: AgentError) -> Self {
        self.script.get_mut().push_back(Err(error));
        self
    }

    /// Sleep before every answer
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `decide` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every history shown so far, in call order
    pub async fn histories(&self) -> Vec<Vec<Message>> {
        self.histories.lock().await.clone()
    }

    /// Number of tool schemas offered on each call
    pub async fn tool_counts(&self) -> Vec<usize> {
        self.tool_counts.lock().await.clone()
    }
}

#[async_trait]
impl Reasoner for ScriptedReasoner {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn decide(
        &self,
        history: &[Message],
        tools: &[ToolSchema],
        _options: &GenerationOptions,
    ) -> Result<ReasonerOutput> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.histories.lock().await.push(history.to_vec());
        self.tool_counts.lock().await.push(tools.len());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.script.lock().await.pop_front() {
            Some(next) => next,
            None => self.fallback.clone().ok_or_else(|| {
                AgentError::Other(format!("scripted reasoner exhausted after {n} calls"))
            }),
        }
    }
}
