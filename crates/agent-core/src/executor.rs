//! Tool Executor
//!
//! Runs the invocations of one assistant message and turns each into a tool
//! message. Failures never escape: an unknown tool, bad arguments, a tool
//! error or a timeout become an `Error: ...` result the reasoner can read.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use crate::message::Message;
use crate::tool::{ToolCall, ToolRegistry, ToolResult};

/// Executes tool invocations against a registry
#[derive(Clone)]
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    parallel: bool,
    timeout: Option<Duration>,
}

impl ToolExecutor {
    pub const fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            parallel: false,
            timeout: None,
        }
    }

    /// Run the invocations of one message concurrently
    #[must_use]
    pub const fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Deadline for each individual invocation
    #[must_use]
    pub const fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Execute every call, returning one result per call in request order
    pub async fn run(&self, calls: &[ToolCall]) -> Vec<ToolResult> {
        if self.parallel && calls.len() > 1 {
            tracing::debug!(count = calls.len(), "Executing tools concurrently");
            let finished = join_all(calls.iter().map(|call| self.run_one(call))).await;
            reassemble(calls, finished)
        } else {
            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                results.push(self.run_one(call).await);
            }
            results
        }
    }

    /// Execute and wrap each result as a tool message
    pub async fn run_to_messages(&self, calls: &[ToolCall]) -> Vec<Message> {
        self.run(calls).await.into_iter().map(into_message).collect()
    }

    async fn run_one(&self, call: &ToolCall) -> ToolResult {
        tracing::debug!(tool = %call.name, id = %call.id, "Executing tool");

        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.registry.execute(call)).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    tracing::warn!(tool = %call.name, ?limit, "Tool timed out");
                    return ToolResult::failure(
                        &call.name,
                        format!("Error: tool '{}' timed out after {limit:?}", call.name),
                    )
                    .with_id(&call.id);
                }
            },
            None => self.registry.execute(call).await,
        };

        match outcome {
            Ok(result) => {
                if !result.success {
                    tracing::warn!(tool = %call.name, output = %result.output, "Tool reported failure");
                }
                result
            }
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "Tool invocation failed");
                ToolResult::failure(&call.name, format!("Error: {e}")).with_id(&call.id)
            }
        }
    }
}

/// Tool message for a result
pub fn into_message(result: ToolResult) -> Message {
    Message::tool(result.id, result.name, result.output)
}

/// Put results back in request order, matching on invocation id
fn reassemble(calls: &[ToolCall], results: Vec<ToolResult>) -> Vec<ToolResult> {
    let mut by_id: HashMap<String, VecDeque<ToolResult>> = HashMap::new();
    for result in results {
        by_id.entry(result.id.clone()).or_default().push_back(result);
    }

    calls
        .iter()
        .map(|call| {
            by_id
                .get_mut(&call.id)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| {
                    ToolResult::failure(
                        &call.name,
                        format!("Error: no result for invocation '{}'", call.id),
                    )
                    .with_id(&call.id)
                })
        })
        .collect()
}
