//! Reasoner Strategy Pattern
//!
//! The reasoner is the boundary to a language-model service. Given the
//! conversation so far and the tools on offer, it either answers or asks for
//! tool invocations. The loop treats it as a black box; adapters for concrete
//! vendors live outside this crate.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_core::reasoner::{GenerationOptions, Reasoner};
//!
//! let output = reasoner.decide(state.history(), &registry.schemas(), &options).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::Message;
use crate::tool::{ToolCall, ToolSchema};

/// Configuration for LLM generation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model or deployment identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Temperature for sampling (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_model() -> String {
    "gpt-4o".into()
}
const fn default_temperature() -> f32 {
    0.0
}
const fn default_max_tokens() -> u32 {
    2048
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// What the reasoner decided for one step
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReasonerOutput {
    /// Final answer, no tool use
    Answer { content: String },

    /// Tools to run for this step, with any accompanying text
    Invocations {
        #[serde(default)]
        content: String,
        calls: Vec<ToolCall>,
    },
}

impl ReasonerOutput {
    pub fn answer(content: impl Into<String>) -> Self {
        Self::Answer {
            content: content.into(),
        }
    }

    /// Request invocations. An empty list is treated as an empty answer.
    pub fn invoke(calls: Vec<ToolCall>) -> Self {
        if calls.is_empty() {
            return Self::answer("");
        }
        Self::Invocations {
            content: String::new(),
            calls,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Self::Answer { content } | Self::Invocations { content, .. } => content,
        }
    }

    pub fn calls(&self) -> &[ToolCall] {
        match self {
            Self::Answer { .. } => &[],
            Self::Invocations { calls, .. } => calls,
        }
    }

    pub fn is_final(&self) -> bool {
        self.calls().is_empty()
    }

    /// The assistant message recording this output
    pub fn into_message(self) -> Message {
        match self {
            Self::Answer { content } => Message::assistant(content),
            Self::Invocations { content, calls } => Message::assistant_with_calls(content, calls),
        }
    }
}

/// Strategy trait for language-model backends
///
/// Implementations must not retry internally in a way that hides failures:
/// service errors surface as `ReasonerUnavailable`, `RateLimited`, `Auth` or
/// `Config` so callers can tell transient from fatal causes.
#[async_trait]
pub trait Reasoner: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str {
        "reasoner"
    }

    /// Decide the next step from the history and the tools on offer.
    ///
    /// An empty `tools` slice means no tool use is allowed for this call.
    async fn decide(
        &self,
        history: &[Message],
        tools: &[ToolSchema],
        options: &GenerationOptions,
    ) -> Result<ReasonerOutput>;
}
