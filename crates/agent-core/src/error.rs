//! Error Types

use std::time::Duration;

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// Invocation names a tool that is not registered
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Arguments do not match the tool's declared schema
    #[error("Invalid arguments for '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },

    /// Tool ran but failed
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Language-model service could not be reached (network, 5xx, overload)
    #[error("Reasoner unavailable: {0}")]
    ReasonerUnavailable(String),

    /// Rate limited by the language-model service
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Authentication against the language-model service failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Checkpoint backend failure
    #[error("Checkpoint unavailable: {0}")]
    CheckpointUnavailable(String),

    /// A reasoning step exceeded its deadline
    #[error("{what} timed out after {after:?}")]
    Timeout { what: String, after: Duration },

    /// The caller cancelled the turn
    #[error("Cancelled")]
    Cancelled,

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Shorthand for [`AgentError::InvalidArguments`]
    pub fn invalid_arguments(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    /// Check if error is retryable
    ///
    /// Transient service conditions are retryable; configuration and
    /// authentication problems are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ReasonerUnavailable(_)
                | Self::RateLimited(_)
                | Self::Timeout { .. }
                | Self::CheckpointUnavailable(_)
        )
    }

    /// Errors that stay inside the loop as tool-result messages
    pub fn is_tool_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownTool(_) | Self::InvalidArguments { .. } | Self::ToolExecution(_)
        )
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::UnknownTool(name) => format!("The tool '{name}' is not available."),
            Self::InvalidArguments { tool, reason } => {
                format!("Invalid input for tool '{tool}': {reason}")
            }
            Self::ToolExecution(msg) => format!("Tool error: {msg}"),
            Self::ReasonerUnavailable(_) => {
                "The AI service is currently unavailable. Please try again.".into()
            }
            Self::RateLimited(_) => "You've made too many requests. Please wait a moment.".into(),
            Self::Auth(_) => "Authentication failed. Please check your credentials.".into(),
            Self::Config(msg) => format!("The agent is misconfigured: {msg}"),
            Self::CheckpointUnavailable(_) => {
                "Conversation memory is unavailable right now.".into()
            }
            Self::Timeout { .. } => "The request took too long to process. Please try again.".into(),
            Self::Cancelled => "The request was cancelled.".into(),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
