//! Error Types for the demo agents

use agent_core::AgentError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DemoError>;

#[derive(Error, Debug)]
pub enum DemoError {
    #[error("Search backend error: {0}")]
    Search(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<DemoError> for AgentError {
    fn from(err: DemoError) -> Self {
        match err {
            DemoError::Config(msg) => Self::Config(msg),
            search @ DemoError::Search(_) => Self::ToolExecution(search.to_string()),
        }
    }
}
