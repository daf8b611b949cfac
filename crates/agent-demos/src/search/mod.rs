//! Search Integration
//!
//! Abstraction over web search providers used by the `web_search` tool.

mod mock;

pub use mock::MockSearchBackend;

use async_trait::async_trait;

use crate::error::Result;

/// Search backend trait (Strategy pattern)
///
/// Implement this for each provider: Tavily, Serper, Google Custom Search, etc.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Search and return the results as plain text
    async fn search(&self, query: &str) -> Result<String>;

    /// Backend name
    fn name(&self) -> &str;
}
