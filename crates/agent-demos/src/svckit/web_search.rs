//! Web Search Tool
//!
//! Looks up information through a pluggable search backend.

use std::sync::Arc;

use async_trait::async_trait;

use agent_core::{
    AgentError, Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema,
    tool::ParameterSchema,
};

use crate::error::DemoError;
use crate::search::SearchBackend;

/// Name the research agent's bound is keyed on
pub const WEB_SEARCH: &str = "web_search";

/// Tool for searching the web
pub struct WebSearchTool {
    backend: Arc<dyn SearchBackend>,
}

impl WebSearchTool {
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(WEB_SEARCH, "Search the web for information.")
            .param(ParameterSchema::string("query", "The search query"))
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let query = call
            .str_arg("query")
            .ok_or_else(|| AgentError::invalid_arguments(WEB_SEARCH, "missing query"))?;

        tracing::info!(query, backend = self.backend.name(), "Searching");
        let results = self.backend.search(query).await?;
        if results.trim().is_empty() {
            return Err(DemoError::Search(format!(
                "{} returned no results for '{query}'",
                self.backend.name()
            ))
            .into());
        }
        Ok(ToolResult::success(WEB_SEARCH, results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::MockSearchBackend;

    #[tokio::test]
    async fn test_search_tool() {
        let tool = WebSearchTool::new(Arc::new(MockSearchBackend::new()));
        let call = ToolCall::new(WEB_SEARCH).arg("query", "azure openai pricing");

        let result = tool.execute(&call).await.unwrap();
        assert!(result.success);
        assert!(result.output.starts_with("Azure OpenAI Service"));
    }

    #[tokio::test]
    async fn test_empty_results_are_tool_error() {
        let backend = MockSearchBackend::new().with_entry("nothing here", "  ");
        let tool = WebSearchTool::new(Arc::new(backend));
        let call = ToolCall::new(WEB_SEARCH).arg("query", "nothing here");

        let err = tool.execute(&call).await.unwrap_err();
        assert!(err.is_tool_error());
        assert!(err.to_string().contains("MockSearch returned no results"));
    }

    #[tokio::test]
    async fn test_blank_query_still_searches() {
        let tool = WebSearchTool::new(Arc::new(MockSearchBackend::new()));
        let call = ToolCall::new(WEB_SEARCH).arg("query", "");

        let result = tool.execute(&call).await.unwrap();
        assert!(result.output.starts_with("Search results for:"));
    }
}
