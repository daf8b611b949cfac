//! Mock Search Backend
//!
//! Keyword-matched canned results. Deterministic, so it doubles as the test
//! backend for the research agent.

use async_trait::async_trait;

use super::SearchBackend;
use crate::error::Result;

const LANGGRAPH: &str = "LangGraph is a library for building stateful, multi-actor applications with LLMs.
Key features:
- Cycles and Branching: Complex agent workflows with loops
- Persistence: Built-in state management
- Human-in-the-Loop: Pause and resume execution
- Streaming: Real-time output
Released by LangChain in 2024.";

const AZURE_OPENAI: &str = "Azure OpenAI Service provides REST API access to OpenAI's models including:
- GPT-4 and GPT-3.5-Turbo for text generation
- DALL-E for image generation
- Whisper for speech-to-text
Key benefits:
- Enterprise-grade security and compliance
- Regional availability
- Integration with Azure services
- Content filtering and responsible AI features";

const AGENTIC_AI: &str = "Agentic AI refers to autonomous systems that can:
- Plan sequences of actions
- Use tools to interact with environments
- Adapt based on feedback
- Maintain state across interactions

Key patterns:
- ReAct (Reasoning + Acting)
- Plan-and-Execute
- Reflection and self-correction

Applications: research assistants, coding agents, task automation";

/// Mock search backend with static results
pub struct MockSearchBackend {
    entries: Vec<(String, String)>,
}

impl Default for MockSearchBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSearchBackend {
    pub fn new() -> Self {
        Self {
            entries: vec![
                ("langgraph".into(), LANGGRAPH.into()),
                ("azure openai".into(), AZURE_OPENAI.into()),
                ("agentic ai".into(), AGENTIC_AI.into()),
            ],
        }
    }

    /// Add a keyword entry; earlier entries win on overlap
    #[must_use]
    pub fn with_entry(mut self, keyword: impl Into<String>, result: impl Into<String>) -> Self {
        self.entries.push((keyword.into().to_lowercase(), result.into()));
        self
    }

    fn lookup(&self, query: &str) -> Option<&str> {
        let query = query.to_lowercase();
        self.entries
            .iter()
            .find(|(keyword, _)| query.contains(keyword.as_str()))
            .map(|(_, result)| result.as_str())
    }
}

fn general_results(query: &str) -> String {
    format!(
        "Search results for: {query}

Multiple relevant sources found. Key points:
1. Recent developments in the field
2. Technical implementations and best practices
3. Real-world applications and case studies
4. Expert opinions and analysis

For specific information, please refine your search query."
    )
}

#[async_trait]
impl SearchBackend for MockSearchBackend {
    async fn search(&self, query: &str) -> Result<String> {
        match self.lookup(query) {
            Some(result) => {
                tracing::debug!(query, "Found relevant information");
                Ok(result.to_string())
            }
            None => {
                tracing::debug!(query, "Found general information");
                Ok(general_results(query))
            }
        }
    }

    fn name(&self) -> &str {
        "MockSearch"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_keyword_match_is_case_insensitive() {
        let backend = MockSearchBackend::new();
        let result = backend.search("What is LangGraph?").await.unwrap();
        assert!(result.starts_with("LangGraph is a library"));
    }

    #[tokio::test]
    async fn test_unmatched_query_uses_template() {
        let backend = MockSearchBackend::new();
        let result = backend.search("rust borrow checker").await.unwrap();
        assert!(result.starts_with("Search results for: rust borrow checker"));
    }

    #[tokio::test]
    async fn test_blank_query_uses_template() {
        let backend = MockSearchBackend::new();
        let result = backend.search("   ").await.unwrap();
        assert!(result.starts_with("Search results for:    \n"));
    }

    #[tokio::test]
    async fn test_custom_entry() {
        let backend = MockSearchBackend::new().with_entry("Tokio", "An async runtime.");
        assert_eq!(backend.search("tokio tasks").await.unwrap(), "An async runtime.");
    }
}
