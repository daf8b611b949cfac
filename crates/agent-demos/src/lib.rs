//! # agent-demos
//!
//! Ready-made agents built on `agent-core`.
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────────────┐   ┌─────────────────┐
//! │ simple_agent │   │      research_agent      │   │  memory_agent   │
//! │ calculator   │   │ web_search (bounded)     │   │ preferences     │
//! │ word length  │   │ analyze_content          │   │ reminders       │
//! └──────────────┘   │ forced synthesis at cap  │   │ checkpointed    │
//!                    └──────────────────────────┘   └─────────────────┘
//! ```
//!
//! Every preset takes an `Arc<dyn Reasoner>`; plug in a vendor adapter or
//! `agent_core::mock::ScriptedReasoner`.

pub mod error;
pub mod presets;
pub mod search;
pub mod svckit;

pub use error::{DemoError, Result};
pub use presets::{UserNameHook, memory_agent, research_agent, simple_agent};
pub use search::{MockSearchBackend, SearchBackend};

/// Re-export tools for easy registration
pub mod tools {
    pub use crate::svckit::{
        AnalyzeContentTool, GetSummaryTool, SavePreferenceTool, SetReminderTool, WebSearchTool,
    };
}

/// System prompt for the research agent
pub const RESEARCH_SYSTEM_PROMPT: &str = "You are a research assistant that helps users find and synthesize information.

Your approach:
1. Break down complex questions into researchable components
2. Use web_search to find relevant information
3. Optionally use analyze_content to extract specific insights
4. Synthesize findings into a comprehensive answer

Guidelines:
- Be thorough but efficient with searches
- Cite that information came from searches
- If you find sufficient information, provide a complete answer
- If information is incomplete, make targeted follow-up searches
- Limit yourself to 3-4 searches per query to stay focused

Provide clear, well-organized answers based on your research.";

/// System prompt for the conversational agent with memory
pub const CONVERSATIONAL_SYSTEM_PROMPT: &str = "You are a helpful AI assistant with memory.

Your capabilities:
- Remember information from earlier in our conversation
- Reference previous topics and context naturally
- Save user preferences when mentioned
- Set reminders when requested
- Provide personalized responses based on conversation history

Guidelines:
- Be conversational and friendly
- When users share personal information, acknowledge and remember it
- Refer back to earlier topics when relevant
- Use the save_user_preference tool when users share important information
- Use set_reminder tool when users mention tasks or appointments

Maintain context awareness throughout our conversation.";
