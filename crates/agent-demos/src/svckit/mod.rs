//! Service Kit - Agent Tools
//!
//! Tools that implement `agent_core::Tool` for the demo agents.

mod analyze_content;
mod notebook;
mod web_search;

pub use analyze_content::AnalyzeContentTool;
pub use notebook::{
    GetSummaryTool, Note, NoteKind, Notebook, SAVE_USER_PREFERENCE, SavePreferenceTool,
    SetReminderTool,
};
pub use web_search::{WEB_SEARCH, WebSearchTool};
