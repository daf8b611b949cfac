//! Notebook Tools
//!
//! Preference, reminder and summary tools for the conversational agent.
//! Entries land in a shared [`Notebook`] so callers can see what the agent
//! recorded; the conversation itself still lives in the checkpointed state.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::RwLock;

use agent_core::{
    AgentError, Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema,
    tool::ParameterSchema,
};

pub const SAVE_USER_PREFERENCE: &str = "save_user_preference";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    Preference,
    Reminder,
}

/// One recorded entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub kind: NoteKind,

    /// Preference type, or the reminder's task
    pub key: String,

    /// Preference value, or the reminder's time
    pub value: String,

    pub recorded_at: DateTime<Utc>,
}

/// Shared log of preferences and reminders
#[derive(Clone, Default)]
pub struct Notebook {
    notes: Arc<RwLock<Vec<Note>>>,
}

impl Notebook {
    pub fn new() -> Self {
        Self::default()
    }

    async fn record(&self, kind: NoteKind, key: &str, value: &str) {
        self.notes.write().await.push(Note {
            kind,
            key: key.to_string(),
            value: value.to_string(),
            recorded_at: Utc::now(),
        });
    }

    pub async fn notes(&self) -> Vec<Note> {
        self.notes.read().await.clone()
    }

    /// Latest value saved for a preference type
    pub async fn preference(&self, key: &str) -> Option<String> {
        self.notes
            .read()
            .await
            .iter()
            .rev()
            .find(|n| n.kind == NoteKind::Preference && n.key == key)
            .map(|n| n.value.clone())
    }
}

fn required<'a>(call: &'a ToolCall, tool: &str, key: &str) -> CoreResult<&'a str> {
    call.str_arg(key)
        .ok_or_else(|| AgentError::invalid_arguments(tool, format!("missing {key}")))
}

/// Save a user preference for future reference
pub struct SavePreferenceTool {
    notebook: Notebook,
}

impl SavePreferenceTool {
    pub const fn new(notebook: Notebook) -> Self {
        Self { notebook }
    }
}

#[async_trait]
impl Tool for SavePreferenceTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(SAVE_USER_PREFERENCE, "Save a user preference for future reference.")
            .param(ParameterSchema::string(
                "preference_type",
                "Type of preference (e.g., \"name\", \"interest\", \"goal\")",
            ))
            .param(ParameterSchema::string("value", "The preference value"))
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let kind = required(call, SAVE_USER_PREFERENCE, "preference_type")?;
        let value = required(call, SAVE_USER_PREFERENCE, "value")?;

        tracing::info!(preference = kind, value, "Saving preference");
        self.notebook.record(NoteKind::Preference, kind, value).await;
        Ok(ToolResult::success(
            SAVE_USER_PREFERENCE,
            format!("Saved {kind}: {value}"),
        ))
    }
}

/// Set a reminder for the user
pub struct SetReminderTool {
    notebook: Notebook,
}

impl SetReminderTool {
    pub const fn new(notebook: Notebook) -> Self {
        Self { notebook }
    }
}

#[async_trait]
impl Tool for SetReminderTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new("set_reminder", "Set a reminder for the user.")
            .param(ParameterSchema::string("task", "What to be reminded about"))
            .param(ParameterSchema::string("time", "When to be reminded"))
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let task = required(call, "set_reminder", "task")?;
        let time = required(call, "set_reminder", "time")?;

        tracing::info!(task, time, "Setting reminder");
        self.notebook.record(NoteKind::Reminder, task, time).await;
        Ok(ToolResult::success(
            "set_reminder",
            format!("Reminder set: '{task}' at {time}"),
        ))
    }
}

/// Ask for a summary of the conversation so far
///
/// The agent does the summarizing from its own history; the tool reports
/// what the notebook holds so the answer can include it.
pub struct GetSummaryTool {
    notebook: Notebook,
}

impl GetSummaryTool {
    pub const fn new(notebook: Notebook) -> Self {
        Self { notebook }
    }
}

#[async_trait]
impl Tool for GetSummaryTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new("get_summary", "Get a summary of what we've discussed so far.")
    }

    async fn execute(&self, _call: &ToolCall) -> CoreResult<ToolResult> {
        let notes = self.notebook.notes().await;
        let mut output = String::from("Summary requested - agent will review conversation history");
        if !notes.is_empty() {
            let recorded: Vec<_> = notes
                .iter()
                .map(|n| json!({ "kind": n.kind, "key": n.key, "value": n.value }))
                .collect();
            output.push_str("\nRecorded: ");
            output.push_str(&serde_json::to_string(&recorded)?);
        }
        Ok(ToolResult::success("get_summary", output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_preference() {
        let notebook = Notebook::new();
        let tool = SavePreferenceTool::new(notebook.clone());
        let call = ToolCall::new(SAVE_USER_PREFERENCE)
            .arg("preference_type", "name")
            .arg("value", "Alex");

        let result = tool.execute(&call).await.unwrap();
        assert_eq!(result.output, "Saved name: Alex");
        assert_eq!(notebook.preference("name").await.as_deref(), Some("Alex"));
    }

    #[tokio::test]
    async fn test_reminder_and_summary() {
        let notebook = Notebook::new();
        let reminder = SetReminderTool::new(notebook.clone());
        let call = ToolCall::new("set_reminder")
            .arg("task", "review the LangGraph documentation")
            .arg("time", "tomorrow at 2pm");

        let result = reminder.execute(&call).await.unwrap();
        assert_eq!(
            result.output,
            "Reminder set: 'review the LangGraph documentation' at tomorrow at 2pm"
        );

        let summary = GetSummaryTool::new(notebook)
            .execute(&ToolCall::new("get_summary"))
            .await
            .unwrap();
        assert!(summary.output.contains("\"reminder\""));
    }

    #[tokio::test]
    async fn test_empty_summary() {
        let summary = GetSummaryTool::new(Notebook::new())
            .execute(&ToolCall::new("get_summary"))
            .await
            .unwrap();
        assert_eq!(
            summary.output,
            "Summary requested - agent will review conversation history"
        );
    }
}
