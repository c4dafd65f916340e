use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use serde_json::Value;

use super::document::{Document, Fields, encode, null_as_default};
use crate::util::date::parse_instant;

/// Task progress state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    #[default]
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
}

impl TaskStatus {
    /// Discrete Gantt progress for this status
    pub fn progress(self) -> u8 {
        match self {
            TaskStatus::Pending => 0,
            TaskStatus::InProgress => 50,
            TaskStatus::Completed => 100,
        }
    }

    /// The label stored in the record
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Completed => "Completed",
        }
    }

    /// Parse a user-supplied status name (case-insensitive, `-`/`_` allowed
    /// in place of the space)
    pub fn parse_status(s: &str) -> Option<Self> {
        let norm = s.trim().to_lowercase().replace(['-', '_'], " ");
        match norm.as_str() {
            "pending" | "todo" => Some(TaskStatus::Pending),
            "in progress" | "active" => Some(TaskStatus::InProgress),
            "completed" | "done" => Some(TaskStatus::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task row belonging to one project
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Store-assigned identifier (not part of the stored fields)
    #[serde(skip)]
    pub id: String,
    /// Owning project; a task without one is a draft
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Raw due date as stored; may be unparsable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: TaskStatus,
    /// Server-assigned on create
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Decode a task from a stored document
    pub fn from_document(doc: &Document) -> Result<Self, serde_json::Error> {
        let mut task: Task = doc.decode()?;
        task.id = doc.id.clone();
        Ok(task)
    }

    /// Every stored field of the task, with unset optional fields as
    /// `null` so a merge clears them. `createdAt` is left to the store.
    pub fn to_row(&self) -> Result<Fields, serde_json::Error> {
        let mut fields = encode(self)?;
        for key in ["projectId", "dueDate"] {
            fields.entry(key).or_insert(Value::Null);
        }
        fields.remove("createdAt");
        Ok(fields)
    }

    /// A draft has no owning project yet
    pub fn is_draft(&self) -> bool {
        self.project_id.as_deref().is_none_or(str::is_empty)
    }

    /// The due date as an instant, if present and parsable
    pub fn due_instant(&self) -> Option<DateTime<Utc>> {
        self.due_date.as_deref().and_then(parse_instant)
    }

    /// Display name, falling back for empty names
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            "Unnamed"
        } else {
            &self.name
        }
    }
}
