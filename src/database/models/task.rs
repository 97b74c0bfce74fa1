use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

use crate::filter::ColumnSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "task_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Open,
    InProgress,
    Blocked,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "task_priority", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl TaskStatus {
    pub fn parse(value: &str) -> Option<TaskStatus> {
        serde_json::from_value(serde_json::Value::String(value.trim().to_ascii_uppercase())).ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Open => "OPEN",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Blocked => "BLOCKED",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Cancelled => "CANCELLED",
        }
    }
}

impl TaskPriority {
    pub fn parse(value: &str) -> Option<TaskPriority> {
        serde_json::from_value(serde_json::Value::String(value.trim().to_ascii_uppercase())).ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "LOW",
            TaskPriority::Medium => "MEDIUM",
            TaskPriority::High => "HIGH",
            TaskPriority::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub tenant_id: String,
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub assignee_id: Option<String>,
    pub due_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Filterable fields and the columns they map to.
    pub const COLUMNS: &'static [ColumnSpec] = &[
        ColumnSpec::text("id", "id"),
        ColumnSpec::text("tenantId", "tenant_id"),
        ColumnSpec::text("title", "title"),
        ColumnSpec::cast("priority", "priority", "task_priority"),
        ColumnSpec::cast("status", "status", "task_status"),
        ColumnSpec::text("assigneeId", "assignee_id"),
        ColumnSpec::cast("dueAt", "due_at", "timestamptz"),
        ColumnSpec::cast("createdAt", "created_at", "timestamptz"),
        ColumnSpec::cast("updatedAt", "updated_at", "timestamptz"),
    ];

    pub fn from_new(tenant_id: &str, new: NewTask) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            title: new.title.trim().to_string(),
            description: new.description,
            priority: new.priority.unwrap_or(TaskPriority::Medium),
            status: new.status.unwrap_or(TaskStatus::Open),
            assignee_id: new.assignee_id,
            due_at: new.due_at,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: &TaskPatch) {
        if let Some(title) = &patch.title {
            self.title = title.trim().to_string();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(assignee) = &patch.assignee_id {
            self.assignee_id = assignee.clone();
        }
        if let Some(due_at) = patch.due_at {
            self.due_at = due_at;
        }
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub assignee_id: Option<String>,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
}

/// Partial update. Outer `None` leaves a field alone; `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub assignee_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_at: Option<Option<DateTime<Utc>>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.status.is_none()
            && self.assignee_id.is_none()
            && self.due_at.is_none()
    }

    pub fn status(status: TaskStatus) -> Self {
        Self { status: Some(status), ..Self::default() }
    }

    pub fn assignee(assignee_id: Option<String>) -> Self {
        Self { assignee_id: Some(assignee_id), ..Self::default() }
    }
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parse_accepts_any_case() {
        assert_eq!(TaskStatus::parse("in_progress"), Some(TaskStatus::InProgress));
        assert_eq!(TaskStatus::parse("DONE"), None);
        assert_eq!(TaskPriority::parse("high"), Some(TaskPriority::High));
    }

    #[test]
    fn patch_distinguishes_clear_from_absent() {
        let patch: TaskPatch = serde_json::from_str(r#"{"assigneeId": null}"#).unwrap();
        assert_eq!(patch.assignee_id, Some(None));
        assert!(patch.description.is_none());

        let mut task = Task::from_new(
            "t1",
            NewTask {
                title: "  File return ".into(),
                description: None,
                priority: None,
                status: None,
                assignee_id: Some("u1".into()),
                due_at: None,
            },
        );
        assert_eq!(task.title, "File return");
        task.apply(&patch);
        assert_eq!(task.assignee_id, None);
        assert_eq!(task.status, TaskStatus::Open);
    }

    #[test]
    fn serializes_camel_case() {
        let task = Task::from_new(
            "t1",
            NewTask {
                title: "x".into(),
                description: None,
                priority: Some(TaskPriority::High),
                status: None,
                assignee_id: None,
                due_at: None,
            },
        );
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["tenantId"], "t1");
        assert_eq!(value["priority"], "HIGH");
        assert!(value.get("assigneeId").is_some());
    }
}
