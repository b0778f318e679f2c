//! Task and subtask entities: typed forms, create/update inputs and wire
//! conversion.
//!
//! A task references exactly one project; a subtask is nested under exactly
//! one task and cannot outlive it. Both carry an `order` value assigned once
//! at creation (creation-time milliseconds) for stable manual ordering.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::fields::{format_priority, format_status, parse_priority, parse_status, Priority, Status};
use crate::store::{Doc, DocId, Fields};

/// A task as held in memory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: DocId,
    pub title: String,
    pub description: Option<String>,
    /// The owning project. Required; tasks never float free.
    pub project_id: DocId,
    pub status: Status,
    pub priority: Priority,
    /// Optional due instant, UTC epoch milliseconds.
    pub due_utc: Option<i64>,
    /// Creation-time ordering value. Absent on documents written before the
    /// field existed; sorting falls back to `created_at_utc`.
    pub order: Option<i64>,
    pub created_at_utc: i64,
    pub updated_at_utc: i64,
}

impl Task {
    /// Decode a task from its wire document.
    pub fn from_doc(doc: &Doc) -> Result<Task> {
        let status = doc.require_str("status")?;
        let status = parse_status(&status).ok_or_else(|| Error::Decode {
            id: doc.id.clone(),
            reason: format!("unknown status {status:?}"),
        })?;
        let priority = doc.require_str("priority")?;
        let priority = parse_priority(&priority).ok_or_else(|| Error::Decode {
            id: doc.id.clone(),
            reason: format!("unknown priority {priority:?}"),
        })?;
        Ok(Task {
            id: doc.id.clone(),
            title: doc.require_str("title")?,
            description: doc.str_field("description").map(str::to_owned),
            project_id: doc.require_str("project_id")?,
            status,
            priority,
            due_utc: doc.int_field("due_utc"),
            order: doc.int_field("order"),
            created_at_utc: doc.int_field("created_at_utc").unwrap_or(0),
            updated_at_utc: doc.int_field("updated_at_utc").unwrap_or(0),
        })
    }
}

/// Input for creating a task. Id, timestamps and the order value are
/// assigned by the mutation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub project_id: DocId,
    pub status: Status,
    pub priority: Priority,
    pub due_utc: Option<i64>,
}

impl TaskDraft {
    /// Validate the draft: non-empty title, non-empty project reference.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::invalid("title", "must not be empty"));
        }
        if self.project_id.is_empty() {
            return Err(Error::invalid("project_id", "must not be empty"));
        }
        Ok(())
    }

    /// Wire fields for the create write.
    pub fn to_fields(&self, now_utc: i64, order: i64) -> Fields {
        let mut f = Fields::new();
        f.insert("title".into(), Value::from(self.title.clone()));
        if let Some(desc) = &self.description {
            f.insert("description".into(), Value::from(desc.clone()));
        }
        f.insert("project_id".into(), Value::from(self.project_id.clone()));
        f.insert("status".into(), Value::from(format_status(self.status)));
        f.insert("priority".into(), Value::from(format_priority(self.priority)));
        if let Some(due) = self.due_utc {
            f.insert("due_utc".into(), Value::from(due));
        }
        f.insert("order".into(), Value::from(order));
        f.insert("created_at_utc".into(), Value::from(now_utc));
        f.insert("updated_at_utc".into(), Value::from(now_utc));
        f
    }
}

/// Field-level partial update for a task. Unset fields are left alone;
/// `clear_due` removes the due date (it wins over `due_utc`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub due_utc: Option<i64>,
    pub clear_due: bool,
}

impl TaskPatch {
    /// Validate the fields that are present.
    pub fn validate(&self) -> Result<()> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(Error::invalid("title", "must not be empty"));
            }
        }
        Ok(())
    }

    /// Wire fields for the merge write. The mutation layer adds the
    /// `updated_at_utc` bump.
    pub fn to_fields(&self) -> Fields {
        let mut f = Fields::new();
        if let Some(title) = &self.title {
            f.insert("title".into(), Value::from(title.clone()));
        }
        if let Some(desc) = &self.description {
            f.insert("description".into(), Value::from(desc.clone()));
        }
        if let Some(status) = self.status {
            f.insert("status".into(), Value::from(format_status(status)));
        }
        if let Some(priority) = self.priority {
            f.insert("priority".into(), Value::from(format_priority(priority)));
        }
        if self.clear_due {
            f.insert("due_utc".into(), Value::Null);
        } else if let Some(due) = self.due_utc {
            f.insert("due_utc".into(), Value::from(due));
        }
        f
    }
}

/// A subtask as held in memory. Owned exclusively by one task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subtask {
    pub id: DocId,
    pub title: String,
    pub completed: bool,
    pub order: Option<i64>,
    pub created_at_utc: i64,
}

impl Subtask {
    /// Decode a subtask from its wire document.
    pub fn from_doc(doc: &Doc) -> Result<Subtask> {
        Ok(Subtask {
            id: doc.id.clone(),
            title: doc.require_str("title")?,
            completed: doc.bool_field("completed").unwrap_or(false),
            order: doc.int_field("order"),
            created_at_utc: doc.int_field("created_at_utc").unwrap_or(0),
        })
    }
}

/// Input for creating a subtask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtaskDraft {
    pub title: String,
    pub completed: bool,
}

impl SubtaskDraft {
    /// Validate the draft: non-empty title.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::invalid("title", "must not be empty"));
        }
        Ok(())
    }

    /// Wire fields for the create write.
    pub fn to_fields(&self, now_utc: i64, order: i64) -> Fields {
        let mut f = Fields::new();
        f.insert("title".into(), Value::from(self.title.clone()));
        f.insert("completed".into(), Value::from(self.completed));
        f.insert("order".into(), Value::from(order));
        f.insert("created_at_utc".into(), Value::from(now_utc));
        f
    }
}

/// Field-level partial update for a subtask.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtaskPatch {
    pub title: Option<String>,
    pub completed: Option<bool>,
}

impl SubtaskPatch {
    /// Validate the fields that are present.
    pub fn validate(&self) -> Result<()> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(Error::invalid("title", "must not be empty"));
            }
        }
        Ok(())
    }

    /// Wire fields for the merge write.
    pub fn to_fields(&self) -> Fields {
        let mut f = Fields::new();
        if let Some(title) = &self.title {
            f.insert("title".into(), Value::from(title.clone()));
        }
        if let Some(completed) = self.completed {
            f.insert("completed".into(), Value::from(completed));
        }
        f
    }
}
