use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tamv_core::{DomainError, DomainResult, Record, RecordId, RecordKind, UserId};

use crate::validate;

const TITLE_MAX: usize = 200;
const DESCRIPTION_MAX: usize = 2_000;

/// Task lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Done,
}

impl core::str::FromStr for TaskStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            other => Err(DomainError::validation(format!(
                "unknown task status '{other}' (expected pending, in_progress or done)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: RecordId,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create-task input.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
}

impl Task {
    pub fn create(input: NewTask, created_by: UserId, now: DateTime<Utc>) -> DomainResult<Self> {
        let title = validate::required_text("title", &input.title, TITLE_MAX)?;
        let description = validate::bounded_text(
            "description",
            input.description.as_deref().unwrap_or_default(),
            DESCRIPTION_MAX,
        )?;

        Ok(Self {
            id: RecordId::new(),
            title,
            description,
            status: TaskStatus::Pending,
            created_by,
            created_at: now,
            updated_at: now,
        })
    }

    /// Validate the whole patch first, then apply it; a rejected patch leaves
    /// the task unchanged.
    pub fn apply(&mut self, patch: TaskPatch, now: DateTime<Utc>) -> DomainResult<()> {
        if patch.title.is_none() && patch.description.is_none() && patch.status.is_none() {
            return Err(DomainError::EmptyPatch);
        }

        let title = patch
            .title
            .map(|t| validate::required_text("title", &t, TITLE_MAX))
            .transpose()?;
        let description = patch
            .description
            .map(|d| validate::bounded_text("description", &d, DESCRIPTION_MAX))
            .transpose()?;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        self.updated_at = now;
        Ok(())
    }
}

impl Record for Task {
    const KIND: RecordKind = RecordKind::Task;

    fn record_id(&self) -> RecordId {
        self.id
    }
}
