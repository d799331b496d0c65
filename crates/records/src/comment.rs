use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tamv_core::{DomainResult, Record, RecordId, RecordKind, UserId};

use crate::validate;

const CONTENT_MAX: usize = 2_000;

/// A comment on a post of the same tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: RecordId,
    pub post_id: RecordId,
    pub author_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewComment {
    pub content: String,
}

impl Comment {
    /// `post_id` must name a post the caller already loaded from its tenant.
    pub fn create(post_id: RecordId, input: NewComment, author_id: UserId, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: RecordId::new(),
            post_id,
            author_id,
            content: validate::required_text("content", &input.content, CONTENT_MAX)?,
            created_at: now,
        })
    }
}

impl Record for Comment {
    const KIND: RecordKind = RecordKind::Comment;

    fn record_id(&self) -> RecordId {
        self.id
    }
}
