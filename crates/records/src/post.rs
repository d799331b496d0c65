use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tamv_core::{DomainError, DomainResult, Record, RecordId, RecordKind, UserId};

use crate::validate;

const CONTENT_MAX: usize = 5_000;

/// A feed post. Ranking and the social economy around posts live elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: RecordId,
    pub author_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPost {
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostPatch {
    pub content: Option<String>,
}

impl Post {
    pub fn create(input: NewPost, author_id: UserId, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: RecordId::new(),
            author_id,
            content: validate::required_text("content", &input.content, CONTENT_MAX)?,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_authored_by(&self, user: UserId) -> bool {
        self.author_id == user
    }

    pub fn apply(&mut self, patch: PostPatch, now: DateTime<Utc>) -> DomainResult<()> {
        let Some(content) = patch.content else {
            return Err(DomainError::EmptyPatch);
        };
        self.content = validate::required_text("content", &content, CONTENT_MAX)?;
        self.updated_at = now;
        Ok(())
    }
}

impl Record for Post {
    const KIND: RecordKind = RecordKind::Post;

    fn record_id(&self) -> RecordId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_is_required_and_bounded() {
        let author = UserId::new();
        let now = Utc::now();
        assert!(Post::create(NewPost { content: "\n ".into() }, author, now).is_err());
        assert!(Post::create(NewPost { content: "x".repeat(CONTENT_MAX + 1) }, author, now).is_err());

        let post = Post::create(NewPost { content: " hello ".into() }, author, now).unwrap();
        assert_eq!(post.content, "hello");
        assert_eq!(post.author_id, author);
        assert!(post.is_authored_by(author));
        assert!(!post.is_authored_by(UserId::new()));
    }

    #[test]
    fn patch_replaces_content_or_rejects_empty_patch() {
        let now = Utc::now();
        let mut post = Post::create(NewPost { content: "draft".into() }, UserId::new(), now).unwrap();
        let later = now + chrono::Duration::seconds(3);

        assert_eq!(post.apply(PostPatch::default(), later), Err(DomainError::EmptyPatch));
        assert!(post.apply(PostPatch { content: Some(" ".into()) }, later).is_err());
        assert_eq!(post.content, "draft");

        post.apply(PostPatch { content: Some("final".into()) }, later).unwrap();
        assert_eq!(post.content, "final");
        assert_eq!(post.updated_at, later);
    }
}
