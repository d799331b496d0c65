//! Tenant-scoped record marker trait.

use serde::{Serialize, de::DeserializeOwned};

use crate::RecordId;

/// Kind of a persisted record; part of every storage key.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKind {
    Task,
    Post,
    Comment,
    User,
    /// Password hash of a user, keyed by the user id.
    Login,
    /// Email reservation, keyed by a name-based id of the normalized address.
    EmailIndex,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Task => "Task",
            RecordKind::Post => "Post",
            RecordKind::Comment => "Comment",
            RecordKind::User => "User",
            RecordKind::Login => "Login",
            RecordKind::EmailIndex => "EmailIndex",
        }
    }
}

impl RecordKind {
    pub const ALL: [RecordKind; 6] = [
        RecordKind::Task,
        RecordKind::Post,
        RecordKind::Comment,
        RecordKind::User,
        RecordKind::Login,
        RecordKind::EmailIndex,
    ];
}

impl core::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for RecordKind {
    type Err = crate::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Task" => Ok(RecordKind::Task),
            "Post" => Ok(RecordKind::Post),
            "Comment" => Ok(RecordKind::Comment),
            "User" => Ok(RecordKind::User),
            "Login" => Ok(RecordKind::Login),
            "EmailIndex" => Ok(RecordKind::EmailIndex),
            other => Err(crate::DomainError::validation(format!("unknown record kind '{other}'"))),
        }
    }
}

/// A record stored under a tenant partition.
///
/// Records never carry their own tenant id: the tenant is part of the storage
/// key and is supplied by the authorized request context.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: RecordKind;

    fn record_id(&self) -> RecordId;
}
