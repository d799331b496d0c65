//! Input validation errors shared by every record type.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Why a request could not be turned into a valid record or change.
///
/// Every variant is a client mistake. Lookups that miss and storage failures
/// are reported by the storage layer, not here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("{field} is required")]
    Required { field: &'static str },

    /// Length is counted in characters, not bytes.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("no fields to update")]
    EmptyPatch,

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("{0}")]
    Validation(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_field() {
        assert_eq!(DomainError::Required { field: "title" }.to_string(), "title is required");
        assert_eq!(
            DomainError::TooLong { field: "content", max: 5000 }.to_string(),
            "content must be at most 5000 characters"
        );
    }
}
