//! `tamv-core`: shared primitives for the tenant boundary.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod record;

pub use error::{DomainError, DomainResult};
pub use id::{RecordId, TenantId, UserId};
pub use record::{Record, RecordKind};
