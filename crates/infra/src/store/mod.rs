//! Tenant-partitioned record storage.
//!
//! - `key`: the composite `(tenant, kind, id)` storage key
//! - `tenant_store`: the raw store contract + in-memory implementation
//! - `postgres`: Postgres implementation
//! - `accessor`: typed, context-bound access used by request handlers

pub mod accessor;
pub mod key;
pub mod postgres;
pub mod tenant_store;

pub use accessor::{AccessError, IdentityLookup, TenantAccessor};
pub use key::StorageKey;
pub use postgres::PostgresTenantStore;
pub use tenant_store::{InMemoryTenantStore, StoreError, TenantStore};
