use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use tamv_core::{RecordId, RecordKind, TenantId};

use super::StorageKey;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("record already exists: {0}")]
    AlreadyExists(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("stored record could not be decoded: {0}")]
    Corrupt(String),
}

/// Tenant-partitioned record store holding JSON bodies.
///
/// Every operation is addressed by a [`StorageKey`] or by a `(tenant, kind)`
/// partition; there is no way to reach a record without naming its tenant.
#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn get(&self, key: &StorageKey) -> Result<Option<Value>, StoreError>;

    /// Insert a new record. Fails with [`StoreError::AlreadyExists`] if the key is taken.
    async fn insert(&self, key: StorageKey, body: Value) -> Result<(), StoreError>;

    /// Replace an existing record. Returns `false` if there was nothing to replace.
    async fn replace(&self, key: StorageKey, body: Value) -> Result<bool, StoreError>;

    /// Returns `false` if there was nothing to delete.
    async fn delete(&self, key: &StorageKey) -> Result<bool, StoreError>;

    /// All records of one kind within one tenant, ordered by record id.
    async fn list(&self, tenant_id: TenantId, kind: RecordKind) -> Result<Vec<Value>, StoreError>;
}

#[async_trait]
impl<S> TenantStore for Arc<S>
where
    S: TenantStore + ?Sized,
{
    async fn get(&self, key: &StorageKey) -> Result<Option<Value>, StoreError> {
        (**self).get(key).await
    }

    async fn insert(&self, key: StorageKey, body: Value) -> Result<(), StoreError> {
        (**self).insert(key, body).await
    }

    async fn replace(&self, key: StorageKey, body: Value) -> Result<bool, StoreError> {
        (**self).replace(key, body).await
    }

    async fn delete(&self, key: &StorageKey) -> Result<bool, StoreError> {
        (**self).delete(key).await
    }

    async fn list(&self, tenant_id: TenantId, kind: RecordKind) -> Result<Vec<Value>, StoreError> {
        (**self).list(tenant_id, kind).await
    }
}

type Partition = BTreeMap<RecordId, Value>;

/// In-memory tenant-partitioned store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryTenantStore {
    partitions: RwLock<HashMap<(TenantId, RecordKind), Partition>>,
}

impl InMemoryTenantStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of records across every tenant.
    pub fn len(&self) -> usize {
        self.partitions
            .read()
            .map(|p| p.values().map(BTreeMap::len).sum())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("in-memory store lock poisoned".to_string())
}

#[async_trait]
impl TenantStore for InMemoryTenantStore {
    async fn get(&self, key: &StorageKey) -> Result<Option<Value>, StoreError> {
        let partitions = self.partitions.read().map_err(|_| poisoned())?;
        Ok(partitions
            .get(&key.partition())
            .and_then(|p| p.get(&key.record_id()))
            .cloned())
    }

    async fn insert(&self, key: StorageKey, body: Value) -> Result<(), StoreError> {
        let mut partitions = self.partitions.write().map_err(|_| poisoned())?;
        let partition = partitions.entry(key.partition()).or_default();
        if partition.contains_key(&key.record_id()) {
            return Err(StoreError::AlreadyExists(key.to_string()));
        }
        partition.insert(key.record_id(), body);
        Ok(())
    }

    async fn replace(&self, key: StorageKey, body: Value) -> Result<bool, StoreError> {
        let mut partitions = self.partitions.write().map_err(|_| poisoned())?;
        match partitions
            .get_mut(&key.partition())
            .and_then(|p| p.get_mut(&key.record_id()))
        {
            Some(slot) => {
                *slot = body;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, key: &StorageKey) -> Result<bool, StoreError> {
        let mut partitions = self.partitions.write().map_err(|_| poisoned())?;
        Ok(partitions
            .get_mut(&key.partition())
            .and_then(|p| p.remove(&key.record_id()))
            .is_some())
    }

    async fn list(&self, tenant_id: TenantId, kind: RecordKind) -> Result<Vec<Value>, StoreError> {
        let partitions = self.partitions.read().map_err(|_| poisoned())?;
        Ok(partitions
            .get(&(tenant_id, kind))
            .map(|p| p.values().cloned().collect())
            .unwrap_or_default())
    }
}
