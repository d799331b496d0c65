//! Typed, context-bound record access.
//!
//! A [`TenantAccessor`] can only be built from an [`AuthorizedContext`], and
//! it takes the tenant from that context for every key it builds. Handlers
//! pass record ids; they never pass tenant ids.
//!
//! [`IdentityLookup`] is the one read path that exists before a request is
//! authorized: login and refresh use it to load the caller's own user records.
//! It cannot write.

use core::marker::PhantomData;

use thiserror::Error;

use tamv_auth::AuthorizedContext;
use tamv_core::{Record, RecordId, TenantId};

use super::{StorageKey, StoreError, TenantStore};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// No such record in the caller's tenant. Says nothing about other tenants.
    #[error("record not found")]
    NotFound,

    #[error("record already exists")]
    Conflict,

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for AccessError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists(_) => AccessError::Conflict,
            other => AccessError::Store(other),
        }
    }
}

pub struct TenantAccessor<'a, R> {
    tenant_id: TenantId,
    store: &'a dyn TenantStore,
    _record: PhantomData<fn() -> R>,
}

impl<'a, R: Record> TenantAccessor<'a, R> {
    pub fn new(ctx: &AuthorizedContext, store: &'a dyn TenantStore) -> Self {
        Self {
            tenant_id: ctx.tenant_id(),
            store,
            _record: PhantomData,
        }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    fn key(&self, id: RecordId) -> StorageKey {
        StorageKey::new(self.tenant_id, R::KIND, id)
    }

    pub async fn get(&self, id: RecordId) -> Result<R, AccessError> {
        let key = self.key(id);
        match self.store.get(&key).await? {
            Some(body) => decode(&key, body),
            None => Err(AccessError::NotFound),
        }
    }

    /// Every record of this kind in the caller's tenant.
    pub async fn list(&self) -> Result<Vec<R>, AccessError> {
        let bodies = self.store.list(self.tenant_id, R::KIND).await?;
        bodies
            .into_iter()
            .map(|body| serde_json::from_value(body).map_err(|e| corrupt(self.tenant_id, e)))
            .collect()
    }

    pub async fn create(&self, record: &R) -> Result<(), AccessError> {
        let key = self.key(record.record_id());
        self.store.insert(key, encode(record)?).await?;
        Ok(())
    }

    pub async fn update(&self, record: &R) -> Result<(), AccessError> {
        let key = self.key(record.record_id());
        if self.store.replace(key, encode(record)?).await? {
            Ok(())
        } else {
            Err(AccessError::NotFound)
        }
    }

    pub async fn delete(&self, id: RecordId) -> Result<(), AccessError> {
        if self.store.delete(&self.key(id)).await? {
            Ok(())
        } else {
            Err(AccessError::NotFound)
        }
    }
}

/// Read-only record access for establishing identity.
pub struct IdentityLookup<'a> {
    tenant_id: TenantId,
    store: &'a dyn TenantStore,
}

impl<'a> IdentityLookup<'a> {
    pub fn new(tenant_id: TenantId, store: &'a dyn TenantStore) -> Self {
        Self { tenant_id, store }
    }

    pub async fn get<R: Record>(&self, id: RecordId) -> Result<R, AccessError> {
        let key = StorageKey::new(self.tenant_id, R::KIND, id);
        match self.store.get(&key).await? {
            Some(body) => decode(&key, body),
            None => Err(AccessError::NotFound),
        }
    }
}

fn encode<R: Record>(record: &R) -> Result<serde_json::Value, AccessError> {
    serde_json::to_value(record).map_err(|e| AccessError::Store(StoreError::Corrupt(e.to_string())))
}

fn decode<R: Record>(key: &StorageKey, body: serde_json::Value) -> Result<R, AccessError> {
    serde_json::from_value(body).map_err(|e| {
        tracing::error!(key = %key, error = %e, "stored record does not decode");
        AccessError::Store(StoreError::Corrupt(e.to_string()))
    })
}

fn corrupt(tenant_id: TenantId, e: serde_json::Error) -> AccessError {
    tracing::error!(tenant_id = %tenant_id, error = %e, "stored record does not decode");
    AccessError::Store(StoreError::Corrupt(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryTenantStore;
    use chrono::{Duration, Utc};
    use tamv_auth::{Capability, Principal, Role, RoleSet, authorize};
    use tamv_core::{RecordKind, UserId};
    use tamv_records::{NewTask, Task, TaskPatch, TaskStatus};

    fn ctx(tenant: TenantId, role: Role, cap: Capability) -> AuthorizedContext {
        let principal = Principal::new(UserId::new(), tenant, RoleSet::from(role), Utc::now() + Duration::minutes(5));
        authorize(&principal, cap).unwrap()
    }

    fn task(title: &str) -> Task {
        Task::create(
            NewTask {
                title: title.to_string(),
                description: None,
            },
            UserId::new(),
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn crud_within_one_tenant() {
        let store = InMemoryTenantStore::new();
        let tenant = TenantId::new();
        let writer = ctx(tenant, Role::User, Capability::Write);
        let tasks = TenantAccessor::<Task>::new(&writer, &store);

        let mut t = task("write docs");
        tasks.create(&t).await.unwrap();
        assert_eq!(tasks.get(t.id).await.unwrap(), t);

        t.apply(
            TaskPatch {
                status: Some(TaskStatus::Done),
                ..TaskPatch::default()
            },
            Utc::now(),
        )
        .unwrap();
        tasks.update(&t).await.unwrap();
        assert_eq!(tasks.get(t.id).await.unwrap().status, TaskStatus::Done);
        assert_eq!(tasks.list().await.unwrap(), vec![t.clone()]);

        let admin = ctx(tenant, Role::Admin, Capability::Delete);
        TenantAccessor::<Task>::new(&admin, &store).delete(t.id).await.unwrap();
        assert_eq!(tasks.get(t.id).await, Err(AccessError::NotFound));
    }

    #[tokio::test]
    async fn other_tenants_records_are_not_found() {
        let store = InMemoryTenantStore::new();
        let a = ctx(TenantId::new(), Role::Owner, Capability::Write);
        let b = ctx(TenantId::new(), Role::Owner, Capability::Delete);

        let t = task("tenant a only");
        TenantAccessor::<Task>::new(&a, &store).create(&t).await.unwrap();

        let from_b = TenantAccessor::<Task>::new(&b, &store);
        assert_eq!(from_b.get(t.id).await, Err(AccessError::NotFound));
        assert_eq!(from_b.update(&t).await, Err(AccessError::NotFound));
        assert_eq!(from_b.delete(t.id).await, Err(AccessError::NotFound));
        assert!(from_b.list().await.unwrap().is_empty());

        // Still there for its owner.
        assert_eq!(TenantAccessor::<Task>::new(&a, &store).get(t.id).await.unwrap(), t);
    }

    #[tokio::test]
    async fn unknown_id_and_other_tenant_id_are_indistinguishable() {
        let store = InMemoryTenantStore::new();
        let a = ctx(TenantId::new(), Role::User, Capability::Write);
        let b = ctx(TenantId::new(), Role::User, Capability::Read);
        let t = task("x");
        TenantAccessor::<Task>::new(&a, &store).create(&t).await.unwrap();

        let from_b = TenantAccessor::<Task>::new(&b, &store);
        assert_eq!(from_b.get(t.id).await, from_b.get(RecordId::new()).await);
    }

    #[tokio::test]
    async fn duplicate_create_is_conflict() {
        let store = InMemoryTenantStore::new();
        let c = ctx(TenantId::new(), Role::User, Capability::Write);
        let tasks = TenantAccessor::<Task>::new(&c, &store);
        let t = task("once");
        tasks.create(&t).await.unwrap();
        assert_eq!(tasks.create(&t).await, Err(AccessError::Conflict));
    }

    #[tokio::test]
    async fn undecodable_body_is_a_store_error() {
        let store = InMemoryTenantStore::new();
        let c = ctx(TenantId::new(), Role::User, Capability::Read);
        let id = RecordId::new();
        store
            .insert(StorageKey::new(c.tenant_id(), RecordKind::Task, id), serde_json::json!({"nope": true}))
            .await
            .unwrap();

        let err = TenantAccessor::<Task>::new(&c, &store).get(id).await.unwrap_err();
        assert!(matches!(err, AccessError::Store(StoreError::Corrupt(_))));
    }

    #[tokio::test]
    async fn identity_lookup_reads_one_tenant_only() {
        let store = InMemoryTenantStore::new();
        let a = ctx(TenantId::new(), Role::User, Capability::Write);
        let t = task("mine");
        TenantAccessor::<Task>::new(&a, &store).create(&t).await.unwrap();

        let same = IdentityLookup::new(a.tenant_id(), &store);
        assert_eq!(same.get::<Task>(t.id).await.unwrap(), t);

        let other = IdentityLookup::new(TenantId::new(), &store);
        assert_eq!(other.get::<Task>(t.id).await, Err(AccessError::NotFound));
    }

    proptest::proptest! {
        #[test]
        fn no_tenant_sees_another_tenants_records(
            writes in proptest::collection::vec((0usize..3, "[a-z]{1,12}"), 1..24)
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let store = InMemoryTenantStore::new();
                let tenants: Vec<TenantId> = (0..3).map(|_| TenantId::new()).collect();
                let mut written: Vec<(usize, Task)> = Vec::new();

                for (who, title) in &writes {
                    let c = ctx(tenants[*who], Role::User, Capability::Write);
                    let t = task(title);
                    TenantAccessor::<Task>::new(&c, &store).create(&t).await.unwrap();
                    written.push((*who, t));
                }

                for (i, tenant) in tenants.iter().enumerate() {
                    let c = ctx(*tenant, Role::User, Capability::Read);
                    let tasks = TenantAccessor::<Task>::new(&c, &store);
                    let listed = tasks.list().await.unwrap();
                    let expected: Vec<_> = written.iter().filter(|(w, _)| *w == i).collect();
                    proptest::prop_assert_eq!(listed.len(), expected.len());

                    for (owner, t) in &written {
                        let got = tasks.get(t.id).await;
                        if *owner == i {
                            proptest::prop_assert_eq!(got.as_ref(), Ok(t));
                        } else {
                            proptest::prop_assert_eq!(got, Err(AccessError::NotFound));
                        }
                    }
                }
                Ok::<(), proptest::test_runner::TestCaseError>(())
            })?;
        }
    }
}
