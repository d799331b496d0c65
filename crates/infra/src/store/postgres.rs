//! Postgres-backed tenant store.
//!
//! Records live in a single `tenant_records` table keyed by
//! `(tenant_id, kind, record_id)` with the body stored as `jsonb`. Every
//! statement binds the tenant id; none of them can address a row by
//! `record_id` alone.
//!
//! ## Error Mapping
//!
//! | SQLx Error | StoreError |
//! |------------|------------|
//! | Database, code `23505` (unique violation) | `AlreadyExists` |
//! | Any other error | `Unavailable` |
//! | Row body decode failure | `Corrupt` |

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Row};
use tracing::instrument;

use tamv_core::{RecordKind, TenantId};

use super::{StorageKey, StoreError, TenantStore};

const SCHEMA: &str = include_str!("../../migrations/0001_tenant_records.sql");

#[derive(Debug, Clone)]
pub struct PostgresTenantStore {
    pool: Arc<PgPool>,
}

impl PostgresTenantStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Connect to `database_url` with a small default pool.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the `tenant_records` table if it does not exist yet.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }
}

#[async_trait]
impl TenantStore for PostgresTenantStore {
    #[instrument(skip(self), fields(tenant_id = %key.tenant_id(), kind = %key.kind()), err)]
    async fn get(&self, key: &StorageKey) -> Result<Option<Value>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT body FROM tenant_records
            WHERE tenant_id = $1 AND kind = $2 AND record_id = $3
            "#,
        )
        .bind(*key.tenant_id().as_uuid())
        .bind(key.kind().as_str())
        .bind(*key.record_id().as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get", e))?;

        row.map(|r| r.try_get::<Value, _>("body").map_err(|e| StoreError::Corrupt(e.to_string())))
            .transpose()
    }

    #[instrument(skip(self, body), fields(tenant_id = %key.tenant_id(), kind = %key.kind()), err)]
    async fn insert(&self, key: StorageKey, body: Value) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO tenant_records (tenant_id, kind, record_id, body)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (tenant_id, kind, record_id) DO NOTHING
            "#,
        )
        .bind(*key.tenant_id().as_uuid())
        .bind(key.kind().as_str())
        .bind(*key.record_id().as_uuid())
        .bind(&body)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists(key.to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self, body), fields(tenant_id = %key.tenant_id(), kind = %key.kind()), err)]
    async fn replace(&self, key: StorageKey, body: Value) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE tenant_records
            SET body = $4, updated_at = NOW()
            WHERE tenant_id = $1 AND kind = $2 AND record_id = $3
            "#,
        )
        .bind(*key.tenant_id().as_uuid())
        .bind(key.kind().as_str())
        .bind(*key.record_id().as_uuid())
        .bind(&body)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("replace", e))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(tenant_id = %key.tenant_id(), kind = %key.kind()), err)]
    async fn delete(&self, key: &StorageKey) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM tenant_records
            WHERE tenant_id = $1 AND kind = $2 AND record_id = $3
            "#,
        )
        .bind(*key.tenant_id().as_uuid())
        .bind(key.kind().as_str())
        .bind(*key.record_id().as_uuid())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("delete", e))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id), err)]
    async fn list(&self, tenant_id: TenantId, kind: RecordKind) -> Result<Vec<Value>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT body FROM tenant_records
            WHERE tenant_id = $1 AND kind = $2
            ORDER BY record_id ASC
            "#,
        )
        .bind(*tenant_id.as_uuid())
        .bind(kind.as_str())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list", e))?;

        rows.iter()
            .map(|r| r.try_get::<Value, _>("body").map_err(|e| StoreError::Corrupt(e.to_string())))
            .collect()
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::AlreadyExists(msg),
                _ => StoreError::Unavailable(msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::Unavailable(format!("connection pool closed in {}", operation)),
        other => StoreError::Unavailable(format!("sqlx error in {}: {}", operation, other)),
    }
}
