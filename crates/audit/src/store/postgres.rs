//! Postgres-backed audit store.
//!
//! Records land in an insert-only `audit_records` table. Nothing in this
//! module issues `UPDATE` or `DELETE`.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | AuditStoreError |
//! |------------|----------------------|-----------------|
//! | Database (unique violation) | `23505` | `Duplicate` |
//! | Database (other) | Any other | `Unavailable` |
//! | PoolClosed / other | N/A | `Unavailable` |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use hms_auth::PrincipalId;
use hms_core::{AuditRecordId, OperationId, ResourceId};

use super::{AuditFilter, AuditStore, AuditStoreError};
use crate::{AuditKind, AuditRecord};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS audit_records (
    id            UUID PRIMARY KEY,
    operation     TEXT NOT NULL,
    resource      TEXT NOT NULL,
    principal_id  UUID NOT NULL,
    kind          TEXT NOT NULL CHECK (kind IN ('CREATE', 'UPDATE', 'DELETE')),
    recorded_at   TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS audit_records_resource_idx ON audit_records (resource, recorded_at);
"#;

/// Postgres-backed append-only audit store.
///
/// `Send + Sync`; all operations go through the SQLx connection pool.
#[derive(Debug, Clone)]
pub struct PostgresAuditStore {
    pool: Arc<PgPool>,
}

impl PostgresAuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create the table and index if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), AuditStoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }
}

#[async_trait]
impl AuditStore for PostgresAuditStore {
    #[instrument(skip(self, record), fields(audit_id = %record.id, operation = %record.operation), err)]
    async fn append(&self, record: AuditRecord) -> Result<(), AuditStoreError> {
        sqlx::query(
            r#"
            INSERT INTO audit_records (id, operation, resource, principal_id, kind, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.operation.as_str())
        .bind(record.resource.as_str())
        .bind(record.principal.as_uuid())
        .bind(record.kind.as_str())
        .bind(record.recorded_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("append", e))?;

        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn list(&self, filter: &AuditFilter) -> Result<Vec<AuditRecord>, AuditStoreError> {
        let limit = filter.limit.map(|l| l as i64);

        let rows = sqlx::query(
            r#"
            SELECT id, operation, resource, principal_id, kind, recorded_at
            FROM audit_records
            WHERE ($1::text IS NULL OR resource = $1)
                AND ($2::uuid IS NULL OR principal_id = $2)
                AND ($3::text IS NULL OR operation = $3)
                AND ($4::text IS NULL OR kind = $4)
            ORDER BY recorded_at ASC, id ASC
            LIMIT $5
            "#,
        )
        .bind(filter.resource.as_ref().map(|r| r.as_str()))
        .bind(filter.principal.map(|p| *p.as_uuid()))
        .bind(filter.operation.as_ref().map(|o| o.as_str()))
        .bind(filter.kind.map(|k| k.as_str()))
        .bind(limit)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list", e))?;

        rows.into_iter()
            .map(|row| {
                let id: Uuid = row.try_get("id").map_err(|e| map_sqlx_error("list", e))?;
                let operation: String = row.try_get("operation").map_err(|e| map_sqlx_error("list", e))?;
                let resource: String = row.try_get("resource").map_err(|e| map_sqlx_error("list", e))?;
                let principal: Uuid = row.try_get("principal_id").map_err(|e| map_sqlx_error("list", e))?;
                let kind: String = row.try_get("kind").map_err(|e| map_sqlx_error("list", e))?;
                let recorded_at: DateTime<Utc> =
                    row.try_get("recorded_at").map_err(|e| map_sqlx_error("list", e))?;

                Ok(AuditRecord {
                    id: AuditRecordId::from_uuid(id),
                    operation: OperationId::new(operation),
                    resource: ResourceId::new(resource),
                    principal: PrincipalId::from_uuid(principal),
                    kind: kind.parse::<AuditKind>().map_err(AuditStoreError::Unavailable)?,
                    recorded_at,
                })
            })
            .collect()
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> AuditStoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => AuditStoreError::Duplicate(msg),
                _ => AuditStoreError::Unavailable(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            AuditStoreError::Unavailable(format!("connection pool closed in {}", operation))
        }
        _ => AuditStoreError::Unavailable(format!("sqlx error in {}: {}", operation, err)),
    }
}
