//! Append-only audit store boundary.
//!
//! The port makes no storage assumptions beyond "append, then list". There is
//! no update or delete operation by construction.

use async_trait::async_trait;
use thiserror::Error;

use hms_auth::PrincipalId;
use hms_core::{OperationId, ResourceId};

use crate::{AuditKind, AuditRecord};

pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use in_memory::InMemoryAuditStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresAuditStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuditStoreError {
    /// The record id already exists (append-only stores never overwrite).
    #[error("duplicate audit record: {0}")]
    Duplicate(String),

    /// The store is unavailable or rejected the write.
    #[error("audit store unavailable: {0}")]
    Unavailable(String),
}

/// Filter for listing audit records. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditFilter {
    pub resource: Option<ResourceId>,
    pub principal: Option<PrincipalId>,
    pub operation: Option<OperationId>,
    pub kind: Option<AuditKind>,
    pub limit: Option<usize>,
}

impl AuditFilter {
    pub fn matches(&self, record: &AuditRecord) -> bool {
        self.resource.as_ref().is_none_or(|r| *r == record.resource)
            && self.principal.is_none_or(|p| p == record.principal)
            && self.operation.as_ref().is_none_or(|o| *o == record.operation)
            && self.kind.is_none_or(|k| k == record.kind)
    }
}

/// Port for persisting append-only audit records.
///
/// Implementations must be safe under concurrent writers. No global ordering
/// is promised beyond each record's own timestamp.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Persist one record.
    async fn append(&self, record: AuditRecord) -> Result<(), AuditStoreError>;

    /// List records matching the filter, oldest first.
    async fn list(&self, filter: &AuditFilter) -> Result<Vec<AuditRecord>, AuditStoreError>;
}
