use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use thiserror::Error;

use hms_auth::PrincipalId;
use hms_core::{OperationId, ResourceId};

use crate::{AuditKind, AuditRecord, AuditStore, AuditStoreError};

/// An audit record could not be persisted.
///
/// Reported to the [`AuditFailureSink`], never to the caller of the audited
/// operation: the domain effect already happened.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("audit write failed for {} on {}: {source}", .record.operation, .record.resource)]
pub struct AuditWriteFailure {
    pub record: AuditRecord,
    #[source]
    pub source: AuditStoreError,
}

/// Observability hook for audit write failures.
pub trait AuditFailureSink: Send + Sync {
    fn report(&self, failure: &AuditWriteFailure);
}

/// Default sink: logs every failure at `error` and keeps a running count.
#[derive(Debug, Default)]
pub struct TracingFailureSink {
    failures: AtomicU64,
}

impl TracingFailureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

impl AuditFailureSink for TracingFailureSink {
    fn report(&self, failure: &AuditWriteFailure) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        tracing::error!(
            audit_id = %failure.record.id,
            operation = %failure.record.operation,
            resource = %failure.record.resource,
            principal = %failure.record.principal,
            kind = %failure.record.kind,
            error = %failure.source,
            "audit write failed"
        );
    }
}

/// Best-effort audit recorder.
///
/// Appends one record per call. A failed append is handed to the failure sink
/// and returned as `Err` for inspection, but callers must not turn it into a
/// failure of the operation being audited.
#[derive(Clone)]
pub struct AuditRecorder {
    store: Arc<dyn AuditStore>,
    sink: Arc<dyn AuditFailureSink>,
}

impl AuditRecorder {
    pub fn new(store: Arc<dyn AuditStore>, sink: Arc<dyn AuditFailureSink>) -> Self {
        Self { store, sink }
    }

    pub fn store(&self) -> &Arc<dyn AuditStore> {
        &self.store
    }

    pub async fn record(
        &self,
        operation: OperationId,
        resource: ResourceId,
        principal: PrincipalId,
        kind: AuditKind,
    ) -> Result<AuditRecord, AuditWriteFailure> {
        let record = AuditRecord::new(operation, resource, principal, kind, Utc::now());

        match self.store.append(record.clone()).await {
            Ok(()) => {
                tracing::debug!(
                    audit_id = %record.id,
                    operation = %record.operation,
                    resource = %record.resource,
                    kind = %record.kind,
                    "audit record appended"
                );
                Ok(record)
            }
            Err(source) => {
                let failure = AuditWriteFailure { record, source };
                self.sink.report(&failure);
                Err(failure)
            }
        }
    }
}

impl core::fmt::Debug for AuditRecorder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuditRecorder").finish_non_exhaustive()
    }
}
