//! `hms-audit`: append-only audit trail for mutating operations.
//!
//! - `record`: the immutable [`AuditRecord`] fact and the document-level [`AuditStamp`]
//! - `store`: the [`AuditStore`] port and its in-memory / Postgres adapters
//! - `recorder`: best-effort [`AuditRecorder`] that never fails the caller

pub mod record;
pub mod recorder;
pub mod store;

pub use record::{AuditKind, AuditRecord, AuditStamp};
pub use recorder::{AuditFailureSink, AuditRecorder, AuditWriteFailure, TracingFailureSink};
pub use store::{AuditFilter, AuditStore, AuditStoreError, InMemoryAuditStore};
#[cfg(feature = "postgres")]
pub use store::PostgresAuditStore;
