//! `hms-core`: shared building blocks (identifiers, domain error model).
//!
//! This crate contains no infrastructure concerns.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{AuditRecordId, OperationId, RecordId, ResourceId};
