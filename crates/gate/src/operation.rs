use serde::Serialize;

use hms_audit::AuditKind;
use hms_auth::Requirement;
use hms_core::OperationId;

/// Whether an operation mutates state (and therefore gets audited).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "audit", rename_all = "snake_case")]
pub enum OperationKind {
    Read,
    Mutating(AuditKind),
}

impl OperationKind {
    pub fn audit_kind(&self) -> Option<AuditKind> {
        match self {
            OperationKind::Read => None,
            OperationKind::Mutating(kind) => Some(*kind),
        }
    }
}

/// Declaration of a gated operation: its id, what it demands of the caller,
/// and whether it is audited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationDef {
    pub id: OperationId,
    pub requirement: Requirement,
    pub kind: OperationKind,
}

impl OperationDef {
    pub fn new(id: impl Into<OperationId>, requirement: Requirement, kind: OperationKind) -> Self {
        Self {
            id: id.into(),
            requirement,
            kind,
        }
    }

    pub fn read(id: impl Into<OperationId>, requirement: Requirement) -> Self {
        Self::new(id, requirement, OperationKind::Read)
    }

    pub fn create(id: impl Into<OperationId>, requirement: Requirement) -> Self {
        Self::new(id, requirement, OperationKind::Mutating(AuditKind::Create))
    }

    pub fn update(id: impl Into<OperationId>, requirement: Requirement) -> Self {
        Self::new(id, requirement, OperationKind::Mutating(AuditKind::Update))
    }

    pub fn delete(id: impl Into<OperationId>, requirement: Requirement) -> Self {
        Self::new(id, requirement, OperationKind::Mutating(AuditKind::Delete))
    }
}
