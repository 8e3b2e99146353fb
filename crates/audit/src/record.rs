use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hms_auth::PrincipalId;
use hms_core::{AuditRecordId, OperationId, ResourceId};

/// Kind of mutation an audit record describes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditKind {
    Create,
    Update,
    Delete,
}

impl AuditKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditKind::Create => "CREATE",
            AuditKind::Update => "UPDATE",
            AuditKind::Delete => "DELETE",
        }
    }
}

impl core::fmt::Display for AuditKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CREATE" => Ok(AuditKind::Create),
            "UPDATE" => Ok(AuditKind::Update),
            "DELETE" => Ok(AuditKind::Delete),
            other => Err(format!("unknown audit kind '{other}'")),
        }
    }
}

/// Immutable fact: who performed which mutating operation on what, and when.
///
/// Exactly one record exists per successful mutating operation. Records are
/// never updated or deleted once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: AuditRecordId,
    pub operation: OperationId,
    pub resource: ResourceId,
    pub principal: PrincipalId,
    pub kind: AuditKind,
    pub recorded_at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(
        operation: OperationId,
        resource: ResourceId,
        principal: PrincipalId,
        kind: AuditKind,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AuditRecordId::new(),
            operation,
            resource,
            principal,
            kind,
            recorded_at,
        }
    }
}

/// Created-by / modified-by facts carried on a stored document itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStamp {
    pub created_by: PrincipalId,
    pub created_at: DateTime<Utc>,
    pub last_modified_by: PrincipalId,
    pub last_modified_at: DateTime<Utc>,
}

impl AuditStamp {
    pub fn created(by: PrincipalId, at: DateTime<Utc>) -> Self {
        Self {
            created_by: by,
            created_at: at,
            last_modified_by: by,
            last_modified_at: at,
        }
    }

    /// Refresh the modification facts; creation facts never change.
    pub fn touched(&self, by: PrincipalId, at: DateTime<Utc>) -> Self {
        Self {
            last_modified_by: by,
            last_modified_at: at,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn kind_serializes_uppercase() {
        assert_eq!(serde_json::to_value(AuditKind::Create).unwrap(), "CREATE");
        assert_eq!("delete".parse::<AuditKind>(), Ok(AuditKind::Delete));
        assert!("purge".parse::<AuditKind>().is_err());
    }

    #[test]
    fn touch_keeps_creation_facts() {
        let creator = PrincipalId::new();
        let editor = PrincipalId::new();
        let t0 = Utc::now();
        let t1 = t0 + Duration::seconds(30);

        let stamp = AuditStamp::created(creator, t0).touched(editor, t1);
        assert_eq!(stamp.created_by, creator);
        assert_eq!(stamp.created_at, t0);
        assert_eq!(stamp.last_modified_by, editor);
        assert_eq!(stamp.last_modified_at, t1);
    }
}
