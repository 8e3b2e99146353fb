use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use hms_audit::{AuditFilter, AuditKind};
use hms_auth::{PrincipalContext, PrincipalId};
use hms_core::{DomainError, DomainResult, OperationId, ResourceId};

use crate::app::{errors, services::AppServices};

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 1000;

#[derive(Debug, Default, Deserialize)]
pub struct AuditQuery {
    pub resource: Option<String>,
    pub principal: Option<String>,
    pub operation: Option<String>,
    pub kind: Option<String>,
    pub limit: Option<usize>,
}

impl AuditQuery {
    fn into_filter(self) -> DomainResult<AuditFilter> {
        let principal = self
            .principal
            .map(|p| {
                p.parse::<PrincipalId>()
                    .map_err(|_| DomainError::invalid_id(format!("principal '{p}' is not a UUID")))
            })
            .transpose()?;
        let kind = self
            .kind
            .map(|k| k.parse::<AuditKind>().map_err(DomainError::validation))
            .transpose()?;

        Ok(AuditFilter {
            resource: self.resource.map(ResourceId::new),
            principal,
            operation: self.operation.map(OperationId::new),
            kind,
            limit: Some(self.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT)),
        })
    }
}

/// GET /audit - list audit records (oldest first).
pub async fn list_audit_records(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Query(query): Query<AuditQuery>,
) -> Response {
    let store = services.audit.clone();

    let result = services
        .gate
        .invoke(
            &ctx,
            &services.operations.audit_list,
            ResourceId::new("audit"),
            |_| async move {
                let filter = query.into_filter()?;
                store
                    .list(&filter)
                    .await
                    .map_err(|e| DomainError::storage(e.to_string()))
            },
        )
        .await;

    match result {
        Ok(records) => (StatusCode::OK, Json(serde_json::json!({ "records": records }))).into_response(),
        Err(e) => errors::gate_error_to_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_becomes_filter_with_capped_limit() {
        let principal = PrincipalId::new();
        let filter = AuditQuery {
            resource: Some("beds/1".to_string()),
            principal: Some(principal.to_string()),
            kind: Some("delete".to_string()),
            limit: Some(50_000),
            ..AuditQuery::default()
        }
        .into_filter()
        .unwrap();

        assert_eq!(filter.resource, Some(ResourceId::new("beds/1")));
        assert_eq!(filter.principal, Some(principal));
        assert_eq!(filter.kind, Some(AuditKind::Delete));
        assert_eq!(filter.limit, Some(MAX_LIMIT));
        assert_eq!(AuditQuery::default().into_filter().unwrap().limit, Some(DEFAULT_LIMIT));
    }

    #[test]
    fn bad_query_values_are_client_errors() {
        let bad_principal = AuditQuery {
            principal: Some("nobody".to_string()),
            ..AuditQuery::default()
        };
        assert!(matches!(bad_principal.into_filter(), Err(DomainError::InvalidId(_))));

        let bad_kind = AuditQuery {
            kind: Some("PURGE".to_string()),
            ..AuditQuery::default()
        };
        assert!(matches!(bad_kind.into_filter(), Err(DomainError::Validation(_))));
    }
}
