//! RBAC endpoints for debugging authorization decisions.
//!
//! `/rbac/explain` answers "would this operation be allowed for me, and if
//! not, why?" without running the operation.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;

use hms_auth::PrincipalContext;
use hms_core::{DomainError, ResourceId};

use crate::app::{errors, services::AppServices};

#[derive(Debug, Deserialize)]
pub struct ExplainQuery {
    pub operation: String,
}

pub fn router() -> Router {
    Router::new()
        .route("/roles", get(list_roles))
        .route("/explain", get(explain_operation))
}

/// GET /rbac/roles - role catalog with each role's permissions.
pub async fn list_roles(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
) -> Response {
    let catalog = services.catalog.clone();

    let result = services
        .gate
        .invoke(
            &ctx,
            &services.operations.rbac_roles,
            ResourceId::new("rbac/roles"),
            |_| async move { Ok::<_, DomainError>(catalog.roles().cloned().collect::<Vec<_>>()) },
        )
        .await;

    match result {
        Ok(roles) => (StatusCode::OK, Json(serde_json::json!({ "roles": roles }))).into_response(),
        Err(e) => errors::gate_error_to_response(e),
    }
}

/// GET /rbac/explain?operation= - explain the caller's decision for an operation.
pub async fn explain_operation(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Query(query): Query<ExplainQuery>,
) -> Response {
    let principal = match ctx.current() {
        Ok(p) => p,
        Err(e) => return errors::json_error(StatusCode::UNAUTHORIZED, "unauthenticated", e.to_string()),
    };

    let Some(operation) = services.registry.get(&query.operation) else {
        return errors::json_error(
            StatusCode::NOT_FOUND,
            "unknown_operation",
            format!("no operation named '{}'", query.operation),
        );
    };

    match services.gate.evaluator().explain(principal, &operation.requirement) {
        Ok(explanation) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "operation": operation.def(),
                "explanation": explanation,
            })),
        )
            .into_response(),
        Err(e) => errors::json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "policy_configuration_error",
            e.to_string(),
        ),
    }
}
