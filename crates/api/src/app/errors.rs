use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use hms_core::DomainError;
use hms_gate::GateError;

pub fn gate_error_to_response(err: GateError<DomainError>) -> axum::response::Response {
    match err {
        GateError::Unauthenticated(e) => json_error(StatusCode::UNAUTHORIZED, "unauthenticated", e.to_string()),
        GateError::AuthorizationDenied(reason) => {
            let body = json!({
                "error": "forbidden",
                "reason": reason.kind.as_str(),
                "message": reason.to_string(),
            });
            (StatusCode::FORBIDDEN, axum::Json(body)).into_response()
        }
        GateError::PolicyConfiguration(e) => {
            tracing::error!(error = %e, "policy configuration error reached a request");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "policy_configuration_error",
                e.to_string(),
            )
        }
        GateError::Operation(e) => domain_error_to_response(e),
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DomainError::Storage(msg) => {
            tracing::error!(error = %msg, "storage failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", msg)
        }
    }
}

/// Malformed or non-JSON request bodies, in the same shape as every other error.
pub fn json_rejection_to_response(rejection: JsonRejection) -> axum::response::Response {
    json_error(rejection.status(), "invalid_body", rejection.body_text())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
