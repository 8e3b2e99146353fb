use axum::{Extension, Json, http::StatusCode, response::IntoResponse};

use hms_auth::PrincipalContext;

use crate::app::errors;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(ctx): Extension<PrincipalContext>) -> axum::response::Response {
    let principal = match ctx.current() {
        Ok(p) => p,
        Err(e) => return errors::json_error(StatusCode::UNAUTHORIZED, "unauthenticated", e.to_string()),
    };

    Json(serde_json::json!({
        "principal_id": principal.id().to_string(),
        "roles": principal.roles().iter().map(|r| r.as_str()).collect::<Vec<_>>(),
        "permissions": principal.permissions().iter().map(|p| p.as_str()).collect::<Vec<_>>(),
    }))
    .into_response()
}
