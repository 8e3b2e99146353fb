use axum::{Router, routing::get};

pub mod audit;
pub mod collections;
pub mod rbac;
pub mod system;

/// Routes behind authentication.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/audit", get(audit::list_audit_records))
        .nest("/rbac", rbac::router())
        .route(
            "/:collection",
            get(collections::list_records).post(collections::create_record),
        )
        .route(
            "/:collection/:id",
            get(collections::get_record)
                .put(collections::update_record)
                .delete(collections::delete_record),
        )
}
