//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: role catalog, evaluator, operation registry, audit store, gate
//! - `operations.rs`: every gated operation and its requirement
//! - `records.rs`: the hospital document collections
//! - `routes/`: HTTP handlers (one file per area)
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use anyhow::Context;
use axum::{Extension, Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::{cors, middleware};

pub mod errors;
pub mod operations;
pub mod records;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// Layering, outermost first: origin check, CORS, request tracing,
/// authentication, then the gate inside each handler.
pub async fn build_app(config: &AppConfig) -> anyhow::Result<Router> {
    let cors = cors::cors_layer(&config.cors).context("invalid CORS configuration")?;
    let origins = cors::OriginPolicy::from_config(&config.cors);
    let services = Arc::new(services::build_services(config).await?);

    let jwt = Arc::new(hms_auth::Hs256JwtValidator::new(config.jwt_secret.clone().into_bytes()));
    let auth_state = middleware::AuthState {
        jwt,
        catalog: services.catalog.clone(),
    };

    let protected = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Ok(Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum::middleware::from_fn_with_state(
            origins,
            cors::reject_disallowed_origin,
        )))
}
