//! Cross-origin policy.
//!
//! Browsers refuse `*` together with credentials, and so does `CorsLayer`
//! (it panics when asked). With credentials on, a wildcard is therefore served
//! by mirroring the request's own origin, headers or method back.
//!
//! `CorsLayer` only withholds the `Access-Control-Allow-*` headers from an
//! origin it does not know; the request itself still runs. [`reject_disallowed_origin`]
//! sits in front of it and turns such cross-origin requests away with 403.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, HeaderValue, Method, Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use thiserror::Error;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};

use crate::app::errors;
use crate::config::CorsConfig;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CorsConfigError {
    #[error("no allowed origins configured")]
    NoOrigins,

    #[error("invalid allowed origin '{0}'")]
    InvalidOrigin(String),

    #[error("invalid allowed header '{0}'")]
    InvalidHeader(String),

    #[error("invalid allowed method '{0}'")]
    InvalidMethod(String),
}

pub fn cors_layer(config: &CorsConfig) -> Result<CorsLayer, CorsConfigError> {
    let credentials = config.allow_credentials;

    let origins = if config.allow_all_origins || is_wildcard(&config.allowed_origins) {
        if credentials {
            AllowOrigin::mirror_request()
        } else {
            AllowOrigin::from(Any)
        }
    } else {
        if config.allowed_origins.is_empty() {
            return Err(CorsConfigError::NoOrigins);
        }
        let origins = config
            .allowed_origins
            .iter()
            .map(|o| {
                HeaderValue::from_str(o.trim_end_matches('/'))
                    .map_err(|_| CorsConfigError::InvalidOrigin(o.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        AllowOrigin::list(origins)
    };

    let headers = if is_wildcard(&config.allowed_headers) {
        if credentials {
            AllowHeaders::mirror_request()
        } else {
            AllowHeaders::from(Any)
        }
    } else {
        let headers = config
            .allowed_headers
            .iter()
            .map(|h| HeaderName::try_from(h.as_str()).map_err(|_| CorsConfigError::InvalidHeader(h.clone())))
            .collect::<Result<Vec<_>, _>>()?;
        AllowHeaders::list(headers)
    };

    let methods = if is_wildcard(&config.allowed_methods) {
        if credentials {
            AllowMethods::mirror_request()
        } else {
            AllowMethods::from(Any)
        }
    } else {
        let methods = config
            .allowed_methods
            .iter()
            .map(|m| {
                Method::from_bytes(m.to_ascii_uppercase().as_bytes())
                    .map_err(|_| CorsConfigError::InvalidMethod(m.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        AllowMethods::list(methods)
    };

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_headers(headers)
        .allow_methods(methods)
        .allow_credentials(credentials))
}

fn is_wildcard(values: &[String]) -> bool {
    values.iter().any(|v| v == "*")
}

/// The origins a cross-origin request may come from.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allow_all: bool,
    allowed: Arc<HashSet<String>>,
}

impl OriginPolicy {
    pub fn from_config(config: &CorsConfig) -> Self {
        Self {
            allow_all: config.allow_all_origins || is_wildcard(&config.allowed_origins),
            allowed: Arc::new(
                config
                    .allowed_origins
                    .iter()
                    .map(|o| o.trim_end_matches('/').to_string())
                    .collect(),
            ),
        }
    }

    pub fn allows(&self, origin: &str) -> bool {
        self.allow_all || self.allowed.contains(origin.trim_end_matches('/'))
    }
}

/// Refuse cross-origin requests (preflights included) from origins outside
/// the policy before anything behind this layer runs.
///
/// Requests without an `Origin` header, and same-origin requests, pass.
pub async fn reject_disallowed_origin(
    State(policy): State<OriginPolicy>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(origin) = req.headers().get(header::ORIGIN) else {
        return next.run(req).await;
    };

    let allowed = match origin.to_str() {
        Ok(origin) => policy.allows(origin) || is_same_origin(origin, req.headers().get(header::HOST)),
        Err(_) => false,
    };
    if allowed {
        return next.run(req).await;
    }

    tracing::info!(
        origin = ?origin,
        method = %req.method(),
        path = %req.uri().path(),
        "rejected request from disallowed origin"
    );
    errors::json_error(StatusCode::FORBIDDEN, "origin_not_allowed", "origin is not allowed")
}

fn is_same_origin(origin: &str, host: Option<&HeaderValue>) -> bool {
    let Some(host) = host.and_then(|h| h.to_str().ok()) else {
        return false;
    };
    origin
        .split_once("://")
        .is_some_and(|(_, authority)| authority.trim_end_matches('/').eq_ignore_ascii_case(host))
}
