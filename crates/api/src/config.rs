//! Process configuration, read once at startup from the environment.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `HMS_BIND_ADDR` | `0.0.0.0:8080` |
//! | `JWT_SECRET` | insecure dev value (warns) |
//! | `HMS_ROLE_CATALOG` | built-in hospital roles |
//! | `HMS_CORS_ALLOW_ALL_ORIGINS` | `false` |
//! | `HMS_CORS_ALLOWED_ORIGINS` | `http://localhost:5173` |
//! | `HMS_CORS_ALLOWED_HEADERS` | `*` |
//! | `HMS_CORS_ALLOWED_METHODS` | `*` |
//! | `HMS_CORS_ALLOW_CREDENTIALS` | `true` |
//! | `USE_PERSISTENT_STORES` | `false` |
//! | `DATABASE_URL` | required when persistent stores are on |

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};

const DEV_JWT_SECRET: &str = "dev-secret";
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:5173";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    /// JSON role catalog; `None` means the built-in hospital roles.
    pub role_catalog: Option<PathBuf>,
    pub cors: CorsConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    InMemory,
    Postgres { database_url: String },
}

/// Cross-origin policy applied to every inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsConfig {
    pub allow_all_origins: bool,
    pub allowed_origins: Vec<String>,
    /// `*` allows any header.
    pub allowed_headers: Vec<String>,
    /// `*` allows any method.
    pub allowed_methods: Vec<String>,
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_all_origins: false,
            allowed_origins: vec![DEFAULT_ALLOWED_ORIGIN.to_string()],
            allowed_headers: vec!["*".to_string()],
            allowed_methods: vec!["*".to_string()],
            allow_credentials: true,
        }
    }
}

impl AppConfig {
    /// In-memory stores, built-in roles, default CORS policy.
    pub fn development(jwt_secret: impl Into<String>) -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            jwt_secret: jwt_secret.into(),
            role_catalog: None,
            cors: CorsConfig::default(),
            storage: StorageConfig::InMemory,
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let bind_addr = match non_empty(lookup("HMS_BIND_ADDR")) {
            Some(addr) => addr
                .parse()
                .with_context(|| format!("HMS_BIND_ADDR '{addr}' is not a socket address"))?,
            None => SocketAddr::from(([0, 0, 0, 0], 8080)),
        };

        let jwt_secret = non_empty(lookup("JWT_SECRET")).unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let defaults = CorsConfig::default();
        let cors = CorsConfig {
            allow_all_origins: parse_bool(&lookup, "HMS_CORS_ALLOW_ALL_ORIGINS", defaults.allow_all_origins)?,
            allowed_origins: non_empty(lookup("HMS_CORS_ALLOWED_ORIGINS"))
                .map(|v| split_list(&v))
                .unwrap_or(defaults.allowed_origins),
            allowed_headers: non_empty(lookup("HMS_CORS_ALLOWED_HEADERS"))
                .map(|v| split_list(&v))
                .unwrap_or(defaults.allowed_headers),
            allowed_methods: non_empty(lookup("HMS_CORS_ALLOWED_METHODS"))
                .map(|v| split_list(&v))
                .unwrap_or(defaults.allowed_methods),
            allow_credentials: parse_bool(&lookup, "HMS_CORS_ALLOW_CREDENTIALS", defaults.allow_credentials)?,
        };

        let storage = if parse_bool(&lookup, "USE_PERSISTENT_STORES", false)? {
            let Some(database_url) = non_empty(lookup("DATABASE_URL")) else {
                bail!("USE_PERSISTENT_STORES is set but DATABASE_URL is missing");
            };
            StorageConfig::Postgres { database_url }
        } else {
            StorageConfig::InMemory
        };

        Ok(Self {
            bind_addr,
            jwt_secret,
            role_catalog: non_empty(lookup("HMS_ROLE_CATALOG")).map(PathBuf::from),
            cors,
            storage,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> anyhow::Result<bool> {
    match non_empty(lookup(key)) {
        None => Ok(default),
        Some(v) => match v.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => bail!("{key} must be a boolean, got '{v}'"),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr, SocketAddr::from(([0, 0, 0, 0], 8080)));
        assert_eq!(cfg.cors, CorsConfig::default());
        assert_eq!(cfg.storage, StorageConfig::InMemory);
        assert!(cfg.role_catalog.is_none());
    }

    #[test]
    fn reads_cors_lists() {
        let cfg = config(&[
            ("HMS_CORS_ALLOWED_ORIGINS", "https://ward.example, https://desk.example"),
            ("HMS_CORS_ALLOWED_METHODS", "GET,POST"),
            ("HMS_CORS_ALLOW_CREDENTIALS", "false"),
        ])
        .unwrap();

        assert_eq!(
            cfg.cors.allowed_origins,
            vec!["https://ward.example".to_string(), "https://desk.example".to_string()]
        );
        assert_eq!(cfg.cors.allowed_methods, vec!["GET".to_string(), "POST".to_string()]);
        assert_eq!(cfg.cors.allowed_headers, vec!["*".to_string()]);
        assert!(!cfg.cors.allow_credentials);
    }

    #[test]
    fn invalid_values_fail_startup() {
        assert!(config(&[("HMS_BIND_ADDR", "not-an-addr")]).is_err());
        assert!(config(&[("HMS_CORS_ALLOW_CREDENTIALS", "maybe")]).is_err());
        assert!(config(&[("USE_PERSISTENT_STORES", "true")]).is_err());
    }

    #[test]
    fn persistent_stores_need_a_database_url() {
        let cfg = config(&[
            ("USE_PERSISTENT_STORES", "true"),
            ("DATABASE_URL", "postgres://localhost/hms"),
        ])
        .unwrap();
        assert_eq!(
            cfg.storage,
            StorageConfig::Postgres {
                database_url: "postgres://localhost/hms".to_string()
            }
        );
    }
}
