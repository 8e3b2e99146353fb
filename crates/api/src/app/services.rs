//! Service wiring: role catalog, evaluator, operation registry, audit, gate.

use std::sync::Arc;

use anyhow::Context;

use hms_audit::{AuditRecorder, AuditStore, InMemoryAuditStore, TracingFailureSink};
use hms_auth::{PolicyEvaluator, RoleCatalog};
use hms_gate::{Gate, OperationRegistry};

use crate::app::operations::{self, RouteOperations};
use crate::app::records::RecordStore;
use crate::config::{AppConfig, StorageConfig};

/// Everything the handlers need, shared behind one `Arc`.
pub struct AppServices {
    pub catalog: Arc<RoleCatalog>,
    pub gate: Gate,
    pub registry: OperationRegistry,
    pub operations: RouteOperations,
    pub records: Arc<RecordStore>,
    pub audit: Arc<dyn AuditStore>,
}

impl core::fmt::Debug for AppServices {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppServices")
            .field("operations", &self.registry.len())
            .finish_non_exhaustive()
    }
}

/// Build the services in dependency order, failing fast on any bad input.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let catalog = Arc::new(load_catalog(config)?);
    let evaluator = Arc::new(PolicyEvaluator::new(catalog.clone()));

    let registry = OperationRegistry::build(&evaluator, operations::declared_operations())
        .context("operation registry failed validation")?;
    let route_operations = RouteOperations::resolve(&registry).context("route operation lookup")?;
    tracing::info!(operations = registry.len(), "operation registry validated");

    let audit = audit_store(&config.storage).await?;
    let recorder = AuditRecorder::new(audit.clone(), Arc::new(TracingFailureSink::new()));
    let gate = Gate::new(evaluator, recorder);

    Ok(AppServices {
        catalog,
        gate,
        registry,
        operations: route_operations,
        records: Arc::new(RecordStore::new()),
        audit,
    })
}

fn load_catalog(config: &AppConfig) -> anyhow::Result<RoleCatalog> {
    match &config.role_catalog {
        Some(path) => {
            let catalog = RoleCatalog::from_json_file(path)
                .with_context(|| format!("failed to load role catalog from {}", path.display()))?;
            tracing::info!(path = %path.display(), roles = catalog.roles().count(), "role catalog loaded");
            Ok(catalog)
        }
        None => Ok(RoleCatalog::hospital_defaults()),
    }
}

async fn audit_store(storage: &StorageConfig) -> anyhow::Result<Arc<dyn AuditStore>> {
    match storage {
        StorageConfig::InMemory => {
            tracing::info!("using in-memory audit store");
            Ok(Arc::new(InMemoryAuditStore::new()))
        }
        StorageConfig::Postgres { database_url } => postgres_store(database_url).await,
    }
}

#[cfg(feature = "postgres")]
async fn postgres_store(database_url: &str) -> anyhow::Result<Arc<dyn AuditStore>> {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .context("failed to connect to DATABASE_URL")?;

    let store = hms_audit::PostgresAuditStore::new(pool);
    store
        .ensure_schema()
        .await
        .context("failed to create audit schema")?;

    tracing::info!("using postgres audit store");
    Ok(Arc::new(store))
}

#[cfg(not(feature = "postgres"))]
async fn postgres_store(_database_url: &str) -> anyhow::Result<Arc<dyn AuditStore>> {
    anyhow::bail!("USE_PERSISTENT_STORES requires building hms-api with the `postgres` feature")
}
