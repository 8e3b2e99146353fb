use std::collections::HashSet;
use std::sync::RwLock;

use async_trait::async_trait;

use hms_core::AuditRecordId;

use super::{AuditFilter, AuditStore, AuditStoreError};
use crate::AuditRecord;

#[derive(Debug, Default)]
struct Inner {
    records: Vec<AuditRecord>,
    ids: HashSet<AuditRecordId>,
}

/// In-memory append-only audit store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    inner: RwLock<Inner>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record, in append order.
    pub fn all(&self) -> Vec<AuditRecord> {
        self.inner
            .read()
            .map(|inner| inner.records.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|inner| inner.records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn append(&self, record: AuditRecord) -> Result<(), AuditStoreError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| AuditStoreError::Unavailable("lock poisoned".to_string()))?;

        if !inner.ids.insert(record.id) {
            return Err(AuditStoreError::Duplicate(record.id.to_string()));
        }
        inner.records.push(record);
        Ok(())
    }

    async fn list(&self, filter: &AuditFilter) -> Result<Vec<AuditRecord>, AuditStoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| AuditStoreError::Unavailable("lock poisoned".to_string()))?;

        let matching = inner.records.iter().filter(|r| filter.matches(r)).cloned();
        Ok(match filter.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use hms_auth::PrincipalId;
    use hms_core::{OperationId, ResourceId};

    use super::*;
    use crate::AuditKind;

    fn record(op: &'static str, resource: &str, principal: PrincipalId, kind: AuditKind) -> AuditRecord {
        AuditRecord::new(OperationId::new(op), ResourceId::new(resource), principal, kind, Utc::now())
    }

    #[tokio::test]
    async fn append_rejects_duplicate_ids() {
        let store = InMemoryAuditStore::new();
        let r = record("beds.create", "beds/1", PrincipalId::new(), AuditKind::Create);

        store.append(r.clone()).await.unwrap();
        assert!(matches!(store.append(r).await, Err(AuditStoreError::Duplicate(_))));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn list_filters_and_limits() {
        let store = InMemoryAuditStore::new();
        let alice = PrincipalId::new();
        let bob = PrincipalId::new();

        store.append(record("beds.create", "beds/1", alice, AuditKind::Create)).await.unwrap();
        store.append(record("beds.update", "beds/1", bob, AuditKind::Update)).await.unwrap();
        store.append(record("patients.create", "patients/9", alice, AuditKind::Create)).await.unwrap();

        let by_resource = store
            .list(&AuditFilter { resource: Some(ResourceId::new("beds/1")), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(by_resource.len(), 2);
        assert_eq!(by_resource[0].kind, AuditKind::Create);

        let by_alice = store
            .list(&AuditFilter { principal: Some(alice), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(by_alice.len(), 2);

        let limited = store
            .list(&AuditFilter { limit: Some(1), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].operation.as_str(), "beds.create");
    }

    #[tokio::test]
    async fn concurrent_writers_all_land() {
        let store = Arc::new(InMemoryAuditStore::new());
        let principal = PrincipalId::new();

        let mut handles = Vec::new();
        for i in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let resource = format!("beds/{i}");
                store
                    .append(record("beds.update", &resource, principal, AuditKind::Update))
                    .await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        assert_eq!(store.len(), 32);
    }
}
