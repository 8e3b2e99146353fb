//! In-memory document store for the hospital collections.
//!
//! Documents are free-form JSON objects. The store owns `id` and the audit
//! stamp; callers cannot set either through the body.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use hms_audit::AuditStamp;
use hms_auth::PrincipalId;
use hms_core::{DomainError, DomainResult, RecordId};

use crate::app::operations::Collection;

const RESERVED_FIELDS: [&str; 3] = ["id", "collection", "audit"];

type Documents = HashMap<Collection, BTreeMap<RecordId, StoredDocument>>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredDocument {
    pub id: RecordId,
    pub collection: Collection,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    pub audit: AuditStamp,
}

#[derive(Debug, Default)]
pub struct RecordStore {
    inner: RwLock<Documents>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(
        &self,
        collection: Collection,
        id: RecordId,
        body: Value,
        actor: PrincipalId,
        at: DateTime<Utc>,
    ) -> DomainResult<StoredDocument> {
        let fields = into_fields(body)?;
        let doc = StoredDocument {
            id,
            collection,
            fields,
            audit: AuditStamp::created(actor, at),
        };

        let mut guard = self.write()?;
        let docs = guard.entry(collection).or_default();
        if docs.contains_key(&id) {
            return Err(DomainError::conflict(format!("{collection}/{id} already exists")));
        }
        docs.insert(id, doc.clone());
        Ok(doc)
    }

    pub fn get(&self, collection: Collection, id: RecordId) -> DomainResult<StoredDocument> {
        self.read()?
            .get(&collection)
            .and_then(|docs| docs.get(&id))
            .cloned()
            .ok_or(DomainError::NotFound)
    }

    /// All documents of a collection, ordered by id (UUIDv7, so oldest first).
    pub fn list(&self, collection: Collection) -> DomainResult<Vec<StoredDocument>> {
        Ok(self
            .read()?
            .get(&collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    /// Replace a document's fields; creation facts survive.
    pub fn update(
        &self,
        collection: Collection,
        id: RecordId,
        body: Value,
        actor: PrincipalId,
        at: DateTime<Utc>,
    ) -> DomainResult<StoredDocument> {
        let fields = into_fields(body)?;

        let mut guard = self.write()?;
        let doc = guard
            .get_mut(&collection)
            .and_then(|docs| docs.get_mut(&id))
            .ok_or(DomainError::NotFound)?;
        doc.fields = fields;
        doc.audit = doc.audit.touched(actor, at);
        Ok(doc.clone())
    }

    pub fn delete(&self, collection: Collection, id: RecordId) -> DomainResult<StoredDocument> {
        self.write()?
            .get_mut(&collection)
            .and_then(|docs| docs.remove(&id))
            .ok_or(DomainError::NotFound)
    }

    fn read(&self) -> DomainResult<RwLockReadGuard<'_, Documents>> {
        self.inner
            .read()
            .map_err(|_| DomainError::storage("record store lock poisoned"))
    }

    fn write(&self) -> DomainResult<RwLockWriteGuard<'_, Documents>> {
        self.inner
            .write()
            .map_err(|_| DomainError::storage("record store lock poisoned"))
    }
}

fn into_fields(body: Value) -> DomainResult<Map<String, Value>> {
    let Value::Object(fields) = body else {
        return Err(DomainError::validation("body must be a JSON object"));
    };
    if let Some(field) = RESERVED_FIELDS.iter().find(|f| fields.contains_key(**f)) {
        return Err(DomainError::validation(format!("field '{field}' is managed by the server")));
    }
    Ok(fields)
}
