//! Operation registry: every gated operation, validated up front.
//!
//! The gate only accepts [`RegisteredOperation`]s, and those can only come out
//! of [`OperationRegistry::build`], so a malformed requirement is a startup
//! failure rather than a per-request one.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use hms_auth::{PolicyConfigurationError, PolicyEvaluator};
use hms_core::OperationId;

use crate::OperationDef;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("operation '{0}' is declared more than once")]
    Duplicate(OperationId),

    #[error("operation '{operation}' has an invalid requirement: {source}")]
    InvalidRequirement {
        operation: OperationId,
        #[source]
        source: PolicyConfigurationError,
    },

    #[error("operation '{0}' is not registered")]
    Unknown(OperationId),
}

/// An operation definition that passed startup validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredOperation(Arc<OperationDef>);

impl RegisteredOperation {
    pub fn def(&self) -> &OperationDef {
        &self.0
    }
}

impl core::ops::Deref for RegisteredOperation {
    type Target = OperationDef;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct OperationRegistry {
    operations: BTreeMap<OperationId, RegisteredOperation>,
}

impl OperationRegistry {
    /// Validate every definition against the evaluator's catalog.
    ///
    /// Fails on the first duplicate id or invalid requirement.
    pub fn build(
        evaluator: &PolicyEvaluator,
        definitions: impl IntoIterator<Item = OperationDef>,
    ) -> Result<Self, RegistryError> {
        let mut operations = BTreeMap::new();

        for def in definitions {
            if operations.contains_key(&def.id) {
                return Err(RegistryError::Duplicate(def.id));
            }
            evaluator
                .validate(&def.requirement)
                .map_err(|source| RegistryError::InvalidRequirement {
                    operation: def.id.clone(),
                    source,
                })?;

            tracing::debug!(operation = %def.id, requirement = %def.requirement, "operation registered");
            operations.insert(def.id.clone(), RegisteredOperation(Arc::new(def)));
        }

        Ok(Self { operations })
    }

    pub fn get(&self, id: &str) -> Option<&RegisteredOperation> {
        self.operations.get(&OperationId::new(id.to_string()))
    }

    /// Like [`Self::get`], for wiring code that expects the operation to exist.
    pub fn require(&self, id: &str) -> Result<RegisteredOperation, RegistryError> {
        self.get(id)
            .cloned()
            .ok_or_else(|| RegistryError::Unknown(OperationId::new(id.to_string())))
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredOperation> {
        self.operations.values()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hms_auth::{Requirement, Role, RoleCatalog};

    fn evaluator() -> PolicyEvaluator {
        PolicyEvaluator::new(Arc::new(RoleCatalog::hospital_defaults()))
    }

    #[test]
    fn builds_and_looks_up_valid_operations() {
        let registry = OperationRegistry::build(
            &evaluator(),
            [
                OperationDef::create("beds.create", Requirement::permission("beds.write")),
                OperationDef::read("beds.list", Requirement::permission("beds.read")),
            ],
        )
        .unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.get("beds.create").is_some());
        assert!(matches!(registry.require("beds.purge"), Err(RegistryError::Unknown(_))));
    }

    #[test]
    fn rejects_duplicates() {
        let err = OperationRegistry::build(
            &evaluator(),
            [
                OperationDef::read("beds.list", Requirement::permission("beds.read")),
                OperationDef::read("beds.list", Requirement::any_role([Role::ADMIN])),
            ],
        )
        .unwrap_err();

        assert_eq!(err, RegistryError::Duplicate(OperationId::new("beds.list")));
    }

    #[test]
    fn rejects_malformed_and_unknown_requirements() {
        let err = OperationRegistry::build(
            &evaluator(),
            [OperationDef::delete("beds.delete", Requirement::any_role([]))],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::InvalidRequirement { source: PolicyConfigurationError::EmptyRoleSet, .. }
        ));

        let err = OperationRegistry::build(
            &evaluator(),
            [OperationDef::read("billing.list", Requirement::permission("billing.read"))],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::InvalidRequirement { source: PolicyConfigurationError::UnknownPermission(_), .. }
        ));
    }
}
