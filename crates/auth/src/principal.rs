use core::str::FromStr;
use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{Permission, Role};

/// Identity of an authenticated principal (staff member, service account, etc).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(Uuid);

impl PrincipalId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PrincipalId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for PrincipalId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<PrincipalId> for Uuid {
    fn from(value: PrincipalId) -> Self {
        value.0
    }
}

impl FromStr for PrincipalId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// A fully resolved principal for authorization decisions.
///
/// Immutable once built. The permission set is derived from the roles by the
/// role catalog at construction time and a new `Principal` is built for every
/// request, so it can never go stale across requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    id: PrincipalId,
    roles: BTreeSet<Role>,
    permissions: BTreeSet<Permission>,
}

impl Principal {
    /// Build a principal from already-derived permissions.
    ///
    /// Production code goes through [`crate::RoleCatalog::resolve`].
    pub fn new(
        id: PrincipalId,
        roles: impl IntoIterator<Item = Role>,
        permissions: impl IntoIterator<Item = Permission>,
    ) -> Self {
        Self {
            id,
            roles: roles.into_iter().collect(),
            permissions: permissions.into_iter().collect(),
        }
    }

    pub fn id(&self) -> PrincipalId {
        self.id
    }

    pub fn roles(&self) -> &BTreeSet<Role> {
        &self.roles
    }

    pub fn permissions(&self) -> &BTreeSet<Permission> {
        &self.permissions
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }

    pub fn has_wildcard(&self) -> bool {
        self.permissions.iter().any(Permission::is_wildcard)
    }

    pub fn has_permission(&self, permission: &Permission) -> bool {
        self.has_wildcard() || self.permissions.contains(permission)
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("unauthenticated: no principal established for this operation")]
pub struct Unauthenticated;

/// Principal context for one in-flight operation.
///
/// The authentication layer establishes it exactly once per request; every
/// downstream component only reads it. Cloning shares the same principal.
#[derive(Debug, Clone, Default)]
pub struct PrincipalContext {
    principal: Option<Arc<Principal>>,
}

impl PrincipalContext {
    /// Context for an operation with no authenticated caller.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn established(principal: Principal) -> Self {
        Self {
            principal: Some(Arc::new(principal)),
        }
    }

    /// The principal of the in-flight operation.
    pub fn current(&self) -> Result<&Principal, Unauthenticated> {
        self.principal.as_deref().ok_or(Unauthenticated)
    }
}
