//! Role catalog: which permissions each role grants.
//!
//! The catalog is read-mostly and loaded once at startup. Principals are
//! resolved against it per request, so a principal's permission set is always
//! a pure function of its roles at that instant.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Permission, Principal, PrincipalId, Role};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read role catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid role catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("role catalog defines no roles")]
    Empty,
}

/// Role definition with its granted permissions (for display and audit).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefinition {
    pub name: Role,
    pub permissions: BTreeSet<Permission>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    roles: Vec<RoleDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleCatalog {
    roles: BTreeMap<Role, RoleDefinition>,
}

impl RoleCatalog {
    pub fn new(definitions: impl IntoIterator<Item = RoleDefinition>) -> Self {
        let roles = definitions
            .into_iter()
            .map(|d| (d.name.clone(), d))
            .collect();
        Self { roles }
    }

    /// Built-in hospital roles.
    pub fn hospital_defaults() -> Self {
        fn def(role: Role, perms: &[&'static str], description: &str) -> RoleDefinition {
            RoleDefinition {
                name: role,
                permissions: perms.iter().map(|p| Permission::new(*p)).collect(),
                description: Some(description.to_string()),
            }
        }

        Self::new([
            def(Role::ADMIN, &["*"], "Hospital administrator with all permissions"),
            def(
                Role::DOCTOR,
                &[
                    "patients.read",
                    "patients.write",
                    "doctors.read",
                    "medicines.read",
                    "beds.read",
                    "hospitals.read",
                ],
                "Physician with patient record access",
            ),
            def(
                Role::NURSE,
                &[
                    "patients.read",
                    "medicines.read",
                    "beds.read",
                    "beds.write",
                    "hospitals.read",
                ],
                "Nursing staff with ward and bed management",
            ),
            def(
                Role::RECEPTIONIST,
                &[
                    "patients.read",
                    "patients.write",
                    "doctors.read",
                    "doctors.write",
                    "beds.read",
                    "hospitals.read",
                ],
                "Front desk staff registering patients and staff",
            ),
            def(
                Role::PHARMACIST,
                &["medicines.read", "medicines.write"],
                "Pharmacy staff managing the medicine stock",
            ),
        ])
    }

    /// Parse a catalog from JSON: `{"roles": [{"name": .., "permissions": [..]}]}`.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        if file.roles.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok(Self::new(file.roles))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Self::from_json(&json)?;
        tracing::debug!(path = %path.display(), roles = catalog.roles.len(), "loaded role catalog");
        Ok(catalog)
    }

    /// Build the principal for one request from its asserted roles.
    ///
    /// Roles the catalog does not know grant nothing but are kept on the
    /// principal, so role requirements still see them.
    pub fn resolve(&self, id: PrincipalId, roles: impl IntoIterator<Item = Role>) -> Principal {
        let roles: BTreeSet<Role> = roles.into_iter().collect();
        let permissions: BTreeSet<Permission> = roles
            .iter()
            .filter_map(|r| self.roles.get(r))
            .flat_map(|d| d.permissions.iter().cloned())
            .collect();
        Principal::new(id, roles, permissions)
    }

    pub fn contains_role(&self, role: &Role) -> bool {
        self.roles.contains_key(role)
    }

    /// Whether some role lists the permission explicitly.
    ///
    /// The wildcard does not count here; otherwise any made-up permission
    /// would look known.
    pub fn defines_permission(&self, permission: &Permission) -> bool {
        self.roles
            .values()
            .any(|d| d.permissions.contains(permission))
    }

    /// Roles whose grants include the permission (explicitly or by wildcard).
    pub fn roles_granting(&self, permission: &Permission) -> Vec<&Role> {
        self.roles
            .values()
            .filter(|d| {
                d.permissions.contains(permission) || d.permissions.iter().any(Permission::is_wildcard)
            })
            .map(|d| &d.name)
            .collect()
    }

    pub fn role(&self, role: &Role) -> Option<&RoleDefinition> {
        self.roles.get(role)
    }

    pub fn roles(&self) -> impl Iterator<Item = &RoleDefinition> {
        self.roles.values()
    }
}

impl Default for RoleCatalog {
    fn default() -> Self {
        Self::hospital_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_derives_union_of_role_grants() {
        let catalog = RoleCatalog::hospital_defaults();
        let p = catalog.resolve(PrincipalId::new(), [Role::NURSE, Role::PHARMACIST]);

        let perms: Vec<_> = p.permissions().iter().map(|p| p.as_str()).collect();
        assert_eq!(
            perms,
            vec![
                "beds.read",
                "beds.write",
                "hospitals.read",
                "medicines.read",
                "medicines.write",
                "patients.read"
            ]
        );
    }

    #[test]
    fn unknown_roles_grant_nothing_but_are_kept() {
        let catalog = RoleCatalog::hospital_defaults();
        let p = catalog.resolve(PrincipalId::new(), [Role::new("JANITOR")]);

        assert!(p.permissions().is_empty());
        assert!(p.has_role(&Role::new("JANITOR")));
    }

    #[test]
    fn wildcard_does_not_define_permissions() {
        let catalog = RoleCatalog::hospital_defaults();
        assert!(catalog.defines_permission(&Permission::new("beds.write")));
        assert!(!catalog.defines_permission(&Permission::new("made.up")));
    }

    #[test]
    fn every_collection_write_permission_is_granted_explicitly() {
        let catalog = RoleCatalog::hospital_defaults();
        for perm in ["patients.write", "doctors.write", "medicines.write", "beds.write"] {
            assert!(
                catalog.defines_permission(&Permission::new(perm)),
                "{perm} is only reachable through the wildcard"
            );
        }

        let roles: Vec<_> = catalog
            .roles_granting(&Permission::new("doctors.write"))
            .into_iter()
            .map(|r| r.as_str())
            .collect();
        assert_eq!(roles, vec!["ADMIN", "RECEPTIONIST"]);
    }

    #[test]
    fn roles_granting_includes_wildcard_holders() {
        let catalog = RoleCatalog::hospital_defaults();
        let roles: Vec<_> = catalog
            .roles_granting(&Permission::new("medicines.write"))
            .into_iter()
            .map(|r| r.as_str())
            .collect();
        assert_eq!(roles, vec!["ADMIN", "PHARMACIST"]);
    }

    #[test]
    fn from_json_parses_and_rejects_empty() {
        let catalog = RoleCatalog::from_json(
            r#"{"roles": [{"name": "CLERK", "permissions": ["patients.read"]}]}"#,
        )
        .unwrap();
        assert!(catalog.contains_role(&Role::new("CLERK")));
        assert!(!catalog.contains_role(&Role::ADMIN));

        assert!(matches!(
            RoleCatalog::from_json(r#"{"roles": []}"#),
            Err(CatalogError::Empty)
        ));
        assert!(matches!(
            RoleCatalog::from_json("not json"),
            Err(CatalogError::Parse(_))
        ));
    }
}
