//! Every operation the HTTP surface exposes, with its requirement.
//!
//! Registered once at startup; a bad requirement stops the process before it
//! serves a single request.

use serde::Serialize;

use hms_auth::{Permission, Requirement, Role};
use hms_gate::{OperationDef, OperationRegistry, RegisteredOperation, RegistryError};

pub const AUDIT_LIST: &str = "audit.list";
pub const RBAC_ROLES: &str = "rbac.roles";

/// A hospital resource collection.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Patients,
    Doctors,
    Medicines,
    Beds,
    Hospitals,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Patients,
        Collection::Doctors,
        Collection::Medicines,
        Collection::Beds,
        Collection::Hospitals,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Patients => "patients",
            Collection::Doctors => "doctors",
            Collection::Medicines => "medicines",
            Collection::Beds => "beds",
            Collection::Hospitals => "hospitals",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }

    fn read_permission(&self) -> Permission {
        Permission::new(format!("{}.read", self.as_str()))
    }

    fn write_permission(&self) -> Permission {
        Permission::new(format!("{}.write", self.as_str()))
    }

    fn operation(&self, action: &str) -> String {
        format!("{}.{action}", self.as_str())
    }

    fn write_requirement(&self) -> Requirement {
        match self {
            // Hospitals are registered by administrators only.
            Collection::Hospitals => Requirement::any_role([Role::ADMIN]),
            _ => Requirement::all_permissions([self.write_permission()]),
        }
    }

    fn delete_requirement(&self) -> Requirement {
        let admin = Requirement::any_role([Role::ADMIN]);
        match self {
            // Nurses turn beds over between patients.
            Collection::Beds => admin.or(Requirement::all_permissions([self.write_permission()])),
            _ => admin,
        }
    }

    fn definitions(&self) -> Vec<OperationDef> {
        let read = || Requirement::all_permissions([self.read_permission()]);
        let write = || self.write_requirement();

        vec![
            OperationDef::create(self.operation("create"), write()),
            OperationDef::read(self.operation("list"), read()),
            OperationDef::read(self.operation("get"), read()),
            OperationDef::update(self.operation("update"), write()),
            OperationDef::delete(self.operation("delete"), self.delete_requirement()),
        ]
    }
}

impl core::fmt::Display for Collection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn declared_operations() -> Vec<OperationDef> {
    let admin_only = || Requirement::any_role([Role::ADMIN]);

    let mut defs: Vec<OperationDef> = Collection::ALL
        .iter()
        .flat_map(Collection::definitions)
        .collect();
    defs.push(OperationDef::read(AUDIT_LIST, admin_only()));
    defs.push(OperationDef::read(RBAC_ROLES, admin_only()));
    defs
}

/// Registered handles for one collection's CRUD operations.
#[derive(Debug, Clone)]
pub struct CollectionOperations {
    pub create: RegisteredOperation,
    pub list: RegisteredOperation,
    pub get: RegisteredOperation,
    pub update: RegisteredOperation,
    pub delete: RegisteredOperation,
}

impl CollectionOperations {
    fn resolve(registry: &OperationRegistry, collection: Collection) -> Result<Self, RegistryError> {
        let op = |action: &str| registry.require(&collection.operation(action));
        Ok(Self {
            create: op("create")?,
            list: op("list")?,
            get: op("get")?,
            update: op("update")?,
            delete: op("delete")?,
        })
    }
}

/// Registered handles for every route, looked up once at startup.
#[derive(Debug, Clone)]
pub struct RouteOperations {
    patients: CollectionOperations,
    doctors: CollectionOperations,
    medicines: CollectionOperations,
    beds: CollectionOperations,
    hospitals: CollectionOperations,
    pub audit_list: RegisteredOperation,
    pub rbac_roles: RegisteredOperation,
}

impl RouteOperations {
    pub fn resolve(registry: &OperationRegistry) -> Result<Self, RegistryError> {
        Ok(Self {
            patients: CollectionOperations::resolve(registry, Collection::Patients)?,
            doctors: CollectionOperations::resolve(registry, Collection::Doctors)?,
            medicines: CollectionOperations::resolve(registry, Collection::Medicines)?,
            beds: CollectionOperations::resolve(registry, Collection::Beds)?,
            hospitals: CollectionOperations::resolve(registry, Collection::Hospitals)?,
            audit_list: registry.require(AUDIT_LIST)?,
            rbac_roles: registry.require(RBAC_ROLES)?,
        })
    }

    pub fn collection(&self, collection: Collection) -> &CollectionOperations {
        match collection {
            Collection::Patients => &self.patients,
            Collection::Doctors => &self.doctors,
            Collection::Medicines => &self.medicines,
            Collection::Beds => &self.beds,
            Collection::Hospitals => &self.hospitals,
        }
    }
}
