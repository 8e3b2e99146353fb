use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role identifier used for RBAC.
///
/// Roles are opaque, case-sensitive strings at this layer (`"NURSE"`,
/// `"ADMIN"`); mapping roles to permissions is the role catalog's job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const ADMIN: Role = Role(Cow::Borrowed("ADMIN"));
    pub const DOCTOR: Role = Role(Cow::Borrowed("DOCTOR"));
    pub const NURSE: Role = Role(Cow::Borrowed("NURSE"));
    pub const RECEPTIONIST: Role = Role(Cow::Borrowed("RECEPTIONIST"));
    pub const PHARMACIST: Role = Role(Cow::Borrowed("PHARMACIST"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
