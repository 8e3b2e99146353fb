use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{Permission, Role};

/// A declared constraint an operation demands of its caller.
///
/// Requirements are plain data attached to an operation definition; they are
/// never mutated after registration. Sets are ordered so evaluation and error
/// messages are deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "of", rename_all = "snake_case")]
pub enum Requirement {
    /// Satisfied when the principal holds at least one of the roles.
    AnyRole(BTreeSet<Role>),

    /// Satisfied when the principal holds every one of the permissions.
    AllPermissions(BTreeSet<Permission>),

    /// Conjunction; sub-requirements are checked in declaration order.
    All(Vec<Requirement>),

    /// Disjunction; sub-requirements are checked in declaration order.
    Any(Vec<Requirement>),
}

impl Requirement {
    pub fn any_role(roles: impl IntoIterator<Item = Role>) -> Self {
        Self::AnyRole(roles.into_iter().collect())
    }

    pub fn all_permissions(permissions: impl IntoIterator<Item = Permission>) -> Self {
        Self::AllPermissions(permissions.into_iter().collect())
    }

    pub fn permission(permission: impl Into<std::borrow::Cow<'static, str>>) -> Self {
        Self::all_permissions([Permission::new(permission)])
    }

    pub fn all(requirements: impl IntoIterator<Item = Requirement>) -> Self {
        Self::All(requirements.into_iter().collect())
    }

    pub fn any(requirements: impl IntoIterator<Item = Requirement>) -> Self {
        Self::Any(requirements.into_iter().collect())
    }

    /// Conjoin with another requirement.
    pub fn and(self, other: Requirement) -> Self {
        match self {
            Self::All(mut parts) => {
                parts.push(other);
                Self::All(parts)
            }
            first => Self::All(vec![first, other]),
        }
    }

    /// Disjoin with another requirement.
    pub fn or(self, other: Requirement) -> Self {
        match self {
            Self::Any(mut parts) => {
                parts.push(other);
                Self::Any(parts)
            }
            first => Self::Any(vec![first, other]),
        }
    }

    /// Every role mentioned anywhere in the tree.
    pub fn roles(&self) -> BTreeSet<&Role> {
        let mut out = BTreeSet::new();
        self.walk(&mut |r| {
            if let Self::AnyRole(roles) = r {
                out.extend(roles.iter());
            }
        });
        out
    }

    /// Every permission mentioned anywhere in the tree.
    pub fn permissions(&self) -> BTreeSet<&Permission> {
        let mut out = BTreeSet::new();
        self.walk(&mut |r| {
            if let Self::AllPermissions(perms) = r {
                out.extend(perms.iter());
            }
        });
        out
    }

    pub(crate) fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Requirement)) {
        f(self);
        if let Self::All(parts) | Self::Any(parts) = self {
            for part in parts {
                part.walk(f);
            }
        }
    }
}

impl core::fmt::Display for Requirement {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        fn join<T: ToString>(items: impl IntoIterator<Item = T>, sep: &str) -> String {
            items
                .into_iter()
                .map(|i| i.to_string())
                .collect::<Vec<_>>()
                .join(sep)
        }

        match self {
            Self::AnyRole(roles) => write!(f, "any role of {{{}}}", join(roles, ", ")),
            Self::AllPermissions(perms) => write!(f, "all permissions of {{{}}}", join(perms, ", ")),
            Self::All(parts) => write!(f, "({})", join(parts, " AND ")),
            Self::Any(parts) => write!(f, "({})", join(parts, " OR ")),
        }
    }
}
