//! `hms-auth`: principals, role catalog, requirements and the policy evaluator.
//!
//! This crate is intentionally decoupled from HTTP and storage: it decides,
//! it never executes or persists anything.

pub mod authorize;
pub mod catalog;
pub mod claims;
pub mod permissions;
pub mod principal;
pub mod requirement;
pub mod roles;

pub use authorize::{
    AuthorizationExplanation, Decision, DenialKind, DenialReason, PolicyConfigurationError,
    PolicyEvaluator,
};
pub use catalog::{CatalogError, RoleCatalog, RoleDefinition};
pub use claims::{Hs256JwtValidator, JwtClaims, JwtValidator, TokenValidationError, validate_claims};
pub use permissions::Permission;
pub use principal::{Principal, PrincipalContext, PrincipalId, Unauthenticated};
pub use requirement::Requirement;
pub use roles::Role;
