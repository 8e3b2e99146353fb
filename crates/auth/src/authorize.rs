use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::{Permission, Principal, PrincipalId, Requirement, Role, RoleCatalog};

/// Outcome of evaluating a requirement against a principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Deny(DenialReason),
}

impl Decision {
    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DenialKind {
    /// None of the required roles is held.
    RoleMismatch,
    /// At least one required permission is missing.
    MissingPermission,
    /// Every alternative of a disjunction was denied.
    NoAlternativeSatisfied,
}

impl DenialKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialKind::RoleMismatch => "role-mismatch",
            DenialKind::MissingPermission => "missing-permission",
            DenialKind::NoAlternativeSatisfied => "no-alternative-satisfied",
        }
    }
}

impl core::fmt::Display for DenialKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DenialReason {
    pub kind: DenialKind,
    pub message: String,
}

impl core::fmt::Display for DenialReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// A requirement that can never be evaluated meaningfully.
///
/// This is a deployment defect: operation registries validate every
/// requirement at startup so it never surfaces mid-request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyConfigurationError {
    #[error("role requirement lists no roles")]
    EmptyRoleSet,

    #[error("permission requirement lists no permissions")]
    EmptyPermissionSet,

    #[error("combinator has no sub-requirements")]
    EmptyCombinator,

    #[error("unknown role '{0}'")]
    UnknownRole(String),

    #[error("unknown permission '{0}' (no role grants it)")]
    UnknownPermission(String),
}

/// Pure decision function over (principal, requirement).
///
/// Holds the role catalog only for validation and explanations; decisions
/// read nothing but the principal and the requirement.
#[derive(Debug, Clone)]
pub struct PolicyEvaluator {
    catalog: Arc<RoleCatalog>,
}

impl PolicyEvaluator {
    pub fn new(catalog: Arc<RoleCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &RoleCatalog {
        &self.catalog
    }

    /// Decide whether the principal satisfies the requirement.
    ///
    /// - No IO
    /// - No panics
    /// - Conjunctions stop at the first deny, disjunctions at the first allow
    pub fn evaluate(
        &self,
        principal: &Principal,
        requirement: &Requirement,
    ) -> Result<Decision, PolicyConfigurationError> {
        check_structure(requirement)?;
        Ok(decide(principal, requirement))
    }

    /// Structural checks plus catalog checks (unknown roles / permissions).
    pub fn validate(&self, requirement: &Requirement) -> Result<(), PolicyConfigurationError> {
        check_structure(requirement)?;

        if let Some(role) = requirement
            .roles()
            .into_iter()
            .find(|r| !self.catalog.contains_role(r))
        {
            return Err(PolicyConfigurationError::UnknownRole(role.as_str().to_string()));
        }

        if let Some(perm) = requirement
            .permissions()
            .into_iter()
            .find(|p| !self.catalog.defines_permission(p))
        {
            return Err(PolicyConfigurationError::UnknownPermission(perm.as_str().to_string()));
        }

        Ok(())
    }

    /// Explain why a decision was made (or would be made).
    pub fn explain(
        &self,
        principal: &Principal,
        requirement: &Requirement,
    ) -> Result<AuthorizationExplanation, PolicyConfigurationError> {
        let decision = self.evaluate(principal, requirement)?;

        let suggestions = match &decision {
            Decision::Allow => Vec::new(),
            Decision::Deny(_) => self.suggestions(principal, requirement),
        };

        let reason = match &decision {
            Decision::Allow if principal.has_wildcard() && !requirement.permissions().is_empty() => {
                "principal holds the wildcard permission '*'".to_string()
            }
            Decision::Allow => format!("principal satisfies {requirement}"),
            Decision::Deny(reason) => reason.to_string(),
        };

        Ok(AuthorizationExplanation {
            requirement: requirement.clone(),
            granted: decision.is_allow(),
            reason,
            principal: PrincipalState {
                principal_id: principal.id(),
                roles: principal.roles().iter().cloned().collect(),
                effective_permissions: principal.permissions().iter().cloned().collect(),
                has_wildcard: principal.has_wildcard(),
            },
            decision,
            suggestions,
        })
    }

    fn suggestions(&self, principal: &Principal, requirement: &Requirement) -> Vec<String> {
        let mut out = Vec::new();

        let missing_roles: Vec<&Role> = requirement
            .roles()
            .into_iter()
            .filter(|r| !principal.has_role(r))
            .collect();
        if !missing_roles.is_empty() {
            out.push(format!("Assign one of the roles: {}", join(missing_roles)));
        }

        for perm in requirement
            .permissions()
            .into_iter()
            .filter(|p| !principal.has_permission(p))
        {
            let granting = self.catalog.roles_granting(perm);
            if granting.is_empty() {
                out.push(format!("No role in the catalog grants '{perm}'"));
            } else {
                out.push(format!("'{perm}' is granted by roles: {}", join(granting)));
            }
        }

        out
    }
}

/// Detailed explanation of an authorization decision.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub requirement: Requirement,
    pub granted: bool,
    pub decision: Decision,
    /// Human-readable reason for the decision.
    pub reason: String,
    pub principal: PrincipalState,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrincipalState {
    pub principal_id: PrincipalId,
    pub roles: Vec<Role>,
    pub effective_permissions: Vec<Permission>,
    pub has_wildcard: bool,
}

fn check_structure(requirement: &Requirement) -> Result<(), PolicyConfigurationError> {
    match requirement {
        Requirement::AnyRole(roles) if roles.is_empty() => Err(PolicyConfigurationError::EmptyRoleSet),
        Requirement::AllPermissions(perms) if perms.is_empty() => {
            Err(PolicyConfigurationError::EmptyPermissionSet)
        }
        Requirement::All(parts) | Requirement::Any(parts) => {
            if parts.is_empty() {
                return Err(PolicyConfigurationError::EmptyCombinator);
            }
            parts.iter().try_for_each(check_structure)
        }
        _ => Ok(()),
    }
}

fn decide(principal: &Principal, requirement: &Requirement) -> Decision {
    match requirement {
        Requirement::AnyRole(required) => {
            if required.iter().any(|r| principal.has_role(r)) {
                Decision::Allow
            } else {
                Decision::Deny(DenialReason {
                    kind: DenialKind::RoleMismatch,
                    message: format!(
                        "requires any of roles {{{}}}, principal has {{{}}}",
                        join(required),
                        join(principal.roles())
                    ),
                })
            }
        }
        Requirement::AllPermissions(required) => {
            let missing: BTreeSet<&Permission> = required
                .iter()
                .filter(|p| !principal.has_permission(p))
                .collect();
            if missing.is_empty() {
                Decision::Allow
            } else {
                Decision::Deny(DenialReason {
                    kind: DenialKind::MissingPermission,
                    message: format!("missing permissions {{{}}}", join(missing)),
                })
            }
        }
        Requirement::All(parts) => parts
            .iter()
            .map(|part| decide(principal, part))
            .find(|d| !d.is_allow())
            .unwrap_or(Decision::Allow),
        Requirement::Any(parts) => {
            let mut reasons = Vec::with_capacity(parts.len());
            for part in parts {
                match decide(principal, part) {
                    Decision::Allow => return Decision::Allow,
                    Decision::Deny(reason) => reasons.push(reason.to_string()),
                }
            }
            Decision::Deny(DenialReason {
                kind: DenialKind::NoAlternativeSatisfied,
                message: reasons.join("; "),
            })
        }
    }
}

fn join<T: core::fmt::Display>(items: impl IntoIterator<Item = T>) -> String {
    items
        .into_iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn evaluator() -> PolicyEvaluator {
        PolicyEvaluator::new(Arc::new(RoleCatalog::hospital_defaults()))
    }

    fn principal(roles: &[Role]) -> Principal {
        RoleCatalog::hospital_defaults().resolve(PrincipalId::new(), roles.iter().cloned())
    }

    #[test]
    fn nurse_is_denied_doctor_or_admin_operation() {
        let decision = evaluator()
            .evaluate(
                &principal(&[Role::NURSE]),
                &Requirement::any_role([Role::DOCTOR, Role::ADMIN]),
            )
            .unwrap();

        let Decision::Deny(reason) = decision else {
            panic!("expected deny");
        };
        assert_eq!(reason.kind, DenialKind::RoleMismatch);
        assert_eq!(reason.kind.as_str(), "role-mismatch");
    }

    #[test]
    fn role_requirement_allows_on_intersection() {
        let d = evaluator()
            .evaluate(
                &principal(&[Role::NURSE, Role::DOCTOR]),
                &Requirement::any_role([Role::DOCTOR, Role::ADMIN]),
            )
            .unwrap();
        assert_eq!(d, Decision::Allow);
    }

    #[test]
    fn permission_requirement_needs_superset() {
        let eval = evaluator();
        let nurse = principal(&[Role::NURSE]);

        let ok = Requirement::all_permissions([Permission::new("beds.read"), Permission::new("beds.write")]);
        assert_eq!(eval.evaluate(&nurse, &ok).unwrap(), Decision::Allow);

        let too_much = Requirement::all_permissions([
            Permission::new("beds.write"),
            Permission::new("patients.write"),
            Permission::new("medicines.write"),
        ]);
        let Decision::Deny(reason) = eval.evaluate(&nurse, &too_much).unwrap() else {
            panic!("expected deny");
        };
        assert_eq!(reason.kind, DenialKind::MissingPermission);
        assert_eq!(reason.message, "missing permissions {medicines.write, patients.write}");
    }

    #[test]
    fn admin_wildcard_satisfies_permission_requirements() {
        let d = evaluator()
            .evaluate(&principal(&[Role::ADMIN]), &Requirement::permission("medicines.write"))
            .unwrap();
        assert_eq!(d, Decision::Allow);
    }

    #[test]
    fn conjunction_reports_first_denial() {
        let r = Requirement::permission("patients.read")
            .and(Requirement::any_role([Role::DOCTOR]))
            .and(Requirement::permission("medicines.write"));

        let Decision::Deny(reason) = evaluator().evaluate(&principal(&[Role::NURSE]), &r).unwrap() else {
            panic!("expected deny");
        };
        assert_eq!(reason.kind, DenialKind::RoleMismatch);
    }

    #[test]
    fn disjunction_allows_on_any_branch() {
        let r = Requirement::any_role([Role::ADMIN]).or(Requirement::permission("beds.write"));
        let eval = evaluator();

        assert!(eval.evaluate(&principal(&[Role::NURSE]), &r).unwrap().is_allow());
        assert!(eval.evaluate(&principal(&[Role::ADMIN]), &r).unwrap().is_allow());

        let Decision::Deny(reason) = eval.evaluate(&principal(&[Role::PHARMACIST]), &r).unwrap() else {
            panic!("expected deny");
        };
        assert_eq!(reason.kind, DenialKind::NoAlternativeSatisfied);
        assert!(reason.message.contains("role-mismatch"));
        assert!(reason.message.contains("missing-permission"));
    }

    #[test]
    fn malformed_requirements_fail_evaluation() {
        let eval = evaluator();
        let p = principal(&[Role::ADMIN]);

        assert_eq!(
            eval.evaluate(&p, &Requirement::any_role([])),
            Err(PolicyConfigurationError::EmptyRoleSet)
        );
        assert_eq!(
            eval.evaluate(&p, &Requirement::all_permissions([])),
            Err(PolicyConfigurationError::EmptyPermissionSet)
        );
        // Malformed branch after an allowing one is still rejected.
        assert_eq!(
            eval.evaluate(&p, &Requirement::any([Requirement::any_role([Role::ADMIN]), Requirement::all([])])),
            Err(PolicyConfigurationError::EmptyCombinator)
        );
    }

    #[test]
    fn validate_rejects_unknown_roles_and_permissions() {
        let eval = evaluator();

        assert_eq!(
            eval.validate(&Requirement::any_role([Role::new("SURGEON")])),
            Err(PolicyConfigurationError::UnknownRole("SURGEON".into()))
        );
        assert_eq!(
            eval.validate(&Requirement::permission("billing.write")),
            Err(PolicyConfigurationError::UnknownPermission("billing.write".into()))
        );
        assert!(eval
            .validate(&Requirement::any_role([Role::ADMIN]).or(Requirement::permission("beds.write")))
            .is_ok());
    }

    #[test]
    fn explain_suggests_granting_roles() {
        let explanation = evaluator()
            .explain(&principal(&[Role::NURSE]), &Requirement::permission("medicines.write"))
            .unwrap();

        assert!(!explanation.granted);
        assert!(explanation
            .suggestions
            .iter()
            .any(|s| s.contains("ADMIN, PHARMACIST")));
        assert!(!explanation.principal.has_wildcard);
    }

    #[test]
    fn explain_names_the_wildcard_only_when_permissions_were_required() {
        let eval = evaluator();
        let admin = principal(&[Role::ADMIN]);

        let by_role = eval
            .explain(&admin, &Requirement::any_role([Role::ADMIN]))
            .unwrap();
        assert!(by_role.granted);
        assert!(by_role.principal.has_wildcard);
        assert!(!by_role.reason.contains("wildcard"));
        assert!(by_role.reason.contains("ADMIN"));

        let by_permission = eval
            .explain(&admin, &Requirement::permission("medicines.write"))
            .unwrap();
        assert!(by_permission.granted);
        assert!(by_permission.reason.contains("wildcard"));
    }

    fn arb_roles() -> impl Strategy<Value = Vec<Role>> {
        prop::collection::vec(
            prop::sample::select(vec![
                Role::ADMIN,
                Role::DOCTOR,
                Role::NURSE,
                Role::RECEPTIONIST,
                Role::PHARMACIST,
            ]),
            0..4,
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: role requirements allow iff the role sets intersect,
        /// regardless of the order roles were supplied in.
        #[test]
        fn role_decision_matches_intersection(held in arb_roles(), required in arb_roles()) {
            prop_assume!(!required.is_empty());
            let eval = evaluator();
            let p = principal(&held);
            let mut reversed = required.clone();
            reversed.reverse();

            let d1 = eval.evaluate(&p, &Requirement::any_role(required.clone())).unwrap();
            let d2 = eval.evaluate(&p, &Requirement::any_role(reversed)).unwrap();

            let expected = required.iter().any(|r| held.contains(r));
            prop_assert_eq!(d1.is_allow(), expected);
            prop_assert_eq!(d1, d2);
        }

        /// Property: evaluating the same pair twice yields the same decision.
        #[test]
        fn evaluation_is_idempotent(held in arb_roles(), a in arb_roles(), b in arb_roles()) {
            prop_assume!(!a.is_empty() && !b.is_empty());
            let eval = evaluator();
            let p = principal(&held);
            let r = Requirement::any_role(a).and(Requirement::any_role(b).or(Requirement::permission("beds.write")));

            let first = eval.evaluate(&p, &r).unwrap();
            let second = eval.evaluate(&p, &r).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
