//! The gate: authorize, execute, audit.
//!
//! Per invocation the gate walks a fixed state machine:
//!
//! ```text
//! Received -> Authorizing -> Denied
//!                         -> Authorized -> Executing -> Failed
//!                                                    -> Succeeded -> Audited
//! ```
//!
//! Authorizing always finishes before Executing starts. Domain errors come
//! back untouched. Audit writes are best-effort and never fail the caller.

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tracing::Instrument;

use hms_audit::AuditRecorder;
use hms_auth::{
    Decision, DenialReason, PolicyConfigurationError, PolicyEvaluator, PrincipalContext, PrincipalId,
    Unauthenticated,
};
use hms_core::ResourceId;

use crate::RegisteredOperation;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GateStage {
    Received,
    Authorizing,
    Denied,
    Authorized,
    Executing,
    Failed,
    Succeeded,
    Audited,
}

impl GateStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateStage::Received => "received",
            GateStage::Authorizing => "authorizing",
            GateStage::Denied => "denied",
            GateStage::Authorized => "authorized",
            GateStage::Executing => "executing",
            GateStage::Failed => "failed",
            GateStage::Succeeded => "succeeded",
            GateStage::Audited => "audited",
        }
    }
}

impl core::fmt::Display for GateStage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum GateError<E> {
    #[error(transparent)]
    Unauthenticated(#[from] Unauthenticated),

    #[error("authorization denied: {0}")]
    AuthorizationDenied(DenialReason),

    /// Should be unreachable once the registry validated the requirement.
    #[error("policy configuration error: {0}")]
    PolicyConfiguration(#[from] PolicyConfigurationError),

    /// The domain operation's own error, passed through unchanged.
    #[error(transparent)]
    Operation(E),
}

impl<E> GateError<E> {
    pub fn into_operation(self) -> Option<E> {
        match self {
            GateError::Operation(e) => Some(e),
            _ => None,
        }
    }
}

/// Stateless composition of the policy evaluator and the audit recorder.
///
/// Cheap to clone and safe to share across concurrent requests.
#[derive(Debug, Clone)]
pub struct Gate {
    evaluator: Arc<PolicyEvaluator>,
    recorder: AuditRecorder,
}

impl Gate {
    pub fn new(evaluator: Arc<PolicyEvaluator>, recorder: AuditRecorder) -> Self {
        Self { evaluator, recorder }
    }

    pub fn evaluator(&self) -> &PolicyEvaluator {
        &self.evaluator
    }

    pub fn recorder(&self) -> &AuditRecorder {
        &self.recorder
    }

    /// Run `execute` as `operation` on `resource` on behalf of the context's principal.
    ///
    /// `execute` receives the acting principal id and is called at most once,
    /// and only after an Allow decision. Mutating operations that succeed get
    /// exactly one audit record; the write is spawned on the runtime so it
    /// still happens if this future is dropped after the domain logic finished.
    pub async fn invoke<T, E, F, Fut>(
        &self,
        ctx: &PrincipalContext,
        operation: &RegisteredOperation,
        resource: ResourceId,
        execute: F,
    ) -> Result<T, GateError<E>>
    where
        F: FnOnce(PrincipalId) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let span = tracing::info_span!(
            "gate",
            operation = %operation.id,
            resource = %resource,
            principal = tracing::field::Empty,
        );

        async move {
            tracing::debug!(stage = %GateStage::Received);

            tracing::debug!(stage = %GateStage::Authorizing);
            let principal = ctx.current().inspect_err(|_| {
                tracing::info!(stage = %GateStage::Denied, "no authenticated principal");
            })?;
            tracing::Span::current().record("principal", tracing::field::display(principal.id()));

            let decision = self
                .evaluator
                .evaluate(principal, &operation.requirement)
                .inspect_err(|e| {
                    tracing::error!(error = %e, "requirement failed evaluation at request time");
                })?;

            if let Decision::Deny(reason) = decision {
                tracing::info!(stage = %GateStage::Denied, reason = %reason, "operation denied");
                return Err(GateError::AuthorizationDenied(reason));
            }
            tracing::debug!(stage = %GateStage::Authorized);

            let principal_id = principal.id();
            tracing::debug!(stage = %GateStage::Executing);
            let value = match execute(principal_id).await {
                Ok(value) => value,
                Err(e) => {
                    tracing::debug!(stage = %GateStage::Failed);
                    return Err(GateError::Operation(e));
                }
            };
            tracing::debug!(stage = %GateStage::Succeeded);

            if let Some(kind) = operation.kind.audit_kind() {
                let recorder = self.recorder.clone();
                let operation_id = operation.id.clone();
                let write = tokio::spawn(
                    async move { recorder.record(operation_id, resource, principal_id, kind).await }
                        .in_current_span(),
                );
                match write.await {
                    Ok(Ok(_)) => tracing::debug!(stage = %GateStage::Audited),
                    // Already reported to the failure sink by the recorder.
                    Ok(Err(_)) => tracing::debug!(stage = %GateStage::Audited, "audit write failed"),
                    Err(e) => tracing::error!(error = %e, "audit task did not complete"),
                }
            }

            Ok::<T, GateError<E>>(value)
        }
        .instrument(span)
        .await
    }
}
