//! Policy enforcement logic.
//!
//! Decides whether an actor may exercise a capability. Callers invoke
//! [`PolicyEnforcer::authorize`] at the top of every gated operation and use
//! the returned subject to stamp the audit trail.

use thiserror::Error;
use tracing::{info, warn};
use warden_types::PrincipalId;

use crate::capabilities::Capability;
use crate::policy::AccessPolicy;
use crate::roles::Role;

/// An actor as seen by the access policy.
///
/// Implemented by the session layer's principal type; kept as a trait so
/// this crate does not depend on how principals are stored.
pub trait Subject {
    /// Identifier used in audit entries and log lines.
    fn subject_id(&self) -> &PrincipalId;

    /// The role the subject currently holds.
    fn role(&self) -> &Role;

    /// Whether the subject's account is active.
    fn is_active(&self) -> bool;
}

/// Error type for policy enforcement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthzError {
    /// No principal is logged in.
    #[error("not authenticated: log in to use '{capability}'")]
    NotAuthenticated { capability: Capability },

    /// The principal's account is deactivated.
    #[error("account '{principal}' is inactive")]
    AccountInactive { principal: PrincipalId },

    /// The principal's role does not hold the capability.
    #[error("insufficient role: '{principal}' ({role}) lacks '{capability}'")]
    InsufficientRole {
        principal: PrincipalId,
        role: Role,
        capability: Capability,
    },

    /// The role check passed but the caller's scope predicate rejected the
    /// principal (e.g. a manager acting outside their own department).
    #[error("'{principal}' may only use '{capability}' within their own scope")]
    ScopeViolation {
        principal: PrincipalId,
        capability: Capability,
    },
}

/// Result type for enforcement operations.
pub type Result<T> = std::result::Result<T, AuthzError>;

/// Policy enforcement engine.
#[derive(Debug, Clone)]
pub struct PolicyEnforcer {
    /// Role → capability configuration.
    policy: AccessPolicy,

    /// Whether to log access decisions.
    audit_enabled: bool,
}

impl PolicyEnforcer {
    /// Creates a new policy enforcer.
    pub fn new(policy: AccessPolicy) -> Self {
        Self {
            policy,
            audit_enabled: true,
        }
    }

    /// Disables decision logging (for testing).
    pub fn without_audit(mut self) -> Self {
        self.audit_enabled = false;
        self
    }

    /// Authorizes `principal` to exercise `capability`.
    ///
    /// Checks, in order: a principal is present, its account is active, its
    /// role holds the capability. On success the principal is returned so
    /// the caller can record it as the actor.
    ///
    /// **Audit:** Logs every decision.
    ///
    /// # Examples
    ///
    /// ```
    /// use warden_rbac::{AuthzError, Capability, PolicyEnforcer, Role, StandardPolicies, Subject};
    /// use warden_types::PrincipalId;
    ///
    /// #[derive(Clone)]
    /// struct Actor(PrincipalId, Role);
    ///
    /// impl Subject for Actor {
    ///     fn subject_id(&self) -> &PrincipalId { &self.0 }
    ///     fn role(&self) -> &Role { &self.1 }
    ///     fn is_active(&self) -> bool { true }
    /// }
    ///
    /// let enforcer = PolicyEnforcer::new(StandardPolicies::hierarchical()).without_audit();
    /// let staff = Actor(PrincipalId::parse("sam")?, Role::Staff);
    ///
    /// assert!(enforcer.authorize(Some(&staff), &Capability::UpdateRecord).is_ok());
    /// assert!(matches!(
    ///     enforcer.authorize(Some(&staff), &Capability::ManagePrincipals),
    ///     Err(AuthzError::InsufficientRole { .. })
    /// ));
    /// assert!(matches!(
    ///     enforcer.authorize::<Actor>(None, &Capability::ReadRecord),
    ///     Err(AuthzError::NotAuthenticated { .. })
    /// ));
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn authorize<P>(&self, principal: Option<&P>, capability: &Capability) -> Result<P>
    where
        P: Subject + Clone,
    {
        let Some(principal) = principal else {
            self.record_denial::<P>(None, capability, "not authenticated");
            return Err(AuthzError::NotAuthenticated {
                capability: capability.clone(),
            });
        };

        if !principal.is_active() {
            self.record_denial(Some(principal), capability, "account inactive");
            return Err(AuthzError::AccountInactive {
                principal: principal.subject_id().clone(),
            });
        }

        if !self.policy.allows(principal.role(), capability) {
            self.record_denial(Some(principal), capability, "insufficient role");
            return Err(AuthzError::InsufficientRole {
                principal: principal.subject_id().clone(),
                role: principal.role().clone(),
                capability: capability.clone(),
            });
        }

        if self.audit_enabled {
            info!(
                principal = %principal.subject_id(),
                role = %principal.role(),
                capability = %capability,
                high_risk = capability.is_high_risk(),
                "Capability granted"
            );
        }

        Ok(principal.clone())
    }

    /// Authorizes like [`authorize`](Self::authorize), then evaluates a
    /// caller-supplied scope predicate on the principal.
    ///
    /// The predicate only runs once the base role check has passed.
    pub fn authorize_scoped<P, F>(
        &self,
        principal: Option<&P>,
        capability: &Capability,
        in_scope: F,
    ) -> Result<P>
    where
        P: Subject + Clone,
        F: FnOnce(&P) -> bool,
    {
        let principal = self.authorize(principal, capability)?;

        if in_scope(&principal) {
            Ok(principal)
        } else {
            self.record_denial(Some(&principal), capability, "outside scope");
            Err(AuthzError::ScopeViolation {
                principal: principal.subject_id().clone(),
                capability: capability.clone(),
            })
        }
    }

    /// Returns the current policy.
    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// Replaces the policy (e.g. after configuration reload).
    pub fn replace_policy(&mut self, policy: AccessPolicy) {
        self.policy = policy;
    }

    fn record_denial<P: Subject>(&self, principal: Option<&P>, capability: &Capability, reason: &str) {
        if !self.audit_enabled {
            return;
        }
        match principal {
            Some(p) => warn!(
                principal = %p.subject_id(),
                role = %p.role(),
                capability = %capability,
                reason,
                "Capability denied"
            ),
            None => warn!(capability = %capability, reason, "Capability denied"),
        }
    }
}
