//! Access control policies.
//!
//! A policy is static configuration: a map from role to the capability set
//! that role holds. Roles absent from the map hold nothing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::capabilities::{Capability, CapabilitySet};
use crate::roles::Role;

/// Error returned when a policy violates its own invariants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    /// A configured role maps to no capabilities at all.
    #[error("role '{0}' is configured with an empty capability set")]
    EmptyRole(Role),

    /// The policy configures no role at all.
    #[error("policy defines no roles")]
    NoRoles,
}

/// Access control policy: role → capability set.
///
/// # Examples
///
/// ```
/// use warden_rbac::{AccessPolicy, Capability, Role};
///
/// let policy = AccessPolicy::new()
///     .with_role(Role::Admin, vec![Capability::CreateRecord, Capability::DeleteRecord])
///     .with_role(Role::Custom("vet".into()), vec![Capability::Custom("add_health_record".into())]);
///
/// assert!(policy.allows(&Role::Admin, &Capability::DeleteRecord));
/// assert!(!policy.allows(&Role::Guest, &Capability::ReadRecord)); // not configured
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessPolicy {
    roles: BTreeMap<Role, CapabilitySet>,
}

impl AccessPolicy {
    /// Creates a policy with no roles.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets (replacing) the capability set of a role.
    pub fn with_role(mut self, role: Role, capabilities: impl Into<CapabilitySet>) -> Self {
        self.roles.insert(role, capabilities.into());
        self
    }

    /// Replaces a role's capabilities in place.
    pub fn set_role(&mut self, role: Role, capabilities: impl Into<CapabilitySet>) {
        self.roles.insert(role, capabilities.into());
    }

    /// Grants one more capability to a role, creating the role if needed.
    pub fn grant(&mut self, role: Role, capability: Capability) {
        self.roles.entry(role).or_default().grant(capability);
    }

    /// Returns the capability set of a role, if the role is configured.
    pub fn capabilities_of(&self, role: &Role) -> Option<&CapabilitySet> {
        self.roles.get(role)
    }

    /// Returns whether the role holds the capability.
    ///
    /// Unrecognized roles hold no capability.
    pub fn allows(&self, role: &Role, capability: &Capability) -> bool {
        self.roles
            .get(role)
            .is_some_and(|set| set.contains(capability))
    }

    /// Returns whether the role is configured at all.
    pub fn knows(&self, role: &Role) -> bool {
        self.roles.contains_key(role)
    }

    /// Returns every configured role with its capabilities.
    pub fn roles(&self) -> impl Iterator<Item = (&Role, &CapabilitySet)> {
        self.roles.iter()
    }

    /// Checks that every configured role maps to a non-empty set.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.roles.is_empty() {
            return Err(PolicyError::NoRoles);
        }
        if let Some((role, _)) = self.roles.iter().find(|(_, set)| set.is_empty()) {
            return Err(PolicyError::EmptyRole(role.clone()));
        }
        Ok(())
    }
}

/// Standard policies for common deployments.
pub struct StandardPolicies;

impl StandardPolicies {
    /// Capabilities of the guest tier: browse only.
    pub fn guest_capabilities() -> CapabilitySet {
        CapabilitySet::from(vec![Capability::ReadRecord, Capability::ViewAll])
    }

    /// Capabilities of the staff tier: guest plus create, edit and history.
    pub fn staff_capabilities() -> CapabilitySet {
        Self::guest_capabilities().union(&CapabilitySet::from(vec![
            Capability::CreateRecord,
            Capability::UpdateRecord,
            Capability::ViewHistory,
        ]))
    }

    /// Capabilities of the manager tier: staff plus deletion.
    pub fn manager_capabilities() -> CapabilitySet {
        Self::staff_capabilities().union(&CapabilitySet::from(vec![Capability::DeleteRecord]))
    }

    /// Capabilities of the admin tier: every built-in capability.
    pub fn admin_capabilities() -> CapabilitySet {
        Self::manager_capabilities().union(&CapabilitySet::all_builtin())
    }

    /// Hierarchical model: `admin ⊇ manager ⊇ staff ⊇ guest`.
    pub fn hierarchical() -> AccessPolicy {
        AccessPolicy::new()
            .with_role(Role::Guest, Self::guest_capabilities())
            .with_role(Role::Staff, Self::staff_capabilities())
            .with_role(Role::Manager, Self::manager_capabilities())
            .with_role(Role::Admin, Self::admin_capabilities())
    }

    /// Flat model: only `admin` is preconfigured; every other role is
    /// added explicitly with its own independent set.
    pub fn flat() -> AccessPolicy {
        AccessPolicy::new().with_role(Role::Admin, Self::admin_capabilities())
    }
}
