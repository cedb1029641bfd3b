//! # warden-rbac: Role-Based Access Control
//!
//! Decides whether an actor may exercise a named capability:
//! - **Roles**: four built-in tiers (Guest, Staff, Manager, Admin) plus custom roles
//! - **Capabilities**: built-in record operations plus custom domain permissions
//! - **Policies**: static role → capability configuration, hierarchical or flat
//! - **Enforcement**: `authorize` / `authorize_scoped` with decision logging
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Gated operation (create, delete, ...)      │
//! └─────────────────┬───────────────────────────┘
//!                   │ authorize(principal, capability)
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  PolicyEnforcer                             │
//! │  ├─ principal present?                      │
//! │  ├─ account active?                         │
//! │  ├─ role holds capability?                  │
//! │  └─ caller's scope predicate (optional)     │
//! └─────────────────┬───────────────────────────┘
//!                   │ Ok(principal) → actor for the audit trail
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  EntityStore                                │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Hierarchical roles
//!
//! | Role    | Read/List | Create/Update/History | Delete | Manage principals |
//! |---------|-----------|-----------------------|--------|-------------------|
//! | Guest   | ✓         | ✗                     | ✗      | ✗                 |
//! | Staff   | ✓         | ✓                     | ✗      | ✗                 |
//! | Manager | ✓         | ✓                     | ✓      | ✗                 |
//! | Admin   | ✓         | ✓                     | ✓      | ✓                 |
//!
//! ## Examples
//!
//! ```
//! use warden_rbac::{Capability, Role, StandardPolicies};
//!
//! // admin ⊇ manager ⊇ staff ⊇ guest
//! let policy = StandardPolicies::hierarchical();
//! assert!(policy.allows(&Role::Manager, &Capability::DeleteRecord));
//!
//! // Flat: only admin is preconfigured, everyone else is explicit
//! let mut zoo = StandardPolicies::flat();
//! zoo.grant(Role::Custom("caretaker".into()), Capability::Custom("record_feeding".into()));
//! assert!(!zoo.allows(&Role::Custom("visitor".into()), &Capability::ReadRecord));
//! ```

pub mod capabilities;
pub mod enforcement;
pub mod policy;
pub mod roles;

// Re-export commonly used types
pub use capabilities::{Capability, CapabilityError, CapabilitySet};
pub use enforcement::{AuthzError, PolicyEnforcer, Subject};
pub use policy::{AccessPolicy, PolicyError, StandardPolicies};
pub use roles::{Role, RoleError};
