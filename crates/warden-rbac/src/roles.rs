#![allow(clippy::match_same_arms)]
//! Role definitions for RBAC.
//!
//! Four built-in roles with escalating privileges, plus custom roles:
//! - Guest: browse records (most restrictive built-in)
//! - Staff: day-to-day record work
//! - Manager: staff work plus deletions
//! - Admin: everything, including principal administration
//!
//! Custom roles (`caretaker`, `vet`, `driver`, ...) carry exactly the
//! capabilities a policy maps them to. A role no policy knows grants nothing.

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a role name cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoleError {
    #[error("role name must not be empty")]
    Empty,

    #[error("invalid role name {0:?}: use lowercase letters, digits, '_' or '-'")]
    InvalidName(String),
}

/// Role in the access control system.
///
/// Built-in roles are ordered from least to most privileged:
/// Guest < Staff < Manager < Admin. Custom roles sort after the built-ins
/// and are treated as the most restrictive for escalation checks.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    /// Read-only visitor.
    ///
    /// **Use Cases:**
    /// - Zoo visitors browsing animals
    /// - Customers browsing a catalog
    Guest,

    /// Standard operator: creates and edits records.
    Staff,

    /// Supervisor: staff work plus deletions, usually within a unit.
    Manager,

    /// Administrator with full access.
    ///
    /// **Permissions:**
    /// - Full create/read/update/delete access
    /// - Provisions, deactivates and removes principals
    Admin,

    /// A domain-specific role, named in lowercase.
    Custom(String),
}

impl Role {
    /// Returns the canonical lowercase name of this role.
    pub fn name(&self) -> &str {
        match self {
            Role::Guest => "guest",
            Role::Staff => "staff",
            Role::Manager => "manager",
            Role::Admin => "admin",
            Role::Custom(name) => name,
        }
    }

    /// Returns whether this is one of the four built-in roles.
    pub fn is_builtin(&self) -> bool {
        !matches!(self, Role::Custom(_))
    }

    /// Returns the restrictiveness level (0 = least restrictive).
    ///
    /// Used for privilege escalation prevention.
    pub fn restrictiveness(&self) -> u8 {
        match self {
            Role::Admin => 0, // Least restrictive
            Role::Manager => 1,
            Role::Staff => 2,
            Role::Guest => 3,
            Role::Custom(_) => 4, // Most restrictive
        }
    }

    /// Returns whether a principal holding this role may assign `target`.
    ///
    /// **Escalation Rules:**
    /// - Cannot assign a less restrictive role than one's own
    /// - Same or more restrictive roles are fine
    ///
    /// # Examples
    ///
    /// ```
    /// use warden_rbac::roles::Role;
    ///
    /// assert!(!Role::Staff.can_escalate_to(&Role::Admin));  // Cannot escalate
    /// assert!(Role::Admin.can_escalate_to(&Role::Staff));   // Can de-escalate
    /// assert!(Role::Manager.can_escalate_to(&Role::Manager)); // Same role OK
    /// ```
    pub fn can_escalate_to(&self, target: &Role) -> bool {
        self.restrictiveness() <= target.restrictiveness()
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Role {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        if name.is_empty() {
            return Err(RoleError::Empty);
        }
        match name.as_str() {
            "guest" => Ok(Role::Guest),
            "staff" => Ok(Role::Staff),
            "manager" => Ok(Role::Manager),
            "admin" => Ok(Role::Admin),
            _ if name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-') =>
            {
                Ok(Role::Custom(name))
            }
            _ => Err(RoleError::InvalidName(s.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = RoleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.name().to_string()
    }
}
