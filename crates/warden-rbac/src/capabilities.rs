#![allow(clippy::match_same_arms)]
//! Capability types for access control.
//!
//! Defines the named permissions a role may or may not hold.

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a capability name cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid capability name {0:?}: use lowercase letters, digits or '_'")]
pub struct CapabilityError(pub String);

/// Named permission that can be granted to a role.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Capability {
    /// Insert new records into a collection.
    CreateRecord,

    /// Look up a single record by key.
    ReadRecord,

    /// Mutate an existing record's attributes.
    UpdateRecord,

    /// Remove records.
    ///
    /// **Security Impact:**
    /// - Deletion discards the record's history
    /// - Usually reserved for managers and admins
    DeleteRecord,

    /// List every record of a collection.
    ViewAll,

    /// Read a record's audit history.
    ViewHistory,

    /// Provision, re-role, deactivate or remove principals.
    ///
    /// **Security Impact:**
    /// - High-risk capability (can escalate privileges)
    /// - Restricted to Admin in the standard policies
    ManagePrincipals,

    /// A domain-specific capability such as `record_feeding` or `book_flight`.
    Custom(String),
}

impl Capability {
    /// The built-in capabilities, in declaration order.
    pub const BUILTIN: [Capability; 7] = [
        Capability::CreateRecord,
        Capability::ReadRecord,
        Capability::UpdateRecord,
        Capability::DeleteRecord,
        Capability::ViewAll,
        Capability::ViewHistory,
        Capability::ManagePrincipals,
    ];

    /// Returns the canonical snake_case name.
    pub fn name(&self) -> &str {
        match self {
            Capability::CreateRecord => "create_record",
            Capability::ReadRecord => "read_record",
            Capability::UpdateRecord => "update_record",
            Capability::DeleteRecord => "delete_record",
            Capability::ViewAll => "view_all",
            Capability::ViewHistory => "view_history",
            Capability::ManagePrincipals => "manage_principals",
            Capability::Custom(name) => name,
        }
    }

    /// Returns whether this capability is high-risk.
    ///
    /// High-risk grants and denials are logged at a higher level.
    pub fn is_high_risk(&self) -> bool {
        matches!(
            self,
            Capability::DeleteRecord | Capability::ManagePrincipals
        )
    }

    /// Returns whether exercising this capability changes state.
    pub fn is_mutating(&self) -> bool {
        match self {
            Capability::CreateRecord => true,
            Capability::ReadRecord => false,
            Capability::UpdateRecord => true,
            Capability::DeleteRecord => true,
            Capability::ViewAll => false,
            Capability::ViewHistory => false,
            Capability::ManagePrincipals => true,
            Capability::Custom(_) => true,
        }
    }
}

impl Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Capability {
    type Err = CapabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        if let Some(builtin) = Capability::BUILTIN.iter().find(|c| c.name() == name) {
            return Ok(builtin.clone());
        }
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(CapabilityError(s.to_string()));
        }
        Ok(Capability::Custom(name))
    }
}

impl TryFrom<String> for Capability {
    type Error = CapabilityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Capability> for String {
    fn from(capability: Capability) -> Self {
        capability.name().to_string()
    }
}

/// Set of capabilities granted to a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet {
    capabilities: Vec<Capability>,
}

impl CapabilitySet {
    /// Creates a capability set, dropping duplicates.
    pub fn new(capabilities: Vec<Capability>) -> Self {
        let mut set = Self::empty();
        for capability in capabilities {
            set.grant(capability);
        }
        set
    }

    /// Creates an empty capability set.
    pub fn empty() -> Self {
        Self {
            capabilities: Vec::new(),
        }
    }

    /// Creates a set holding every built-in capability.
    pub fn all_builtin() -> Self {
        Self::new(Capability::BUILTIN.to_vec())
    }

    /// Returns whether this set contains the given capability.
    pub fn contains(&self, capability: &Capability) -> bool {
        self.capabilities.contains(capability)
    }

    /// Adds a capability to the set.
    pub fn grant(&mut self, capability: Capability) {
        if !self.capabilities.contains(&capability) {
            self.capabilities.push(capability);
        }
    }

    /// Removes a capability from the set.
    pub fn revoke(&mut self, capability: &Capability) {
        self.capabilities.retain(|c| c != capability);
    }

    /// Returns a new set with the capabilities of both.
    pub fn union(&self, other: &CapabilitySet) -> CapabilitySet {
        let mut merged = self.clone();
        for capability in &other.capabilities {
            merged.grant(capability.clone());
        }
        merged
    }

    /// Returns all capabilities in the set.
    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.capabilities.iter()
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Returns whether any capability in the set is high-risk.
    pub fn has_high_risk_capability(&self) -> bool {
        self.capabilities.iter().any(Capability::is_high_risk)
    }
}

impl Default for CapabilitySet {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Vec<Capability>> for CapabilitySet {
    fn from(capabilities: Vec<Capability>) -> Self {
        Self::new(capabilities)
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_capability_high_risk() {
        assert!(!Capability::CreateRecord.is_high_risk());
        assert!(!Capability::ReadRecord.is_high_risk());
        assert!(!Capability::UpdateRecord.is_high_risk());
        assert!(Capability::DeleteRecord.is_high_risk());
        assert!(!Capability::ViewAll.is_high_risk());
        assert!(!Capability::ViewHistory.is_high_risk());
        assert!(Capability::ManagePrincipals.is_high_risk());
        assert!(!Capability::Custom("record_feeding".into()).is_high_risk());
    }

    #[test]
    fn test_builtin_names_parse_back() {
        for capability in Capability::BUILTIN {
            let parsed: Capability = capability.name().parse().unwrap();
            assert_eq!(parsed, capability);
        }
    }

    #[test]
    fn test_custom_capability_parsing() {
        assert_eq!(
            "Record_Feeding".parse::<Capability>().unwrap(),
            Capability::Custom("record_feeding".into())
        );
        assert!("book flight".parse::<Capability>().is_err());
        assert!("".parse::<Capability>().is_err());
    }

    #[test]
    fn test_capability_set_operations() {
        let mut set = CapabilitySet::empty();
        assert!(!set.contains(&Capability::ReadRecord));

        set.grant(Capability::ReadRecord);
        assert!(set.contains(&Capability::ReadRecord));

        set.grant(Capability::ReadRecord); // Duplicate grant is no-op
        assert_eq!(set.len(), 1);

        set.grant(Capability::UpdateRecord);
        assert_eq!(set.len(), 2);

        set.revoke(&Capability::ReadRecord);
        assert!(!set.contains(&Capability::ReadRecord));
        assert!(set.contains(&Capability::UpdateRecord));
    }

    #[test]
    fn test_capability_set_union() {
        let staff = CapabilitySet::from(vec![Capability::ReadRecord, Capability::CreateRecord]);
        let extra = CapabilitySet::from(vec![Capability::CreateRecord, Capability::DeleteRecord]);
        let merged = staff.union(&extra);

        assert_eq!(merged.len(), 3);
        assert!(merged.has_high_risk_capability());
        assert!(!staff.has_high_risk_capability());
    }

    #[test]
    fn test_capability_set_serializes_as_list() {
        let set = CapabilitySet::from(vec![
            Capability::ViewAll,
            Capability::Custom("record_feeding".into()),
        ]);
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["view_all","record_feeding"]"#);
    }

    proptest! {
        #[test]
        fn custom_names_round_trip_through_display(name in "[a-z][a-z0-9_]{0,20}") {
            let capability: Capability = name.parse().unwrap();
            prop_assert_eq!(capability.to_string(), name);
        }
    }
}
