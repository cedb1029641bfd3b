//! Registry of principals.

use std::collections::BTreeMap;

use tracing::info;
use warden_rbac::Role;
use warden_types::PrincipalId;

use crate::error::DirectoryError;
use crate::principal::{Credential, Principal};

/// Every principal known to a realm, keyed by identifier.
///
/// The directory only stores principals; deciding who may change them is
/// the caller's job (see `warden::Realm`).
#[derive(Debug, Clone, Default)]
pub struct Directory {
    principals: BTreeMap<PrincipalId, Principal>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a principal.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::DuplicatePrincipal`] if the identifier is taken;
    /// the directory is left unchanged.
    pub fn provision(&mut self, principal: Principal) -> Result<&Principal, DirectoryError> {
        let id = principal.id().clone();
        if self.principals.contains_key(&id) {
            return Err(DirectoryError::DuplicatePrincipal(id));
        }
        info!(principal = %id, role = %principal.role(), "Principal provisioned");
        Ok(&*self.principals.entry(id).or_insert(principal))
    }

    pub fn get(&self, id: &PrincipalId) -> Option<&Principal> {
        self.principals.get(id)
    }

    pub fn contains(&self, id: &PrincipalId) -> bool {
        self.principals.contains_key(id)
    }

    /// Changes a principal's role.
    pub fn set_role(&mut self, id: &PrincipalId, role: Role) -> Result<&Principal, DirectoryError> {
        let principal = self.get_mut(id)?;
        info!(principal = %id, from = %principal.role(), to = %role, "Principal role changed");
        principal.set_role(role);
        Ok(&*principal)
    }

    /// Activates or deactivates a principal.
    pub fn set_active(&mut self, id: &PrincipalId, active: bool) -> Result<&Principal, DirectoryError> {
        let principal = self.get_mut(id)?;
        principal.set_active(active);
        info!(principal = %id, active, "Principal status changed");
        Ok(&*principal)
    }

    /// Moves a principal to another organizational unit (or none).
    pub fn set_unit(
        &mut self,
        id: &PrincipalId,
        unit: Option<String>,
    ) -> Result<&Principal, DirectoryError> {
        let principal = self.get_mut(id)?;
        principal.set_unit(unit);
        Ok(&*principal)
    }

    /// Replaces a principal's credential.
    pub fn set_credential(
        &mut self,
        id: &PrincipalId,
        credential: Credential,
    ) -> Result<(), DirectoryError> {
        self.get_mut(id)?.set_credential(credential);
        info!(principal = %id, "Principal credential changed");
        Ok(())
    }

    /// Removes a principal permanently.
    pub fn remove(&mut self, id: &PrincipalId) -> Result<Principal, DirectoryError> {
        let removed = self
            .principals
            .remove(id)
            .ok_or_else(|| DirectoryError::PrincipalNotFound(id.clone()))?;
        info!(principal = %id, "Principal removed");
        Ok(removed)
    }

    /// Iterates principals in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &Principal> {
        self.principals.values()
    }

    pub fn len(&self) -> usize {
        self.principals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.principals.is_empty()
    }

    fn get_mut(&mut self, id: &PrincipalId) -> Result<&mut Principal, DirectoryError> {
        self.principals
            .get_mut(id)
            .ok_or_else(|| DirectoryError::PrincipalNotFound(id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(id: &str, role: Role) -> Principal {
        Principal::new(
            PrincipalId::parse(id).unwrap(),
            id.to_uppercase(),
            role,
            Credential::from_secret(id),
        )
    }

    #[test]
    fn provisioning_twice_fails_and_keeps_original() {
        let mut directory = Directory::new();
        directory.provision(principal("anna", Role::Manager)).unwrap();

        let result = directory.provision(principal("anna", Role::Guest));

        assert_eq!(
            result.unwrap_err(),
            DirectoryError::DuplicatePrincipal(PrincipalId::parse("anna").unwrap())
        );
        let anna = directory.get(&PrincipalId::parse("anna").unwrap()).unwrap();
        assert_eq!(anna.role(), &Role::Manager);
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn role_and_status_changes_apply() {
        let mut directory = Directory::new();
        directory.provision(principal("john", Role::Staff)).unwrap();
        let id = PrincipalId::parse("john").unwrap();

        directory.set_role(&id, Role::Manager).unwrap();
        directory.set_active(&id, false).unwrap();
        directory.set_unit(&id, Some("HR".into())).unwrap();

        let john = directory.get(&id).unwrap();
        assert_eq!(john.role(), &Role::Manager);
        assert!(!john.is_active());
        assert!(john.in_unit("HR"));
    }

    #[test]
    fn credential_change_takes_effect() {
        let mut directory = Directory::new();
        directory.provision(principal("john", Role::Staff)).unwrap();
        let id = PrincipalId::parse("john").unwrap();

        directory
            .set_credential(&id, Credential::from_secret("new-secret"))
            .unwrap();

        let john = directory.get(&id).unwrap();
        assert!(john.credential().verify("new-secret"));
        assert!(!john.credential().verify("john"));
    }

    #[test]
    fn missing_principals_are_reported() {
        let mut directory = Directory::new();
        let ghost = PrincipalId::parse("ghost").unwrap();

        assert!(matches!(
            directory.set_role(&ghost, Role::Admin),
            Err(DirectoryError::PrincipalNotFound(_))
        ));
        assert!(matches!(
            directory.remove(&ghost),
            Err(DirectoryError::PrincipalNotFound(_))
        ));
    }

    #[test]
    fn iteration_is_sorted_by_id() {
        let mut directory = Directory::new();
        directory.provision(principal("zed", Role::Guest)).unwrap();
        directory.provision(principal("amy", Role::Guest)).unwrap();

        let ids: Vec<&str> = directory.iter().map(|p| p.id().as_str()).collect();
        assert_eq!(ids, vec!["amy", "zed"]);
    }
}
