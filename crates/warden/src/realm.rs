//! The realm: one directory, one session, one policy and named collections.

use std::collections::BTreeMap;

use tracing::{info, warn};
use warden_config::{ConfigError, WardenConfig};
use warden_rbac::{AccessPolicy, Capability, PolicyEnforcer, Role};
use warden_session::{Credential, Directory, DirectoryError, Principal, Session, SessionEnd};
use warden_store::{
    Attributes, DeletePolicy, DependencyResolver, EntityStore, HistoryEntry, MutationError,
    Record, RecordRef, RefTarget, References, StoreError,
};
use warden_types::{CollectionName, PrincipalId, RecordKey};

use crate::error::RealmError;

pub type Result<T> = std::result::Result<T, RealmError>;

/// What happens to records that reference something being removed.
///
/// Applies across every collection of the realm, including the one a
/// deleted record lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemovalPolicy {
    /// Remove regardless; references are left dangling.
    #[default]
    Standalone,
    /// Refuse while anything references the target.
    Restrict,
    /// Detach every reference (one history entry per changed record), then remove.
    Cascade,
}

/// Composition root of a role-gated store.
///
/// Every operation authorizes the current session against the policy before
/// touching data, so an unauthorized caller learns nothing about which
/// collections or keys exist.
#[derive(Debug)]
pub struct Realm<A> {
    name: String,
    directory: Directory,
    session: Session,
    enforcer: PolicyEnforcer,
    collections: BTreeMap<CollectionName, EntityStore<A>>,
}

impl<A: Attributes + References> Realm<A> {
    pub fn new(name: impl Into<String>, policy: AccessPolicy) -> Self {
        Self {
            name: name.into(),
            directory: Directory::new(),
            session: Session::new(),
            enforcer: PolicyEnforcer::new(policy),
            collections: BTreeMap::new(),
        }
    }

    /// Builds a realm from configuration: the configured policy, the
    /// bootstrap administrator and the default collection.
    pub fn from_config(config: &WardenConfig) -> std::result::Result<Self, ConfigError> {
        let mut realm = Self::new(config.realm.name.clone(), config.access_policy()?);
        let admin = Principal::new(
            config.bootstrap_admin_id()?,
            config.bootstrap.admin_name.clone(),
            Role::Admin,
            Credential::from_secret(&config.bootstrap.admin_credential),
        );
        realm
            .bootstrap(admin)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        realm
            .collections
            .entry(config.default_collection()?)
            .or_insert_with_key(|name| EntityStore::new(name.clone()));
        Ok(realm)
    }

    /// Disables grant/deny logging; for tests.
    #[must_use]
    pub fn without_audit(mut self) -> Self {
        self.enforcer = self.enforcer.without_audit();
        self
    }

    /// Swaps in another policy, e.g. the configured one plus domain capabilities.
    #[must_use]
    pub fn with_policy(mut self, policy: AccessPolicy) -> Self {
        self.enforcer.replace_policy(policy);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> &AccessPolicy {
        self.enforcer.policy()
    }

    /// Provisions the first principal without a session.
    ///
    /// # Errors
    ///
    /// [`RealmError::AlreadyBootstrapped`] once the directory holds anyone.
    pub fn bootstrap(&mut self, principal: Principal) -> Result<()> {
        if !self.directory.is_empty() {
            return Err(RealmError::AlreadyBootstrapped);
        }
        info!(realm = %self.name, principal = %principal.id(), "Realm bootstrapped");
        self.directory.provision(principal)?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------------

    pub fn login(&mut self, id: &PrincipalId, secret: &str) -> Result<Principal> {
        Ok(self.session.authenticate(&self.directory, id, secret)?)
    }

    pub fn logout(&mut self) -> SessionEnd {
        self.session.end()
    }

    /// The logged-in principal, if any.
    pub fn current(&self) -> Option<&Principal> {
        self.session.current()
    }

    /// Checks the current principal against `capability` and returns it.
    ///
    /// Domain code calls this directly for custom capabilities.
    pub fn authorize(&self, capability: &Capability) -> Result<Principal> {
        Ok(self.enforcer.authorize(self.session.current(), capability)?)
    }

    /// Like [`authorize`](Self::authorize), then applies a scope predicate.
    pub fn authorize_scoped<F>(&self, capability: &Capability, in_scope: F) -> Result<Principal>
    where
        F: FnOnce(&Principal) -> bool,
    {
        Ok(self
            .enforcer
            .authorize_scoped(self.session.current(), capability, in_scope)?)
    }

    // ------------------------------------------------------------------------
    // Collections and records
    // ------------------------------------------------------------------------

    /// Creates a collection. Returns `false` if it already existed.
    pub fn open_collection(&mut self, name: CollectionName) -> Result<bool> {
        let actor = self.authorize(&Capability::ManagePrincipals)?;
        if self.collections.contains_key(&name) {
            return Ok(false);
        }
        info!(realm = %self.name, collection = %name, actor = %actor.id(), "Collection opened");
        self.collections
            .insert(name.clone(), EntityStore::new(name));
        Ok(true)
    }

    /// Collection names, sorted.
    pub fn collections(&self) -> impl Iterator<Item = &CollectionName> {
        self.collections.keys()
    }

    pub fn create(
        &mut self,
        collection: &CollectionName,
        key: RecordKey,
        attributes: A,
    ) -> Result<RecordRef> {
        let actor = self.authorize(&Capability::CreateRecord)?;
        Ok(self
            .store_mut(collection)?
            .create(key, attributes, actor.id())?)
    }

    pub fn get(&self, collection: &CollectionName, key: &RecordKey) -> Result<Option<&Record<A>>> {
        self.authorize(&Capability::ReadRecord)?;
        Ok(self.store(collection)?.get(key))
    }

    pub fn update<F>(&mut self, collection: &CollectionName, key: &RecordKey, mutation: F) -> Result<()>
    where
        F: FnOnce(&mut A) -> std::result::Result<String, MutationError>,
    {
        let actor = self.authorize(&Capability::UpdateRecord)?;
        Ok(self
            .store_mut(collection)?
            .update(key, mutation, actor.id())?)
    }

    /// Updates only if `in_scope` accepts the principal for this record,
    /// e.g. a manager editing employees of their own department.
    pub fn update_scoped<S, F>(
        &mut self,
        collection: &CollectionName,
        key: &RecordKey,
        in_scope: S,
        mutation: F,
    ) -> Result<()>
    where
        S: FnOnce(&Principal, &Record<A>) -> bool,
        F: FnOnce(&mut A) -> std::result::Result<String, MutationError>,
    {
        let actor = self.authorize_record(&Capability::UpdateRecord, collection, key, in_scope)?;
        Ok(self
            .store_mut(collection)?
            .update(key, mutation, actor.id())?)
    }

    /// Deletes a record; `policy` governs references from every collection.
    pub fn delete(
        &mut self,
        collection: &CollectionName,
        key: &RecordKey,
        policy: RemovalPolicy,
    ) -> Result<Record<A>> {
        let actor = self.authorize(&Capability::DeleteRecord)?;
        self.delete_as(&actor, collection, key, policy)
    }

    pub fn delete_scoped<S>(
        &mut self,
        collection: &CollectionName,
        key: &RecordKey,
        policy: RemovalPolicy,
        in_scope: S,
    ) -> Result<Record<A>>
    where
        S: FnOnce(&Principal, &Record<A>) -> bool,
    {
        let actor = self.authorize_record(&Capability::DeleteRecord, collection, key, in_scope)?;
        self.delete_as(&actor, collection, key, policy)
    }

    /// Records of a collection matching `predicate`, in insertion order.
    pub fn list<'a, P>(
        &'a self,
        collection: &CollectionName,
        predicate: P,
    ) -> Result<impl Iterator<Item = &'a Record<A>> + 'a>
    where
        P: FnMut(&Record<A>) -> bool + 'a,
    {
        self.authorize(&Capability::ViewAll)?;
        Ok(self.store(collection)?.list(predicate))
    }

    pub fn history(&self, collection: &CollectionName, key: &RecordKey) -> Result<&[HistoryEntry]> {
        self.authorize(&Capability::ViewHistory)?;
        Ok(self.store(collection)?.history(key)?)
    }

    // ------------------------------------------------------------------------
    // Principals
    // ------------------------------------------------------------------------

    /// Every principal, sorted by identifier.
    pub fn principals(&self) -> Result<impl Iterator<Item = &Principal>> {
        self.authorize(&Capability::ManagePrincipals)?;
        Ok(self.directory.iter())
    }

    pub fn provision_principal(&mut self, principal: Principal) -> Result<()> {
        let actor = self.authorize(&Capability::ManagePrincipals)?;
        check_escalation(&actor, principal.role())?;
        self.directory.provision(principal)?;
        Ok(())
    }

    /// Changes a principal's role.
    ///
    /// The actor must outrank or equal both the target's current role and
    /// the new one, and cannot change its own role.
    pub fn set_principal_role(&mut self, id: &PrincipalId, role: Role) -> Result<()> {
        let actor = self.authorize(&Capability::ManagePrincipals)?;
        if actor.id() == id && &role != actor.role() {
            warn!(principal = %id, role = %role, "Refused to change own role");
            return Err(RealmError::SelfTarget {
                principal: id.clone(),
            });
        }
        self.check_authority(&actor, id)?;
        check_escalation(&actor, &role)?;
        self.directory.set_role(id, role)?;
        self.session.refresh(&self.directory);
        Ok(())
    }

    pub fn set_principal_active(&mut self, id: &PrincipalId, active: bool) -> Result<()> {
        let actor = self.authorize(&Capability::ManagePrincipals)?;
        if !active && actor.id() == id {
            return Err(RealmError::SelfTarget {
                principal: id.clone(),
            });
        }
        self.check_authority(&actor, id)?;
        self.directory.set_active(id, active)?;
        self.session.refresh(&self.directory);
        Ok(())
    }

    pub fn set_principal_unit(&mut self, id: &PrincipalId, unit: Option<String>) -> Result<()> {
        let actor = self.authorize(&Capability::ManagePrincipals)?;
        self.check_authority(&actor, id)?;
        self.directory.set_unit(id, unit)?;
        self.session.refresh(&self.directory);
        Ok(())
    }

    /// Removes a principal; `policy` governs records that reference it.
    ///
    /// Only principal references count: a record key that happens to equal
    /// the identifier is unrelated.
    pub fn remove_principal(&mut self, id: &PrincipalId, policy: RemovalPolicy) -> Result<Principal> {
        let actor = self.authorize(&Capability::ManagePrincipals)?;
        if actor.id() == id {
            return Err(RealmError::SelfTarget {
                principal: id.clone(),
            });
        }
        self.check_authority(&actor, id)?;

        let target = RefTarget::Principal(id);
        match policy {
            RemovalPolicy::Standalone => {}
            RemovalPolicy::Restrict => {
                let count: usize = self
                    .collections
                    .values()
                    .map(|store| store.count_dependents(target))
                    .sum();
                if count > 0 {
                    warn!(principal = %id, count, "Principal removal refused: still referenced");
                    return Err(RealmError::PrincipalInUse {
                        principal: id.clone(),
                        count,
                    });
                }
            }
            RemovalPolicy::Cascade => {
                for store in self.collections.values_mut() {
                    store.detach_dependents(target, actor.id());
                }
            }
        }

        let removed = self.directory.remove(id)?;
        self.session.refresh(&self.directory);
        Ok(removed)
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    /// The actor may only administer principals whose role is at least as
    /// restrictive as its own.
    fn check_authority(&self, actor: &Principal, id: &PrincipalId) -> Result<()> {
        let target = self
            .directory
            .get(id)
            .ok_or_else(|| DirectoryError::PrincipalNotFound(id.clone()))?;
        if actor.role().can_escalate_to(target.role()) {
            return Ok(());
        }
        warn!(
            principal = %actor.id(),
            target = %id,
            role = %target.role(),
            "Principal administration refused: target outranks actor"
        );
        Err(RealmError::Outranked {
            principal: actor.id().clone(),
            target: id.clone(),
            role: target.role().clone(),
        })
    }

    fn store(&self, collection: &CollectionName) -> Result<&EntityStore<A>> {
        self.collections
            .get(collection)
            .ok_or_else(|| RealmError::UnknownCollection(collection.clone()))
    }

    fn store_mut(&mut self, collection: &CollectionName) -> Result<&mut EntityStore<A>> {
        self.collections
            .get_mut(collection)
            .ok_or_else(|| RealmError::UnknownCollection(collection.clone()))
    }

    /// Authorizes `capability` with a scope predicate over an existing record.
    ///
    /// The role check runs first; a missing collection or key is reported
    /// only to principals holding the capability.
    fn authorize_record<S>(
        &self,
        capability: &Capability,
        collection: &CollectionName,
        key: &RecordKey,
        in_scope: S,
    ) -> Result<Principal>
    where
        S: FnOnce(&Principal, &Record<A>) -> bool,
    {
        let record = self.collections.get(collection).and_then(|s| s.get(key));
        let actor = self
            .enforcer
            .authorize_scoped(self.session.current(), capability, |principal| {
                record.is_none_or(|record| in_scope(principal, record))
            })?;
        let store = self.store(collection)?;
        if !store.contains(key) {
            return Err(StoreError::NotFound { key: key.clone() }.into());
        }
        Ok(actor)
    }

    fn delete_as(
        &mut self,
        actor: &Principal,
        collection: &CollectionName,
        key: &RecordKey,
        policy: RemovalPolicy,
    ) -> Result<Record<A>> {
        let mut target = None;
        let mut others: Vec<&mut EntityStore<A>> = Vec::new();
        for (name, store) in &mut self.collections {
            if name == collection {
                target = Some(store);
            } else {
                others.push(store);
            }
        }
        let target = target.ok_or_else(|| RealmError::UnknownCollection(collection.clone()))?;

        let policy = match policy {
            RemovalPolicy::Standalone => DeletePolicy::Standalone,
            RemovalPolicy::Restrict => DeletePolicy::Restrict(
                others
                    .iter()
                    .map(|store| &**store as &dyn DependencyResolver)
                    .collect(),
            ),
            RemovalPolicy::Cascade => DeletePolicy::Cascade(
                others
                    .into_iter()
                    .map(|store| store as &mut dyn DependencyResolver)
                    .collect(),
            ),
        };
        Ok(target.delete(key, actor.id(), policy)?)
    }
}

fn check_escalation(actor: &Principal, role: &Role) -> Result<()> {
    if actor.role().can_escalate_to(role) {
        Ok(())
    } else {
        warn!(principal = %actor.id(), role = %role, "Role escalation refused");
        Err(RealmError::Escalation {
            principal: actor.id().clone(),
            role: role.clone(),
        })
    }
}
