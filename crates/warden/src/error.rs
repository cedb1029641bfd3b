use thiserror::Error;
use warden_rbac::{AuthzError, Role};
use warden_session::{AuthError, DirectoryError};
use warden_store::StoreError;
use warden_types::{CollectionName, PrincipalId};

/// Every way a realm operation can fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RealmError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error("collection '{0}' does not exist")]
    UnknownCollection(CollectionName),

    /// The acting principal tried to grant a role less restrictive than its own.
    #[error("'{principal}' may not grant the role '{role}'")]
    Escalation { principal: PrincipalId, role: Role },

    #[error("'{principal}' cannot demote, remove or deactivate itself")]
    SelfTarget { principal: PrincipalId },

    /// The target holds a less restrictive role than the acting principal.
    #[error("'{principal}' may not administer '{target}' ({role})")]
    Outranked {
        principal: PrincipalId,
        target: PrincipalId,
        role: Role,
    },

    /// Records still reference the principal.
    #[error("principal '{principal}' is referenced by {count} record(s)")]
    PrincipalInUse { principal: PrincipalId, count: usize },

    /// Bootstrapping is only possible while the directory is empty.
    #[error("realm already has principals")]
    AlreadyBootstrapped,
}
