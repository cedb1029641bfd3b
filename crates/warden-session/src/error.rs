//! Session and directory error types.

use thiserror::Error;
use warden_types::PrincipalId;

/// Authentication failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("unknown principal '{principal}'")]
    UnknownPrincipal { principal: PrincipalId },

    /// The principal exists but is deactivated.
    #[error("account '{principal}' is inactive, contact an administrator")]
    Inactive { principal: PrincipalId },

    #[error("incorrect credential for '{principal}'")]
    BadCredential { principal: PrincipalId },
}

/// Principal administration failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    #[error("principal '{0}' already exists")]
    DuplicatePrincipal(PrincipalId),

    #[error("principal '{0}' not found")]
    PrincipalNotFound(PrincipalId),
}
