//! Principals and their credentials.

use serde::Serialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use warden_rbac::{Role, Subject};
use warden_types::PrincipalId;

/// Length of a credential digest in bytes.
pub const CREDENTIAL_DIGEST_LENGTH: usize = 32;

/// Opaque credential: only a SHA-256 digest of the secret is kept.
///
/// Verification compares digests in constant time. This is an unsalted
/// digest and is not meant to resist offline attacks.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    digest: [u8; CREDENTIAL_DIGEST_LENGTH],
}

impl Credential {
    /// Derives a credential from a plaintext secret.
    pub fn from_secret(secret: &str) -> Self {
        Self {
            digest: digest_of(secret),
        }
    }

    /// Returns whether `candidate` is the secret this credential was made from.
    pub fn verify(&self, candidate: &str) -> bool {
        let digest = digest_of(candidate);
        self.digest[..].ct_eq(&digest[..]).into()
    }
}

fn digest_of(secret: &str) -> [u8; CREDENTIAL_DIGEST_LENGTH] {
    let mut digest = [0u8; CREDENTIAL_DIGEST_LENGTH];
    digest.copy_from_slice(&Sha256::digest(secret.as_bytes()));
    digest
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// An actor known to the directory.
///
/// The credential is never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    id: PrincipalId,
    display_name: String,
    role: Role,
    active: bool,
    /// Organizational unit (department, branch, ward) for scoped checks.
    unit: Option<String>,
    #[serde(skip)]
    credential: Credential,
}

impl Principal {
    /// Creates an active principal with no unit.
    pub fn new(
        id: PrincipalId,
        display_name: impl Into<String>,
        role: Role,
        credential: Credential,
    ) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            role,
            active: true,
            unit: None,
            credential,
        }
    }

    /// Places the principal in an organizational unit.
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn id(&self) -> &PrincipalId {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    /// Returns whether the principal belongs to `unit`.
    pub fn in_unit(&self, unit: &str) -> bool {
        self.unit.as_deref() == Some(unit)
    }

    pub(crate) fn credential(&self) -> &Credential {
        &self.credential
    }

    pub(crate) fn set_role(&mut self, role: Role) {
        self.role = role;
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub(crate) fn set_unit(&mut self, unit: Option<String>) {
        self.unit = unit;
    }

    pub(crate) fn set_credential(&mut self, credential: Credential) {
        self.credential = credential;
    }
}

impl Subject for Principal {
    fn subject_id(&self) -> &PrincipalId {
        &self.id
    }

    fn role(&self) -> &Role {
        &self.role
    }

    fn is_active(&self) -> bool {
        self.active
    }
}
