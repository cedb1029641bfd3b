//! # warden-session: principals, credentials and sessions
//!
//! - [`Principal`]: an actor with a role, an active flag and an opaque [`Credential`]
//! - [`Directory`]: every principal of a realm, keyed by [`PrincipalId`](warden_types::PrincipalId)
//! - [`Session`]: at most one authenticated principal at a time
//! - [`SessionRegistry`]: sessions keyed by connection for multi-user hosts
//!
//! ```
//! use warden_rbac::Role;
//! use warden_session::{Credential, Directory, Principal, Session, SessionEnd};
//! use warden_types::PrincipalId;
//!
//! let admin = PrincipalId::parse("admin")?;
//! let mut directory = Directory::new();
//! directory.provision(Principal::new(
//!     admin.clone(),
//!     "System Admin",
//!     Role::Admin,
//!     Credential::from_secret("admin123"),
//! ))?;
//!
//! let mut session = Session::new();
//! session.authenticate(&directory, &admin, "admin123")?;
//! assert!(session.current().is_some());
//!
//! assert!(matches!(session.end(), SessionEnd::Ended(_)));
//! assert_eq!(session.end(), SessionEnd::NoActiveSession);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod directory;
mod error;
mod principal;
mod session;

pub use directory::Directory;
pub use error::{AuthError, DirectoryError};
pub use principal::{CREDENTIAL_DIGEST_LENGTH, Credential, Principal};
pub use session::{Session, SessionEnd, SessionId, SessionRegistry};
