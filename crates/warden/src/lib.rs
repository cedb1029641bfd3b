//! # Warden: a role-gated entity store with an audit trail
//!
//! A [`Realm`] ties together the pieces of the workspace:
//!
//! ```text
//! ┌─────────────────────────────── Realm<A> ───────────────────────────────┐
//! │  Session ──► PolicyEnforcer ──► EntityStore<A> (one per collection)    │
//! │     │          (AccessPolicy)       └─ Record { attributes, history }  │
//! │  Directory (principals, roles, credentials)                            │
//! └────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every operation authorizes the logged-in principal first; every
//! successful mutation appends exactly one history entry naming that
//! principal.
//!
//! | Operation                          | Capability          |
//! |------------------------------------|---------------------|
//! | `create`                           | `create_record`     |
//! | `get`                              | `read_record`       |
//! | `update`, `update_scoped`          | `update_record`     |
//! | `delete`, `delete_scoped`          | `delete_record`     |
//! | `list`                             | `view_all`          |
//! | `history`                          | `view_history`      |
//! | `open_collection`, principal admin | `manage_principals` |
//!
//! ```
//! use warden::{Realm, RemovalPolicy};
//! use warden_rbac::{Role, StandardPolicies};
//! use warden_session::{Credential, Principal};
//! use warden_store::{Attributes, References};
//! use warden_types::{CollectionName, PrincipalId, RecordKey};
//!
//! #[derive(Debug, Clone)]
//! struct Note(String);
//! impl Attributes for Note {}
//! impl References for Note {}
//!
//! let admin = PrincipalId::parse("admin")?;
//! let mut realm = Realm::new("demo", StandardPolicies::hierarchical());
//! realm.bootstrap(Principal::new(admin.clone(), "Admin", Role::Admin, Credential::from_secret("pw")))?;
//!
//! let notes = CollectionName::parse("notes")?;
//! let key = RecordKey::parse("n-1")?;
//! assert!(realm.create(&notes, key.clone(), Note("hi".into())).is_err()); // not logged in
//!
//! realm.login(&admin, "pw")?;
//! realm.open_collection(notes.clone())?;
//! realm.create(&notes, key.clone(), Note("hi".into()))?;
//! assert_eq!(realm.history(&notes, &key)?.len(), 1);
//! realm.delete(&notes, &key, RemovalPolicy::Standalone)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod realm;

pub use error::RealmError;
pub use realm::{Realm, RemovalPolicy, Result};
