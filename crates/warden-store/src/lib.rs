//! # warden-store: keyed records with an audit trail
//!
//! An [`EntityStore`] owns records of one attribute type `A`. Every record
//! carries an append-only history; every successful mutation appends exactly
//! one [`HistoryEntry`] naming the actor, and every failed one leaves the
//! record untouched.
//!
//! ```text
//! create(key, attrs, actor) ──► Record { attrs, history: ["created by actor"] }
//! update(key, mutation, actor)
//!     clone attrs ─► mutation(&mut draft) ─► validate(draft) ─► commit + 1 entry
//!                         │ Err                   │ Err
//!                         └──── InvalidMutation ◄─┘   (record unchanged)
//! delete(key, actor, policy)
//!     Standalone │ Restrict(resolvers) │ Cascade(resolvers)
//! ```
//!
//! The store performs no authorization; callers gate each operation first
//! (see `warden::Realm`).
//!
//! ```
//! use warden_store::{Attributes, DeletePolicy, EntityStore, MutationError, References};
//! use warden_types::{CollectionName, PrincipalId, RecordKey};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Item {
//!     quantity: i64,
//! }
//!
//! impl Attributes for Item {
//!     fn validate(&self) -> Result<(), MutationError> {
//!         if self.quantity < 0 {
//!             return Err(MutationError::new("quantity cannot be negative"));
//!         }
//!         Ok(())
//!     }
//! }
//!
//! impl References for Item {}
//!
//! let actor = PrincipalId::parse("admin")?;
//! let key = RecordKey::parse("widget")?;
//! let mut store = EntityStore::new(CollectionName::parse("inventory")?);
//!
//! store.create(key.clone(), Item { quantity: 5 }, &actor)?;
//! store.update(&key, |item| { item.quantity -= 2; Ok("sold 2".into()) }, &actor)?;
//! assert!(store.update(&key, |item| { item.quantity -= 10; Ok("sold 10".into()) }, &actor).is_err());
//!
//! assert_eq!(store.get(&key).map(|r| r.attributes().quantity), Some(3));
//! assert_eq!(store.history(&key)?.len(), 2);
//!
//! store.delete(&key, &actor, DeletePolicy::Standalone)?;
//! assert!(store.get(&key).is_none());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod record;
mod store;


pub use error::StoreError;
pub use record::{
    Attributes, HistoryEntry, MutationError, Record, RecordRef, RefTarget, References,
};
pub use store::{DeletePolicy, DependencyResolver, EntityStore};
