//! Records, their attributes and their history.

use std::fmt::{self, Display};

use serde::Serialize;
use warden_types::{CollectionName, PrincipalId, RecordKey, Timestamp};

/// Reason a mutation or a set of attributes was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationError {
    reason: String,
}

impl MutationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl Display for MutationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

impl std::error::Error for MutationError {}

/// Domain attributes stored in a record.
///
/// Implement this for each domain's record type (or a tagged union of
/// them). Validation is opt-in through the default method.
pub trait Attributes: Clone {
    /// Checks domain invariants. Runs on create and after every mutation,
    /// before anything is committed.
    fn validate(&self) -> Result<(), MutationError> {
        Ok(())
    }
}

/// What a reference points at.
///
/// Principal identifiers and record keys are separate namespaces, and a
/// record key only means something together with its collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefTarget<'a> {
    Record {
        collection: &'a CollectionName,
        key: &'a RecordKey,
    },
    Principal(&'a PrincipalId),
}

impl RefTarget<'_> {
    /// Whether this is the record `key` of `collection`.
    pub fn is_record(&self, collection: &CollectionName, key: &RecordKey) -> bool {
        matches!(self, Self::Record { collection: c, key: k } if *c == collection && *k == key)
    }

    /// Whether this is the record `key` of the collection named `collection`.
    pub fn is_record_in(&self, collection: &str, key: &RecordKey) -> bool {
        matches!(self, Self::Record { collection: c, key: k } if c.as_str() == collection && *k == key)
    }

    /// Whether this is the principal `id`.
    pub fn is_principal(&self, id: &PrincipalId) -> bool {
        matches!(self, Self::Principal(p) if *p == id)
    }
}

impl Display for RefTarget<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Record { collection, key } => write!(f, "{collection}/{key}"),
            Self::Principal(id) => write!(f, "principal {id}"),
        }
    }
}

/// Cross-references from one record to another record or to a principal.
///
/// Domains without references implement this with the defaults
/// (`impl References for Note {}`).
pub trait References {
    /// Returns whether these attributes refer to `target`.
    fn references(&self, _target: RefTarget<'_>) -> bool {
        false
    }

    /// Drops every reference to `target` and describes what changed, or
    /// returns `None` if there was nothing to drop. Must leave the attributes
    /// valid.
    fn detach(&mut self, _target: RefTarget<'_>) -> Option<String> {
        None
    }
}

/// Immutable audit line appended on every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    at: Timestamp,
    actor: PrincipalId,
    description: String,
}

impl HistoryEntry {
    pub(crate) fn new(at: Timestamp, actor: PrincipalId, description: String) -> Self {
        Self {
            at,
            actor,
            description,
        }
    }

    pub fn at(&self) -> Timestamp {
        self.at
    }

    pub fn actor(&self) -> &PrincipalId {
        &self.actor
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.at, self.actor, self.description)
    }
}

/// A stored entity: key, attributes and append-only history.
///
/// Records are owned by their store; callers receive shared references and
/// hold keys, never mutable aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record<A> {
    key: RecordKey,
    attributes: A,
    history: Vec<HistoryEntry>,
}

impl<A> Record<A> {
    pub(crate) fn new(key: RecordKey, attributes: A, created: HistoryEntry) -> Self {
        Self {
            key,
            attributes,
            history: vec![created],
        }
    }

    pub fn key(&self) -> &RecordKey {
        &self.key
    }

    pub fn attributes(&self) -> &A {
        &self.attributes
    }

    /// History, oldest first.
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Time of the first history entry.
    pub fn created_at(&self) -> Timestamp {
        self.history.first().map_or(Timestamp::EPOCH, HistoryEntry::at)
    }

    /// Time of the latest history entry.
    pub fn updated_at(&self) -> Timestamp {
        self.history.last().map_or(Timestamp::EPOCH, HistoryEntry::at)
    }

    /// Replaces the attributes and appends the matching history entry.
    /// The only way attributes change once a record exists.
    pub(crate) fn commit(&mut self, attributes: A, entry: HistoryEntry) {
        self.attributes = attributes;
        self.history.push(entry);
    }
}

/// Handle returned by `create`: the key plus the insertion generation.
///
/// The generation distinguishes a re-created key from the record that
/// previously held it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordRef {
    pub key: RecordKey,
    pub generation: u64,
}
