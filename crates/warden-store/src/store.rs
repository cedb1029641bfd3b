//! The entity store.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info, warn};
use warden_types::{CollectionName, PrincipalId, RecordKey, Timestamp};

use crate::error::StoreError;
use crate::record::{
    Attributes, HistoryEntry, MutationError, Record, RecordRef, RefTarget, References,
};

/// Records that may reference something being removed.
///
/// Implemented by every [`EntityStore`] whose attributes implement
/// [`References`], so one collection can serve as the dependents of another
/// or of a principal.
pub trait DependencyResolver {
    /// Number of records referencing `target`.
    fn count_dependents(&self, target: RefTarget<'_>) -> usize;

    /// Detaches every reference to `target`, appending one history entry per
    /// changed record. Returns the number of records changed.
    fn detach_dependents(&mut self, target: RefTarget<'_>, actor: &PrincipalId) -> usize;
}

/// What `delete` does about records that reference the deleted key.
///
/// The store always checks its own records as well as the listed resolvers.
pub enum DeletePolicy<'a> {
    /// Remove unconditionally; references elsewhere are left dangling.
    Standalone,
    /// Fail with [`StoreError::HasDependents`] while anything references the key.
    Restrict(Vec<&'a dyn DependencyResolver>),
    /// Detach every reference, then remove.
    Cascade(Vec<&'a mut dyn DependencyResolver>),
}

#[derive(Debug, Clone)]
struct Slot<A> {
    generation: u64,
    record: Record<A>,
}

/// Keyed collection of records with per-record audit history.
///
/// Lookups go through a hash map; a second map from insertion generation to
/// key keeps `list` in insertion order. Every mutation is all-or-nothing: the
/// new attributes are built and validated on a copy before anything is
/// committed.
#[derive(Debug, Clone)]
pub struct EntityStore<A> {
    name: CollectionName,
    slots: HashMap<RecordKey, Slot<A>>,
    order: BTreeMap<u64, RecordKey>,
    next_generation: u64,
    last_stamp: Option<Timestamp>,
}

impl<A: Attributes> EntityStore<A> {
    pub fn new(name: CollectionName) -> Self {
        Self {
            name,
            slots: HashMap::new(),
            order: BTreeMap::new(),
            next_generation: 0,
            last_stamp: None,
        }
    }

    /// The collection name used in log lines.
    pub fn name(&self) -> &CollectionName {
        &self.name
    }

    /// Inserts a new record and seeds its history with a creation entry.
    ///
    /// # Errors
    ///
    /// - [`StoreError::DuplicateKey`] if `key` is already present
    /// - [`StoreError::InvalidMutation`] if `attributes` fail validation
    pub fn create(
        &mut self,
        key: RecordKey,
        attributes: A,
        actor: &PrincipalId,
    ) -> Result<RecordRef, StoreError> {
        if self.slots.contains_key(&key) {
            return Err(StoreError::DuplicateKey { key });
        }
        attributes
            .validate()
            .map_err(|e| invalid(&key, &e))?;

        let generation = self.next_generation;
        self.next_generation += 1;
        let entry = HistoryEntry::new(
            tick(&mut self.last_stamp),
            actor.clone(),
            format!("created by {actor}"),
        );

        info!(collection = %self.name, key = %key, actor = %actor, "Record created");
        self.order.insert(generation, key.clone());
        self.slots.insert(
            key.clone(),
            Slot {
                generation,
                record: Record::new(key.clone(), attributes, entry),
            },
        );
        Ok(RecordRef { key, generation })
    }

    pub fn get(&self, key: &RecordKey) -> Option<&Record<A>> {
        self.slots.get(key).map(|slot| &slot.record)
    }

    pub fn contains(&self, key: &RecordKey) -> bool {
        self.slots.contains_key(key)
    }

    /// Applies `mutation` to a copy of the record's attributes and commits
    /// the result with one history entry carrying the returned description.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if `key` is absent
    /// - [`StoreError::InvalidMutation`] if the mutation fails or its result
    ///   does not validate; the record is left unchanged
    pub fn update<F>(
        &mut self,
        key: &RecordKey,
        mutation: F,
        actor: &PrincipalId,
    ) -> Result<(), StoreError>
    where
        F: FnOnce(&mut A) -> Result<String, MutationError>,
    {
        let slot = self.slots.get_mut(key).ok_or_else(|| not_found(key))?;

        let mut draft = slot.record.attributes().clone();
        let description = mutation(&mut draft).map_err(|e| invalid(key, &e))?;
        draft.validate().map_err(|e| invalid(key, &e))?;

        let entry = HistoryEntry::new(tick(&mut self.last_stamp), actor.clone(), description);
        debug!(collection = %self.name, key = %key, actor = %actor, change = entry.description(), "Record updated");
        slot.record.commit(draft, entry);
        Ok(())
    }

    /// Lazily yields records matching `predicate`, in insertion order.
    pub fn list<'a, P>(&'a self, mut predicate: P) -> impl Iterator<Item = &'a Record<A>> + 'a
    where
        P: FnMut(&Record<A>) -> bool + 'a,
    {
        self.iter().filter(move |record| predicate(*record))
    }

    /// Every record, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Record<A>> + '_ {
        self.order
            .values()
            .filter_map(|key| self.slots.get(key))
            .map(|slot| &slot.record)
    }

    /// History of `key`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if `key` is absent.
    pub fn history(&self, key: &RecordKey) -> Result<&[HistoryEntry], StoreError> {
        self.get(key)
            .map(Record::history)
            .ok_or_else(|| not_found(key))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<A: Attributes + References> EntityStore<A> {
    /// Removes a record and returns it, handling references per `policy`.
    ///
    /// A removed key may be created again; the new record starts with a
    /// fresh history and moves to the end of the insertion order.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if `key` is absent
    /// - [`StoreError::HasDependents`] under [`DeletePolicy::Restrict`] while
    ///   any record references `key`; nothing is removed
    pub fn delete(
        &mut self,
        key: &RecordKey,
        actor: &PrincipalId,
        policy: DeletePolicy<'_>,
    ) -> Result<Record<A>, StoreError> {
        if !self.slots.contains_key(key) {
            return Err(not_found(key));
        }

        let collection = self.name.clone();
        let target = RefTarget::Record {
            collection: &collection,
            key,
        };
        match policy {
            DeletePolicy::Standalone => {}
            DeletePolicy::Restrict(resolvers) => {
                let count = self.count_dependents(target)
                    + resolvers
                        .iter()
                        .map(|r| r.count_dependents(target))
                        .sum::<usize>();
                if count > 0 {
                    warn!(collection = %self.name, key = %key, count, "Delete refused: record has dependents");
                    return Err(StoreError::HasDependents {
                        key: key.clone(),
                        count,
                    });
                }
            }
            DeletePolicy::Cascade(resolvers) => {
                let mut detached = self.detach_dependents(target, actor);
                for resolver in resolvers {
                    detached += resolver.detach_dependents(target, actor);
                }
                if detached > 0 {
                    info!(collection = %self.name, key = %key, detached, "References detached");
                }
            }
        }

        let slot = self.slots.remove(key).ok_or_else(|| not_found(key))?;
        self.order.remove(&slot.generation);
        info!(collection = %self.name, key = %key, actor = %actor, "Record deleted");
        Ok(slot.record)
    }
}

impl<A: Attributes + References> DependencyResolver for EntityStore<A> {
    /// A record never counts as its own dependent.
    fn count_dependents(&self, target: RefTarget<'_>) -> usize {
        self.slots
            .values()
            .filter(|slot| {
                !target.is_record(&self.name, slot.record.key())
                    && slot.record.attributes().references(target)
            })
            .count()
    }

    fn detach_dependents(&mut self, target: RefTarget<'_>, actor: &PrincipalId) -> usize {
        let mut changed = 0;
        for dependent in self.order.values() {
            if target.is_record(&self.name, dependent) {
                continue;
            }
            let Some(slot) = self.slots.get_mut(dependent) else {
                continue;
            };
            if !slot.record.attributes().references(target) {
                continue;
            }
            let mut draft = slot.record.attributes().clone();
            if let Some(description) = draft.detach(target) {
                let entry =
                    HistoryEntry::new(tick(&mut self.last_stamp), actor.clone(), description);
                slot.record.commit(draft, entry);
                changed += 1;
            }
        }
        changed
    }
}

/// Next history timestamp, strictly after the previous one.
fn tick(last: &mut Option<Timestamp>) -> Timestamp {
    let now = Timestamp::now_monotonic(*last);
    *last = Some(now);
    now
}

fn not_found(key: &RecordKey) -> StoreError {
    StoreError::NotFound { key: key.clone() }
}

fn invalid(key: &RecordKey, error: &MutationError) -> StoreError {
    StoreError::InvalidMutation {
        key: key.clone(),
        reason: error.reason().to_string(),
    }
}
