//! Tracking of collections created during one run.

use crate::assembler::Handle;
use rowgraph_core::{CollectionRef, EntityId, PersistentCollection};
use std::collections::HashMap;

/// Owns the bookkeeping for every to-many collection a run creates.
///
/// A collection is created at most once per (entity, relation) pair and
/// reused for the rest of the run. [`finalize`](Self::finalize) snapshots every
/// created collection and clears its hydrating flag.
#[derive(Debug, Default)]
pub struct CollectionManager {
    initialized: HashMap<(Handle, String), CollectionRef>,
    created: Vec<CollectionRef>,
}

impl CollectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// The collection already created this run for `owner.field`.
    pub fn get(&self, owner: Handle, field: &str) -> Option<&CollectionRef> {
        self.initialized.get(&(owner, field.to_string()))
    }

    /// Create a hydrating collection owned by `entity.field`.
    pub fn create(
        &mut self,
        owner: Handle,
        entity: EntityId,
        field: &str,
        element_class: &str,
    ) -> CollectionRef {
        let mut collection = PersistentCollection::new(element_class);
        collection.set_owner(entity, field);
        collection.set_hydrating(true);
        let collection = collection.into_ref();

        self.initialized
            .insert((owner, field.to_string()), collection.clone());
        self.created.push(collection.clone());
        collection
    }

    /// Number of collections created this run.
    pub fn len(&self) -> usize {
        self.created.len()
    }

    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
    }

    /// Snapshot every created collection and mark it as loaded.
    ///
    /// Returns the number of collections finalized.
    pub fn finalize(&mut self) -> usize {
        let count = self.created.len();
        for collection in self.created.drain(..) {
            let mut collection = collection.borrow_mut();
            collection.take_snapshot();
            collection.set_hydrating(false);
        }
        self.initialized.clear();
        count
    }
}
