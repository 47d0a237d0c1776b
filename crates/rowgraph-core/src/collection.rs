//! Owner-tagged container for to-many associations.

use crate::entity::EntityId;
use crate::key::KeyValue;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;

/// Shared handle to a collection; the owning entity's property and the
/// hydration run both hold one while the collection is being populated.
pub type CollectionRef = Rc<RefCell<PersistentCollection>>;

/// An ordered, keyed collection of entity ids backing a to-many association.
///
/// Elements appended with [`add`](Self::add) get integer keys in insertion
/// order; [`set`](Self::set) places an element under an explicit key (custom
/// index fields). While `hydrating` is set the collection is being filled from
/// rows; [`take_snapshot`](Self::take_snapshot) records the loaded contents as
/// the baseline for change detection.
#[derive(Debug, Clone)]
pub struct PersistentCollection {
    element_class: String,
    owner: Option<(EntityId, String)>,
    elements: IndexMap<KeyValue, EntityId>,
    snapshot: Vec<(KeyValue, EntityId)>,
    next_position: usize,
    hydrating: bool,
}

impl PersistentCollection {
    /// Create an empty collection of `element_class` instances.
    pub fn new(element_class: impl Into<String>) -> Self {
        Self {
            element_class: element_class.into(),
            owner: None,
            elements: IndexMap::new(),
            snapshot: Vec::new(),
            next_position: 0,
            hydrating: false,
        }
    }

    /// Wrap into a shared handle.
    pub fn into_ref(self) -> CollectionRef {
        Rc::new(RefCell::new(self))
    }

    pub fn element_class(&self) -> &str {
        &self.element_class
    }

    /// Tag the collection with the entity and association field holding it.
    pub fn set_owner(&mut self, owner: EntityId, field: impl Into<String>) {
        self.owner = Some((owner, field.into()));
    }

    pub fn owner(&self) -> Option<(EntityId, &str)> {
        self.owner.as_ref().map(|(id, field)| (*id, field.as_str()))
    }

    pub fn set_hydrating(&mut self, hydrating: bool) {
        self.hydrating = hydrating;
    }

    pub fn is_hydrating(&self) -> bool {
        self.hydrating
    }

    /// Append an element under the next integer key and return that key.
    pub fn add(&mut self, entity: EntityId) -> KeyValue {
        let key = KeyValue::position(self.next_position);
        self.next_position += 1;
        self.elements.insert(key.clone(), entity);
        key
    }

    /// Place an element under an explicit key, replacing any previous element.
    pub fn set(&mut self, key: KeyValue, entity: EntityId) {
        if let Some(position) = key.as_position().and_then(|p| usize::try_from(p).ok()) {
            self.next_position = self.next_position.max(position + 1);
        }
        self.elements.insert(key, entity);
    }

    /// Remove the element under `key`, keeping the order of the others.
    pub fn remove(&mut self, key: &KeyValue) -> Option<EntityId> {
        self.elements.shift_remove(key)
    }

    pub fn contains_key(&self, key: &KeyValue) -> bool {
        self.elements.contains_key(key)
    }

    pub fn get(&self, key: &KeyValue) -> Option<EntityId> {
        self.elements.get(key).copied()
    }

    /// Last element in insertion order.
    pub fn last(&self) -> Option<(&KeyValue, EntityId)> {
        self.elements.last().map(|(k, v)| (k, *v))
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// `(key, element)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&KeyValue, EntityId)> {
        self.elements.iter().map(|(k, v)| (k, *v))
    }

    /// Elements in insertion order.
    pub fn entities(&self) -> Vec<EntityId> {
        self.elements.values().copied().collect()
    }

    /// Record the current contents as the loaded baseline.
    pub fn take_snapshot(&mut self) {
        self.snapshot = self
            .elements
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
    }

    pub fn snapshot(&self) -> &[(KeyValue, EntityId)] {
        &self.snapshot
    }

    /// Have the contents changed since the last snapshot?
    pub fn is_dirty(&self) -> bool {
        self.snapshot.len() != self.elements.len()
            || self
                .snapshot
                .iter()
                .zip(self.elements.iter())
                .any(|((sk, sv), (k, v))| sk != k || sv != v)
    }
}
