//! The root output of a hydration run.

use indexmap::IndexMap;
use rowgraph_core::{EntityId, KeyValue, Value};

/// One entry of a mixed result tuple.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultItem {
    Entity(EntityId),
    Scalar(Value),
}

impl ResultItem {
    pub fn as_entity(&self) -> Option<EntityId> {
        match self {
            ResultItem::Entity(id) => Some(*id),
            ResultItem::Scalar(_) => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            ResultItem::Scalar(v) => Some(v),
            ResultItem::Entity(_) => None,
        }
    }
}

/// One element of a mixed result: the root entity, under position 0 or its
/// index value, followed by scalars under their select-alias names.
///
/// The root and the scalars live apart, so an index value that equals a
/// scalar name cannot displace the entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTuple {
    root: Option<(KeyValue, EntityId)>,
    scalars: IndexMap<String, Value>,
}

impl ResultTuple {
    fn with_root(key: KeyValue, entity: EntityId) -> Self {
        Self {
            root: Some((key, entity)),
            scalars: IndexMap::new(),
        }
    }

    pub fn root(&self) -> Option<EntityId> {
        self.root.as_ref().map(|(_, id)| *id)
    }

    /// Key the root entity is filed under.
    pub fn root_key(&self) -> Option<&KeyValue> {
        self.root.as_ref().map(|(key, _)| key)
    }

    pub fn scalar(&self, name: &str) -> Option<&Value> {
        self.scalars.get(name)
    }

    pub fn scalars(&self) -> &IndexMap<String, Value> {
        &self.scalars
    }

    /// Number of items: the root, if any, plus every scalar.
    pub fn len(&self) -> usize {
        usize::from(self.root.is_some()) + self.scalars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Items in tuple order, root first.
    pub fn items(&self) -> impl Iterator<Item = (KeyValue, ResultItem)> + '_ {
        let root = self
            .root
            .iter()
            .map(|(key, id)| (key.clone(), ResultItem::Entity(*id)));
        let scalars = self
            .scalars
            .iter()
            .map(|(name, value)| (KeyValue::name(name.as_str()), ResultItem::Scalar(value.clone())));
        root.chain(scalars)
    }
}

/// Root results of a run.
///
/// Both layouts keep insertion order and give O(1) positional access through
/// slots.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultContainer {
    /// Pure entity results: positional keys, or index-field values when the
    /// root alias declares one.
    Entities(IndexMap<KeyValue, EntityId>),
    /// Mixed results: one tuple per root element (or scalar-only row).
    Tuples(Vec<ResultTuple>),
}

impl ResultContainer {
    /// Create an empty container in the given layout.
    pub fn new(mixed: bool, capacity: usize) -> Self {
        if mixed {
            ResultContainer::Tuples(Vec::with_capacity(capacity))
        } else {
            ResultContainer::Entities(IndexMap::with_capacity(capacity))
        }
    }

    pub fn is_mixed(&self) -> bool {
        matches!(self, ResultContainer::Tuples(_))
    }

    /// Number of root elements (pure) or tuples (mixed).
    pub fn len(&self) -> usize {
        match self {
            ResultContainer::Entities(map) => map.len(),
            ResultContainer::Tuples(tuples) => tuples.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a root entity, under `key` when the root alias is indexed.
    ///
    /// Returns the slot the entity landed in. A pure container that already
    /// holds `key` replaces the entity in place.
    pub fn push_root(&mut self, entity: EntityId, key: Option<KeyValue>) -> usize {
        match self {
            ResultContainer::Entities(map) => {
                let key = key.unwrap_or_else(|| KeyValue::position(map.len()));
                map.insert_full(key, entity).0
            }
            ResultContainer::Tuples(tuples) => {
                tuples.push(ResultTuple::with_root(
                    key.unwrap_or_else(|| KeyValue::position(0)),
                    entity,
                ));
                tuples.len() - 1
            }
        }
    }

    /// The root entity in `slot`.
    pub fn entity_at(&self, slot: usize) -> Option<EntityId> {
        match self {
            ResultContainer::Entities(map) => map.get_index(slot).map(|(_, id)| *id),
            ResultContainer::Tuples(tuples) => tuples.get(slot)?.root(),
        }
    }

    /// Write scalar select items into the tuple at `slot`, or into a new tuple
    /// when the row produced no root element. Returns the slot written.
    ///
    /// Pure containers carry no scalars; the call is a no-op there.
    pub fn write_scalars(
        &mut self,
        slot: Option<usize>,
        scalars: &IndexMap<String, Value>,
    ) -> Option<usize> {
        let ResultContainer::Tuples(tuples) = self else {
            return None;
        };
        let slot = match slot {
            Some(slot) if slot < tuples.len() => slot,
            _ => {
                tuples.push(ResultTuple::default());
                tuples.len() - 1
            }
        };
        let tuple = &mut tuples[slot];
        for (name, value) in scalars {
            tuple.scalars.insert(name.clone(), value.clone());
        }
        Some(slot)
    }

    /// Root entities in result order.
    pub fn entities(&self) -> Vec<EntityId> {
        match self {
            ResultContainer::Entities(map) => map.values().copied().collect(),
            ResultContainer::Tuples(tuples) => tuples.iter().filter_map(ResultTuple::root).collect(),
        }
    }

    /// Look up a root entity by key (pure layout).
    pub fn get(&self, key: &KeyValue) -> Option<EntityId> {
        match self {
            ResultContainer::Entities(map) => map.get(key).copied(),
            ResultContainer::Tuples(_) => None,
        }
    }

    /// Tuples of a mixed result; empty for pure results.
    pub fn tuples(&self) -> &[ResultTuple] {
        match self {
            ResultContainer::Entities(_) => &[],
            ResultContainer::Tuples(tuples) => tuples,
        }
    }
}
