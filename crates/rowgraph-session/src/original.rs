//! Loaded-state baselines for dirty detection.
//!
//! The hydrator reports every managed property it sets. `OriginalData` keeps
//! those values per entity so a later flush can compare the current state of
//! an entity against what was loaded.

use rowgraph_core::{ChangeRegister, EntityId, PropertyValue};
use std::collections::HashMap;

/// Per-entity, per-field register of originally loaded property values.
#[derive(Debug, Default)]
pub struct OriginalData {
    originals: HashMap<EntityId, HashMap<String, PropertyValue>>,
}

impl OriginalData {
    /// Create an empty register.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The baseline recorded for `entity.field`, if any.
    pub fn original(&self, entity: EntityId, field: &str) -> Option<&PropertyValue> {
        self.originals.get(&entity)?.get(field)
    }

    /// All fields recorded for an entity.
    pub fn fields(&self, entity: EntityId) -> Vec<&str> {
        let mut fields: Vec<&str> = self
            .originals
            .get(&entity)
            .map(|m| m.keys().map(String::as_str).collect())
            .unwrap_or_default();
        fields.sort_unstable();
        fields
    }

    /// Check if any baseline exists for the entity.
    pub fn has_entity(&self, entity: EntityId) -> bool {
        self.originals.contains_key(&entity)
    }

    /// Does `current` differ from the recorded baseline?
    ///
    /// A field without a baseline is treated as dirty.
    #[tracing::instrument(level = "trace", skip(self, current))]
    pub fn is_dirty(&self, entity: EntityId, field: &str, current: &PropertyValue) -> bool {
        let dirty = self.original(entity, field) != Some(current);
        tracing::trace!(dirty, "Dirty check result");
        dirty
    }

    /// Forget the baselines of one entity.
    pub fn clear(&mut self, entity: EntityId) {
        self.originals.remove(&entity);
    }

    /// Forget all baselines.
    pub fn clear_all(&mut self) {
        self.originals.clear();
    }

    /// Number of entities with at least one baseline.
    #[must_use]
    pub fn len(&self) -> usize {
        self.originals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.originals.is_empty()
    }
}

impl ChangeRegister for OriginalData {
    fn set_original_property(&mut self, entity: EntityId, field: &str, value: &PropertyValue) {
        tracing::trace!(entity = %entity, field, "Recording original property");
        self.originals
            .entry(entity)
            .or_default()
            .insert(field.to_string(), value.clone());
    }
}
