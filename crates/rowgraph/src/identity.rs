//! Duplicate detection across join fan-out.

use rowgraph_core::{IdentityKey, KeyValue};
use std::collections::HashMap;

/// Where in the shape an identity was seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackerPath {
    /// A root alias, by shape index.
    Root(usize),
    /// A joined alias under its parent, by shape indices.
    Joined { parent: usize, alias: usize },
}

/// A previously produced position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Position {
    /// Slot in the result container.
    Slot(usize),
    /// Key inside the parent's collection.
    Key(KeyValue),
}

/// Maps (path, parent key, own key) to the position produced for it.
///
/// Root paths use the absent key as parent key, so they are keyed by their
/// own identity only. Joined paths include the parent's key, which lets two
/// parents each hold a child with the same identity.
#[derive(Debug, Default)]
pub struct IdentityTracker {
    entries: HashMap<TrackerPath, HashMap<IdentityKey, HashMap<IdentityKey, Position>>>,
    len: usize,
}

impl IdentityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(
        &self,
        path: TrackerPath,
        parent_key: &IdentityKey,
        own_key: &IdentityKey,
    ) -> Option<&Position> {
        self.entries.get(&path)?.get(parent_key)?.get(own_key)
    }

    /// Record a position, replacing a stale entry for the same key.
    pub fn record(
        &mut self,
        path: TrackerPath,
        parent_key: &IdentityKey,
        own_key: &IdentityKey,
        position: Position,
    ) {
        let previous = self
            .entries
            .entry(path)
            .or_default()
            .entry(parent_key.clone())
            .or_default()
            .insert(own_key.clone(), position);
        if previous.is_none() {
            self.len += 1;
        }
    }

    /// Number of recorded identities.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
