//! Graph assembly, one decoded row at a time.
//!
//! The assembler owns all per-run state: the metadata map of materialized
//! objects, the result pointers, the identity tracker, the collection
//! manager and the result container. It is created fresh for every run and
//! consumed by [`GraphAssembler::finish`].

use crate::collections::CollectionManager;
use crate::config::HydrationConfig;
use crate::decoder::{AliasSegment, DecodedRow};
use crate::hydrator::HydrationStats;
use crate::identity::{IdentityTracker, Position, TrackerPath};
use crate::result::ResultContainer;
use crate::shape::{BoundAlias, BoundShape};
use rowgraph_core::{
    AssociationMapping, ChangeRegister, ClassMetadata, EntityFactory, EntityId, Error,
    FactoryHints, IdentityKey, KeyValue, MappingErrorKind, PropertyValue, Result,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Dense per-run handle of a materialized object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(pub usize);

/// Entry of the per-run metadata map.
#[derive(Debug, Clone)]
struct Materialized {
    entity: EntityId,
    class: Arc<ClassMetadata>,
}

/// Builds the object graph from decoded rows.
pub struct GraphAssembler<'run> {
    shape: &'run BoundShape,
    factory: &'run mut dyn EntityFactory,
    register: &'run mut dyn ChangeRegister,
    hints: FactoryHints,
    notify: bool,
    objects: Vec<Materialized>,
    handles: HashMap<EntityId, Handle>,
    /// Most recent object per alias, by shape index.
    pointers: Vec<Option<Handle>>,
    tracker: IdentityTracker,
    collections: CollectionManager,
    /// Single-valued associations settled in this run.
    resolved: HashSet<(Handle, String)>,
    result: ResultContainer,
    rows: usize,
}

impl<'run> GraphAssembler<'run> {
    pub fn new(
        shape: &'run BoundShape,
        config: &HydrationConfig,
        factory: &'run mut dyn EntityFactory,
        register: &'run mut dyn ChangeRegister,
    ) -> Self {
        Self {
            shape,
            factory,
            register,
            hints: config.factory_hints(),
            notify: config.notify_change_register,
            objects: Vec::new(),
            handles: HashMap::new(),
            pointers: vec![None; shape.aliases().len()],
            tracker: IdentityTracker::new(),
            collections: CollectionManager::new(),
            resolved: HashSet::new(),
            result: ResultContainer::new(shape.is_mixed(), config.capacity_hint),
            rows: 0,
        }
    }

    /// Attach the entities of one row to the graph.
    pub fn hydrate_row(&mut self, row: &DecodedRow) -> Result<()> {
        let shape = self.shape;
        self.rows += 1;

        let mut latest_root = None;
        for (index, alias) in shape.aliases().iter().enumerate() {
            match alias.parent {
                None => {
                    if let Some(slot) = self.hydrate_root(index, alias, row.segment(index))? {
                        latest_root = Some(slot);
                    }
                }
                Some(parent) => self.hydrate_joined(index, parent, alias, row)?,
            }
        }

        if row.has_scalars() {
            self.result.write_scalars(latest_root, row.scalars());
        }

        tracing::trace!(
            row = self.rows,
            objects = self.objects.len(),
            results = self.result.len(),
            "Hydrated row"
        );
        Ok(())
    }

    fn hydrate_root(
        &mut self,
        index: usize,
        alias: &BoundAlias,
        segment: &AliasSegment,
    ) -> Result<Option<usize>> {
        if !segment.is_present() {
            self.pointers[index] = None;
            return Ok(None);
        }

        let path = TrackerPath::Root(index);
        let no_parent = IdentityKey::absent();
        let seen = match self.tracker.lookup(path, &no_parent, &segment.key) {
            Some(Position::Slot(slot)) => Some(*slot),
            _ => None,
        };

        let (slot, entity) = match seen {
            Some(slot) => {
                let entity = if self.shape.is_simple() {
                    self.factory
                        .create_entity(&alias.class, &segment.data, &self.hints)?
                } else {
                    self.result.entity_at(slot).ok_or_else(|| {
                        Error::Custom(format!("result slot {slot} holds no entity"))
                    })?
                };
                (slot, entity)
            }
            None => {
                let entity = self
                    .factory
                    .create_entity(&alias.class, &segment.data, &self.hints)?;
                let key = match &alias.index_by {
                    Some(field) => Some(self.index_key(entity, &alias.class, field)?),
                    None => None,
                };
                let slot = self.result.push_root(entity, key);
                self.tracker
                    .record(path, &no_parent, &segment.key, Position::Slot(slot));
                (slot, entity)
            }
        };

        let handle = self.register_object(entity, &alias.class);
        self.pointers[index] = Some(handle);
        Ok(Some(slot))
    }

    fn hydrate_joined(
        &mut self,
        index: usize,
        parent: usize,
        alias: &BoundAlias,
        row: &DecodedRow,
    ) -> Result<()> {
        // Orphan: the parent was not resolved in this row.
        let Some(base) = self.pointers[parent] else {
            self.pointers[index] = None;
            return Ok(());
        };
        let relation = alias.relation.as_ref().ok_or_else(|| {
            Error::config(format!("joined alias '{}' has no relation", alias.name))
        })?;

        self.pointers[index] = if relation.kind.is_to_many() {
            self.hydrate_to_many(index, parent, alias, relation, base, row)?
        } else {
            self.hydrate_to_one(alias, relation, base, row.segment(index))?
        };
        Ok(())
    }

    fn hydrate_to_many(
        &mut self,
        index: usize,
        parent: usize,
        alias: &BoundAlias,
        relation: &AssociationMapping,
        base: Handle,
        row: &DecodedRow,
    ) -> Result<Option<Handle>> {
        let segment = row.segment(index);
        let field = relation.field.as_str();
        let owner = self.objects[base.0].entity;

        if !segment.is_present() {
            // Loaded but empty.
            if self.factory.get_property(owner, field)?.is_none() {
                let collection = self
                    .collections
                    .create(base, owner, field, alias.class.name());
                self.set_managed(owner, field, PropertyValue::Collection(collection))?;
            }
            return Ok(None);
        }

        let collection = match self.collections.get(base, field) {
            Some(collection) => collection.clone(),
            None => {
                let collection = self
                    .collections
                    .create(base, owner, field, alias.class.name());
                self.set_managed(owner, field, PropertyValue::Collection(collection.clone()))?;
                collection
            }
        };

        let path = TrackerPath::Joined { parent, alias: index };
        let parent_key = &row.segment(parent).key;
        let known = match self.tracker.lookup(path, parent_key, &segment.key) {
            // A key no longer in the collection is stale.
            Some(Position::Key(key)) => collection.borrow().get(key),
            _ => None,
        };

        let child = match known {
            Some(child) => child,
            None => {
                let child = self
                    .factory
                    .create_entity(&alias.class, &segment.data, &self.hints)?;
                let key = match &alias.index_by {
                    Some(index_field) => {
                        let key = self.index_key(child, &alias.class, index_field)?;
                        collection.borrow_mut().set(key.clone(), child);
                        key
                    }
                    None => collection.borrow_mut().add(child),
                };
                self.tracker
                    .record(path, parent_key, &segment.key, Position::Key(key));
                child
            }
        };

        Ok(Some(self.register_object(child, &alias.class)))
    }

    fn hydrate_to_one(
        &mut self,
        alias: &BoundAlias,
        relation: &AssociationMapping,
        base: Handle,
        segment: &AliasSegment,
    ) -> Result<Option<Handle>> {
        let field = relation.field.as_str();
        let owner = self.objects[base.0].entity;

        // Once settled in this run, null included, the value is never
        // overwritten. A null left by an earlier run is settled again.
        let current = self.factory.get_property(owner, field)?;
        let settled = self.resolved.contains(&(base, field.to_string()));
        let resolved = match current {
            Some(value) if settled || !value.is_null() => value,
            _ if !segment.is_present() => {
                self.set_managed(owner, field, PropertyValue::Null)?;
                PropertyValue::Null
            }
            _ => {
                let child = self
                    .factory
                    .create_entity(&alias.class, &segment.data, &self.hints)?;
                self.set_managed(owner, field, PropertyValue::Entity(child))?;
                let child_handle = self.register_object(child, &alias.class);
                self.link_bidirectional(base, child_handle, relation)?;
                PropertyValue::Entity(child)
            }
        };

        self.resolved.insert((base, field.to_string()));

        Ok(match resolved {
            PropertyValue::Entity(child) => Some(self.register_object(child, &alias.class)),
            _ => None,
        })
    }

    /// Set the back-reference of a single-valued association on `child`.
    ///
    /// On the owning side the back-reference is the inverse association the
    /// child's class maps for `mapping`; on the inverse side it is the child's
    /// `mapped_by` field. Unidirectional and to-many mappings are left alone,
    /// as is a back-reference that holds an entity or was settled in this run.
    pub fn link_bidirectional(
        &mut self,
        parent: Handle,
        child: Handle,
        mapping: &AssociationMapping,
    ) -> Result<()> {
        if !mapping.is_to_one() {
            return Ok(());
        }
        let parent_entity = self.objects[parent.0].entity;
        let Materialized {
            entity: child_entity,
            class: child_class,
        } = self.objects[child.0].clone();

        let back_field = match mapping.mapped_by.as_deref() {
            None => match child_class.inverse_association_for(&mapping.source_class, &mapping.field) {
                Some(inverse) if inverse.is_to_one() => inverse.field.clone(),
                _ => return Ok(()),
            },
            Some(mapped_by) => {
                if !child_class.has_association(mapped_by) {
                    return Err(Error::mapping(
                        MappingErrorKind::MissingInverse,
                        mapping.source_class.as_str(),
                        mapping.field.as_str(),
                        format!("mapped_by names {}.{}, which is not mapped", child_class.name(), mapped_by),
                    ));
                }
                mapped_by.to_string()
            }
        };

        let open = match self.factory.get_property(child_entity, &back_field)? {
            None => true,
            Some(value) => value.is_null() && !self.resolved.contains(&(child, back_field.clone())),
        };
        if open {
            self.set_managed(child_entity, &back_field, PropertyValue::Entity(parent_entity))?;
            self.resolved.insert((child, back_field));
        }
        Ok(())
    }

    /// Register an entity in the metadata map, once.
    fn register_object(&mut self, entity: EntityId, class: &Arc<ClassMetadata>) -> Handle {
        if let Some(handle) = self.handles.get(&entity) {
            return *handle;
        }
        let handle = Handle(self.objects.len());
        self.objects.push(Materialized {
            entity,
            class: Arc::clone(class),
        });
        self.handles.insert(entity, handle);
        handle
    }

    /// Store `value` on the entity, then report it to the change register.
    ///
    /// A value the entity rejects is never reported.
    fn set_managed(&mut self, entity: EntityId, field: &str, value: PropertyValue) -> Result<()> {
        if !self.notify {
            return self.factory.set_property(entity, field, value);
        }
        let recorded = value.clone();
        self.factory.set_property(entity, field, value)?;
        self.register.set_original_property(entity, field, &recorded);
        Ok(())
    }

    fn index_key(&self, entity: EntityId, class: &ClassMetadata, field: &str) -> Result<KeyValue> {
        let found = match self.factory.get_property(entity, field)? {
            Some(PropertyValue::Scalar(value)) if !value.is_null() => return Ok(KeyValue(value)),
            Some(other) => other.kind_name(),
            None => "unset",
        };
        Err(Error::mapping(
            MappingErrorKind::InvalidIndexField,
            class.name(),
            field,
            format!("index field is {found}, which cannot key a collection"),
        ))
    }

    /// The entity the pointer of the alias at `index` currently refers to.
    pub fn pointer(&self, index: usize) -> Option<EntityId> {
        self.pointers
            .get(index)
            .copied()
            .flatten()
            .map(|h| self.objects[h.0].entity)
    }

    /// The handle assigned to `entity` in this run.
    pub fn handle_of(&self, entity: EntityId) -> Option<Handle> {
        self.handles.get(&entity).copied()
    }

    /// Number of objects in the metadata map.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn result(&self) -> &ResultContainer {
        &self.result
    }

    /// Finalize collections and hand off the result.
    pub fn finish(mut self) -> (ResultContainer, HydrationStats) {
        let collections = self.collections.finalize();
        let stats = HydrationStats {
            rows: self.rows,
            entities: self.objects.len(),
            collections,
            elapsed: std::time::Duration::ZERO,
        };
        (self.result, stats)
    }
}

impl std::fmt::Debug for GraphAssembler<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphAssembler")
            .field("objects", &self.objects.len())
            .field("pointers", &self.pointers)
            .field("tracked", &self.tracker.len())
            .field("collections", &self.collections.len())
            .field("results", &self.result.len())
            .field("rows", &self.rows)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::RowDecoder;
    use crate::shape::ResultShape;
    use rowgraph_core::{AssociationMapping, ClassMetadata, MetadataRegistry, Row, Value};
    use rowgraph_session::{EntityStore, OriginalData};

    fn registry() -> MetadataRegistry {
        MetadataRegistry::new()
            .with(
                ClassMetadata::new("User")
                    .identifier(&["id"])
                    .field("name")
                    .association(AssociationMapping::one_to_many("posts", "Post").mapped_by("author"))
                    .association(AssociationMapping::one_to_one("profile", "Profile").inversed_by("user")),
            )
            .with(
                ClassMetadata::new("Post")
                    .identifier(&["id"])
                    .field("title")
                    .association(AssociationMapping::many_to_one("author", "User").inversed_by("posts")),
            )
            .with(
                ClassMetadata::new("Profile")
                    .identifier(&["id"])
                    .association(AssociationMapping::one_to_one("user", "User").mapped_by("profile")),
            )
    }

    fn user_posts(registry: &MetadataRegistry) -> BoundShape {
        let shape = ResultShape::builder()
            .entity("u", "User")
            .field("u", "u_id", "id")
            .joined_entity("p", "Post", "u", "posts")
            .field("p", "p_id", "id")
            .build()
            .unwrap();
        BoundShape::bind(&shape, registry).unwrap()
    }

    fn row(user: Value, post: Value) -> Row {
        Row::from_pairs([("u_id", user), ("p_id", post)])
    }

    #[test]
    fn test_stale_entry_is_rematerialized() {
        let registry = registry();
        let shape = user_posts(&registry);
        let mut store = EntityStore::new();
        let mut originals = OriginalData::new();
        let config = HydrationConfig::default();
        let mut decoder = RowDecoder::new(&shape);

        let mut assembler = GraphAssembler::new(&shape, &config, &mut store, &mut originals);
        assembler
            .hydrate_row(&decoder.decode(&row(Value::Int(1), Value::Int(10))))
            .unwrap();
        let user = assembler.result().entity_at(0).unwrap();
        let collection = assembler
            .factory
            .get_property(user, "posts")
            .unwrap()
            .unwrap()
            .as_collection()
            .cloned()
            .unwrap();

        // Drop the tracked element behind the tracker's back.
        collection.borrow_mut().remove(&KeyValue::position(0));
        assembler
            .hydrate_row(&decoder.decode(&row(Value::Int(1), Value::Int(10))))
            .unwrap();

        let coll = collection.borrow();
        assert_eq!(coll.len(), 1);
        assert_eq!(coll.last().map(|(k, _)| k.clone()), Some(KeyValue::position(1)));
    }

    #[test]
    fn test_orphan_clears_pointer() {
        let registry = registry();
        let shape = user_posts(&registry);
        let mut store = EntityStore::new();
        let mut originals = OriginalData::new();
        let config = HydrationConfig::default();
        let mut decoder = RowDecoder::new(&shape);

        let mut assembler = GraphAssembler::new(&shape, &config, &mut store, &mut originals);
        assembler
            .hydrate_row(&decoder.decode(&row(Value::Int(1), Value::Int(10))))
            .unwrap();
        assert!(assembler.pointer(1).is_some());

        assembler
            .hydrate_row(&decoder.decode(&row(Value::Null, Value::Int(11))))
            .unwrap();
        assert_eq!(assembler.pointer(0), None);
        assert_eq!(assembler.pointer(1), None);
        assert_eq!(assembler.object_count(), 2);
    }

    #[test]
    fn test_each_object_registered_once() {
        let registry = registry();
        let shape = user_posts(&registry);
        let mut store = EntityStore::new();
        let mut originals = OriginalData::new();
        let config = HydrationConfig::default();
        let mut decoder = RowDecoder::new(&shape);

        let mut assembler = GraphAssembler::new(&shape, &config, &mut store, &mut originals);
        for (u, p) in [(1, 10), (1, 11), (1, 10), (2, 10)] {
            assembler
                .hydrate_row(&decoder.decode(&row(Value::Int(u), Value::Int(p))))
                .unwrap();
        }

        // Users 1 and 2, posts 10 and 11; post 10 is shared.
        assert_eq!(assembler.object_count(), 4);
        let (result, stats) = assembler.finish();
        assert_eq!(result.len(), 2);
        assert_eq!(stats.rows, 4);
        assert_eq!(stats.collections, 2);
    }

    #[test]
    fn test_link_bidirectional_owning_side() {
        let registry = registry();
        let shape = ResultShape::builder()
            .entity("u", "User")
            .field("u", "u_id", "id")
            .joined_entity("pr", "Profile", "u", "profile")
            .field("pr", "pr_id", "id")
            .build()
            .unwrap();
        let shape = BoundShape::bind(&shape, &registry).unwrap();
        let mut store = EntityStore::new();
        let mut originals = OriginalData::new();
        let config = HydrationConfig::default();
        let mut decoder = RowDecoder::new(&shape);

        let mut assembler = GraphAssembler::new(&shape, &config, &mut store, &mut originals);
        assembler
            .hydrate_row(&decoder.decode(&Row::from_pairs([
                ("u_id", Value::Int(1)),
                ("pr_id", Value::Int(9)),
            ])))
            .unwrap();
        let user = assembler.pointer(0).unwrap();
        let profile = assembler.pointer(1).unwrap();
        let user_handle = assembler.handle_of(user).unwrap();
        assert_eq!(assembler.handle_of(profile), Some(Handle(1)));
        assert_eq!(user_handle, Handle(0));
        drop(assembler);

        assert_eq!(
            store.get_property(profile, "user").unwrap(),
            Some(PropertyValue::Entity(user))
        );
        assert_eq!(
            originals.original(profile, "user"),
            Some(&PropertyValue::Entity(user))
        );
    }
}
