//! Identity-map aware entity arena.
//!
//! The store owns every entity materialized through it and guarantees that
//! each (class, identity key) pair maps to exactly one instance:
//!
//! - **Uniqueness**: the same identity always yields the same [`EntityId`]
//! - **Stability**: ids are arena slots and never move
//! - **Refresh**: with the refresh hint set, scalar state of a known instance
//!   is overwritten from the incoming row

use rowgraph_core::{
    ClassMetadata, Entity, EntityFactory, EntityId, Error, FactoryHints, FieldData,
    IdentityKey, MappingErrorKind, MetadataRegistry, PropertyValue, Record, Result, Value,
};
use std::collections::{HashMap, HashSet};

/// Builds an empty instance of one class.
pub type Constructor = Box<dyn Fn() -> Box<dyn Entity>>;

/// Arena of entities with an identity map keyed by (class, identity key).
#[derive(Default)]
pub struct EntityStore {
    entities: Vec<Box<dyn Entity>>,
    identities: HashMap<(String, IdentityKey), EntityId>,
    constructors: HashMap<String, Constructor>,
}

impl EntityStore {
    /// Create an empty store. Classes without a registered constructor are
    /// materialized as [`Record`]s.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the constructor used for instances of `class`.
    pub fn register_constructor<F>(&mut self, class: impl Into<String>, constructor: F)
    where
        F: Fn() -> Box<dyn Entity> + 'static,
    {
        self.constructors.insert(class.into(), Box::new(constructor));
    }

    /// Builder-style [`register_constructor`](Self::register_constructor).
    #[must_use]
    pub fn with_constructor<F>(mut self, class: impl Into<String>, constructor: F) -> Self
    where
        F: Fn() -> Box<dyn Entity> + 'static,
    {
        self.register_constructor(class, constructor);
        self
    }

    /// Number of entities in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Borrow an entity.
    pub fn get(&self, id: EntityId) -> Option<&dyn Entity> {
        self.entities.get(id.index()).map(|e| &**e)
    }

    /// Mutably borrow an entity.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut dyn Entity> {
        let entity = self.entities.get_mut(id.index())?;
        Some(&mut **entity)
    }

    /// Find the instance known under `key` for `class`.
    pub fn lookup(&self, class: &str, key: &IdentityKey) -> Option<EntityId> {
        self.identities.get(&(class.to_string(), key.clone())).copied()
    }

    /// Read a scalar property, `None` if unset or not a scalar.
    pub fn scalar(&self, id: EntityId, field: &str) -> Option<Value> {
        match self.get(id)?.get(field)? {
            PropertyValue::Scalar(v) => Some(v),
            _ => None,
        }
    }

    /// Put an already built entity under management.
    ///
    /// Fails when another instance with the same identity is already stored.
    pub fn attach(&mut self, entity: Box<dyn Entity>, key: IdentityKey) -> Result<EntityId> {
        let slot = (entity.class_name().to_string(), key);
        if self.identities.contains_key(&slot) {
            return Err(Error::Custom(format!(
                "an instance of {} with identity {} is already managed",
                slot.0, slot.1
            )));
        }
        let id = self.push(entity);
        self.identities.insert(slot, id);
        Ok(id)
    }

    fn push(&mut self, entity: Box<dyn Entity>) -> EntityId {
        let id = EntityId(u64::try_from(self.entities.len()).unwrap_or(u64::MAX));
        self.entities.push(entity);
        id
    }

    fn instantiate(&self, class: &str) -> Box<dyn Entity> {
        match self.constructors.get(class) {
            Some(constructor) => constructor(),
            None => Box::new(Record::new(class)),
        }
    }

    fn entity_mut(&mut self, id: EntityId) -> Result<&mut Box<dyn Entity>> {
        self.entities
            .get_mut(id.index())
            .ok_or_else(|| Error::Custom(format!("entity {id} is not managed by this store")))
    }

    /// Render an entity and everything reachable from it as JSON.
    ///
    /// Scalar fields are rendered first, then associations in declaration
    /// order. Unset associations are omitted. An entity already on the current
    /// path renders as `{"$ref": "<Class>#<id>"}` so bidirectional links
    /// terminate.
    pub fn to_json(&self, id: EntityId, registry: &MetadataRegistry) -> Result<serde_json::Value> {
        let mut path = HashSet::new();
        self.render(id, registry, &mut path)
    }

    fn render(
        &self,
        id: EntityId,
        registry: &MetadataRegistry,
        path: &mut HashSet<EntityId>,
    ) -> Result<serde_json::Value> {
        let entity = self
            .get(id)
            .ok_or_else(|| Error::Custom(format!("entity {id} is not managed by this store")))?;

        if !path.insert(id) {
            return Ok(serde_json::json!({ "$ref": format!("{}{}", entity.class_name(), id) }));
        }

        let class = registry.class(entity.class_name())?;
        let mut out = serde_json::Map::new();

        for field in class.fields() {
            if let Some(PropertyValue::Scalar(value)) = entity.get(field) {
                out.insert(field.clone(), value.to_json());
            }
        }

        for assoc in class.associations() {
            let rendered = match entity.get(&assoc.field) {
                None => continue,
                Some(PropertyValue::Null) => serde_json::Value::Null,
                Some(PropertyValue::Entity(target)) => self.render(target, registry, path)?,
                Some(PropertyValue::Collection(coll)) => {
                    let members = coll.borrow().entities();
                    let mut items = Vec::with_capacity(members.len());
                    for member in members {
                        items.push(self.render(member, registry, path)?);
                    }
                    serde_json::Value::Array(items)
                }
                Some(PropertyValue::Scalar(value)) => value.to_json(),
            };
            out.insert(assoc.field.clone(), rendered);
        }

        path.remove(&id);
        Ok(serde_json::Value::Object(out))
    }
}

impl std::fmt::Debug for EntityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStore")
            .field("entities", &self.entities)
            .field("identities", &self.identities.len())
            .field("constructors", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl EntityFactory for EntityStore {
    #[tracing::instrument(level = "trace", skip(self, class, data), fields(class = class.name()))]
    fn create_entity(
        &mut self,
        class: &ClassMetadata,
        data: &FieldData,
        hints: &FactoryHints,
    ) -> Result<EntityId> {
        let parts = class
            .identifier_fields()
            .iter()
            .map(|f| data.get(f).cloned().unwrap_or(Value::Null))
            .collect();
        let key = IdentityKey::from_parts(parts);
        if key.is_absent() {
            return Err(Error::mapping(
                MappingErrorKind::MissingIdentifier,
                class.name(),
                class.identifier_fields().join(","),
                "cannot materialize an entity without identifier values",
            ));
        }

        let slot = (class.name().to_string(), key);
        if let Some(&id) = self.identities.get(&slot) {
            if hints.refresh {
                tracing::trace!(entity = %id, "Refreshing managed entity");
                let entity = self.entity_mut(id)?;
                for (field, value) in data {
                    entity.set(field, PropertyValue::Scalar(value.clone()))?;
                }
            }
            return Ok(id);
        }

        let mut entity = self.instantiate(class.name());
        for (field, value) in data {
            entity.set(field, PropertyValue::Scalar(value.clone()))?;
        }
        let id = self.push(entity);
        tracing::trace!(entity = %id, identity = %slot.1, "Materialized entity");
        self.identities.insert(slot, id);
        Ok(id)
    }

    fn get_property(&self, entity: EntityId, field: &str) -> Result<Option<PropertyValue>> {
        self.get(entity)
            .map(|e| e.get(field))
            .ok_or_else(|| Error::Custom(format!("entity {entity} is not managed by this store")))
    }

    fn set_property(&mut self, entity: EntityId, field: &str, value: PropertyValue) -> Result<()> {
        self.entity_mut(entity)?.set(field, value)
    }
}
