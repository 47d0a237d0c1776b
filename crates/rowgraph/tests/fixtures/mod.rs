//! Shared metadata, rows and helpers for hydration integration tests.

#![allow(dead_code)]

use rowgraph::{
    AssociationMapping, ClassMetadata, CollectionRef, ColumnInfo, EntityFactory, EntityId, Hydration,
    HydrationConfig, MetadataRegistry, ObjectHydrator, PropertyValue, Result, ResultShape, Row,
    Value,
};
use rowgraph_session::{EntityStore, OriginalData};
use std::sync::Arc;

/// Users write posts, posts collect comments, users own one profile, and a
/// plain parent/child pair.
pub fn registry() -> MetadataRegistry {
    let registry = MetadataRegistry::new()
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
                .field("slug")
                .association(AssociationMapping::many_to_one("author", "User").inversed_by("posts"))
                .association(AssociationMapping::one_to_many("comments", "Comment").mapped_by("post")),
        )
        .with(
            ClassMetadata::new("Comment")
                .identifier(&["id"])
                .field("body")
                .association(AssociationMapping::many_to_one("post", "Post").inversed_by("comments")),
        )
        .with(
            ClassMetadata::new("Profile")
                .identifier(&["id"])
                .field("bio")
                .association(AssociationMapping::one_to_one("user", "User").mapped_by("profile")),
        )
        .with(
            ClassMetadata::new("Parent")
                .identifier(&["id"])
                .field("name")
                .association(AssociationMapping::one_to_many("children", "Child").mapped_by("parent")),
        )
        .with(
            ClassMetadata::new("Child")
                .identifier(&["id"])
                .association(AssociationMapping::many_to_one("parent", "Parent").inversed_by("children")),
        );
    registry.validate().expect("fixture metadata is consistent");
    registry
}

/// Rows sharing one column list.
pub fn rows(columns: &[&str], values: Vec<Vec<Value>>) -> Vec<Row> {
    let info = Arc::new(ColumnInfo::new(
        columns.iter().map(|c| (*c).to_string()).collect(),
    ));
    values
        .into_iter()
        .map(|v| Row::with_columns(Arc::clone(&info), v))
        .collect()
}

pub fn int(v: i32) -> Value {
    Value::Int(v)
}

pub fn text(v: &str) -> Value {
    Value::Text(v.to_string())
}

/// Everything a run leaves behind.
pub struct Run {
    pub store: EntityStore,
    pub originals: OriginalData,
    pub hydration: Hydration,
}

impl Run {
    pub fn roots(&self) -> Vec<EntityId> {
        self.hydration.result.entities()
    }

    pub fn scalar(&self, entity: EntityId, field: &str) -> Value {
        self.store.scalar(entity, field).expect("scalar is set")
    }

    pub fn property(&self, entity: EntityId, field: &str) -> Option<PropertyValue> {
        self.store.get_property(entity, field).expect("entity is managed")
    }

    pub fn collection(&self, entity: EntityId, field: &str) -> CollectionRef {
        self.property(entity, field)
            .and_then(|p| p.as_collection().cloned())
            .expect("collection is set")
    }

    /// Identifier values of a collection's members, in order.
    pub fn member_ids(&self, entity: EntityId, field: &str) -> Vec<Value> {
        self.collection(entity, field)
            .borrow()
            .entities()
            .into_iter()
            .map(|id| self.scalar(id, "id"))
            .collect()
    }

    pub fn json(&self, registry: &MetadataRegistry, entity: EntityId) -> serde_json::Value {
        self.store.to_json(entity, registry).expect("render entity")
    }
}

pub fn try_hydrate_with(
    registry: &MetadataRegistry,
    shape: &ResultShape,
    rows: Vec<Row>,
    config: HydrationConfig,
) -> Result<Run> {
    let mut store = EntityStore::new();
    let mut originals = OriginalData::new();
    let hydration = ObjectHydrator::new(registry).with_config(config).hydrate_all(
        shape,
        &mut rows.into_iter(),
        &mut store,
        &mut originals,
    )?;
    Ok(Run {
        store,
        originals,
        hydration,
    })
}

pub fn hydrate(registry: &MetadataRegistry, shape: &ResultShape, rows: Vec<Row>) -> Run {
    try_hydrate_with(registry, shape, rows, HydrationConfig::default()).expect("hydration succeeds")
}
