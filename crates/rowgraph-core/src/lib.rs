//! Core types and traits for rowgraph.
//!
//! This crate holds the vocabulary shared by the hydrator and its
//! collaborators:
//!
//! - `Value` and `Row` for fetched data
//! - `KeyValue` / `IdentityKey` for hashable keys over values
//! - `ClassMetadata`, `AssociationMapping` and `MetadataRegistry`
//! - the `Entity` capability trait and the dynamic `Record`
//! - `PersistentCollection` for to-many associations
//! - the `EntityFactory` and `ChangeRegister` collaborator contracts

pub mod collection;
pub mod entity;
pub mod error;
pub mod key;
pub mod metadata;
pub mod row;
pub mod value;

pub use collection::{CollectionRef, PersistentCollection};
pub use entity::{
    ChangeRegister, Entity, EntityFactory, EntityId, FactoryHints, FieldData, PropertyValue,
    Record,
};
pub use error::{
    ConfigError, Error, MappingError, MappingErrorKind, Result, SourceError, TypeError,
};
pub use key::{IdentityKey, KeyValue};
pub use metadata::{AssociationKind, AssociationMapping, ClassMetadata, MetadataRegistry};
pub use row::{ColumnInfo, Row};
pub use value::Value;
