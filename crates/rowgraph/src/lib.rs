//! Single-pass hydration of joined SQL rows into object graphs.
//!
//! `rowgraph` takes the flat, denormalized rows produced by a joined query and
//! assembles them into entities with correct identity, association direction
//! and collection membership:
//!
//! - entities repeated by join fan-out are materialized once
//! - "association not loaded" (unset) is kept apart from "loaded but empty"
//! - results are either plain root entities or mixed entity + scalar tuples
//! - rows are consumed one at a time; the result set is never buffered
//!
//! # Example
//!
//! ```ignore
//! use rowgraph::{ObjectHydrator, ResultShape};
//! use rowgraph_session::{EntityStore, OriginalData};
//!
//! let shape = ResultShape::builder()
//!     .entity("u", "User")
//!     .field("u", "u_id", "id")
//!     .joined_entity("p", "Post", "u", "posts")
//!     .field("p", "p_id", "id")
//!     .build()?;
//!
//! let mut store = EntityStore::new();
//! let mut originals = OriginalData::new();
//! let hydration = ObjectHydrator::new(&registry).hydrate_all(
//!     &shape,
//!     &mut rows.into_iter(),
//!     &mut store,
//!     &mut originals,
//! )?;
//! ```

pub mod assembler;
pub mod collections;
pub mod config;
pub mod decoder;
pub mod hydrator;
pub mod identity;
pub mod result;
pub mod shape;
pub mod source;

pub use assembler::{GraphAssembler, Handle};
pub use collections::CollectionManager;
pub use config::HydrationConfig;
pub use decoder::{AliasSegment, DecodedRow, RowDecoder};
pub use hydrator::{Hydration, HydrationStats, ObjectHydrator};
pub use identity::{IdentityTracker, Position, TrackerPath};
pub use result::{ResultContainer, ResultItem, ResultTuple};
pub use shape::{
    BoundAlias, BoundShape, ColumnMapping, ColumnRole, EntityAlias, ResultShape, ResultShapeBuilder,
};
pub use source::{IterSource, RowSource};

pub use rowgraph_core::{
    AssociationKind, AssociationMapping, ChangeRegister, ClassMetadata, CollectionRef, ColumnInfo,
    Entity, EntityFactory, EntityId, Error, FactoryHints, FieldData, IdentityKey, KeyValue,
    MappingErrorKind, MetadataRegistry, PersistentCollection, PropertyValue, Record, Result, Row,
    Value,
};
