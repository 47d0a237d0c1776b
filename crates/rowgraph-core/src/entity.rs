//! Entity capability interface and the collaborator contracts of hydration.
//!
//! Entities are reached through [`Entity::get`] / [`Entity::set`] rather than
//! through runtime reflection. Entities live in whatever store the
//! [`EntityFactory`] maintains and are referenced everywhere else by the
//! stable [`EntityId`] the factory hands out.

use crate::collection::CollectionRef;
use crate::error::{Error, Result, TypeError};
use crate::metadata::ClassMetadata;
use crate::value::Value;
use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;

/// Stable handle of an entity instance, issued by the entity factory.
///
/// The factory is identity-map aware: materializing the same identity twice
/// yields the same `EntityId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Slot index for arena-backed stores.
    pub fn index(self) -> usize {
        usize::try_from(self.0).unwrap_or(usize::MAX)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Field values of one alias in one row, keyed by field name.
pub type FieldData = IndexMap<String, Value>;

/// The value held by an entity property.
///
/// An association property that was never set reads as `None` from
/// [`Entity::get`]; one that was resolved to "nothing" holds [`PropertyValue::Null`].
#[derive(Debug, Clone)]
pub enum PropertyValue {
    /// Scalar column value
    Scalar(Value),
    /// Single-valued association
    Entity(EntityId),
    /// Collection-valued association
    Collection(CollectionRef),
    /// Association resolved to nothing
    Null,
}

impl PropertyValue {
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            PropertyValue::Scalar(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<EntityId> {
        match self {
            PropertyValue::Entity(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&CollectionRef> {
        match self {
            PropertyValue::Collection(c) => Some(c),
            _ => None,
        }
    }

    /// Name of the variant, as used in type errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            PropertyValue::Scalar(v) => v.type_name(),
            PropertyValue::Entity(_) => "ENTITY",
            PropertyValue::Collection(_) => "COLLECTION",
            PropertyValue::Null => "NULL",
        }
    }

    /// Unwrap a scalar for storage in a typed field named `field`.
    ///
    /// A `Null` becomes `Value::Null`; associations are a type error.
    pub fn into_scalar(self, field: &str) -> Result<Value> {
        match self {
            PropertyValue::Scalar(v) => Ok(v),
            PropertyValue::Null => Ok(Value::Null),
            other => Err(Error::Type(TypeError {
                expected: "scalar value",
                actual: other.kind_name().to_string(),
                column: Some(field.to_string()),
            })),
        }
    }
}

impl PartialEq for PropertyValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PropertyValue::Scalar(a), PropertyValue::Scalar(b)) => a == b,
            (PropertyValue::Entity(a), PropertyValue::Entity(b)) => a == b,
            (PropertyValue::Collection(a), PropertyValue::Collection(b)) => Rc::ptr_eq(a, b),
            (PropertyValue::Null, PropertyValue::Null) => true,
            _ => false,
        }
    }
}

impl From<Value> for PropertyValue {
    fn from(value: Value) -> Self {
        PropertyValue::Scalar(value)
    }
}

/// Per-class property access.
pub trait Entity: fmt::Debug {
    /// Name of the class this instance belongs to.
    fn class_name(&self) -> &str;

    /// Read a property. `None` means the property was never set.
    fn get(&self, field: &str) -> Option<PropertyValue>;

    /// Write a property.
    fn set(&mut self, field: &str, value: PropertyValue) -> Result<()>;
}

/// A dynamically shaped entity: class name plus an ordered property map.
///
/// Used for classes that have no dedicated Rust type.
#[derive(Debug, Clone)]
pub struct Record {
    class: String,
    properties: IndexMap<String, PropertyValue>,
}

impl Record {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            properties: IndexMap::new(),
        }
    }

    /// Builder-style property assignment.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(field.into(), value.into());
        self
    }

    /// Properties in assignment order.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Entity for Record {
    fn class_name(&self) -> &str {
        &self.class
    }

    fn get(&self, field: &str) -> Option<PropertyValue> {
        self.properties.get(field).cloned()
    }

    fn set(&mut self, field: &str, value: PropertyValue) -> Result<()> {
        self.properties.insert(field.to_string(), value);
        Ok(())
    }
}

/// Hints passed to the factory with every materialization request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FactoryHints {
    /// Overwrite the scalar state of an instance the factory already holds.
    pub refresh: bool,
}

/// Allocates or reuses entity instances and exposes their properties.
pub trait EntityFactory {
    /// Materialize an entity of `class` from one row's field data.
    ///
    /// Must return the existing id when an instance with the same identity is
    /// already known.
    fn create_entity(
        &mut self,
        class: &ClassMetadata,
        data: &FieldData,
        hints: &FactoryHints,
    ) -> Result<EntityId>;

    /// Read a property of an instance. `Ok(None)` means the property is unset.
    fn get_property(&self, entity: EntityId, field: &str) -> Result<Option<PropertyValue>>;

    /// Write a property of an instance.
    fn set_property(&mut self, entity: EntityId, field: &str, value: PropertyValue) -> Result<()>;
}

/// Receives the baseline value of every managed property the hydrator sets,
/// so later dirty checks compare against what was loaded.
pub trait ChangeRegister {
    fn set_original_property(&mut self, entity: EntityId, field: &str, value: &PropertyValue);
}
