//! Class and association metadata.
//!
//! Metadata is plain data registered once per class and looked up by class
//! name. The hydrator resolves property access and association direction
//! through it instead of inspecting entity types at runtime.

use crate::error::{Error, MappingError, MappingErrorKind, Result};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;

/// The cardinality of an association between two classes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AssociationKind {
    /// One-to-one: `User` has one `Profile`.
    OneToOne,
    /// Many-to-one: many `Post`s belong to one `User`.
    #[default]
    ManyToOne,
    /// One-to-many: one `User` has many `Post`s.
    OneToMany,
    /// Many-to-many: `Post`s have many `Tag`s via a link table.
    ManyToMany,
}

impl AssociationKind {
    /// Single-valued association.
    pub const fn is_to_one(self) -> bool {
        matches!(self, Self::OneToOne | Self::ManyToOne)
    }

    /// Collection-valued association.
    pub const fn is_to_many(self) -> bool {
        !self.is_to_one()
    }
}

/// Metadata about one association field.
///
/// The owning side persists the foreign key; the inverse side names the owning
/// field through `mapped_by`. An owning side that is mirrored on the target
/// class names the mirror through `inversed_by`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationMapping {
    /// Association field on the source class.
    pub field: String,
    /// Class declaring this association. Filled in by [`ClassMetadata::association`].
    pub source_class: String,
    /// Class of the associated entities.
    pub target_class: String,
    /// Cardinality.
    pub kind: AssociationKind,
    /// Owning field on the target class (inverse side only).
    pub mapped_by: Option<String>,
    /// Inverse field on the target class (owning side of a bidirectional association).
    pub inversed_by: Option<String>,
}

impl AssociationMapping {
    /// Create a new association with required fields.
    pub fn new(field: impl Into<String>, target_class: impl Into<String>, kind: AssociationKind) -> Self {
        Self {
            field: field.into(),
            source_class: String::new(),
            target_class: target_class.into(),
            kind,
            mapped_by: None,
            inversed_by: None,
        }
    }

    pub fn one_to_one(field: impl Into<String>, target_class: impl Into<String>) -> Self {
        Self::new(field, target_class, AssociationKind::OneToOne)
    }

    pub fn many_to_one(field: impl Into<String>, target_class: impl Into<String>) -> Self {
        Self::new(field, target_class, AssociationKind::ManyToOne)
    }

    pub fn one_to_many(field: impl Into<String>, target_class: impl Into<String>) -> Self {
        Self::new(field, target_class, AssociationKind::OneToMany)
    }

    pub fn many_to_many(field: impl Into<String>, target_class: impl Into<String>) -> Self {
        Self::new(field, target_class, AssociationKind::ManyToMany)
    }

    /// Mark this as the inverse side, mirrored by `field` on the target class.
    pub fn mapped_by(mut self, field: impl Into<String>) -> Self {
        self.mapped_by = Some(field.into());
        self
    }

    /// Name the inverse field on the target class (owning side).
    pub fn inversed_by(mut self, field: impl Into<String>) -> Self {
        self.inversed_by = Some(field.into());
        self
    }

    /// Does this side persist the association?
    pub fn is_owning_side(&self) -> bool {
        self.mapped_by.is_none()
    }

    /// Single-valued association.
    pub fn is_to_one(&self) -> bool {
        self.kind.is_to_one()
    }
}

/// Mapping metadata for one entity class.
#[derive(Debug, Clone, Default)]
pub struct ClassMetadata {
    name: String,
    identifier: Vec<String>,
    fields: Vec<String>,
    associations: IndexMap<String, AssociationMapping>,
}

impl ClassMetadata {
    /// Create metadata for a class with no fields yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Declare the identifier fields, in key order. Also declares them as fields.
    pub fn identifier(mut self, fields: &[&str]) -> Self {
        self.identifier = fields.iter().map(|f| (*f).to_string()).collect();
        for field in fields {
            if !self.has_field(field) {
                self.fields.push((*field).to_string());
            }
        }
        self
    }

    /// Declare a scalar field.
    pub fn field(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.has_field(&name) {
            self.fields.push(name);
        }
        self
    }

    /// Declare an association.
    pub fn association(mut self, mut mapping: AssociationMapping) -> Self {
        mapping.source_class.clone_from(&self.name);
        self.associations.insert(mapping.field.clone(), mapping);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier field names in key order.
    pub fn identifier_fields(&self) -> &[String] {
        &self.identifier
    }

    /// Scalar field names in declaration order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f == name)
    }

    pub fn is_identifier(&self, name: &str) -> bool {
        self.identifier.iter().any(|f| f == name)
    }

    pub fn has_association(&self, name: &str) -> bool {
        self.associations.contains_key(name)
    }

    /// Look up an association, failing with a mapping error if it is not mapped.
    pub fn association_mapping(&self, field: &str) -> Result<&AssociationMapping> {
        self.associations.get(field).ok_or_else(|| {
            Error::mapping(
                MappingErrorKind::UnknownAssociation,
                &self.name,
                field,
                "no association is mapped under this name",
            )
        })
    }

    /// All associations in declaration order.
    pub fn associations(&self) -> impl Iterator<Item = &AssociationMapping> {
        self.associations.values()
    }

    /// Find the inverse side of `source_class.source_field` on this class:
    /// the association targeting `source_class` whose `mapped_by` names the field.
    pub fn inverse_association_for(
        &self,
        source_class: &str,
        source_field: &str,
    ) -> Option<&AssociationMapping> {
        self.associations.values().find(|a| {
            a.target_class == source_class && a.mapped_by.as_deref() == Some(source_field)
        })
    }
}

/// Registry of class metadata, indexed by class name.
#[derive(Debug, Clone, Default)]
pub struct MetadataRegistry {
    classes: HashMap<String, Arc<ClassMetadata>>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) metadata for a class.
    pub fn register(&mut self, class: ClassMetadata) -> &mut Self {
        self.classes.insert(class.name.clone(), Arc::new(class));
        self
    }

    /// Builder-style registration.
    pub fn with(mut self, class: ClassMetadata) -> Self {
        self.register(class);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Look up a class, failing with a mapping error if it is unknown.
    pub fn class(&self, name: &str) -> Result<Arc<ClassMetadata>> {
        self.classes.get(name).cloned().ok_or_else(|| {
            Error::Mapping(MappingError::new(
                MappingErrorKind::UnknownClass,
                name,
                "class is not registered",
            ))
        })
    }

    /// Check that every association targets a registered class and that both
    /// sides of bidirectional associations name each other.
    pub fn validate(&self) -> Result<()> {
        let mut names: Vec<&String> = self.classes.keys().collect();
        names.sort();

        for name in names {
            let class = &self.classes[name];
            if class.identifier.is_empty() {
                return Err(Error::Mapping(MappingError::new(
                    MappingErrorKind::MissingIdentifier,
                    &class.name,
                    "class declares no identifier",
                )));
            }

            for assoc in class.associations() {
                let target = self.class(&assoc.target_class).map_err(|_| {
                    Error::mapping(
                        MappingErrorKind::UnknownClass,
                        &class.name,
                        &assoc.field,
                        format!("target class '{}' is not registered", assoc.target_class),
                    )
                })?;

                if let Some(mapped_by) = &assoc.mapped_by {
                    let owning = target.associations.get(mapped_by);
                    if !owning.is_some_and(|o| o.target_class == class.name) {
                        return Err(Error::mapping(
                            MappingErrorKind::MissingInverse,
                            &class.name,
                            &assoc.field,
                            format!(
                                "mapped_by='{}' but {}.{} does not point back to {}",
                                mapped_by, target.name, mapped_by, class.name
                            ),
                        ));
                    }
                }

                if let Some(inversed_by) = &assoc.inversed_by {
                    let inverse = target.associations.get(inversed_by);
                    if !inverse.is_some_and(|i| i.mapped_by.as_deref() == Some(assoc.field.as_str())) {
                        return Err(Error::mapping(
                            MappingErrorKind::MissingInverse,
                            &class.name,
                            &assoc.field,
                            format!(
                                "inversed_by='{}' but {}.{} is not mapped by '{}'",
                                inversed_by, target.name, inversed_by, assoc.field
                            ),
                        ));
                    }
                }
            }
        }

        Ok(())
    }
}
