//! Result-shape descriptors.
//!
//! A [`ResultShape`] describes how the columns of a result set map onto entity
//! aliases and scalar select items. Shapes are plain data: they can be built
//! with [`ResultShape::builder`] or loaded from JSON, and are validated on
//! construction. Before hydration a shape is bound to a [`MetadataRegistry`],
//! producing a [`BoundShape`] in which every class, relation and identifier
//! has been resolved.
//!
//! # Example
//!
//! ```ignore
//! let shape = ResultShape::builder()
//!     .entity("u", "User")
//!     .field("u", "u__id", "id")
//!     .field("u", "u__name", "name")
//!     .joined_entity("p", "Post", "u", "posts")
//!     .field("p", "p__id", "id")
//!     .build()?;
//! ```

use rowgraph_core::{
    AssociationMapping, ClassMetadata, Error, MappingErrorKind, MetadataRegistry, Result,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// One entity position in the result shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityAlias {
    /// Alias name, unique within the shape
    pub alias: String,
    /// Entity class materialized for this alias
    pub class: String,
    /// Parent alias for joined entities
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Association field on the parent's class linking to this alias
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
    /// Field whose value keys this alias's entities in their container
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_by: Option<String>,
}

impl EntityAlias {
    /// Root aliases have no parent.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// What one result column carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnMapping {
    /// An entity field of an alias.
    Field {
        column: String,
        alias: String,
        field: String,
    },
    /// A non-entity select item.
    Scalar { column: String, name: String },
}

impl ColumnMapping {
    /// The result column name.
    pub fn column(&self) -> &str {
        match self {
            ColumnMapping::Field { column, .. } | ColumnMapping::Scalar { column, .. } => column,
        }
    }
}

/// Describes the aliases and columns of one result set.
///
/// Aliases are kept in declaration order, in which every parent precedes its
/// children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultShape {
    aliases: Vec<EntityAlias>,
    columns: Vec<ColumnMapping>,
    /// Force the mixed (tuple) result layout.
    #[serde(default)]
    mixed: bool,
}

impl ResultShape {
    /// Start building a shape.
    pub fn builder() -> ResultShapeBuilder {
        ResultShapeBuilder::default()
    }

    /// Load a shape from JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let shape: ResultShape = serde_json::from_str(json)?;
        shape.validate()?;
        Ok(shape)
    }

    /// Serialize the shape to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Entity aliases in shape order.
    pub fn aliases(&self) -> &[EntityAlias] {
        &self.aliases
    }

    /// Look up an alias by name.
    pub fn alias(&self, name: &str) -> Option<&EntityAlias> {
        self.aliases.iter().find(|a| a.alias == name)
    }

    fn alias_index(&self, name: &str) -> Option<usize> {
        self.aliases.iter().position(|a| a.alias == name)
    }

    /// Column mappings in declaration order.
    pub fn columns(&self) -> &[ColumnMapping] {
        &self.columns
    }

    /// Number of entity results per row: the root aliases. Joined aliases
    /// hang off a root and do not count.
    pub fn entity_result_count(&self) -> usize {
        self.aliases.iter().filter(|a| a.is_root()).count()
    }

    /// Scalar select-alias names in column order.
    pub fn scalar_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter_map(|c| match c {
                ColumnMapping::Scalar { name, .. } => Some(name.as_str()),
                ColumnMapping::Field { .. } => None,
            })
            .collect()
    }

    /// Mixed results are rows of tuples: implied by any scalar select item or
    /// by more than one root entity alias.
    pub fn is_mixed(&self) -> bool {
        self.mixed || self.entity_result_count() > 1 || !self.scalar_names().is_empty()
    }

    /// A simple shape has at most one entity result; it selects the simple
    /// root dedup mode.
    pub fn is_simple(&self) -> bool {
        self.entity_result_count() <= 1
    }

    /// Check the shape for structural problems.
    pub fn validate(&self) -> Result<()> {
        if self.aliases.is_empty() && self.columns.is_empty() {
            return Err(Error::config("result shape selects nothing"));
        }

        let mut seen = HashSet::new();
        for (index, alias) in self.aliases.iter().enumerate() {
            if !seen.insert(alias.alias.as_str()) {
                return Err(Error::config(format!("duplicate alias '{}'", alias.alias)));
            }
            match (&alias.parent, &alias.relation) {
                (None, None) => {}
                (Some(parent), Some(_)) => match self.alias_index(parent) {
                    Some(p) if p < index => {}
                    Some(_) => {
                        return Err(Error::config(format!(
                            "alias '{}' is declared before its parent '{}'",
                            alias.alias, parent
                        )));
                    }
                    None => {
                        return Err(Error::config(format!(
                            "alias '{}' has unknown parent '{}'",
                            alias.alias, parent
                        )));
                    }
                },
                (Some(_), None) | (None, Some(_)) => {
                    return Err(Error::config(format!(
                        "alias '{}' must declare both a parent and a relation, or neither",
                        alias.alias
                    )));
                }
            }
        }

        let mut columns = HashSet::new();
        let mut scalars = HashSet::new();
        for mapping in &self.columns {
            if !columns.insert(mapping.column()) {
                return Err(Error::config(format!(
                    "column '{}' is mapped more than once",
                    mapping.column()
                )));
            }
            match mapping {
                ColumnMapping::Field { alias, column, .. } => {
                    if self.alias_index(alias).is_none() {
                        return Err(Error::config(format!(
                            "column '{column}' maps to unknown alias '{alias}'"
                        )));
                    }
                }
                ColumnMapping::Scalar { name, .. } => {
                    if !scalars.insert(name.as_str()) {
                        return Err(Error::config(format!(
                            "scalar select alias '{name}' is used more than once"
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

/// Builder for [`ResultShape`].
#[derive(Debug, Default)]
pub struct ResultShapeBuilder {
    shape: ResultShape,
    errors: Vec<String>,
}

impl ResultShapeBuilder {
    /// Add a root entity alias.
    pub fn entity(mut self, alias: impl Into<String>, class: impl Into<String>) -> Self {
        self.shape.aliases.push(EntityAlias {
            alias: alias.into(),
            class: class.into(),
            parent: None,
            relation: None,
            index_by: None,
        });
        self
    }

    /// Add an entity alias joined to `parent` through its `relation` field.
    pub fn joined_entity(
        mut self,
        alias: impl Into<String>,
        class: impl Into<String>,
        parent: impl Into<String>,
        relation: impl Into<String>,
    ) -> Self {
        self.shape.aliases.push(EntityAlias {
            alias: alias.into(),
            class: class.into(),
            parent: Some(parent.into()),
            relation: Some(relation.into()),
            index_by: None,
        });
        self
    }

    /// Map `column` to `field` of `alias`.
    pub fn field(
        mut self,
        alias: impl Into<String>,
        column: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        self.shape.columns.push(ColumnMapping::Field {
            column: column.into(),
            alias: alias.into(),
            field: field.into(),
        });
        self
    }

    /// Map `column` to the scalar select item `name`.
    pub fn scalar(mut self, column: impl Into<String>, name: impl Into<String>) -> Self {
        self.shape.columns.push(ColumnMapping::Scalar {
            column: column.into(),
            name: name.into(),
        });
        self
    }

    /// Key the entities of `alias` by the value of `field`.
    pub fn index_by(mut self, alias: &str, field: impl Into<String>) -> Self {
        match self.shape.aliases.iter_mut().find(|a| a.alias == alias) {
            Some(entry) => entry.index_by = Some(field.into()),
            None => self
                .errors
                .push(format!("index_by refers to unknown alias '{alias}'")),
        }
        self
    }

    /// Force the mixed result layout.
    pub fn mixed(mut self, mixed: bool) -> Self {
        self.shape.mixed = mixed;
        self
    }

    /// Validate and return the shape.
    pub fn build(self) -> Result<ResultShape> {
        if let Some(message) = self.errors.into_iter().next() {
            return Err(Error::config(message));
        }
        self.shape.validate()?;
        Ok(self.shape)
    }
}

/// An alias resolved against class metadata.
#[derive(Debug, Clone)]
pub struct BoundAlias {
    pub name: String,
    pub class: Arc<ClassMetadata>,
    /// Index of the parent alias in shape order.
    pub parent: Option<usize>,
    /// Association on the parent's class that links to this alias.
    pub relation: Option<AssociationMapping>,
    pub index_by: Option<String>,
}

impl BoundAlias {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Resolved role of one result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnRole {
    /// Field of the alias at this index.
    Field { alias: usize, field: String },
    /// Scalar select item.
    Scalar { name: String },
}

/// A [`ResultShape`] bound to class metadata.
#[derive(Debug, Clone)]
pub struct BoundShape {
    aliases: Vec<BoundAlias>,
    columns: Vec<(String, ColumnRole)>,
    mixed: bool,
    simple: bool,
}

impl BoundShape {
    /// Resolve every alias, relation, field and identifier of `shape`.
    ///
    /// Mapping problems surface here, before any row is pulled.
    #[tracing::instrument(level = "debug", skip_all, fields(aliases = shape.aliases().len()))]
    pub fn bind(shape: &ResultShape, registry: &MetadataRegistry) -> Result<Self> {
        shape.validate()?;

        let mut aliases: Vec<BoundAlias> = Vec::with_capacity(shape.aliases.len());
        for alias in &shape.aliases {
            let class = registry.class(&alias.class)?;
            let (parent, relation) = match (&alias.parent, &alias.relation) {
                (Some(parent), Some(field)) => {
                    let parent_index = shape
                        .alias_index(parent)
                        .ok_or_else(|| Error::config(format!("unknown parent '{parent}'")))?;
                    let mapping = resolve_relation(&aliases[parent_index], field, &class)?;
                    (Some(parent_index), Some(mapping))
                }
                _ => (None, None),
            };

            if let Some(index_field) = &alias.index_by {
                if !class.has_field(index_field) {
                    return Err(Error::mapping(
                        MappingErrorKind::InvalidIndexField,
                        class.name(),
                        index_field.as_str(),
                        format!("alias '{}' is indexed by a field the class does not map", alias.alias),
                    ));
                }
            }

            aliases.push(BoundAlias {
                name: alias.alias.clone(),
                class,
                parent,
                relation,
                index_by: alias.index_by.clone(),
            });
        }

        let mut columns = Vec::with_capacity(shape.columns.len());
        for mapping in &shape.columns {
            let role = match mapping {
                ColumnMapping::Field { alias, field, .. } => {
                    let index = shape
                        .alias_index(alias)
                        .ok_or_else(|| Error::config(format!("unknown alias '{alias}'")))?;
                    let class = &aliases[index].class;
                    if !class.has_field(field) {
                        return Err(Error::mapping(
                            MappingErrorKind::UnknownField,
                            class.name(),
                            field.as_str(),
                            "field is not mapped on the class",
                        ));
                    }
                    ColumnRole::Field {
                        alias: index,
                        field: field.clone(),
                    }
                }
                ColumnMapping::Scalar { name, .. } => ColumnRole::Scalar { name: name.clone() },
            };
            columns.push((mapping.column().to_string(), role));
        }

        for (index, alias) in aliases.iter().enumerate() {
            for id_field in alias.class.identifier_fields() {
                let selected = columns.iter().any(|(_, role)| {
                    matches!(role, ColumnRole::Field { alias: a, field } if *a == index && field == id_field)
                });
                if !selected {
                    return Err(Error::mapping(
                        MappingErrorKind::MissingIdentifier,
                        alias.class.name(),
                        id_field.as_str(),
                        format!("alias '{}' does not select this identifier column", alias.name),
                    ));
                }
            }
        }

        let bound = Self {
            aliases,
            columns,
            mixed: shape.is_mixed(),
            simple: shape.is_simple(),
        };
        tracing::debug!(
            mixed = bound.mixed,
            simple = bound.simple,
            columns = bound.columns.len(),
            "Bound result shape"
        );
        Ok(bound)
    }

    /// Bound aliases in shape order.
    pub fn aliases(&self) -> &[BoundAlias] {
        &self.aliases
    }

    pub fn alias(&self, index: usize) -> &BoundAlias {
        &self.aliases[index]
    }

    /// Role of a result column, `None` for columns the shape does not mention.
    pub fn role_of(&self, column: &str) -> Option<&ColumnRole> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, role)| role)
    }

    pub fn is_mixed(&self) -> bool {
        self.mixed
    }

    pub fn is_simple(&self) -> bool {
        self.simple
    }
}

fn resolve_relation(
    parent: &BoundAlias,
    field: &str,
    class: &ClassMetadata,
) -> Result<AssociationMapping> {
    let mapping = parent.class.association_mapping(field)?.clone();
    if mapping.target_class != class.name() {
        return Err(Error::mapping(
            MappingErrorKind::UnknownAssociation,
            parent.class.name(),
            field,
            format!(
                "association targets {} but the joined alias materializes {}",
                mapping.target_class,
                class.name()
            ),
        ));
    }
    if let Some(mapped_by) = &mapping.mapped_by {
        if !class.has_association(mapped_by) {
            return Err(Error::mapping(
                MappingErrorKind::MissingInverse,
                parent.class.name(),
                field,
                format!("mapped_by names {}.{}, which is not mapped", class.name(), mapped_by),
            ));
        }
    }
    Ok(mapping)
}
