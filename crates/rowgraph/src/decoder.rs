//! Splitting flat rows into per-alias field data.

use crate::shape::{BoundShape, ColumnRole};
use indexmap::IndexMap;
use rowgraph_core::{FieldData, IdentityKey, Row, Value};
use std::collections::HashMap;

/// Field data and identity of one alias in one row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AliasSegment {
    /// Field values in column order.
    pub data: FieldData,
    /// Identity built from the identifier fields; empty when the alias is
    /// absent from the row.
    pub key: IdentityKey,
}

impl AliasSegment {
    /// Did this row carry an entity for the alias?
    pub fn is_present(&self) -> bool {
        !self.key.is_absent()
    }
}

/// One row, decoded against a bound shape.
#[derive(Debug, Clone, Default)]
pub struct DecodedRow {
    segments: Vec<AliasSegment>,
    scalars: IndexMap<String, Value>,
}

impl DecodedRow {
    /// Segment of the alias at `index` in shape order.
    pub fn segment(&self, index: usize) -> &AliasSegment {
        &self.segments[index]
    }

    pub fn segments(&self) -> &[AliasSegment] {
        &self.segments
    }

    /// Scalar select items in column order.
    pub fn scalars(&self) -> &IndexMap<String, Value> {
        &self.scalars
    }

    pub fn has_scalars(&self) -> bool {
        !self.scalars.is_empty()
    }
}

/// Decodes rows for one query.
///
/// The role of each column is looked up in the shape the first time its name
/// is seen and cached for the rest of the run.
#[derive(Debug)]
pub struct RowDecoder<'s> {
    shape: &'s BoundShape,
    roles: HashMap<String, Option<ColumnRole>>,
}

impl<'s> RowDecoder<'s> {
    pub fn new(shape: &'s BoundShape) -> Self {
        Self {
            shape,
            roles: HashMap::new(),
        }
    }

    /// Number of column names resolved so far.
    pub fn cached_columns(&self) -> usize {
        self.roles.len()
    }

    /// Partition `row` into alias segments and the scalar bucket.
    ///
    /// Columns the shape does not mention are ignored. Every alias gets a
    /// segment, absent ones included, so descendants are still decoded.
    pub fn decode(&mut self, row: &Row) -> DecodedRow {
        let shape = self.shape;
        let mut segments = vec![AliasSegment::default(); shape.aliases().len()];
        let mut scalars = IndexMap::new();

        for (column, value) in row.iter() {
            if !self.roles.contains_key(column) {
                let role = shape.role_of(column).cloned();
                self.roles.insert(column.to_string(), role);
            }
            match &self.roles[column] {
                Some(ColumnRole::Field { alias, field }) => {
                    segments[*alias].data.insert(field.clone(), value.clone());
                }
                Some(ColumnRole::Scalar { name }) => {
                    scalars.insert(name.clone(), value.clone());
                }
                None => {}
            }
        }

        for (segment, alias) in segments.iter_mut().zip(shape.aliases()) {
            let parts = alias
                .class
                .identifier_fields()
                .iter()
                .map(|f| segment.data.get(f).cloned().unwrap_or(Value::Null))
                .collect();
            segment.key = IdentityKey::from_parts(parts);
        }

        DecodedRow { segments, scalars }
    }
}
