use super::TableId;
use crate::metadata::{Property, PropertyId};
use crate::storage::TypeMapping;
use crate::{Result, Value};
use std::fmt;

/// A table column.
///
/// Several properties may share a column; every facet is taken from the
/// first property mapped to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Uniquely identifies the column in the relational model
    pub id: ColumnId,

    /// The name of the column in the database
    pub name: String,

    /// The database storage type of the column
    pub store_type: String,

    /// Whether or not the column is nullable
    pub is_nullable: bool,

    pub max_length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub is_unicode: Option<bool>,
    pub is_fixed_length: Option<bool>,

    /// Default value, already in its stored representation
    pub default_value: Option<Value>,

    pub default_value_sql: Option<String>,
    pub computed_column_sql: Option<String>,
    pub is_stored: Option<bool>,
    pub comment: Option<String>,
    pub collation: Option<String>,

    /// True if the store regenerates the value on every write
    pub is_row_version: bool,

    /// Properties mapped to the column, in mapping order
    pub properties: Vec<PropertyId>,
}

#[derive(PartialEq, Eq, Clone, Copy, Hash)]
pub struct ColumnId {
    pub table: TableId,
    pub index: usize,
}

impl From<&Column> for ColumnId {
    fn from(value: &Column) -> Self {
        value.id
    }
}

impl fmt::Debug for ColumnId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "ColumnId({}/{})", self.table.0, self.index)
    }
}

/// The property's default value converted by its value converter, or by
/// the converter of its type mapping.
pub(crate) fn provider_default_value(
    property: &Property,
    mapping: Option<&TypeMapping>,
) -> Result<Option<Value>> {
    let Some(value) = property.default_value() else {
        return Ok(None);
    };

    let converter = property
        .value_converter()
        .or_else(|| mapping.and_then(|mapping| mapping.converter.as_ref()));

    match converter {
        Some(converter) => converter.to_provider(value).map(Some),
        None => Ok(Some(value.clone())),
    }
}
