use super::{
    Column, ColumnId, ForeignKeyConstraint, PrimaryKeyConstraint, TableIndex, UniqueConstraint,
};
use crate::metadata::{EntityTypeId, PropertyId};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum StoreObjectKind {
    Table,
    View,
}

/// Names a table or view in the database.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreObjectIdentifier {
    pub kind: StoreObjectKind,
    pub name: String,
    pub schema: Option<String>,
}

impl StoreObjectIdentifier {
    pub fn table(name: impl Into<String>, schema: Option<String>) -> StoreObjectIdentifier {
        StoreObjectIdentifier {
            kind: StoreObjectKind::Table,
            name: name.into(),
            schema,
        }
    }

    pub fn view(name: impl Into<String>, schema: Option<String>) -> StoreObjectIdentifier {
        StoreObjectIdentifier {
            kind: StoreObjectKind::View,
            name: name.into(),
            schema,
        }
    }
}

impl fmt::Display for StoreObjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{schema}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// A database table or view
#[derive(Debug)]
pub struct Table {
    /// Uniquely identifies a table
    pub id: TableId,

    pub identifier: StoreObjectIdentifier,

    /// Entity types mapped to the table, in mapping order
    pub entity_types: Vec<EntityTypeId>,

    /// The table's columns, in mapping order
    pub columns: Vec<Column>,

    pub primary_key: Option<PrimaryKeyConstraint>,

    pub unique_constraints: Vec<UniqueConstraint>,

    pub foreign_keys: Vec<ForeignKeyConstraint>,

    pub indexes: Vec<TableIndex>,

    pub comment: Option<String>,

    pub(crate) column_lookup: HashMap<String, usize>,

    pub(crate) property_lookup: HashMap<PropertyId, usize>,
}

/// Uniquely identifies a table
#[derive(PartialEq, Eq, Clone, Copy, Hash)]
pub struct TableId(pub usize);

impl Table {
    pub(crate) fn new(id: TableId, identifier: StoreObjectIdentifier) -> Table {
        Table {
            id,
            identifier,
            entity_types: vec![],
            columns: vec![],
            primary_key: None,
            unique_constraints: vec![],
            foreign_keys: vec![],
            indexes: vec![],
            comment: None,
            column_lookup: HashMap::new(),
            property_lookup: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.identifier.name
    }

    pub fn schema(&self) -> Option<&str> {
        self.identifier.schema.as_deref()
    }

    pub fn is_view(&self) -> bool {
        self.identifier.kind == StoreObjectKind::View
    }

    pub fn column(&self, id: impl Into<ColumnId>) -> &Column {
        &self.columns[id.into().index]
    }

    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.column_lookup.get(name).map(|index| &self.columns[*index])
    }

    /// The column `property` is mapped to in this table.
    pub fn find_column_for_property(&self, property: PropertyId) -> Option<&Column> {
        self.property_lookup
            .get(&property)
            .map(|index| &self.columns[*index])
    }

    pub fn primary_key_columns(&self) -> Vec<&Column> {
        match &self.primary_key {
            Some(pk) => pk.columns.iter().map(|id| self.column(*id)).collect(),
            None => vec![],
        }
    }
}

impl fmt::Debug for TableId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "TableId({})", self.0)
    }
}

/// How an entity type's properties land in one table.
#[derive(Debug, Clone)]
pub struct TableMapping {
    pub entity_type: EntityTypeId,
    pub table: TableId,

    /// Mapped properties, inherited ones first
    pub columns: Vec<ColumnMapping>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub property: PropertyId,
    pub column: ColumnId,
}
