//! The relational view of a finalized model: tables, columns and the
//! constraints between them.
//!
//! The projection is read-only and derived entirely from the conceptual
//! model. It is computed on first use by
//! [`FinalizedModel::relational`](crate::FinalizedModel::relational).

mod build;

mod column;
pub use column::{Column, ColumnId};
pub(crate) use column::provider_default_value;

mod constraint;
pub use constraint::{ForeignKeyConstraint, PrimaryKeyConstraint, TableIndex, UniqueConstraint};

mod options;
pub use options::RelationalOptions;

mod table;
pub use table::{ColumnMapping, StoreObjectIdentifier, StoreObjectKind, Table, TableId, TableMapping};

use crate::metadata::{EntityTypeId, Model};
use crate::storage::TypeMappingSource;
use std::collections::HashMap;

#[derive(Debug)]
pub struct RelationalModel {
    tables: Vec<Table>,

    /// Maps `(name, schema)` to the table
    table_lookup: HashMap<(String, Option<String>), TableId>,

    /// Table mappings of each entity type, in mapping order
    mappings: HashMap<EntityTypeId, Vec<TableMapping>>,
}

impl RelationalModel {
    pub(crate) fn build(
        model: &Model,
        options: &RelationalOptions,
        type_mappings: &dyn TypeMappingSource,
    ) -> RelationalModel {
        build::BuildRelationalModel::new(model, options, type_mappings).build()
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn table(&self, id: TableId) -> &Table {
        &self.tables[id.0]
    }

    pub fn find_table(&self, name: &str, schema: Option<&str>) -> Option<&Table> {
        let key = (name.to_string(), schema.map(str::to_string));
        self.table_lookup.get(&key).map(|id| &self.tables[id.0])
    }

    pub fn column(&self, id: ColumnId) -> &Column {
        self.table(id.table).column(id)
    }

    /// Tables and views `entity_type` maps to. Empty for entity types that
    /// are not mapped.
    pub fn table_mappings(&self, entity_type: EntityTypeId) -> &[TableMapping] {
        self.mappings
            .get(&entity_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
