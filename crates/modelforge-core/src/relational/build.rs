use super::{
    provider_default_value, Column, ColumnId, ColumnMapping, ForeignKeyConstraint,
    PrimaryKeyConstraint, RelationalModel, RelationalOptions, StoreObjectIdentifier, Table,
    TableId, TableIndex, TableMapping, UniqueConstraint,
};
use crate::annotation::names;
use crate::metadata::{EntityTypeId, Model, Property, PropertyId};
use crate::storage::{MappingInfo, TypeMappingSource};
use crate::Value;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Tracks state while the relational model is derived.
pub(super) struct BuildRelationalModel<'a> {
    model: &'a Model,

    options: &'a RelationalOptions,

    type_mappings: &'a dyn TypeMappingSource,

    /// Maps `(name, schema)` to the table, in registration order
    table_lookup: IndexMap<(String, Option<String>), TableId>,

    /// Tables as they are built
    tables: Vec<Table>,

    /// The table each entity type's declared properties land in
    entity_tables: HashMap<EntityTypeId, TableId>,
}

impl<'a> BuildRelationalModel<'a> {
    pub(super) fn new(
        model: &'a Model,
        options: &'a RelationalOptions,
        type_mappings: &'a dyn TypeMappingSource,
    ) -> Self {
        BuildRelationalModel {
            model,
            options,
            type_mappings,
            table_lookup: IndexMap::new(),
            tables: vec![],
            entity_tables: HashMap::new(),
        }
    }

    pub(super) fn build(mut self) -> RelationalModel {
        let order = self.mapping_order();

        for id in &order {
            self.map_entity_type_to_table(*id);
        }

        for id in &order {
            self.map_columns(*id);
        }

        for table in 0..self.tables.len() {
            self.build_constraints(TableId(table));
        }

        let mappings = self.build_table_mappings(&order);

        debug!(
            tables = self.tables.len(),
            entity_types = order.len(),
            "relational model built"
        );

        RelationalModel {
            tables: self.tables,
            table_lookup: self.table_lookup.into_iter().collect(),
            mappings,
        }
    }

    /// Entity types in model order, each hierarchy root followed by its
    /// derived types.
    fn mapping_order(&self) -> Vec<EntityTypeId> {
        let mut order = vec![];
        for et in self.model.entity_types().filter(|et| et.is_root()) {
            order.push(et.id());
            order.extend(self.model.derived_types(et.id()));
        }
        order
    }

    fn identifier_for(&self, id: EntityTypeId) -> StoreObjectIdentifier {
        let et = self.model.entity_type(id);
        let annotation = |name| et.annotations().value(name).and_then(Value::as_str);

        let schema = annotation(names::SCHEMA)
            .or_else(|| self.options.schema())
            .map(str::to_string);

        if let Some(name) = annotation(names::TABLE_NAME) {
            return StoreObjectIdentifier::table(name, schema);
        }
        if let Some(name) = annotation(names::VIEW_NAME) {
            return StoreObjectIdentifier::view(name, schema);
        }

        match et.base_type() {
            // Derived types share the table of their base
            Some(base) => self.identifier_for(base),
            None => StoreObjectIdentifier::table(self.options.table_name_from_entity(et.name()), schema),
        }
    }

    fn map_entity_type_to_table(&mut self, id: EntityTypeId) {
        let identifier = self.identifier_for(id);
        let key = (identifier.name.clone(), identifier.schema.clone());

        let table = match self.table_lookup.get(&key) {
            Some(table) => *table,
            None => {
                let table = TableId(self.tables.len());
                self.table_lookup.insert(key, table);
                self.tables.push(Table::new(table, identifier));
                table
            }
        };

        let comment = self
            .model
            .entity_type(id)
            .annotations()
            .value(names::COMMENT)
            .and_then(Value::as_str);

        let table_ref = &mut self.tables[table.0];
        table_ref.entity_types.push(id);
        if table_ref.comment.is_none() {
            table_ref.comment = comment.map(str::to_string);
        }

        self.entity_tables.insert(id, table);
    }

    fn map_columns(&mut self, id: EntityTypeId) {
        let Some(&table) = self.entity_tables.get(&id) else {
            return;
        };
        let et = self.model.entity_type(id);

        let shares_base_table = et
            .base_type()
            .map(|base| self.entity_tables.get(&base) == Some(&table));

        let properties: Vec<PropertyId> = match shares_base_table {
            None | Some(true) => et.declared_properties().to_vec(),
            // A derived type with its own table repeats the primary key
            Some(false) => {
                let mut properties: Vec<_> = self
                    .model
                    .primary_key(id)
                    .map(|key| self.model.key(key).properties().to_vec())
                    .unwrap_or_default();
                properties.extend_from_slice(et.declared_properties());
                properties
            }
        };

        // Rows of other hierarchy types leave the columns of a derived type
        // empty.
        let force_nullable = shares_base_table == Some(true);
        for property in properties {
            self.map_property(table, property, force_nullable);
        }
    }

    fn map_property(&mut self, table: TableId, property: PropertyId, force_nullable: bool) {
        let p = self.model.property(property);
        let name = p
            .column_name()
            .cloned()
            .unwrap_or_else(|| p.name().to_string());
        let nullable = p.is_nullable() || force_nullable;

        let existing = self.tables[table.0].column_lookup.get(&name).copied();
        if let Some(index) = existing {
            let table = &mut self.tables[table.0];
            let column = &mut table.columns[index];
            column.is_nullable |= nullable;
            column.properties.push(property);
            table.property_lookup.insert(property, index);
            return;
        }

        let index = self.tables[table.0].columns.len();
        let column = self.new_column(ColumnId { table, index }, name.clone(), p, nullable);

        let table = &mut self.tables[table.0];
        table.columns.push(column);
        table.column_lookup.insert(name, index);
        table.property_lookup.insert(property, index);
    }

    fn new_column(&self, id: ColumnId, name: String, property: &Property, is_nullable: bool) -> Column {
        let info = MappingInfo::for_property(property);
        let mapping = self.type_mappings.find_mapping(property.ty(), &info);

        let store_type = match (property.column_type(), &mapping) {
            (Some(column_type), _) => column_type.clone(),
            (None, Some(mapping)) => mapping.store_type.to_string(),
            (None, None) => String::new(),
        };

        // Conversion failures are rejected when the model is finalized.
        let default_value = provider_default_value(property, mapping.as_ref())
            .ok()
            .flatten();

        Column {
            id,
            name,
            store_type,
            is_nullable,
            max_length: property.max_length(),
            precision: property.precision(),
            scale: property.scale(),
            is_unicode: property.unicode(),
            is_fixed_length: property.fixed_length(),
            default_value,
            default_value_sql: property.default_value_sql().cloned(),
            computed_column_sql: property.computed_column_sql().cloned(),
            is_stored: property.stored(),
            comment: property.comment().cloned(),
            collation: property.collation().cloned(),
            is_row_version: info.row_version,
            properties: vec![property.id()],
        }
    }

    fn build_constraints(&mut self, table_id: TableId) {
        let model = self.model;
        let table = &self.tables[table_id.0];
        if table.is_view() {
            return;
        }

        let columns_in = |table: &Table, properties: &[PropertyId]| -> Option<Vec<ColumnId>> {
            properties
                .iter()
                .map(|property| {
                    table.property_lookup.get(property).map(|index| ColumnId {
                        table: table.id,
                        index: *index,
                    })
                })
                .collect()
        };
        let column_names = |table: &Table, columns: &[ColumnId]| -> String {
            columns
                .iter()
                .map(|column| table.column(*column).name.as_str())
                .collect::<Vec<_>>()
                .join("_")
        };

        let primary_key = table.entity_types.iter().find_map(|et| {
            let key = model.primary_key(*et)?;
            let columns = columns_in(table, model.key(key).properties())?;
            Some(PrimaryKeyConstraint {
                name: format!("PK_{}", table.name()),
                columns,
                key,
            })
        });

        let mut unique_constraints: Vec<UniqueConstraint> = vec![];
        let mut foreign_keys: Vec<ForeignKeyConstraint> = vec![];
        let mut indexes: Vec<TableIndex> = vec![];
        let mut fk_names = HashSet::new();

        for et in &table.entity_types {
            let et = model.entity_type(*et);

            for key in et.declared_keys() {
                if primary_key.as_ref().map(|pk| pk.key) == Some(*key) {
                    continue;
                }
                let Some(columns) = columns_in(table, model.key(*key).properties()) else {
                    continue;
                };
                if primary_key.as_ref().map_or(false, |pk| pk.columns == columns)
                    || unique_constraints.iter().any(|uc| uc.columns == columns)
                {
                    continue;
                }
                unique_constraints.push(UniqueConstraint {
                    name: format!("AK_{}_{}", table.name(), column_names(table, &columns)),
                    columns,
                    key: *key,
                });
            }

            for fk in et.declared_foreign_keys() {
                let fk = model.foreign_key(*fk);
                let Some(columns) = columns_in(table, fk.properties()) else {
                    continue;
                };
                let Some(principal_table) = self.entity_tables.get(&fk.principal_entity_type()) else {
                    continue;
                };
                let principal = &self.tables[principal_table.0];
                if principal.is_view() {
                    continue;
                }
                let Some(principal_columns) =
                    columns_in(principal, model.key(fk.principal_key()).properties())
                else {
                    continue;
                };

                // Rows sharing a table and key reference themselves.
                if principal.id == table_id && principal_columns == columns {
                    continue;
                }

                let name = format!(
                    "FK_{}_{}_{}",
                    table.name(),
                    principal.name(),
                    column_names(table, &columns)
                );
                if !fk_names.insert(name.clone()) {
                    continue;
                }
                foreign_keys.push(ForeignKeyConstraint {
                    name,
                    columns,
                    principal_table: principal.id,
                    principal_columns,
                    on_delete: fk.delete_behavior(model),
                    foreign_key: fk.id(),
                });
            }

            for index in et.declared_indexes() {
                let index = model.index(*index);
                let Some(columns) = columns_in(table, index.properties()) else {
                    continue;
                };
                if indexes.iter().any(|existing| existing.columns == columns) {
                    continue;
                }
                let name = match index.name() {
                    Some(name) => name.to_string(),
                    None => format!("IX_{}_{}", table.name(), column_names(table, &columns)),
                };
                indexes.push(TableIndex {
                    name,
                    columns,
                    is_unique: index.is_unique(),
                    index: index.id(),
                });
            }
        }

        let table = &mut self.tables[table_id.0];
        table.primary_key = primary_key;
        table.unique_constraints = unique_constraints;
        table.foreign_keys = foreign_keys;
        table.indexes = indexes;
    }

    /// One mapping per distinct table of the entity type and its ancestors,
    /// the root's table first.
    fn build_table_mappings(&self, order: &[EntityTypeId]) -> HashMap<EntityTypeId, Vec<TableMapping>> {
        let mut mappings = HashMap::new();

        for id in order {
            let properties = self.model.properties_of(*id);
            let mut tables: Vec<TableId> = vec![];
            for ancestor in self.model.self_and_ancestors(*id).into_iter().rev() {
                if let Some(table) = self.entity_tables.get(&ancestor) {
                    if !tables.contains(table) {
                        tables.push(*table);
                    }
                }
            }

            let entity_mappings = tables
                .into_iter()
                .map(|table| {
                    let t = &self.tables[table.0];
                    let columns = properties
                        .iter()
                        .filter_map(|property| {
                            t.property_lookup.get(property).map(|index| ColumnMapping {
                                property: *property,
                                column: ColumnId {
                                    table,
                                    index: *index,
                                },
                            })
                        })
                        .collect();
                    TableMapping {
                        entity_type: *id,
                        table,
                        columns,
                    }
                })
                .collect();

            mappings.insert(*id, entity_mappings);
        }

        mappings
    }
}
