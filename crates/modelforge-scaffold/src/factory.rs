use crate::naming::Namer;
use crate::{
    ColumnValueGenerated, DatabaseColumn, DatabaseForeignKey, DatabaseModel, DatabaseTable,
    DefaultValueNormalizer, NormalizedDefault, ParenthesizedDefaultValue, ReferentialAction,
    ScaffoldOptions,
};
use modelforge_core::metadata::{DeleteBehavior, EntityTypeId, ValueGenerated};
use modelforge_core::reflect::{ScalarType, TypeInfo, TypeRef, TypeRegistry};
use modelforge_core::storage::{StoreType, TypeMappingSource};
use modelforge_core::{
    ConfigurationSource, ConventionSet, FinalizedModel, ModelBuilder, RelationalOptions, Result,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Everything read from the database is explicit configuration.
const SOURCE: ConfigurationSource = ConfigurationSource::Explicit;

/// Backing type shared by every scaffolded entity type.
const PROPERTY_BAG: &str = "PropertyBag";

/// Builds a finalized model from a [`DatabaseModel`].
///
/// Entity types are shared-type entity types over a property bag, named
/// after their tables; every column that has a type mapping becomes an
/// indexer property. Columns, keys and
/// foreign keys that cannot be represented are skipped with a warning.
#[derive(Debug, Clone)]
pub struct ScaffoldingModelFactory {
    type_mappings: Arc<dyn TypeMappingSource>,
    normalizer: Arc<dyn DefaultValueNormalizer>,
    options: ScaffoldOptions,
}

/// The entity type created for one table.
struct ScaffoldedTable {
    entity_type: EntityTypeId,

    /// Property name by column name. Skipped columns are absent.
    properties: HashMap<String, String>,
}

impl ScaffoldingModelFactory {
    pub fn new(type_mappings: Arc<dyn TypeMappingSource>) -> ScaffoldingModelFactory {
        ScaffoldingModelFactory {
            type_mappings,
            normalizer: Arc::new(ParenthesizedDefaultValue),
            options: ScaffoldOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ScaffoldOptions) -> ScaffoldingModelFactory {
        self.options = options;
        self
    }

    pub fn with_normalizer(
        mut self,
        normalizer: impl DefaultValueNormalizer + 'static,
    ) -> ScaffoldingModelFactory {
        self.normalizer = Arc::new(normalizer);
        self
    }

    pub fn options(&self) -> &ScaffoldOptions {
        &self.options
    }

    pub fn create(&self, database: &DatabaseModel) -> Result<FinalizedModel> {
        let types = TypeRegistry::new().with(TypeInfo::new(PROPERTY_BAG).property_bag());
        let mut mb = ModelBuilder::new(types, ConventionSet::default_set());
        let namer = Namer::new(&self.options);

        let scaffolded: Vec<Option<ScaffoldedTable>> = database
            .tables
            .iter()
            .map(|table| self.visit_table(&mut mb, &namer, database, table))
            .collect();

        for (index, table) in database.tables.iter().enumerate() {
            for fk in &table.foreign_keys {
                self.visit_foreign_key(&mut mb, &namer, database, &scaffolded, index, fk)?;
            }
        }

        debug!(
            database = database.database_name.as_deref().unwrap_or_default(),
            tables = database.tables.len(),
            entity_types = scaffolded.iter().flatten().count(),
            "database scaffolded"
        );

        mb.finalize_with(RelationalOptions::default(), Arc::clone(&self.type_mappings))
    }

    fn schema_of<'a>(&'a self, table: &'a DatabaseTable) -> Option<&'a str> {
        table
            .schema
            .as_deref()
            .or(self.options.default_schema.as_deref())
    }

    fn visit_table(
        &self,
        mb: &mut ModelBuilder,
        namer: &Namer<'_>,
        database: &DatabaseModel,
        table: &DatabaseTable,
    ) -> Option<ScaffoldedTable> {
        let name = namer.entity_type_name(mb.model(), &table.name);
        let Some(mut builder) = mb.shared_type_entity(&name, PROPERTY_BAG, SOURCE) else {
            warn!(table = %table.name, entity_type = %name, "could not add entity type for table; skipping it");
            return None;
        };
        let entity_type = builder.id();

        let schema = self
            .schema_of(table)
            .filter(|schema| Some(*schema) != database.default_schema.as_deref());
        builder.to_table(&table.name, schema, SOURCE);
        if let Some(comment) = &table.comment {
            builder.has_comment(comment, SOURCE);
        }

        let mut properties = HashMap::new();
        for column in &table.columns {
            if let Some(property) = self.visit_column(mb, namer, entity_type, table, column) {
                properties.insert(column.name.clone(), property);
            }
        }

        let scaffolded = ScaffoldedTable {
            entity_type,
            properties,
        };

        self.visit_primary_key(mb, table, &scaffolded);
        self.visit_unique_constraints(mb, table, &scaffolded);
        self.visit_indexes(mb, table, &scaffolded);

        Some(scaffolded)
    }

    /// Returns the name of the property created for `column`.
    fn visit_column(
        &self,
        mb: &mut ModelBuilder,
        namer: &Namer<'_>,
        entity_type: EntityTypeId,
        table: &DatabaseTable,
        column: &DatabaseColumn,
    ) -> Option<String> {
        let Some(mapping) = self
            .type_mappings
            .find_mapping_for_store_type(&column.store_type)
        else {
            warn!(
                table = %table.name,
                column = %column.name,
                store_type = %column.store_type,
                "could not find a type mapping for column; skipping it"
            );
            return None;
        };

        let mut ty = TypeRef::from(mapping.scalar);
        if column.is_nullable {
            ty = ty.nullable();
        }

        let name = namer.property_name(mb.model(), entity_type, &column.name);
        let mut et = mb.entity_type_builder(entity_type)?;
        let Some(mut property) = et.indexer_property(&name, ty, SOURCE) else {
            warn!(table = %table.name, column = %column.name, "could not add property for column; skipping it");
            return None;
        };

        if name != column.name {
            property.has_column_name(column.name.as_str(), SOURCE);
        }
        property.has_column_type(column.store_type.as_str(), SOURCE);
        if !column.is_nullable {
            property.is_required(true, SOURCE);
        }
        if let Some(max_length) = column.max_length {
            property.has_max_length(max_length, SOURCE);
        }
        if let Some(precision) = column.precision {
            property.has_precision(precision, SOURCE);
        }
        if let Some(scale) = column.scale {
            property.has_scale(scale, SOURCE);
        }
        if let Some(comment) = &column.comment {
            property.has_comment(comment.as_str(), SOURCE);
        }
        if let Some(collation) = &column.collation {
            property.use_collation(collation.as_str(), SOURCE);
        }
        if let Some(sql) = &column.computed_column_sql {
            property.has_computed_column_sql(sql.as_str(), SOURCE);
        }
        if let Some(stored) = column.is_stored {
            property.is_stored(stored, SOURCE);
        }

        if mapping.store_type == StoreType::RowVersion {
            property.is_concurrency_token(true, SOURCE);
            property.value_generated(ValueGenerated::OnAddOrUpdate, SOURCE);
        }

        match column.value_generated {
            Some(ColumnValueGenerated::Identity) if mapping.scalar == ScalarType::U8 => {
                warn!(
                    table = %table.name,
                    column = %column.name,
                    store_type = %column.store_type,
                    "single-byte columns cannot be identity columns; ignoring identity"
                );
            }
            Some(ColumnValueGenerated::Identity) => {
                property.value_generated(ValueGenerated::OnAdd, SOURCE);
            }
            Some(ColumnValueGenerated::Computed) => {
                property.value_generated(ValueGenerated::OnAddOrUpdate, SOURCE);
            }
            None => {}
        }

        if let Some(default_value_sql) = &column.default_value_sql {
            match self.normalizer.normalize(column, default_value_sql) {
                NormalizedDefault::Sql(sql) => {
                    property.has_default_value_sql(sql, SOURCE);
                }
                NormalizedDefault::Omitted => {}
                NormalizedDefault::Unrecognized => {
                    warn!(
                        table = %table.name,
                        column = %column.name,
                        default_value_sql = %default_value_sql,
                        property = %name,
                        "could not interpret default value; ignoring it"
                    );
                }
            }
        }

        Some(name)
    }

    fn visit_primary_key(&self, mb: &mut ModelBuilder, table: &DatabaseTable, scaffolded: &ScaffoldedTable) {
        let columns = table.primary_key_columns();

        let names = match names_for(&scaffolded.properties, &columns) {
            Some(names) if !names.is_empty() => names,
            Some(_) => {
                warn!(table = %table.name, "table has no primary key; scaffolding a keyless entity type");
                if let Some(mut et) = mb.entity_type_builder(scaffolded.entity_type) {
                    et.has_no_key(SOURCE);
                }
                return;
            }
            None => {
                warn!(
                    table = %table.name,
                    "primary key includes a skipped column; scaffolding a keyless entity type"
                );
                if let Some(mut et) = mb.entity_type_builder(scaffolded.entity_type) {
                    et.has_no_key(SOURCE);
                }
                return;
            }
        };

        let Some(mut et) = mb.entity_type_builder(scaffolded.entity_type) else {
            return;
        };
        if et.primary_key(&as_strs(&names), SOURCE).is_none() {
            warn!(table = %table.name, columns = ?columns, "could not configure primary key");
            return;
        }

        // Conventions generate single integer and uuid keys; the database
        // only does so for identity columns.
        let [column] = columns[..] else {
            return;
        };
        let is_identity = table
            .find_column(column)
            .map_or(false, |column| column.value_generated == Some(ColumnValueGenerated::Identity));
        if is_identity {
            return;
        }

        let model = mb.model();
        let Some(property) = model.find_property(scaffolded.entity_type, &names[0]) else {
            return;
        };
        let generated_by_convention = model
            .property(property)
            .ty()
            .scalar()
            .map_or(false, |scalar| scalar.is_integer() || scalar == ScalarType::Uuid);
        if generated_by_convention {
            if let Some(mut property) = mb.property_builder(property) {
                property.value_generated(ValueGenerated::Never, SOURCE);
            }
        }
    }

    fn visit_unique_constraints(
        &self,
        mb: &mut ModelBuilder,
        table: &DatabaseTable,
        scaffolded: &ScaffoldedTable,
    ) {
        for constraint in &table.unique_constraints {
            let Some(names) = names_for(&scaffolded.properties, &constraint.columns) else {
                warn!(
                    table = %table.name,
                    constraint = ?constraint.name,
                    "unique constraint includes a skipped column; skipping it"
                );
                continue;
            };
            if let Some(mut et) = mb.entity_type_builder(scaffolded.entity_type) {
                et.has_key(&as_strs(&names), SOURCE);
            }
        }
    }

    fn visit_indexes(&self, mb: &mut ModelBuilder, table: &DatabaseTable, scaffolded: &ScaffoldedTable) {
        for index in &table.indexes {
            let Some(names) = names_for(&scaffolded.properties, &index.columns) else {
                warn!(
                    table = %table.name,
                    index = ?index.name,
                    "index includes a skipped column; skipping it"
                );
                continue;
            };
            let Some(mut et) = mb.entity_type_builder(scaffolded.entity_type) else {
                continue;
            };
            let Some(mut builder) = et.has_index(&as_strs(&names), SOURCE) else {
                continue;
            };
            builder.is_unique(index.is_unique, SOURCE);
            if let Some(name) = &index.name {
                builder.has_name(name.as_str(), SOURCE);
            }
        }
    }

    fn visit_foreign_key(
        &self,
        mb: &mut ModelBuilder,
        namer: &Namer<'_>,
        database: &DatabaseModel,
        scaffolded: &[Option<ScaffoldedTable>],
        index: usize,
        fk: &DatabaseForeignKey,
    ) -> Result<()> {
        let table = &database.tables[index];
        let Some(dependent) = &scaffolded[index] else {
            return Ok(());
        };

        let principal = self
            .find_table(database, fk.principal_schema.as_deref(), &fk.principal_table)
            .and_then(|principal| scaffolded[principal].as_ref());
        let Some(principal) = principal else {
            warn!(
                table = %table.name,
                foreign_key = ?fk.name,
                principal_table = %fk.principal_table,
                "foreign key references a table that is not in the model; skipping it"
            );
            return Ok(());
        };

        let dependent_names = names_for(&dependent.properties, &fk.columns);
        let principal_names = names_for(&principal.properties, &fk.principal_columns);
        let (Some(dependent_names), Some(principal_names)) = (dependent_names, principal_names) else {
            warn!(
                table = %table.name,
                foreign_key = ?fk.name,
                "foreign key includes a skipped column; skipping it"
            );
            return Ok(());
        };
        if dependent_names.is_empty() || dependent_names.len() != principal_names.len() {
            warn!(
                table = %table.name,
                foreign_key = ?fk.name,
                "foreign key columns do not line up with the principal columns; skipping it"
            );
            return Ok(());
        }

        let dependent_names = as_strs(&dependent_names);
        let principal_names = as_strs(&principal_names);

        let Some(mut et) = mb.entity_type_builder(dependent.entity_type) else {
            return Ok(());
        };
        let Some(fk_id) = et
            .has_relationship(
                principal.entity_type,
                Some(dependent_names.as_slice()),
                Some(principal_names.as_slice()),
                SOURCE,
            )
            .map(|builder| builder.id())
        else {
            warn!(
                table = %table.name,
                foreign_key = ?fk.name,
                "foreign key could not be added to the model; skipping it"
            );
            return Ok(());
        };

        let is_unique = table.is_unique_column_set(&fk.columns);
        if let Some(mut builder) = mb.foreign_key_builder(fk_id) {
            builder.is_unique(is_unique, SOURCE);
            match fk.on_delete {
                Some(ReferentialAction::SetDefault) => {
                    warn!(
                        table = %table.name,
                        foreign_key = ?fk.name,
                        "ON DELETE SET DEFAULT has no model equivalent; using the default behavior"
                    );
                }
                Some(action) => {
                    builder.on_delete(delete_behavior(action), SOURCE);
                }
                None => {}
            }
        }

        let to_principal = namer.dependent_to_principal_name(
            mb.model(),
            dependent.entity_type,
            principal.entity_type,
            &dependent_names,
        );
        if let Some(mut builder) = mb.foreign_key_builder(fk_id) {
            builder.has_dependent_to_principal(&to_principal, SOURCE)?;
        }

        let to_dependent = namer.principal_to_dependent_name(
            mb.model(),
            principal.entity_type,
            dependent.entity_type,
            is_unique,
        );
        if let Some(mut builder) = mb.foreign_key_builder(fk_id) {
            builder.has_principal_to_dependent(&to_dependent, SOURCE)?;
        }

        Ok(())
    }

    fn find_table(&self, database: &DatabaseModel, schema: Option<&str>, name: &str) -> Option<usize> {
        let schema = schema.or(self.options.default_schema.as_deref());
        if let Some(index) = database
            .tables
            .iter()
            .position(|table| table.name == name && self.schema_of(table) == schema)
        {
            return Some(index);
        }

        // Fall back to the name alone when it is unambiguous
        let mut by_name = database
            .tables
            .iter()
            .enumerate()
            .filter(|(_, table)| table.name == name);
        match (by_name.next(), by_name.next()) {
            (Some((index, _)), None) => Some(index),
            _ => None,
        }
    }
}

fn delete_behavior(action: ReferentialAction) -> DeleteBehavior {
    match action {
        ReferentialAction::Cascade => DeleteBehavior::Cascade,
        ReferentialAction::SetNull => DeleteBehavior::SetNull,
        ReferentialAction::Restrict => DeleteBehavior::Restrict,
        ReferentialAction::NoAction | ReferentialAction::SetDefault => DeleteBehavior::NoAction,
    }
}

/// Property names for `columns`, or `None` if any column was skipped.
fn names_for<S: AsRef<str>>(properties: &HashMap<String, String>, columns: &[S]) -> Option<Vec<String>> {
    columns
        .iter()
        .map(|column| properties.get(column.as_ref()).cloned())
        .collect()
}

fn as_strs(names: &[String]) -> Vec<&str> {
    names.iter().map(String::as_str).collect()
}
