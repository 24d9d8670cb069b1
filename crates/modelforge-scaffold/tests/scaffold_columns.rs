use modelforge_core::metadata::ValueGenerated;
use modelforge_core::storage::DefaultTypeMappingSource;
use modelforge_core::FinalizedModel;
use modelforge_scaffold::{
    DatabaseColumn, DatabaseModel, DefaultValueNormalizer, NormalizedDefault,
    ScaffoldingModelFactory,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std_util::{assert_none, assert_ok};

fn factory() -> ScaffoldingModelFactory {
    ScaffoldingModelFactory::new(Arc::new(DefaultTypeMappingSource::default()))
}

fn scaffold(json: &str) -> FinalizedModel {
    let database: DatabaseModel = serde_json::from_str(json).unwrap();
    assert_ok!(factory().create(&database))
}

const BLOG: &str = r#"{
    "database_name": "blogging",
    "tables": [{
        "name": "Blog",
        "columns": [
            { "name": "Id", "store_type": "int", "value_generated": "identity", "primary_key_ordinal": 1 },
            { "name": "Url", "store_type": "nvarchar(200)", "max_length": 200 },
            { "name": "Rating", "store_type": "int", "is_nullable": true, "default_value_sql": "((0))" },
            { "name": "Created", "store_type": "datetime2", "default_value_sql": "(getdate())" },
            { "name": "Notes", "store_type": "text", "is_nullable": true, "default_value_sql": "(NULL)" },
            { "name": "Location", "store_type": "geography", "is_nullable": true },
            { "name": "Version", "store_type": "rowversion" }
        ]
    }]
}"#;

#[test]
fn columns_become_properties() {
    let model = scaffold(BLOG);
    let blog = model.find_entity_type("Blog").unwrap().id();

    let url = model.property(model.find_property(blog, "Url").unwrap());
    assert!(!url.is_nullable());
    assert_eq!(url.max_length(), Some(200));
    assert_eq!(url.column_type().map(String::as_str), Some("nvarchar(200)"));

    let rating = model.property(model.find_property(blog, "Rating").unwrap());
    assert!(rating.is_nullable());
    assert_eq!(rating.default_value_sql().map(String::as_str), Some("0"));

    let created = model.property(model.find_property(blog, "Created").unwrap());
    assert_eq!(created.default_value_sql().map(String::as_str), Some("getdate()"));

    let notes = model.property(model.find_property(blog, "Notes").unwrap());
    assert_none!(notes.default_value_sql());
}

#[test]
fn tables_become_property_bag_entity_types() {
    let model = scaffold(BLOG);
    let blog = model.find_entity_type("Blog").unwrap();
    assert!(blog.is_shared_type());
    assert!(blog.is_property_bag());

    let url = model.property(model.find_property(blog.id(), "Url").unwrap());
    assert!(url.is_indexer());
}

#[test]
fn unmappable_columns_are_skipped() {
    let model = scaffold(BLOG);
    let blog = model.find_entity_type("Blog").unwrap().id();

    assert_none!(model.find_property(blog, "Location"));

    let table = model.relational().find_table("Blog", None).unwrap();
    assert_none!(table.find_column("Location"));
    assert_eq!(table.columns.len(), 6);
}

#[test]
fn identity_and_row_version() {
    let model = scaffold(BLOG);
    let blog = model.find_entity_type("Blog").unwrap().id();

    let id = model.property(model.find_property(blog, "Id").unwrap());
    assert_eq!(id.value_generated(), Some(ValueGenerated::OnAdd));

    let version = model.property(model.find_property(blog, "Version").unwrap());
    assert!(version.is_concurrency_token());
    assert_eq!(version.value_generated(), Some(ValueGenerated::OnAddOrUpdate));

    let table = model.relational().find_table("Blog", None).unwrap();
    assert!(table.find_column("Version").unwrap().is_row_version);
    assert!(!table.find_column("Id").unwrap().is_row_version);
}

#[test]
fn key_without_identity_is_not_generated() {
    let model = scaffold(
        r#"{
        "tables": [{
            "name": "Country",
            "columns": [
                { "name": "Code", "store_type": "int", "primary_key_ordinal": 1 },
                { "name": "Name", "store_type": "nvarchar(100)", "max_length": 100 }
            ]
        }]
    }"#,
    );
    let country = model.find_entity_type("Country").unwrap().id();

    let key = model.primary_key(country).unwrap();
    assert_eq!(model.property_names(model.key(key).properties()), ["Code"]);

    let code = model.property(model.find_property(country, "Code").unwrap());
    assert_eq!(code.value_generated(), Some(ValueGenerated::Never));
}

#[test]
fn table_without_key_is_keyless() {
    let model = scaffold(
        r#"{
        "tables": [{
            "name": "AuditLog",
            "columns": [
                { "name": "Message", "store_type": "text" }
            ]
        }]
    }"#,
    );
    let log = model.find_entity_type("AuditLog").unwrap();

    assert!(log.is_keyless());
    assert_none!(model.primary_key(log.id()));
}

#[derive(Debug)]
struct RejectAll;

impl DefaultValueNormalizer for RejectAll {
    fn normalize(&self, _: &DatabaseColumn, _: &str) -> NormalizedDefault {
        NormalizedDefault::Unrecognized
    }
}

#[test]
fn uninterpretable_defaults_are_dropped() {
    let database: DatabaseModel = serde_json::from_str(BLOG).unwrap();
    let model = factory().with_normalizer(RejectAll).create(&database).unwrap();
    let blog = model.find_entity_type("Blog").unwrap().id();

    let rating = model.property(model.find_property(blog, "Rating").unwrap());
    assert_eq!(rating.default_value_sql(), None);
}
