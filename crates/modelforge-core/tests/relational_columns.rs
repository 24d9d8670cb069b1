use modelforge_core::builder::EntityTypeBuilder;
use modelforge_core::metadata::ValueGenerated;
use modelforge_core::reflect::{MemberInfo, ScalarType, TypeInfo, TypeRegistry};
use modelforge_core::relational::Column;
use modelforge_core::storage::{ConverterRef, NumberToString};
use modelforge_core::{ConfigurationSource, ConventionSet, FinalizedModel, ModelBuilder, Value};
use pretty_assertions::assert_eq;
use std_util::{assert_err, assert_none};

const EXPLICIT: ConfigurationSource = ConfigurationSource::Explicit;

fn builder() -> ModelBuilder {
    let types = TypeRegistry::new().with(
        TypeInfo::new("Setting")
            .member(MemberInfo::property("Id", ScalarType::I32))
            .member(MemberInfo::property("Name", ScalarType::String))
            .member(MemberInfo::property("Enabled", ScalarType::Bool))
            .member(MemberInfo::property("Priority", ScalarType::I32))
            .member(MemberInfo::property("Version", ScalarType::Bytes)),
    );
    let mut mb = ModelBuilder::new(types, ConventionSet::default_set());
    mb.entity("Setting", EXPLICIT).unwrap();
    mb
}

fn configure(mb: &mut ModelBuilder, f: impl FnOnce(&mut EntityTypeBuilder<'_>)) {
    let id = mb.model().find_entity_type("Setting").unwrap().id();
    f(&mut mb.entity_type_builder(id).unwrap());
}

fn column<'a>(model: &'a FinalizedModel, name: &str) -> &'a Column {
    model
        .relational()
        .find_table("Setting", None)
        .unwrap()
        .find_column(name)
        .unwrap_or_else(|| panic!("no column `{name}`"))
}

#[test]
fn store_types_follow_facets() {
    let mut mb = builder();
    configure(&mut mb, |setting| {
        setting
            .property("Name", ScalarType::String, EXPLICIT)
            .unwrap()
            .has_max_length(64u32, EXPLICIT)
            .unwrap()
            .has_column_name("display_name", EXPLICIT)
            .unwrap()
            .has_comment("Shown to users", EXPLICIT)
            .unwrap()
            .use_collation("nocase", EXPLICIT)
            .unwrap();
    });
    let model = mb.finalize().unwrap();

    assert_none!(model.relational().find_table("Setting", None).unwrap().find_column("Name"));

    let name = column(&model, "display_name");
    assert_eq!(name.store_type, "varchar(64)");
    assert_eq!(name.max_length, Some(64));
    assert_eq!(name.comment.as_deref(), Some("Shown to users"));
    assert_eq!(name.collation.as_deref(), Some("nocase"));

    assert_eq!(column(&model, "Id").store_type, "integer");
    assert_eq!(column(&model, "Enabled").store_type, "boolean");
}

#[test]
fn configured_column_type_is_kept_verbatim() {
    let mut mb = builder();
    configure(&mut mb, |setting| {
        setting
            .property("Enabled", ScalarType::Bool, EXPLICIT)
            .unwrap()
            .has_column_type("INT", EXPLICIT)
            .unwrap()
            .has_default_value(true, EXPLICIT)
            .unwrap();
    });
    let model = mb.finalize().unwrap();

    let enabled = column(&model, "Enabled");
    assert_eq!(enabled.store_type, "INT");

    // The store type's converter turns the default into its stored form
    assert_eq!(enabled.default_value, Some(Value::I32(1)));
}

#[test]
fn property_converter_wins_for_defaults() {
    let mut mb = builder();
    configure(&mut mb, |setting| {
        let converter = NumberToString::new(ScalarType::I32).unwrap();
        setting
            .property("Priority", ScalarType::I32, EXPLICIT)
            .unwrap()
            .has_conversion(ConverterRef::new(converter), EXPLICIT)
            .unwrap()
            .has_default_value(Value::I32(5), EXPLICIT)
            .unwrap();
    });
    let model = mb.finalize().unwrap();

    assert_eq!(column(&model, "Priority").default_value, Some(Value::from("5")));
}

#[test]
fn unconvertible_default_fails_finalization() {
    let mut mb = builder();
    configure(&mut mb, |setting| {
        setting
            .property("Enabled", ScalarType::Bool, EXPLICIT)
            .unwrap()
            .has_column_type("int", EXPLICIT)
            .unwrap()
            .has_default_value("yes", EXPLICIT)
            .unwrap();
    });

    let err = assert_err!(mb.finalize());
    assert!(err.is_invalid_model());
    assert!(err.to_string().contains("Setting.Enabled"));
}

#[test]
fn sql_defaults_and_computed_columns() {
    let mut mb = builder();
    configure(&mut mb, |setting| {
        setting
            .property("Priority", ScalarType::I32, EXPLICIT)
            .unwrap()
            .has_default_value_sql("10", EXPLICIT)
            .unwrap();
        setting
            .property("Name", ScalarType::String, EXPLICIT)
            .unwrap()
            .has_computed_column_sql("upper(Key)", EXPLICIT)
            .unwrap()
            .is_stored(true, EXPLICIT)
            .unwrap();
    });
    let model = mb.finalize().unwrap();

    let priority = column(&model, "Priority");
    assert_eq!(priority.default_value_sql.as_deref(), Some("10"));
    assert_none!(&priority.default_value);

    let name = column(&model, "Name");
    assert_eq!(name.computed_column_sql.as_deref(), Some("upper(Key)"));
    assert_eq!(name.is_stored, Some(true));
}

#[test]
fn row_version() {
    let mut mb = builder();
    configure(&mut mb, |setting| {
        setting
            .property("Version", ScalarType::Bytes, EXPLICIT)
            .unwrap()
            .is_concurrency_token(true, EXPLICIT)
            .unwrap()
            .value_generated(ValueGenerated::OnAddOrUpdate, EXPLICIT)
            .unwrap();
    });
    let model = mb.finalize().unwrap();

    let version = column(&model, "Version");
    assert!(version.is_row_version);
    assert_eq!(version.store_type, "rowversion");
    assert!(!column(&model, "Priority").is_row_version);
}

#[test]
fn concurrency_token_without_generation_is_a_plain_column() {
    let mut mb = builder();
    configure(&mut mb, |setting| {
        setting
            .property("Version", ScalarType::Bytes, EXPLICIT)
            .unwrap()
            .is_concurrency_token(true, EXPLICIT)
            .unwrap();
    });
    let model = mb.finalize().unwrap();

    let version = column(&model, "Version");
    assert!(!version.is_row_version);
    assert_eq!(version.store_type, "blob");
}
