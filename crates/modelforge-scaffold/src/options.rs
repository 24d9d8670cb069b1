use serde::Deserialize;

/// Controls the names the scaffolder gives to generated model elements.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScaffoldOptions {
    /// Keep table and column names verbatim as entity type and property
    /// names instead of converting them to UpperCamelCase
    pub use_database_names: bool,

    /// Name entity types after the singular form of their table name
    pub singularize_entity_names: bool,

    /// Pluralize the names of collection navigations
    pub pluralize_navigations: bool,

    /// Schema assumed for tables and foreign keys that do not name one
    pub default_schema: Option<String>,
}

impl Default for ScaffoldOptions {
    fn default() -> Self {
        ScaffoldOptions {
            use_database_names: false,
            singularize_entity_names: false,
            pluralize_navigations: true,
            default_schema: None,
        }
    }
}

impl ScaffoldOptions {
    pub fn use_database_names(&mut self, value: bool) -> &mut Self {
        self.use_database_names = value;
        self
    }

    pub fn singularize_entity_names(&mut self, value: bool) -> &mut Self {
        self.singularize_entity_names = value;
        self
    }

    pub fn pluralize_navigations(&mut self, value: bool) -> &mut Self {
        self.pluralize_navigations = value;
        self
    }

    pub fn default_schema(&mut self, schema: &str) -> &mut Self {
        self.default_schema = Some(schema.to_string());
        self
    }
}
