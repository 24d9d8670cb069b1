/// Options applied when deriving table names.
#[derive(Debug, Clone, Default)]
pub struct RelationalOptions {
    /// If set, prefix generated table names with this string
    table_name_prefix: Option<String>,

    /// Pluralize entity type names when generating table names
    pluralize_table_names: bool,

    /// Schema of tables that do not configure one
    default_schema: Option<String>,
}

impl RelationalOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table_name_prefix(&mut self, prefix: &str) -> &mut Self {
        self.table_name_prefix = Some(prefix.to_string());
        self
    }

    pub fn pluralize_table_names(&mut self, pluralize: bool) -> &mut Self {
        self.pluralize_table_names = pluralize;
        self
    }

    pub fn default_schema(&mut self, schema: &str) -> &mut Self {
        self.default_schema = Some(schema.to_string());
        self
    }

    pub fn schema(&self) -> Option<&str> {
        self.default_schema.as_deref()
    }

    /// Table name for a root entity type without a configured one.
    pub(crate) fn table_name_from_entity(&self, entity_name: &str) -> String {
        let base = if self.pluralize_table_names {
            std_util::str::pluralize(entity_name)
        } else {
            entity_name.to_string()
        };

        match &self.table_name_prefix {
            Some(prefix) => format!("{prefix}{base}"),
            None => base,
        }
    }
}
