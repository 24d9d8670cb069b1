use serde::{Deserialize, Serialize};

/// A database schema as read from the database catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseModel {
    #[serde(default)]
    pub database_name: Option<String>,

    /// Schema objects live in when they do not name one
    #[serde(default)]
    pub default_schema: Option<String>,

    #[serde(default)]
    pub tables: Vec<DatabaseTable>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseTable {
    pub name: String,

    #[serde(default)]
    pub schema: Option<String>,

    #[serde(default)]
    pub comment: Option<String>,

    /// Columns in ordinal order
    #[serde(default)]
    pub columns: Vec<DatabaseColumn>,

    /// When absent, the key is read from the columns' `primary_key_ordinal`
    #[serde(default)]
    pub primary_key: Option<DatabasePrimaryKey>,

    #[serde(default)]
    pub unique_constraints: Vec<DatabaseUniqueConstraint>,

    #[serde(default)]
    pub indexes: Vec<DatabaseIndex>,

    #[serde(default)]
    pub foreign_keys: Vec<DatabaseForeignKey>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseColumn {
    pub name: String,

    /// Store type as declared, e.g. `nvarchar(200)`
    pub store_type: String,

    #[serde(default)]
    pub is_nullable: bool,

    #[serde(default)]
    pub max_length: Option<u32>,

    #[serde(default)]
    pub precision: Option<u32>,

    #[serde(default)]
    pub scale: Option<u32>,

    /// Default value expression exactly as the catalog reports it
    #[serde(default)]
    pub default_value_sql: Option<String>,

    #[serde(default)]
    pub computed_column_sql: Option<String>,

    #[serde(default)]
    pub is_stored: Option<bool>,

    #[serde(default)]
    pub value_generated: Option<ColumnValueGenerated>,

    /// 1-based position of the column in the primary key
    #[serde(default)]
    pub primary_key_ordinal: Option<u32>,

    #[serde(default)]
    pub comment: Option<String>,

    #[serde(default)]
    pub collation: Option<String>,
}

/// How the database fills in a column's value.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnValueGenerated {
    /// Assigned on insert, e.g. an identity or auto-increment column
    Identity,

    /// Recomputed on every write
    Computed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabasePrimaryKey {
    #[serde(default)]
    pub name: Option<String>,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseUniqueConstraint {
    #[serde(default)]
    pub name: Option<String>,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseIndex {
    #[serde(default)]
    pub name: Option<String>,
    pub columns: Vec<String>,

    #[serde(default)]
    pub is_unique: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseForeignKey {
    #[serde(default)]
    pub name: Option<String>,

    /// Columns of the referencing table
    pub columns: Vec<String>,

    #[serde(default)]
    pub principal_schema: Option<String>,
    pub principal_table: String,

    /// Referenced columns, lined up with `columns`
    pub principal_columns: Vec<String>,

    #[serde(default)]
    pub on_delete: Option<ReferentialAction>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferentialAction {
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl DatabaseTable {
    pub fn find_column(&self, name: &str) -> Option<&DatabaseColumn> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Primary key columns, from the declared key or else from the columns'
    /// ordinals.
    pub fn primary_key_columns(&self) -> Vec<&str> {
        if let Some(primary_key) = &self.primary_key {
            return primary_key.columns.iter().map(String::as_str).collect();
        }

        let mut columns: Vec<_> = self
            .columns
            .iter()
            .filter_map(|column| column.primary_key_ordinal.map(|ordinal| (ordinal, column)))
            .collect();
        columns.sort_by_key(|(ordinal, _)| *ordinal);
        columns
            .into_iter()
            .map(|(_, column)| column.name.as_str())
            .collect()
    }

    /// Whether `columns` are exactly the columns of the primary key, a
    /// unique constraint or a unique index, in any order.
    pub fn is_unique_column_set(&self, columns: &[String]) -> bool {
        let same_set = |other: &[&str]| {
            other.len() == columns.len() && columns.iter().all(|column| other.contains(&column.as_str()))
        };

        same_set(&self.primary_key_columns())
            || self.unique_constraints.iter().any(|uc| {
                same_set(&uc.columns.iter().map(String::as_str).collect::<Vec<_>>())
            })
            || self.indexes.iter().filter(|index| index.is_unique).any(|index| {
                same_set(&index.columns.iter().map(String::as_str).collect::<Vec<_>>())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_key_from_ordinals() {
        let table = DatabaseTable {
            name: "OrderLines".into(),
            columns: vec![
                DatabaseColumn {
                    name: "LineNo".into(),
                    store_type: "int".into(),
                    primary_key_ordinal: Some(2),
                    ..Default::default()
                },
                DatabaseColumn {
                    name: "Note".into(),
                    store_type: "text".into(),
                    ..Default::default()
                },
                DatabaseColumn {
                    name: "OrderId".into(),
                    store_type: "int".into(),
                    primary_key_ordinal: Some(1),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        assert_eq!(table.primary_key_columns(), ["OrderId", "LineNo"]);
        assert!(table.is_unique_column_set(&["LineNo".into(), "OrderId".into()]));
        assert!(!table.is_unique_column_set(&["OrderId".into()]));
    }
}
