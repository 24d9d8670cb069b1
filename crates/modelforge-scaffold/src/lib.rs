//! Builds a model from the description of an existing database.
//!
//! The description ([`DatabaseModel`]) is provider neutral. Vendor specific
//! interpretation of default values is plugged in through
//! [`DefaultValueNormalizer`]; store type names are resolved through the
//! core [`TypeMappingSource`](modelforge_core::storage::TypeMappingSource).

mod database;
pub use database::{
    ColumnValueGenerated, DatabaseColumn, DatabaseForeignKey, DatabaseIndex, DatabaseModel,
    DatabasePrimaryKey, DatabaseTable, DatabaseUniqueConstraint, ReferentialAction,
};

mod default_value;
pub use default_value::{DefaultValueNormalizer, NormalizedDefault, ParenthesizedDefaultValue};

mod factory;
pub use factory::ScaffoldingModelFactory;

mod naming;

mod options;
pub use options::ScaffoldOptions;
