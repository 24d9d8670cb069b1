use super::{ColumnId, TableId};
use crate::metadata::{DeleteBehavior, ForeignKeyId, IndexId, KeyId};

/// `PK_<table>`
#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryKeyConstraint {
    pub name: String,
    pub columns: Vec<ColumnId>,
    pub key: KeyId,
}

/// An alternate key. Named `AK_<table>_<columns>`.
#[derive(Debug, Clone, PartialEq)]
pub struct UniqueConstraint {
    pub name: String,
    pub columns: Vec<ColumnId>,
    pub key: KeyId,
}

/// Named `FK_<table>_<principal table>_<columns>`.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeyConstraint {
    pub name: String,
    pub columns: Vec<ColumnId>,
    pub principal_table: TableId,
    pub principal_columns: Vec<ColumnId>,
    pub on_delete: DeleteBehavior,
    pub foreign_key: ForeignKeyId,
}

/// Named `IX_<table>_<columns>` unless the index configures a name.
#[derive(Debug, Clone, PartialEq)]
pub struct TableIndex {
    pub name: String,
    pub columns: Vec<ColumnId>,
    pub is_unique: bool,
    pub index: IndexId,
}
