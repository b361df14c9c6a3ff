use crate::stmt::Type;

use serde::{Deserialize, Serialize};

/// One column of the database catalog, as read by introspection or lowered
/// from a declarative table definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    pub table: String,

    pub column: String,

    #[serde(rename = "type")]
    pub ty: Type,

    #[serde(default)]
    pub nullable: bool,

    #[serde(default)]
    pub is_primary_key: bool,

    /// The column alone is unique
    #[serde(default)]
    pub is_unique: bool,

    /// Name of a composite unique constraint the column participates in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_key: Option<String>,

    /// The database assigns the value on insert
    #[serde(default)]
    pub auto_increment: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<ForeignKeyInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyInfo {
    pub referenced_table: String,
    pub referenced_column: String,
}

impl ColumnInfo {
    pub fn new(table: impl Into<String>, column: impl Into<String>, ty: Type) -> ColumnInfo {
        ColumnInfo {
            table: table.into(),
            column: column.into(),
            ty,
            nullable: false,
            is_primary_key: false,
            is_unique: false,
            unique_key: None,
            auto_increment: false,
            foreign_key: None,
        }
    }
}
