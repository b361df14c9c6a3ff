use crate::driver::{ColumnInfo, ForeignKeyInfo};
use crate::stmt::Type;

use serde::{Deserialize, Serialize};

/// Hand-written table definition, lowered into the same catalog rows that
/// introspection produces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDecl {
    pub name: String,

    pub columns: Vec<ColumnDecl>,

    /// Composite unique constraints, as lists of column names
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unique: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDecl {
    pub name: String,

    #[serde(default, rename = "type")]
    pub ty: Type,

    #[serde(default)]
    pub nullable: bool,

    #[serde(default)]
    pub primary_key: bool,

    #[serde(default)]
    pub unique: bool,

    #[serde(default)]
    pub auto_increment: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<ForeignKeyInfo>,
}

impl TableDecl {
    pub fn new(name: impl Into<String>) -> TableDecl {
        TableDecl {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn column(mut self, column: ColumnDecl) -> TableDecl {
        self.columns.push(column);
        self
    }

    pub fn unique_key<I>(mut self, columns: I) -> TableDecl
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.unique
            .push(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Lowers the declaration into catalog rows.
    pub fn to_columns(&self) -> Vec<ColumnInfo> {
        self.columns
            .iter()
            .map(|column| {
                let unique_key = self
                    .unique
                    .iter()
                    .position(|key| key.iter().any(|name| *name == column.name))
                    .map(|index| format!("{}_unique_{index}", self.name));

                ColumnInfo {
                    table: self.name.clone(),
                    column: column.name.clone(),
                    ty: column.ty,
                    nullable: column.nullable,
                    is_primary_key: column.primary_key,
                    is_unique: column.unique,
                    unique_key,
                    auto_increment: column.auto_increment,
                    foreign_key: column.references.clone(),
                }
            })
            .collect()
    }
}

impl ColumnDecl {
    pub fn new(name: impl Into<String>, ty: Type) -> ColumnDecl {
        ColumnDecl {
            name: name.into(),
            ty,
            ..Default::default()
        }
    }

    /// An auto-increment integer primary key
    pub fn id(name: impl Into<String>) -> ColumnDecl {
        ColumnDecl::new(name, Type::Number)
            .primary_key()
            .auto_increment()
    }

    pub fn nullable(mut self) -> ColumnDecl {
        self.nullable = true;
        self
    }

    pub fn primary_key(mut self) -> ColumnDecl {
        self.primary_key = true;
        self
    }

    pub fn unique(mut self) -> ColumnDecl {
        self.unique = true;
        self
    }

    pub fn auto_increment(mut self) -> ColumnDecl {
        self.auto_increment = true;
        self
    }

    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> ColumnDecl {
        self.references = Some(ForeignKeyInfo {
            referenced_table: table.into(),
            referenced_column: column.into(),
        });
        self
    }
}
