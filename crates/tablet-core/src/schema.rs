mod builder;
pub use builder::Builder;

mod config;
pub use config::{FieldConfig, ModelConfig, SchemaConfig};

mod decl;
pub use decl::{ColumnDecl, TableDecl};

mod field;
pub use field::{Field, FieldId, FieldTy, ForeignKey, Primitive, Related};

mod model;
pub use model::{Model, ModelId, UniqueKey};

pub mod naming;
pub use naming::{Naming, NamingStyle};

use crate::driver::ColumnInfo;
use crate::Result;

use indexmap::IndexMap;

/// The model graph of one database.
///
/// Built once, read-only afterwards.
#[derive(Debug, Clone)]
pub struct Schema {
    pub models: Vec<Model>,
    by_table: IndexMap<String, ModelId>,
    by_name: IndexMap<String, ModelId>,
}

impl Schema {
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Builds a schema from catalog rows with default naming and no overrides.
    pub fn from_columns(columns: &[ColumnInfo]) -> Result<Schema> {
        Builder::new().build(columns)
    }

    pub fn from_decls(tables: &[TableDecl]) -> Result<Schema> {
        Builder::new().build_from_decls(tables)
    }

    pub fn models(&self) -> impl Iterator<Item = &Model> {
        self.models.iter()
    }

    /// Get a model by ID
    pub fn model(&self, id: ModelId) -> &Model {
        self.models.get(id.0).expect("invalid model ID")
    }

    /// Get a field by ID
    pub fn field(&self, id: FieldId) -> &Field {
        self.model(id.model)
            .fields
            .get(id.index)
            .expect("invalid field ID")
    }

    pub fn model_by_table(&self, table: &str) -> Option<&Model> {
        self.by_table.get(table).map(|id| self.model(*id))
    }

    pub fn model_by_name(&self, name: &str) -> Option<&Model> {
        self.by_name.get(name).map(|id| self.model(*id))
    }
}
