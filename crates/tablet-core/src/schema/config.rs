use super::{naming, Schema};
use crate::{Error, Result};

use serde::{Deserialize, Serialize};

/// Name overrides and relation hints applied during schema construction.
///
/// Serializes to camelCase JSON, so overrides can be kept in a file:
///
/// ```json
/// { "models": [{ "table": "product_category",
///                "fields": [{ "column": "product_id", "relatedName": "categorySet" }] }] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaConfig {
    #[serde(default)]
    pub models: Vec<ModelConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    pub table: String,

    /// Model name, instead of the pascal-cased table name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Forces (or suppresses) treating the table as a many-to-many junction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub junction: Option<bool>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldConfig {
    pub column: String,

    /// Field name, instead of the derived one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Name of the related field created on the model this foreign key
    /// references
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_name: Option<String>,

    /// The junction's other foreign key column. Marks the table as a junction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub through_field: Option<String>,

    /// Do not create a related field for this foreign key
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub suppress_related: bool,
}

impl SchemaConfig {
    pub fn new() -> SchemaConfig {
        SchemaConfig::default()
    }

    pub fn model(&self, table: &str) -> Option<&ModelConfig> {
        self.models.iter().find(|model| model.table == table)
    }

    pub fn field(&self, table: &str, column: &str) -> Option<&FieldConfig> {
        self.model(table)?
            .fields
            .iter()
            .find(|field| field.column == column)
    }

    /// Returns the entry for `table`, adding an empty one if missing.
    pub fn model_mut(&mut self, table: &str) -> &mut ModelConfig {
        let index = match self.models.iter().position(|model| model.table == table) {
            Some(index) => index,
            None => {
                self.models.push(ModelConfig {
                    table: table.to_string(),
                    ..Default::default()
                });
                self.models.len() - 1
            }
        };

        &mut self.models[index]
    }

    /// Renames the model mapped to `table` and rewrites the names of all
    /// foreign keys referencing it, so `first_post_id` follows `Post` to
    /// `WebPost` as `firstWebPost`.
    pub fn set_model_name(&mut self, schema: &Schema, table: &str, name: &str) -> Result<()> {
        let Some(model) = schema.model_by_table(table) else {
            return Err(Error::invalid_schema(format!("unknown table `{table}`")));
        };

        let old = naming::lower_first(&model.name);
        let new = naming::lower_first(name);

        self.model_mut(table).name = Some(name.to_string());

        for referencing in schema.models() {
            for field in referencing.column_fields() {
                let Some(fk) = field.as_foreign_key() else {
                    continue;
                };

                if fk.target.model != model.id {
                    continue;
                }

                let renamed = if field.name == old {
                    new.clone()
                } else if let Some(prefix) = field.name.strip_suffix(&naming::upper_first(&old)) {
                    format!("{prefix}{}", naming::upper_first(&new))
                } else {
                    continue;
                };

                let column = fk.column.clone();
                let entry = self.model_mut(&referencing.table);

                match entry.fields.iter_mut().find(|f| f.column == column) {
                    Some(field) => field.name = Some(renamed),
                    None => entry.fields.push(FieldConfig {
                        column,
                        name: Some(renamed),
                        ..Default::default()
                    }),
                }
            }
        }

        Ok(())
    }
}

impl ModelConfig {
    pub fn new(table: impl Into<String>) -> ModelConfig {
        ModelConfig {
            table: table.into(),
            ..Default::default()
        }
    }

    pub fn field(&self, column: &str) -> Option<&FieldConfig> {
        self.fields.iter().find(|field| field.column == column)
    }
}
