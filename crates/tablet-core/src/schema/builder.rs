use super::{
    naming, Field, FieldId, FieldTy, ForeignKey, Model, ModelId, Naming, Primitive, Related,
    Schema, SchemaConfig, TableDecl, UniqueKey,
};
use crate::driver::ColumnInfo;
use crate::{Error, Result};

use indexmap::IndexMap;

#[derive(Debug, Default)]
pub struct Builder {
    config: SchemaConfig,
    naming: Naming,
}

/// Used to track state during the build process
struct BuildSchema<'a> {
    /// Build options
    builder: &'a Builder,

    /// Catalog rows grouped by table, in first-appearance order. A model's id
    /// is the index of its table here.
    tables: IndexMap<&'a str, Vec<&'a ColumnInfo>>,

    /// Models as they are built
    models: Vec<Model>,

    by_name: IndexMap<String, ModelId>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&mut self, config: SchemaConfig) -> &mut Self {
        self.config = config;
        self
    }

    pub fn naming(&mut self, naming: Naming) -> &mut Self {
        self.naming = naming;
        self
    }

    /// Builds the model graph from catalog rows.
    pub fn build(&self, columns: &[ColumnInfo]) -> Result<Schema> {
        let mut tables: IndexMap<&str, Vec<&ColumnInfo>> = IndexMap::new();

        for column in columns {
            tables.entry(&column.table).or_default().push(column);
        }

        let mut build = BuildSchema {
            builder: self,
            tables,
            models: vec![],
            by_name: IndexMap::new(),
        };

        for index in 0..build.tables.len() {
            let model = build.build_model(ModelId(index))?;
            build.models.push(model);
        }

        // Relations are attached once every model exists, so foreign keys can
        // point forward.
        for index in 0..build.models.len() {
            if build.models[index].junction {
                build.link_junction(ModelId(index))?;
            } else {
                build.link_foreign_keys(ModelId(index))?;
            }
        }

        let by_table = build
            .models
            .iter()
            .map(|model| (model.table.clone(), model.id))
            .collect();

        tracing::debug!(models = build.models.len(), "schema built");

        Ok(Schema {
            models: build.models,
            by_table,
            by_name: build.by_name,
        })
    }

    pub fn build_from_decls(&self, tables: &[TableDecl]) -> Result<Schema> {
        let columns: Vec<_> = tables.iter().flat_map(TableDecl::to_columns).collect();
        self.build(&columns)
    }
}

impl BuildSchema<'_> {
    fn build_model(&mut self, id: ModelId) -> Result<Model> {
        let (table, columns) = self
            .tables
            .get_index(id.0)
            .map(|(table, columns)| (*table, columns))
            .expect("model id out of range");
        let config = self.builder.config.model(table);

        let name = config
            .and_then(|config| config.name.clone())
            .unwrap_or_else(|| naming::model_name(table));

        if let Some(other) = self.by_name.get(&name) {
            return Err(Error::invalid_schema(format!(
                "duplicate model name `{name}` for tables `{}` and `{table}`",
                self.tables.get_index(other.0).map(|(t, _)| *t).unwrap_or_default()
            )));
        }

        let mut fields: Vec<Field> = vec![];

        for (index, column) in columns.iter().enumerate() {
            let field_config = config.and_then(|config| config.field(&column.column));
            let field_id = FieldId { model: id, index };

            let (default_name, ty) = match &column.foreign_key {
                Some(fk) => (
                    naming::foreign_key_name(&column.column),
                    FieldTy::ForeignKey(ForeignKey {
                        column: column.column.clone(),
                        ty: column.ty,
                        target: self.resolve_reference(
                            table,
                            &column.column,
                            &fk.referenced_table,
                            &fk.referenced_column,
                        )?,
                        related: None,
                    }),
                ),
                None => (
                    naming::field_name(&column.column),
                    FieldTy::Primitive(Primitive {
                        column: column.column.clone(),
                        ty: column.ty,
                    }),
                ),
            };

            let field_name = field_config
                .and_then(|config| config.name.clone())
                .unwrap_or(default_name);

            if fields.iter().any(|field| field.name == field_name) {
                return Err(Error::invalid_schema(format!(
                    "field `{name}::{field_name}` is defined twice; set a `name` for column `{table}.{}`",
                    column.column
                )));
            }

            fields.push(Field {
                id: field_id,
                name: field_name,
                ty,
                nullable: column.nullable,
                primary_key: column.is_primary_key,
                auto_increment: column.auto_increment,
            });
        }

        let primary_key: Vec<_> = fields
            .iter()
            .filter(|field| field.primary_key)
            .map(|field| field.id)
            .collect();

        let junction = self.is_junction(table, columns, &fields)?;

        // Junction rows are addressed by their foreign key pair.
        if primary_key.is_empty() && !junction {
            return Err(Error::invalid_schema(format!(
                "table `{table}` has no primary key"
            )));
        }

        let unique_keys = build_unique_keys(&primary_key, columns, &fields);

        self.by_name.insert(name.clone(), id);

        Ok(Model {
            id,
            name,
            table: table.to_string(),
            fields,
            primary_key,
            unique_keys,
            junction,
        })
    }

    fn resolve_reference(
        &self,
        table: &str,
        column: &str,
        referenced_table: &str,
        referenced_column: &str,
    ) -> Result<FieldId> {
        let Some((model, _, columns)) = self.tables.get_full(referenced_table) else {
            return Err(Error::invalid_schema(format!(
                "foreign key `{table}.{column}` references unknown table `{referenced_table}`"
            )));
        };

        let Some(index) = columns
            .iter()
            .position(|c| c.column == referenced_column)
        else {
            return Err(Error::invalid_schema(format!(
                "foreign key `{table}.{column}` references unknown column `{referenced_table}.{referenced_column}`"
            )));
        };

        Ok(FieldId {
            model: ModelId(model),
            index,
        })
    }

    fn is_junction(&self, table: &str, columns: &[&ColumnInfo], fields: &[Field]) -> Result<bool> {
        let config = self.builder.config.model(table);
        let foreign_keys: Vec<_> = fields.iter().filter_map(Field::as_foreign_key).collect();

        let hinted = config.is_some_and(|config| {
            config
                .fields
                .iter()
                .any(|field| field.through_field.is_some())
        });

        let junction = match config.and_then(|config| config.junction) {
            Some(junction) => junction,
            None if hinted => true,
            None => {
                foreign_keys.len() == 2
                    && columns
                        .iter()
                        .all(|column| column.foreign_key.is_some() || column.is_primary_key)
            }
        };

        if !junction {
            return Ok(false);
        }

        if foreign_keys.len() != 2 {
            return Err(Error::invalid_schema(format!(
                "junction table `{table}` must have exactly two foreign keys, found {}",
                foreign_keys.len()
            )));
        }

        // A `throughField` hint must name the other foreign key
        for (fk, other) in [
            (foreign_keys[0], foreign_keys[1]),
            (foreign_keys[1], foreign_keys[0]),
        ] {
            let through = self
                .builder
                .config
                .field(table, &fk.column)
                .and_then(|config| config.through_field.as_deref());

            if let Some(through) = through {
                if through != other.column {
                    return Err(Error::invalid_schema(format!(
                        "`{table}.{}` has throughField `{through}`, expected `{}`",
                        fk.column, other.column
                    )));
                }
            }
        }

        Ok(true)
    }

    /// Creates the reverse side of every foreign key on `id`.
    fn link_foreign_keys(&mut self, id: ModelId) -> Result<()> {
        for index in 0..self.models[id.0].fields.len() {
            let field = &self.models[id.0].fields[index];
            let Some(fk) = field.as_foreign_key() else {
                continue;
            };

            let model = &self.models[id.0];
            let config = self.builder.config.field(&model.table, &fk.column);

            if config.is_some_and(|config| config.suppress_related) {
                continue;
            }

            let unique = model.primary_key == [field.id]
                || model
                    .unique_keys
                    .iter()
                    .any(|key| key.fields == [field.id]);

            let name = match config.and_then(|config| config.related_name.clone()) {
                Some(name) => name,
                None if unique => naming::lower_first(&model.name),
                None => self.builder.naming.pluralize(&naming::lower_first(&model.name)),
            };

            let target = fk.target.model;
            let related = Related {
                target: id,
                pair: field.id,
                through: None,
                unique,
            };
            let origin = format!("{}.{}", model.table, fk.column);

            let related_id = self.add_related(target, name, related, &origin)?;

            if let FieldTy::ForeignKey(fk) = &mut self.models[id.0].fields[index].ty {
                fk.related = Some(related_id);
            }
        }

        Ok(())
    }

    /// Exposes a junction as a many-to-many relation on both endpoints.
    fn link_junction(&mut self, id: ModelId) -> Result<()> {
        let junction = &self.models[id.0];
        let foreign_keys: Vec<_> = junction
            .fields
            .iter()
            .filter_map(|field| Some((field.id, field.as_foreign_key()?.clone())))
            .collect();

        let [(a_id, a), (b_id, b)] = &foreign_keys[..] else {
            return Err(Error::invalid_schema(format!(
                "junction table `{}` must have exactly two foreign keys",
                junction.table
            )));
        };

        let table = junction.table.clone();

        for ((pair_id, pair), (through_id, through)) in [((a_id, a), (b_id, b)), ((b_id, b), (a_id, a))] {
            let owner = pair.target.model;
            let target = through.target.model;

            let name = match self
                .builder
                .config
                .field(&table, &pair.column)
                .and_then(|config| config.related_name.clone())
            {
                Some(name) => name,
                None => self
                    .builder
                    .naming
                    .pluralize(&naming::lower_first(&self.models[target.0].name)),
            };

            let related = Related {
                target,
                pair: *pair_id,
                through: Some(*through_id),
                unique: false,
            };
            let origin = format!("{table}.{}", pair.column);

            self.add_related(owner, name, related, &origin)?;
        }

        Ok(())
    }

    fn add_related(
        &mut self,
        model: ModelId,
        name: String,
        related: Related,
        origin: &str,
    ) -> Result<FieldId> {
        let model = &mut self.models[model.0];

        if model.field(&name).is_some() {
            return Err(Error::invalid_schema(format!(
                "field `{}::{name}` is defined twice; set `relatedName` on `{origin}`",
                model.name
            )));
        }

        let id = FieldId {
            model: model.id,
            index: model.fields.len(),
        };

        model.fields.push(Field {
            id,
            name,
            ty: FieldTy::Related(related),
            nullable: false,
            primary_key: false,
            auto_increment: false,
        });

        Ok(id)
    }
}

/// Primary key first, then single-column unique fields in column order, then
/// composite constraints in first-appearance order.
fn build_unique_keys(
    primary_key: &[FieldId],
    columns: &[&ColumnInfo],
    fields: &[Field],
) -> Vec<UniqueKey> {
    let mut keys = vec![];

    if !primary_key.is_empty() {
        keys.push(UniqueKey {
            fields: primary_key.to_vec(),
            primary_key: true,
        });
    }

    for (column, field) in columns.iter().zip(fields) {
        if column.is_unique && primary_key != [field.id] {
            keys.push(UniqueKey {
                fields: vec![field.id],
                primary_key: false,
            });
        }
    }

    let mut composite: IndexMap<&str, Vec<FieldId>> = IndexMap::new();

    for (column, field) in columns.iter().zip(fields) {
        if let Some(name) = &column.unique_key {
            composite.entry(name).or_default().push(field.id);
        }
    }

    for (_, fields) in composite {
        if !keys.iter().any(|key| key.fields == fields) {
            keys.push(UniqueKey {
                fields,
                primary_key: false,
            });
        }
    }

    keys
}
