use super::{Connect, Database, Pool, PoolConfig};
use crate::{driver::Driver, Result};

use tablet_core::schema::{self, Naming, Schema, SchemaConfig, TableDecl};

#[derive(Debug, Default)]
pub struct Builder {
    source: Source,

    /// Naming and overrides used when the schema is built here
    core: schema::Builder,

    pool: PoolConfig,

    /// SQL run on the new pool before the schema is read
    script: Option<String>,
}

/// Where the model graph comes from
#[derive(Debug, Default)]
enum Source {
    /// Read the catalog of the connected database
    #[default]
    Introspect,

    /// Use a schema built by the caller
    Schema(Schema),

    /// Build from declared tables
    Tables(Vec<TableDecl>),
}

impl Builder {
    /// Use an already built schema. Naming and config set on this builder
    /// are ignored.
    pub fn schema(&mut self, schema: Schema) -> &mut Self {
        self.source = Source::Schema(schema);
        self
    }

    /// Declare a table. Once any table is declared, the schema is built from
    /// the declarations instead of the database catalog.
    pub fn table(&mut self, table: TableDecl) -> &mut Self {
        match &mut self.source {
            Source::Tables(tables) => tables.push(table),
            source => *source = Source::Tables(vec![table]),
        }
        self
    }

    /// Build the schema from the connected database's catalog. This is the
    /// default.
    pub fn introspect(&mut self) -> &mut Self {
        self.source = Source::Introspect;
        self
    }

    pub fn naming(&mut self, naming: Naming) -> &mut Self {
        self.core.naming(naming);
        self
    }

    pub fn config(&mut self, config: SchemaConfig) -> &mut Self {
        self.core.config(config);
        self
    }

    pub fn pool(&mut self, config: PoolConfig) -> &mut Self {
        self.pool = config;
        self
    }

    /// Runs `sql` once the pool is up and before the catalog is read. An
    /// in-memory database only exists inside the pool, so this is where its
    /// tables get created.
    pub fn script(&mut self, sql: impl Into<String>) -> &mut Self {
        self.script = Some(sql.into());
        self
    }

    pub async fn connect(&mut self, url: &str) -> Result<Database> {
        self.build(Connect::new(url)?).await
    }

    pub async fn build(&mut self, driver: impl Driver) -> Result<Database> {
        let pool = Pool::new(driver, self.pool.clone())?;

        if let Some(script) = self.script.take() {
            pool.get()
                .await?
                .exec_script(&script)
                .await
                .map_err(|err| err.context("running setup script"))?;
        }

        let schema = match std::mem::take(&mut self.source) {
            Source::Schema(schema) => schema,
            Source::Tables(tables) => self.core.build_from_decls(&tables)?,
            Source::Introspect => {
                let mut connection = pool.get().await?;
                let columns = connection
                    .introspect()
                    .await
                    .map_err(|err| err.context("reading the database catalog"))?;
                tracing::debug!(columns = columns.len(), "building schema from catalog");
                self.core.build(&columns)?
            }
        };

        Ok(Database::new(schema, pool))
    }
}
