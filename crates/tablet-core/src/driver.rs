mod capability;
pub use capability::Capability;

mod catalog;
pub use catalog::{ColumnInfo, ForeignKeyInfo};

pub mod operation;
pub use operation::{Operation, Transaction};

mod response;
pub use response::{Response, Rows};

use crate::{async_trait, Result};

use std::fmt::Debug;

#[async_trait]
pub trait Driver: Debug + Send + Sync + 'static {
    /// Describes the driver's capability, which decides how row reservation
    /// is serialized.
    fn capability(&self) -> &'static Capability;

    /// Opens a new connection to the database.
    async fn connect(&self) -> Result<Box<dyn Connection>>;

    /// Upper bound on the number of connections the pool may open. `None`
    /// leaves the pool configuration in charge.
    fn max_connections(&self) -> Option<usize> {
        None
    }
}

#[async_trait]
pub trait Connection: Debug + Send + 'static {
    /// Execute a database operation
    async fn exec(&mut self, op: Operation) -> Result<Response>;

    /// Reads column-level catalog metadata for every user table, ordered by
    /// table then column position.
    async fn introspect(&mut self) -> Result<Vec<ColumnInfo>>;

    /// Runs a batch of `;`-separated statements without parameters.
    async fn exec_script(&mut self, sql: &str) -> Result<()>;
}
