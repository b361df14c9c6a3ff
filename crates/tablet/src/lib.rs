mod db;
pub use db::{Builder, Connect, Database, Pool, PoolConfig, PoolConnection};

mod engine;
pub use engine::Selection;

mod queue;

mod table;
pub use table::{OrderBy, SelectOptions, Table};

mod transaction;

pub use tablet_core::{
    driver::{self, Driver},
    err,
    schema::{self, Naming, NamingStyle, Schema, SchemaConfig},
    stmt::{PendingId, Record, Type, Value},
    Error, Result,
};

/// A row returned by reads and mutations, keyed by field name.
pub type Row = Record;

#[cfg(feature = "mysql")]
pub use tablet_driver_mysql::MySQL;

#[cfg(feature = "sqlite")]
pub use tablet_driver_sqlite::Sqlite;
