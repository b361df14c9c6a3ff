mod introspect;

mod value;
pub(crate) use value::Value;

use rusqlite::Connection as RusqliteConnection;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use tablet_core::{
    async_trait,
    driver::{Capability, ColumnInfo, Driver, Operation, Response},
    stmt::{Record, Statement},
    Error, Result,
};
use tablet_sql::Serializer;
use url::Url;

/// How long a connection waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub enum Sqlite {
    File(PathBuf),
    InMemory,
}

impl Sqlite {
    /// Create a new SQLite driver with an arbitrary connection URL
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url_str = url.into();
        let url = Url::parse(&url_str).map_err(Error::driver_operation_failed)?;

        if url.scheme() != "sqlite" {
            tablet_core::bail!("connection URL does not have a `sqlite` scheme; url={url_str}");
        }

        if url.path() == ":memory:" {
            Ok(Self::InMemory)
        } else {
            Ok(Self::File(PathBuf::from(url.path())))
        }
    }

    /// Create an in-memory SQLite database
    pub fn in_memory() -> Self {
        Self::InMemory
    }

    /// Open a SQLite database at the specified file path
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self::File(path.as_ref().to_path_buf())
    }
}

#[async_trait]
impl Driver for Sqlite {
    fn capability(&self) -> &'static Capability {
        &Capability::SQLITE
    }

    async fn connect(&self) -> Result<Box<dyn tablet_core::Connection>> {
        let connection = match self {
            Sqlite::File(path) => Connection::open(path)?,
            Sqlite::InMemory => Connection::in_memory()?,
        };
        Ok(Box::new(connection))
    }

    /// Every in-memory connection is a separate database, so the pool must
    /// hand out the same one.
    fn max_connections(&self) -> Option<usize> {
        matches!(self, Self::InMemory).then_some(1)
    }
}

#[derive(Debug)]
pub struct Connection {
    connection: RusqliteConnection,
    serializer: Serializer,
}

impl Connection {
    pub fn in_memory() -> Result<Self> {
        let connection =
            RusqliteConnection::open_in_memory().map_err(Error::driver_operation_failed)?;
        Self::init(connection)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let connection = RusqliteConnection::open(path).map_err(Error::driver_operation_failed)?;
        Self::init(connection)
    }

    fn init(connection: RusqliteConnection) -> Result<Self> {
        connection
            .busy_timeout(BUSY_TIMEOUT)
            .map_err(Error::driver_operation_failed)?;
        connection
            .execute_batch("PRAGMA foreign_keys = ON")
            .map_err(Error::driver_operation_failed)?;

        Ok(Self {
            connection,
            serializer: Serializer::sqlite(),
        })
    }

    fn exec_statement(&mut self, stmt: &Statement) -> Result<Response> {
        let mut params: Vec<tablet_core::stmt::Value> = vec![];
        let sql = self.serializer.serialize(stmt, &mut params);

        tracing::debug!(sql = %sql, params = params.len(), "sqlite query");

        let params = params.into_iter().map(Value::from).collect::<Vec<_>>();

        let mut prepared = self
            .connection
            .prepare_cached(&sql)
            .map_err(Error::driver_operation_failed)?;

        if !stmt.is_select() {
            let count = prepared
                .execute(rusqlite::params_from_iter(params.iter()))
                .map_err(Error::driver_operation_failed)?;

            return Ok(match stmt {
                Statement::Insert(_) => Response::inserted(
                    count as u64,
                    self.connection.last_insert_rowid().into(),
                ),
                _ => Response::count(count as u64),
            });
        }

        let columns: Vec<String> = prepared
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();

        let mut rows = prepared
            .query(rusqlite::params_from_iter(params.iter()))
            .map_err(Error::driver_operation_failed)?;

        let mut ret = vec![];

        while let Some(row) = rows.next().map_err(Error::driver_operation_failed)? {
            let mut record = Record::new();

            for (index, column) in columns.iter().enumerate() {
                let value = Value::from_sql(row, index).map_err(Error::driver_operation_failed)?;
                record.insert(column.clone(), value.into_inner());
            }

            ret.push(record);
        }

        Ok(Response::values(ret))
    }
}

#[async_trait]
impl tablet_core::driver::Connection for Connection {
    async fn exec(&mut self, op: Operation) -> Result<Response> {
        match op {
            Operation::QuerySql(stmt) => self.exec_statement(&stmt),
            Operation::Transaction(op) => {
                let sql = self.serializer.serialize_transaction(&op);
                tracing::debug!(sql = %sql, "sqlite transaction");

                self.connection
                    .execute_batch(&sql)
                    .map_err(Error::driver_operation_failed)?;
                Ok(Response::count(0))
            }
        }
    }

    async fn introspect(&mut self) -> Result<Vec<ColumnInfo>> {
        introspect::columns(&self.connection, &self.serializer)
    }

    async fn exec_script(&mut self, sql: &str) -> Result<()> {
        self.connection
            .execute_batch(sql)
            .map_err(Error::driver_operation_failed)
    }
}
