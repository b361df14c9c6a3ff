mod value;
pub(crate) use value::Value;

use mysql_async::{
    prelude::{Queryable, ToValue},
    Conn, Pool,
};
use tablet_core::{
    async_trait,
    driver::{Capability, ColumnInfo, Driver, ForeignKeyInfo, Operation, Response},
    stmt::{Record, Statement, Type},
    Error, Result,
};
use tablet_sql::Serializer;
use url::Url;

#[derive(Debug)]
pub struct MySQL {
    pool: Pool,
}

impl MySQL {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url_str = url.into();
        let url = Url::parse(&url_str).map_err(Error::driver_operation_failed)?;

        if url.scheme() != "mysql" {
            tablet_core::bail!("connection url does not have a `mysql` scheme; url={url}");
        }

        if url.host_str().is_none() {
            tablet_core::bail!("missing host in connection URL; url={url}");
        }

        if url.path().is_empty() || url.path() == "/" {
            tablet_core::bail!("no database specified - missing path in connection URL; url={url}");
        }

        let opts = mysql_async::Opts::from_url(url.as_ref()).map_err(Error::driver_operation_failed)?;
        let opts = mysql_async::OptsBuilder::from_opts(opts).client_found_rows(true);

        let pool = Pool::new(opts);
        Ok(Self { pool })
    }
}

impl From<Pool> for MySQL {
    fn from(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Driver for MySQL {
    fn capability(&self) -> &'static Capability {
        &Capability::MYSQL
    }

    async fn connect(&self) -> Result<Box<dyn tablet_core::driver::Connection>> {
        let conn = self
            .pool
            .get_conn()
            .await
            .map_err(Error::driver_operation_failed)?;
        Ok(Box::new(Connection::new(conn)))
    }
}

#[derive(Debug)]
pub struct Connection {
    conn: Conn,
    serializer: Serializer,
}

impl Connection {
    pub fn new(conn: Conn) -> Self {
        Self {
            conn,
            serializer: Serializer::mysql(),
        }
    }

    async fn exec_statement(&mut self, stmt: &Statement) -> Result<Response> {
        let mut params: Vec<tablet_core::stmt::Value> = Vec::new();
        let sql = self.serializer.serialize(stmt, &mut params);

        tracing::debug!(sql = %sql, params = params.len(), "mysql query");

        let params = params.into_iter().map(Value::from).collect::<Vec<_>>();
        let args = params
            .iter()
            .map(|param| param.to_value())
            .collect::<Vec<_>>();

        let statement = self
            .conn
            .prep(&sql)
            .await
            .map_err(Error::driver_operation_failed)?;

        if !stmt.is_select() {
            let result = self
                .conn
                .exec_iter(&statement, mysql_async::Params::Positional(args))
                .await
                .map_err(Error::driver_operation_failed)?;

            let count = result.affected_rows();
            let last_insert_id = result.last_insert_id();

            // Drain the result so the connection can be reused
            result
                .drop_result()
                .await
                .map_err(Error::driver_operation_failed)?;

            return Ok(match (stmt, last_insert_id) {
                (Statement::Insert(_), Some(id)) => {
                    Response::inserted(count, Value::from_sql(mysql_async::Value::UInt(id)).into_inner())
                }
                _ => Response::count(count),
            });
        }

        let rows: Vec<mysql_async::Row> = self
            .conn
            .exec(&statement, mysql_async::Params::Positional(args))
            .await
            .map_err(Error::driver_operation_failed)?;

        let mut ret = Vec::with_capacity(rows.len());

        for mut row in rows {
            let columns = row.columns();
            let mut record = Record::new();

            for (index, column) in columns.iter().enumerate() {
                let value = row.take(index).unwrap_or(mysql_async::Value::NULL);
                record.insert(column.name_str().into_owned(), Value::from_sql(value).into_inner());
            }

            ret.push(record);
        }

        Ok(Response::values(ret))
    }
}

impl From<Conn> for Connection {
    fn from(conn: Conn) -> Self {
        Self::new(conn)
    }
}

/// (table, column, data type, nullable, column key, extra)
type CatalogColumn = (String, String, String, String, String, String);

/// (table, column, constraint, referenced table, referenced column)
type CatalogKey = (String, String, String, Option<String>, Option<String>);

#[async_trait]
impl tablet_core::driver::Connection for Connection {
    async fn exec(&mut self, op: Operation) -> Result<Response> {
        match op {
            Operation::QuerySql(stmt) => self.exec_statement(&stmt).await,
            Operation::Transaction(op) => {
                let sql = self.serializer.serialize_transaction(&op);
                tracing::debug!(sql = %sql, "mysql transaction");

                self.conn
                    .query_drop(sql)
                    .await
                    .map_err(Error::driver_operation_failed)?;
                Ok(Response::count(0))
            }
        }
    }

    async fn introspect(&mut self) -> Result<Vec<ColumnInfo>> {
        let columns: Vec<CatalogColumn> = self
            .conn
            .query(
                "SELECT TABLE_NAME, COLUMN_NAME, COLUMN_TYPE, IS_NULLABLE, COLUMN_KEY, EXTRA \
                 FROM information_schema.COLUMNS \
                 WHERE TABLE_SCHEMA = DATABASE() \
                 ORDER BY TABLE_NAME, ORDINAL_POSITION",
            )
            .await
            .map_err(Error::driver_operation_failed)?;

        let keys: Vec<CatalogKey> = self
            .conn
            .query(
                "SELECT TABLE_NAME, COLUMN_NAME, CONSTRAINT_NAME, REFERENCED_TABLE_NAME, REFERENCED_COLUMN_NAME \
                 FROM information_schema.KEY_COLUMN_USAGE \
                 WHERE TABLE_SCHEMA = DATABASE() \
                 ORDER BY TABLE_NAME, CONSTRAINT_NAME, ORDINAL_POSITION",
            )
            .await
            .map_err(Error::driver_operation_failed)?;

        // (table, index, column)
        let unique_indices: Vec<(String, String, String)> = self
            .conn
            .query(
                "SELECT TABLE_NAME, INDEX_NAME, COLUMN_NAME \
                 FROM information_schema.STATISTICS \
                 WHERE TABLE_SCHEMA = DATABASE() AND NON_UNIQUE = 0 AND INDEX_NAME <> 'PRIMARY' \
                 ORDER BY TABLE_NAME, INDEX_NAME, SEQ_IN_INDEX",
            )
            .await
            .map_err(Error::driver_operation_failed)?;

        let mut ret = Vec::with_capacity(columns.len());

        for (table, column, ty, nullable, column_key, extra) in columns {
            let foreign_key = keys
                .iter()
                .find(|(t, c, _, referenced, _)| *t == table && *c == column && referenced.is_some())
                .and_then(|(_, _, _, referenced_table, referenced_column)| {
                    Some(ForeignKeyInfo {
                        referenced_table: referenced_table.clone()?,
                        referenced_column: referenced_column.clone()?,
                    })
                });

            let index = unique_indices
                .iter()
                .find(|(t, _, c)| *t == table && *c == column)
                .map(|(_, index, _)| index.clone());

            let width = index.as_ref().map(|index| {
                unique_indices
                    .iter()
                    .filter(|(t, i, _)| *t == table && i == index)
                    .count()
            });

            let (is_unique, unique_key) = match width {
                Some(1) => (true, None),
                Some(_) => (false, index),
                None => (false, None),
            };

            ret.push(ColumnInfo {
                is_primary_key: column_key == "PRI",
                nullable: nullable == "YES",
                auto_increment: extra.contains("auto_increment"),
                ty: Type::from_sql_name(&ty),
                table,
                column,
                is_unique,
                unique_key,
                foreign_key,
            });
        }

        tracing::debug!(columns = ret.len(), "introspected mysql catalog");

        Ok(ret)
    }

    async fn exec_script(&mut self, sql: &str) -> Result<()> {
        self.conn
            .query_drop(sql)
            .await
            .map_err(Error::driver_operation_failed)
    }
}
