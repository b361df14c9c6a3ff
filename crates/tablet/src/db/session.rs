use super::{PoolConnection, Shared};
use crate::Result;

use tablet_core::{
    driver::{Operation, Response},
    stmt::{Record, Statement},
};

use std::sync::{atomic::Ordering, Arc};

/// A connection checked out of the pool for the duration of one operation.
///
/// Every statement issued by the engine goes through a session so the
/// database can count them.
#[derive(Debug)]
pub(crate) struct Session {
    connection: PoolConnection,
    shared: Arc<Shared>,
}

impl Session {
    pub(crate) fn new(connection: PoolConnection, shared: Arc<Shared>) -> Session {
        Session { connection, shared }
    }

    pub(crate) async fn exec(&mut self, op: impl Into<Operation>) -> Result<Response> {
        self.shared.queries.fetch_add(1, Ordering::Relaxed);
        self.connection.exec(op.into()).await
    }

    pub(crate) async fn exec_stmt(&mut self, stmt: impl Into<Statement>) -> Result<Response> {
        self.exec(stmt.into()).await
    }

    /// Runs a select and returns its rows, keyed by column name.
    pub(crate) async fn query(&mut self, stmt: impl Into<Statement>) -> Result<Vec<Record>> {
        let response = self.exec_stmt(stmt).await?;
        Ok(response.rows.into_values())
    }

    pub(crate) async fn exec_script(&mut self, sql: &str) -> Result<()> {
        self.shared.queries.fetch_add(1, Ordering::Relaxed);
        self.connection.exec_script(sql).await
    }
}
