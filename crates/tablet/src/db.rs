mod builder;
mod connect;
mod pool;
mod session;

pub use builder::Builder;
pub use connect::Connect;
pub use pool::*;
pub(crate) use session::Session;

use crate::{
    queue::{self, Queue},
    Result, Table,
};

use tablet_core::{
    err,
    stmt::{PendingId, Record},
    Error, Schema,
};

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, MutexGuard,
};

/// Shared state between all `Database` clones.
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) schema: Schema,
    pub(crate) pool: Pool,

    /// Records queued with `Table::append`, waiting for `flush`
    pub(crate) queue: Mutex<Queue>,

    /// Serializes concurrent `flush` calls
    pub(crate) flushing: tokio::sync::Mutex<()>,

    /// Statements sent to the driver, transaction control included
    pub(crate) queries: AtomicU64,
}

/// A database handle: the model graph, a connection pool and the queue of
/// appended records. Cloning is cheap and every clone shares the same state.
#[derive(Debug, Clone)]
pub struct Database {
    pub(crate) shared: Arc<Shared>,
}

impl Database {
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub(crate) fn new(schema: Schema, pool: Pool) -> Database {
        Database {
            shared: Arc::new(Shared {
                schema,
                pool,
                queue: Mutex::new(Queue::default()),
                flushing: tokio::sync::Mutex::new(()),
                queries: AtomicU64::new(0),
            }),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.shared.schema
    }

    /// Returns the table mapped by the model named `name`, looking the name
    /// up as a table name first and as a model name second.
    pub fn table(&self, name: &str) -> Result<Table> {
        let schema = &self.shared.schema;

        let model = schema
            .model_by_table(name)
            .or_else(|| schema.model_by_name(name))
            .ok_or_else(|| Error::invalid_payload(format!("unknown table `{name}`")))?;

        Ok(Table::new(self.clone(), model.id))
    }

    /// Inserts every queued record in one transaction and writes the assigned
    /// keys back into the queue.
    pub async fn flush(&self) -> Result<()> {
        let _flushing = self.shared.flushing.lock().await;

        let batch = self.queue().begin_flush(&self.shared.schema)?;

        if batch.is_empty() {
            return Ok(());
        }

        match queue::flush(self, &batch).await {
            Ok(rows) => {
                self.queue().complete_flush(&self.shared.schema, &batch, rows);
                Ok(())
            }
            Err(err) => {
                self.queue().abort_flush(&batch);
                Err(err)
            }
        }
    }

    /// Current contents of a queued record. After a successful `flush`, the
    /// record holds the row as stored, generated key included.
    ///
    /// Flushed rows stay in memory for the life of the database so that
    /// handles keep resolving. Call [`forget`](Database::forget) once a
    /// handle is no longer needed.
    pub fn pending(&self, id: PendingId) -> Option<Record> {
        self.queue().get(id)
    }

    /// Releases the stored row of a flushed record and returns it. The
    /// handle resolves to nothing afterwards and can no longer be
    /// referenced by `append`.
    ///
    /// Returns `None`, keeping the record, while it has values still to
    /// write or another queued record references it.
    pub fn forget(&self, id: PendingId) -> Option<Record> {
        self.queue().forget(id)
    }

    /// Runs `;`-separated SQL statements on one pooled connection.
    pub async fn exec_script(&self, sql: &str) -> Result<()> {
        let mut session = self.session().await?;
        session.exec_script(sql).await
    }

    /// Number of statements issued through this database so far.
    pub fn query_count(&self) -> u64 {
        self.shared.queries.load(Ordering::Relaxed)
    }

    /// Closes the pool. Queued records that were never flushed are dropped.
    pub fn close(&self) {
        let dropped = self.queue().len();

        if dropped > 0 {
            tracing::warn!(dropped, "closing database with unflushed records");
        }

        self.shared.pool.close();
    }

    pub(crate) async fn session(&self) -> Result<Session> {
        if self.shared.pool.is_closed() {
            return Err(err!("database is closed"));
        }

        let connection = self.shared.pool.get().await?;
        Ok(Session::new(connection, self.shared.clone()))
    }

    pub(crate) fn queue(&self) -> MutexGuard<'_, Queue> {
        self.shared
            .queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
