use crate::{db::Session, Result};

use tablet_core::{
    driver::{operation, Response},
    stmt::{Record, Statement},
};
use tracing::{debug, warn};

/// An active database transaction on one pooled connection.
///
/// If dropped without calling [`commit`](Self::commit) or
/// [`rollback`](Self::rollback), the transaction is automatically rolled back.
#[derive(Debug)]
pub(crate) struct Transaction {
    /// Pinned connection for the duration of the transaction.
    /// `Option` so that `Drop` can `.take()` and move it into a spawned task.
    session: Option<Session>,

    /// Whether commit or rollback has been called.
    committed: bool,
}

impl Transaction {
    /// Starts a transaction. An exclusive transaction holds the database write
    /// lock from the start, on drivers that lock the whole database.
    pub(crate) async fn begin(mut session: Session, exclusive: bool) -> Result<Transaction> {
        session
            .exec(operation::Transaction::Start { exclusive })
            .await?;

        debug!(exclusive, "transaction started");

        Ok(Transaction {
            session: Some(session),
            committed: false,
        })
    }

    /// Commit the transaction.
    pub(crate) async fn commit(mut self) -> Result<()> {
        self.session().exec(operation::Transaction::Commit).await?;
        self.committed = true;
        debug!("transaction committed");
        Ok(())
    }

    /// Roll back the transaction.
    pub(crate) async fn rollback(mut self) -> Result<()> {
        self.committed = true;
        self.session().exec(operation::Transaction::Rollback).await?;
        debug!("transaction rolled back");
        Ok(())
    }

    /// Commits if `result` is `Ok`. Otherwise rolls back and returns the
    /// error that caused the rollback, even if the rollback itself fails.
    pub(crate) async fn finish<T>(self, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = self.rollback().await {
                    warn!(error = %rollback, cause = %err, "transaction rollback failed");
                }
                Err(err)
            }
        }
    }

    pub(crate) async fn exec(&mut self, stmt: impl Into<Statement>) -> Result<Response> {
        self.session().exec_stmt(stmt).await
    }

    pub(crate) async fn query(&mut self, stmt: impl Into<Statement>) -> Result<Vec<Record>> {
        self.session().query(stmt).await
    }

    pub(crate) fn session(&mut self) -> &mut Session {
        self.session
            .as_mut()
            .expect("connection taken after commit/rollback")
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.committed {
            return;
        }

        let Some(mut session) = self.session.take() else {
            return;
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("transaction dropped outside of a runtime; connection discarded");
            return;
        };

        runtime.spawn(async move {
            if let Err(err) = session.exec(operation::Transaction::Rollback).await {
                warn!(error = %err, "rollback of dropped transaction failed");
            }
        });
    }
}
