//! Reserving one row for exactly one caller.
//!
//! The select and the update run in one transaction. Drivers with row locks
//! select `FOR UPDATE SKIP LOCKED`, so concurrent claims pass over each
//! other's rows. Drivers without them begin the transaction holding the
//! database write lock, which serializes claims entirely.

use super::{filter, hydrate, planner, Selection};
use crate::{transaction::Transaction, Database, Result};

use tablet_core::{
    driver::Capability,
    schema::{Model, Schema},
    stmt::{self, Expr, Lock, Record, Select, Value},
};
use tracing::debug;

pub(crate) async fn claim(
    db: &Database,
    model: &Model,
    filter: &Value,
    data: &Record,
) -> Result<Option<Record>> {
    let schema = db.schema();
    let filter = filter::lower(schema, model, filter)?;
    let assignments = planner::column_values(schema, model, data)?;
    let capability = db.shared.pool.capability();

    let session = db.session().await?;
    let mut tx = Transaction::begin(session, capability.exclusive_begin).await?;

    let result = reserve(&mut tx, schema, model, filter, assignments, capability).await;
    tx.finish(result).await
}

async fn reserve(
    tx: &mut Transaction,
    schema: &Schema,
    model: &Model,
    filter: Expr,
    assignments: Vec<(String, Expr)>,
    capability: &Capability,
) -> Result<Option<Record>> {
    let mut candidate = Select::new(&model.table, filter)
        .columns(model.primary_key_fields().map(|field| field.expect_column()))
        .limit(1);
    candidate.order_by = hydrate::key_order(model);

    if capability.select_for_update_skip_locked {
        candidate = candidate.lock(Lock::ForUpdateSkipLocked);
    }

    let Some(mut key) = tx.query(candidate).await?.pop() else {
        debug!(model = %model.name, "no row left to claim");
        return Ok(None);
    };

    if !assignments.is_empty() {
        let mut update = stmt::Update::new(&model.table, filter::key_filter(model, &key));

        for (column, expr) in assignments {
            // Follow the row if the claim rewrites its key.
            if let (Some(value), Expr::Value(assigned)) = (key.get_mut(&column), &expr) {
                *value = assigned.clone();
            }
            update.set(column, expr);
        }

        tx.exec(update).await?;
    }

    debug!(model = %model.name, key = ?key, "row claimed");

    let stmt = Select::new(&model.table, filter::key_filter(model, &key));
    let mut rows = hydrate::load(tx.session(), schema, model, stmt, &Selection::all()).await?;

    Ok(rows.pop())
}
