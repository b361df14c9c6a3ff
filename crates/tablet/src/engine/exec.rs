//! Executes a [`Plan`] step by step on one transaction.

use super::{
    filter, hydrate,
    plan::{Plan, Step, VarId},
    Selection,
};
use crate::{transaction::Transaction, Database, Result};

use async_recursion::async_recursion;
use tablet_core::{
    err,
    schema::{Model, Schema},
    stmt::{self, Expr, Record, Select, Value},
    Error,
};
use tracing::{debug, trace};

/// Rows bound to plan variables, keyed by column.
#[derive(Debug)]
pub(crate) struct Vars {
    rows: Vec<Option<Record>>,
}

impl Vars {
    fn new(len: usize) -> Vars {
        Vars {
            rows: vec![None; len],
        }
    }

    pub(crate) fn take(&mut self, var: VarId) -> Option<Record> {
        self.rows.get_mut(var).and_then(Option::take)
    }

    fn is_set(&self, var: VarId) -> bool {
        matches!(self.rows.get(var), Some(Some(_)))
    }

    fn set(&mut self, var: VarId, row: Option<Record>) {
        self.rows[var] = row;
    }

    /// Returns `expr` with every argument replaced by the value it references.
    fn resolve(&self, expr: &Expr) -> Result<Expr> {
        let mut expr = expr.clone();
        let mut unbound = None;

        expr.substitute(&mut |arg| match self.rows.get(arg.var) {
            Some(Some(row)) => row[&arg.column].clone(),
            _ => {
                unbound = Some(arg.var);
                Value::Null
            }
        });

        match unbound {
            Some(var) => Err(err!("plan variable read before it was bound; var={var}")),
            None => Ok(expr),
        }
    }

    fn resolve_all(&self, values: &[(String, Expr)]) -> Result<Vec<(String, Expr)>> {
        values
            .iter()
            .map(|(column, expr)| Ok((column.clone(), self.resolve(expr)?)))
            .collect()
    }
}

/// Runs `plan` in a new transaction and returns the row bound to `var`,
/// hydrated with `selection`. Either every step is applied or none is.
pub(crate) async fn apply(
    db: &Database,
    model: &Model,
    plan: Plan,
    var: VarId,
    selection: &Selection,
) -> Result<Record> {
    let schema = db.schema();

    debug!(model = %model.name, steps = plan.steps.len(), "applying mutation plan");

    let session = db.session().await?;
    let mut tx = Transaction::begin(session, db.shared.pool.capability().exclusive_begin).await?;

    let result = async {
        let mut vars = execute(&mut tx, schema, &plan).await?;

        let raw = vars
            .take(var)
            .ok_or_else(|| Error::record_not_found(format!("{} row of the mutation", model.name)))?;

        let mut rows = hydrate::hydrate(tx.session(), schema, model, &[raw], selection).await?;
        rows.pop()
            .ok_or_else(|| Error::record_not_found(format!("{} row of the mutation", model.name)))
    }
    .await;

    tx.finish(result).await
}

/// Runs every step of `plan` on `tx`.
pub(crate) async fn execute(tx: &mut Transaction, schema: &Schema, plan: &Plan) -> Result<Vars> {
    let mut vars = Vars::new(plan.vars);
    run(tx, schema, &mut vars, &plan.steps).await?;
    Ok(vars)
}

#[async_recursion]
async fn run(tx: &mut Transaction, schema: &Schema, vars: &mut Vars, steps: &[Step]) -> Result<()> {
    for step in steps {
        trace!(step = step.kind(), "executing step");

        match step {
            Step::Find(find) => {
                let model = schema.model(find.model);
                let stmt = Select::new(&model.table, vars.resolve(&find.filter)?).limit(2);

                let mut rows = tx.query(stmt).await?;

                if rows.len() > 1 {
                    return Err(Error::too_many_records(format!(
                        "expected at most one `{}` row",
                        model.name
                    )));
                }

                let row = rows.pop();

                if row.is_none() && find.required {
                    return Err(Error::record_not_found(format!(
                        "no `{}` row matches the filter",
                        model.name
                    )));
                }

                vars.set(find.var, row);
            }
            Step::Insert(insert) => {
                let model = schema.model(insert.model);
                let values = vars.resolve_all(&insert.values)?;

                let response = tx
                    .exec(stmt::Insert {
                        table: model.table.clone(),
                        values: values.clone(),
                    })
                    .await?;

                let key = inserted_key(model, &values, response.last_insert_id)?;
                let row = tx
                    .query(Select::new(&model.table, filter::key_filter(model, &key)))
                    .await?
                    .pop();

                if row.is_none() {
                    return Err(err!("inserted row could not be read back; table={}", model.table));
                }

                vars.set(insert.var, row);
            }
            Step::Update(update) => {
                let model = schema.model(update.model);

                let mut stmt = stmt::Update::new(&model.table, vars.resolve(&update.filter)?);
                stmt.assignments = vars.resolve_all(&update.assignments)?;

                let count = tx.exec(stmt).await?.rows.count();
                trace!(table = %model.table, count, "rows updated");
            }
            Step::Delete(delete) => {
                let model = schema.model(delete.model);
                let stmt = stmt::Delete::new(&model.table, vars.resolve(&delete.filter)?);

                let count = tx.exec(stmt).await?.rows.count();
                trace!(table = %model.table, count, "rows deleted");
            }
            Step::Link(link) => {
                let junction = schema.model(link.junction);
                let values = vars.resolve_all(&link.values)?;

                let existing = Select::new(
                    &junction.table,
                    Expr::and_from_vec(
                        values
                            .iter()
                            .map(|(column, value)| Expr::eq(Expr::column(column), value.clone()))
                            .collect(),
                    ),
                )
                .limit(1);

                if tx.query(existing).await?.is_empty() {
                    tx.exec(stmt::Insert {
                        table: junction.table.clone(),
                        values,
                    })
                    .await?;
                }
            }
            Step::Branch(branch) => {
                let steps = if vars.is_set(branch.var) {
                    &branch.present
                } else {
                    &branch.absent
                };

                run(tx, schema, vars, steps).await?;
            }
        }
    }

    Ok(())
}

/// Primary key of a row just inserted with `values`, keyed by column. Key
/// columns that were not provided take the key generated by the database.
pub(crate) fn inserted_key(
    model: &Model,
    values: &[(String, Expr)],
    mut generated: Option<Value>,
) -> Result<Record> {
    let mut key = Record::new();

    for field in model.primary_key_fields() {
        let column = field.expect_column();

        let value = match values.iter().find(|(name, _)| name == column) {
            Some((_, Expr::Value(value))) if !value.is_null() => value.clone(),
            _ => generated
                .take()
                .filter(|value| !value.is_null())
                .ok_or_else(|| {
                    err!("no key for inserted `{}` row; column={column}", model.name)
                })?,
        };

        key.insert(column, value.cast(field.value_ty().unwrap_or_default()));
    }

    Ok(key)
}
