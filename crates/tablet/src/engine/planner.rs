//! Walks a mutation payload into a [`Plan`].
//!
//! Forward foreign keys are resolved before the row that holds them is
//! written; reverse relations are processed after it, so every step only
//! references rows produced by earlier steps.

use super::{
    filter,
    plan::{self, Plan, Step, VarId},
};
use crate::Result;

use tablet_core::{
    schema::{Field, FieldId, FieldTy, ForeignKey, Model, Related, Schema},
    stmt::{Expr, Record, Select, Value},
    Error,
};
use tracing::trace;

/// Points the foreign key of the row being written at the owner of a
/// relation.
#[derive(Debug, Clone)]
struct Attach {
    field: FieldId,
    column: String,
    value: Expr,
}

pub(crate) struct Planner<'a> {
    schema: &'a Schema,

    /// Steps of the block being planned
    steps: Vec<Step>,

    vars: usize,
}

impl<'a> Planner<'a> {
    pub(crate) fn new(schema: &'a Schema) -> Planner<'a> {
        Planner {
            schema,
            steps: vec![],
            vars: 0,
        }
    }

    pub(crate) fn build(self) -> Plan {
        Plan {
            steps: self.steps,
            vars: self.vars,
        }
    }

    /// Plans inserting `data` with its nested relation payloads. The returned
    /// variable holds the created row.
    pub(crate) fn create(&mut self, model: &'a Model, data: &Record) -> Result<VarId> {
        let var = self.var();
        self.create_into(var, model, data, None)?;
        Ok(var)
    }

    /// Plans applying `data` to the one row `filter` identifies.
    pub(crate) fn modify(&mut self, model: &'a Model, data: &Record, filter: &Value) -> Result<VarId> {
        let filter = filter::unique_filter(self.schema, model, filter)?;

        let var = self.var();
        self.push(plan::Find {
            var,
            model: model.id,
            filter: filter::lower_record(self.schema, model, &filter)?,
            required: true,
        });

        self.update_row(var, model, data, None)?;
        Ok(var)
    }

    /// Plans inserting `create` unless a row with the same unique key exists;
    /// an existing row gets `update` applied, or is left alone without one.
    pub(crate) fn upsert(
        &mut self,
        model: &'a Model,
        create: &Record,
        update: Option<&Record>,
    ) -> Result<VarId> {
        let var = self.var();
        self.upsert_into(var, model, create, update, None)?;
        Ok(var)
    }

    /// Plans inserting already resolved column values.
    pub(crate) fn insert(&mut self, model: &'a Model, values: Vec<(String, Expr)>) -> VarId {
        let var = self.var();
        self.push(plan::Insert {
            var,
            model: model.id,
            values,
        });
        var
    }

    /// Plans updating the row whose primary key columns hold `key`, then
    /// reading it back.
    pub(crate) fn update_key(
        &mut self,
        model: &'a Model,
        key: &Record,
        assignments: Vec<(String, Expr)>,
    ) -> VarId {
        let var = self.var();

        let key_filter = |assigned: &[(String, Expr)]| {
            Expr::and_from_vec(
                model
                    .primary_key_fields()
                    .map(|field| {
                        let column = field.expect_column();
                        let value = assigned
                            .iter()
                            .find(|(name, _)| name == column)
                            .map(|(_, expr)| expr.clone())
                            .unwrap_or_else(|| Expr::Value(key[column].clone()));
                        Expr::eq(Expr::column(column), value)
                    })
                    .collect(),
            )
        };

        let filter = key_filter(&[][..]);
        let reload = key_filter(assignments.as_slice());

        self.push(plan::Update {
            model: model.id,
            filter,
            assignments,
        });

        self.push(plan::Find {
            var,
            model: model.id,
            filter: reload,
            required: true,
        });

        var
    }

    fn create_into(
        &mut self,
        var: VarId,
        model: &'a Model,
        data: &Record,
        attach: Option<Attach>,
    ) -> Result<()> {
        let mut values = vec![];
        let mut relations = vec![];

        for (name, value) in data.iter() {
            let field = self.field(model, name)?;

            match &field.ty {
                FieldTy::Primitive(primitive) => {
                    values.push((primitive.column.clone(), scalar(model, field, value)?));
                }
                FieldTy::ForeignKey(fk) => {
                    let expr = self.foreign_key(model, field, fk, value)?;
                    values.push((fk.column.clone(), expr));
                }
                FieldTy::Related(related) => relations.push((field, related, value)),
            }
        }

        if let Some(attach) = attach {
            assign(&mut values, attach.column, attach.value);
        }

        self.push(plan::Insert {
            var,
            model: model.id,
            values,
        });

        for (field, related, value) in relations {
            self.relation(var, model, field, related, value)?;
        }

        Ok(())
    }

    fn update_row(
        &mut self,
        var: VarId,
        model: &'a Model,
        data: &Record,
        attach: Option<Attach>,
    ) -> Result<()> {
        let mut assignments = vec![];
        let mut relations = vec![];

        for (name, value) in data.iter() {
            let field = self.field(model, name)?;

            match &field.ty {
                FieldTy::Primitive(primitive) => {
                    assignments.push((primitive.column.clone(), scalar(model, field, value)?));
                }
                FieldTy::ForeignKey(fk) => {
                    let expr = self.foreign_key(model, field, fk, value)?;
                    assignments.push((fk.column.clone(), expr));
                }
                FieldTy::Related(related) => relations.push((field, related, value)),
            }
        }

        if let Some(attach) = attach {
            assign(&mut assignments, attach.column, attach.value);
        }

        if !assignments.is_empty() {
            // The key may be among the assignments; reload by the new one.
            let reload = Expr::and_from_vec(
                model
                    .primary_key_fields()
                    .map(|field| {
                        let column = field.expect_column();
                        let value = assignments
                            .iter()
                            .find(|(name, _)| name == column)
                            .map(|(_, expr)| expr.clone())
                            .unwrap_or_else(|| Expr::arg(var, column));
                        Expr::eq(Expr::column(column), value)
                    })
                    .collect(),
            );

            self.push(plan::Update {
                model: model.id,
                filter: key_of(model, var),
                assignments,
            });

            self.push(plan::Find {
                var,
                model: model.id,
                filter: reload,
                required: true,
            });
        }

        for (field, related, value) in relations {
            self.relation(var, model, field, related, value)?;
        }

        Ok(())
    }

    fn upsert_into(
        &mut self,
        var: VarId,
        model: &'a Model,
        create: &Record,
        update: Option<&Record>,
        attach: Option<Attach>,
    ) -> Result<()> {
        let schema = self.schema;

        let key = model
            .find_unique_key(|field| {
                attach.as_ref().is_some_and(|attach| attach.field == field.id)
                    || create
                        .get(&field.name)
                        .and_then(|value| filter::equality_value(schema, field, value))
                        .is_some_and(|value| !value.is_null())
            })
            .ok_or_else(|| Error::bad_filter(&model.name, create.keys()))?;

        let mut lookup = vec![];
        let mut attached = false;

        for id in &key.fields {
            let field = &model.fields[id.index];
            let column = field.expect_column();

            let value = match &attach {
                Some(attach) if attach.field == field.id => {
                    attached = true;
                    attach.value.clone()
                }
                _ => create
                    .get(&field.name)
                    .and_then(|value| filter::equality_value(schema, field, value))
                    .map(|value| Expr::Value(value.clone()))
                    .unwrap_or(Expr::Value(Value::Null)),
            };

            lookup.push(Expr::eq(Expr::column(column), value));
        }

        self.push(plan::Find {
            var,
            model: model.id,
            filter: Expr::and_from_vec(lookup),
            required: false,
        });

        // A row found through the owner's key is attached already.
        let present_attach = if attached { None } else { attach.clone() };
        let update = update.cloned().unwrap_or_default();

        let present = self.block(|planner| planner.update_row(var, model, &update, present_attach))?;
        let absent = self.block(|planner| planner.create_into(var, model, create, attach))?;

        self.push(plan::Branch {
            var,
            present,
            absent,
        });

        Ok(())
    }

    /// Resolves the value written to a foreign key column.
    fn foreign_key(
        &mut self,
        model: &'a Model,
        field: &'a Field,
        fk: &'a ForeignKey,
        value: &Value,
    ) -> Result<Expr> {
        if let Some(value) = filter::equality_value(self.schema, field, value) {
            return Ok(Expr::Value(value.clone()));
        }

        let Value::Record(payload) = value else {
            return Err(Error::invalid_payload(format!(
                "field `{}::{}` expects a key, a key record or a relation operation",
                model.name, field.name
            )));
        };

        let target = self.schema.model(fk.target.model);
        let target_column = self.schema.field(fk.target).expect_column();

        let mut operations = payload.iter();

        let (Some((op, arg)), None) = (operations.next(), operations.next()) else {
            return Err(Error::invalid_payload(format!(
                "field `{}::{}` expects exactly one of `connect`, `create`, `upsert` or `disconnect`",
                model.name, field.name
            )));
        };

        trace!(field = %field.name, op, "planning foreign key");

        match op {
            "connect" => {
                let var = self.connect(target, arg)?;
                Ok(Expr::arg(var, target_column))
            }
            "create" => {
                let data = record_arg(model, field, op, arg)?;
                let var = self.create(target, data)?;
                Ok(Expr::arg(var, target_column))
            }
            "upsert" => {
                let (create, update) = upsert_args(model, field, arg)?;
                let var = self.upsert(target, create, update)?;
                Ok(Expr::arg(var, target_column))
            }
            "disconnect" if arg.as_bool() == Some(true) => {
                if !field.nullable {
                    return Err(Error::invalid_payload(format!(
                        "cannot disconnect `{}::{}`: the foreign key is required",
                        model.name, field.name
                    )));
                }
                Ok(Expr::Value(Value::Null))
            }
            op => Err(unknown_operation(model, field, op)),
        }
    }

    fn relation(
        &mut self,
        owner: VarId,
        model: &'a Model,
        field: &'a Field,
        related: &'a Related,
        payload: &Value,
    ) -> Result<()> {
        let Value::Record(operations) = payload else {
            return Err(Error::invalid_payload(format!(
                "relation `{}::{}` expects a record of operations",
                model.name, field.name
            )));
        };

        let pair = self.schema.field(related.pair);
        let owner_key = Expr::arg(owner, filter::referenced_column(self.schema, pair));

        for (op, items) in operations.iter() {
            let items = match items {
                Value::List(items) => &items[..],
                item => std::slice::from_ref(item),
            };

            trace!(relation = %field.name, op, items = items.len(), "planning relation");

            for item in items {
                match related.through {
                    None => self.one_to_many(model, field, related, &owner_key, op, item)?,
                    Some(through) => {
                        let through = self.schema.field(through);
                        self.many_to_many(model, field, related, through, &owner_key, op, item)?
                    }
                }
            }
        }

        Ok(())
    }

    fn one_to_many(
        &mut self,
        model: &'a Model,
        field: &'a Field,
        related: &'a Related,
        owner_key: &Expr,
        op: &str,
        item: &Value,
    ) -> Result<()> {
        let target = self.schema.model(related.target);
        let pair = self.schema.field(related.pair);
        let pair_column = pair.expect_column();

        let attach = Attach {
            field: pair.id,
            column: pair_column.to_string(),
            value: owner_key.clone(),
        };
        let owned = Expr::eq(Expr::column(pair_column), owner_key.clone());

        match op {
            "connect" => {
                let var = self.connect(target, item)?;
                self.push(plan::Update {
                    model: target.id,
                    filter: key_of(target, var),
                    assignments: vec![(pair_column.to_string(), owner_key.clone())],
                });
            }
            "create" => {
                let data = record_arg(model, field, op, item)?;
                let var = self.var();
                self.create_into(var, target, data, Some(attach))?;
            }
            "upsert" => {
                let (create, update) = upsert_args(model, field, item)?;
                let var = self.var();
                self.upsert_into(var, target, create, update, Some(attach))?;
            }
            "update" => {
                let (filter, data) = update_args(model, field, item)?;
                let filter = filter::lower(self.schema, target, filter)?.and(owned);
                self.update_one(target, filter, data)?;
            }
            "delete" => {
                let filter = self.item_filter(target, item)?.and(owned);
                self.push(plan::Delete {
                    model: target.id,
                    filter,
                });
            }
            "disconnect" => {
                if !pair.nullable {
                    return Err(Error::invalid_payload(format!(
                        "cannot disconnect from `{}::{}`: `{}::{}` is required",
                        model.name, field.name, target.name, pair.name
                    )));
                }

                let filter = self.item_filter(target, item)?.and(owned);
                self.push(plan::Update {
                    model: target.id,
                    filter,
                    assignments: vec![(pair_column.to_string(), Expr::Value(Value::Null))],
                });
            }
            op => return Err(unknown_operation(model, field, op)),
        }

        Ok(())
    }

    /// Junction rows are the only rows written or removed for a link;
    /// endpoint rows are only ever created or updated.
    #[allow(clippy::too_many_arguments)]
    fn many_to_many(
        &mut self,
        model: &'a Model,
        field: &'a Field,
        related: &'a Related,
        through: &'a Field,
        owner_key: &Expr,
        op: &str,
        item: &Value,
    ) -> Result<()> {
        let target = self.schema.model(related.target);
        let junction = self.schema.model(through.id.model);

        let pair_column = self.schema.field(related.pair).expect_column();
        let through_column = through.expect_column();
        let target_column = filter::referenced_column(self.schema, through);

        let link = |var: VarId| plan::Link {
            junction: junction.id,
            values: [
                (pair_column.to_string(), owner_key.clone()),
                (through_column.to_string(), Expr::arg(var, target_column)),
            ],
        };

        match op {
            "connect" => {
                let var = self.connect(target, item)?;
                self.push(link(var));
            }
            "create" => {
                let data = record_arg(model, field, op, item)?;
                let var = self.create(target, data)?;
                self.push(link(var));
            }
            "upsert" => {
                let (create, update) = upsert_args(model, field, item)?;
                let var = self.upsert(target, create, update)?;
                self.push(link(var));
            }
            "update" => {
                let (filter, data) = update_args(model, field, item)?;

                let linked = Select::new(
                    &junction.table,
                    Expr::eq(Expr::column(pair_column), owner_key.clone()),
                )
                .columns([through_column]);

                let filter = filter::lower(self.schema, target, filter)?
                    .and(Expr::in_subquery(Expr::column(target_column), linked));

                self.update_one(target, filter, data)?;
            }
            "delete" | "disconnect" => {
                let targets = Select::new(&target.table, self.item_filter(target, item)?)
                    .columns([target_column]);

                self.push(plan::Delete {
                    model: junction.id,
                    filter: Expr::and_from_vec(vec![
                        Expr::eq(Expr::column(pair_column), owner_key.clone()),
                        Expr::in_subquery(Expr::column(through_column), targets),
                    ]),
                });
            }
            op => return Err(unknown_operation(model, field, op)),
        }

        Ok(())
    }

    /// Applies `data` to the single row matching `filter`, if there is one.
    fn update_one(&mut self, model: &'a Model, filter: Expr, data: &Record) -> Result<()> {
        let var = self.var();

        self.push(plan::Find {
            var,
            model: model.id,
            filter,
            required: false,
        });

        let present = self.block(|planner| planner.update_row(var, model, data, None))?;

        self.push(plan::Branch {
            var,
            present,
            absent: vec![],
        });

        Ok(())
    }

    /// Plans the lookup of the one row `filter` identifies.
    fn connect(&mut self, model: &'a Model, filter: &Value) -> Result<VarId> {
        let filter = filter::unique_filter(self.schema, model, filter)?;
        let var = self.var();

        self.push(plan::Find {
            var,
            model: model.id,
            filter: filter::lower_record(self.schema, model, &filter)?,
            required: true,
        });

        Ok(var)
    }

    /// A `delete`/`disconnect` item: a key value or a filter.
    fn item_filter(&self, model: &Model, item: &Value) -> Result<Expr> {
        match item {
            Value::Record(record) => filter::lower_record(self.schema, model, record),
            value if value.is_scalar() && !value.is_null() => {
                let record = filter::key_record(model, value)?;
                filter::lower_record(self.schema, model, &record)
            }
            _ => Err(Error::invalid_payload(format!(
                "expected a key or a filter on `{}`; value={item:?}",
                model.name
            ))),
        }
    }

    fn field(&self, model: &'a Model, name: &str) -> Result<&'a Field> {
        model
            .field(name)
            .ok_or_else(|| Error::invalid_payload(format!("unknown field `{}::{name}`", model.name)))
    }

    fn var(&mut self) -> VarId {
        let var = self.vars;
        self.vars += 1;
        var
    }

    fn push(&mut self, step: impl Into<Step>) {
        let step = step.into();
        trace!(step = step.kind(), "planned step");
        self.steps.push(step);
    }

    /// Plans `f` into a separate list of steps.
    fn block(&mut self, f: impl FnOnce(&mut Self) -> Result<()>) -> Result<Vec<Step>> {
        let outer = std::mem::take(&mut self.steps);
        let result = f(self);
        let inner = std::mem::replace(&mut self.steps, outer);
        result.map(|()| inner)
    }
}

/// Column values of a payload holding only scalar and foreign key fields,
/// as written by the plain `insert`/`update` operations and by `claim`.
pub(crate) fn column_values(
    schema: &Schema,
    model: &Model,
    data: &Record,
) -> Result<Vec<(String, Expr)>> {
    data.iter()
        .map(|(name, value)| {
            let field = model.field(name).ok_or_else(|| {
                Error::invalid_payload(format!("unknown field `{}::{name}`", model.name))
            })?;

            let Some(column) = field.column() else {
                return Err(Error::invalid_payload(format!(
                    "relation `{}::{name}` can only be written by create, modify or upsert",
                    model.name
                )));
            };

            let value = filter::equality_value(schema, field, value).ok_or_else(|| {
                Error::invalid_payload(format!(
                    "field `{}::{name}` expects a scalar value",
                    model.name
                ))
            })?;

            Ok((column.to_string(), Expr::Value(value.clone())))
        })
        .collect()
}

/// Equality on `model`'s primary key against the row held by `var`.
fn key_of(model: &Model, var: VarId) -> Expr {
    Expr::and_from_vec(
        model
            .primary_key_fields()
            .map(|field| {
                let column = field.expect_column();
                Expr::eq(Expr::column(column), Expr::arg(var, column))
            })
            .collect(),
    )
}

fn assign(values: &mut Vec<(String, Expr)>, column: String, value: Expr) {
    match values.iter_mut().find(|(name, _)| *name == column) {
        Some((_, existing)) => *existing = value,
        None => values.push((column, value)),
    }
}

fn scalar(model: &Model, field: &Field, value: &Value) -> Result<Expr> {
    if value.is_scalar() {
        Ok(Expr::Value(value.clone()))
    } else {
        Err(Error::invalid_payload(format!(
            "field `{}::{}` expects a scalar value",
            model.name, field.name
        )))
    }
}

fn record_arg<'v>(model: &Model, field: &Field, op: &str, value: &'v Value) -> Result<&'v Record> {
    value.as_record().ok_or_else(|| {
        Error::invalid_payload(format!(
            "`{op}` on `{}::{}` expects a record",
            model.name, field.name
        ))
    })
}

fn upsert_args<'v>(
    model: &Model,
    field: &Field,
    value: &'v Value,
) -> Result<(&'v Record, Option<&'v Record>)> {
    let args = record_arg(model, field, "upsert", value)?;

    let create = args
        .get("create")
        .and_then(Value::as_record)
        .ok_or_else(|| {
            Error::invalid_payload(format!(
                "`upsert` on `{}::{}` expects a `create` record",
                model.name, field.name
            ))
        })?;

    Ok((create, args.get("update").and_then(Value::as_record)))
}

fn update_args<'v>(model: &Model, field: &Field, value: &'v Value) -> Result<(&'v Value, &'v Record)> {
    let args = record_arg(model, field, "update", value)?;

    match (args.get("where"), args.get("data").and_then(Value::as_record)) {
        (Some(filter), Some(data)) => Ok((filter, data)),
        _ => Err(Error::invalid_payload(format!(
            "`update` on `{}::{}` expects `where` and `data`",
            model.name, field.name
        ))),
    }
}

fn unknown_operation(model: &Model, field: &Field, op: &str) -> Error {
    Error::invalid_payload(format!(
        "unknown operation `{op}` on `{}::{}`",
        model.name, field.name
    ))
}
