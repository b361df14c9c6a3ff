//! Turning stored rows into returned rows.
//!
//! Rows come back from the driver keyed by column. They are projected onto
//! field names, values are cast to the field's logical type, foreign keys
//! become `{<referenced field>: value}` stubs, and requested relations are
//! loaded with one batched `IN (...)` select per relation.

use super::{filter, Selection};
use crate::{db::Session, Result};

use async_recursion::async_recursion;
use tablet_core::{
    schema::{Field, FieldTy, ForeignKey, Model, Related, Schema},
    stmt::{Expr, OrderBy, Record, Select, Value},
    Error,
};

/// Runs `stmt` against `model`'s table and returns hydrated rows.
pub(crate) async fn load(
    session: &mut Session,
    schema: &Schema,
    model: &Model,
    stmt: Select,
    selection: &Selection,
) -> Result<Vec<Record>> {
    let raw = session.query(stmt).await?;
    hydrate(session, schema, model, &raw, selection).await
}

/// Hydrates rows that were already read, keyed by column.
#[async_recursion]
pub(crate) async fn hydrate(
    session: &mut Session,
    schema: &Schema,
    model: &Model,
    raw: &[Record],
    selection: &Selection,
) -> Result<Vec<Record>> {
    let mut relations = vec![];

    let mut rows: Vec<Record> = raw.iter().map(|_| Record::new()).collect();

    if selection.is_all() {
        for field in model.column_fields() {
            for (row, raw) in rows.iter_mut().zip(raw) {
                row.insert(&field.name, project(schema, field, raw));
            }
        }
    }

    for (name, nested) in selection.fields() {
        let field = model.field(name).ok_or_else(|| {
            Error::invalid_payload(format!("unknown field `{}::{name}`", model.name))
        })?;

        match (&field.ty, nested) {
            (FieldTy::Primitive(_), Some(_)) => {
                return Err(Error::invalid_payload(format!(
                    "field `{}::{name}` is not a relation",
                    model.name
                )))
            }
            (FieldTy::Primitive(_), None) | (FieldTy::ForeignKey(_), None) => {
                for (row, raw) in rows.iter_mut().zip(raw) {
                    row.insert(&field.name, project(schema, field, raw));
                }
            }
            _ => {
                // Reserve the position; filled in below.
                for row in &mut rows {
                    row.insert(&field.name, Value::Null);
                }
                relations.push((field, nested));
            }
        }
    }

    for (field, nested) in relations {
        let all = Selection::all();
        let nested = nested.unwrap_or(&all);

        let values = match &field.ty {
            FieldTy::ForeignKey(fk) => load_parents(session, schema, fk, raw, nested).await?,
            FieldTy::Related(related) if related.through.is_some() => {
                load_linked(session, schema, related, raw, nested).await?
            }
            FieldTy::Related(related) => load_children(session, schema, related, raw, nested).await?,
            FieldTy::Primitive(_) => unreachable!(),
        };

        for (row, value) in rows.iter_mut().zip(values) {
            row.insert(&field.name, value);
        }
    }

    Ok(rows)
}

/// The value of a column field as returned to callers.
fn project(schema: &Schema, field: &Field, raw: &Record) -> Value {
    let column = field.expect_column();
    let value = raw[column].clone();

    match &field.ty {
        FieldTy::ForeignKey(fk) if !value.is_null() => {
            let target = schema.field(fk.target);
            Value::Record(Record::from_iter([(target.name.clone(), value.cast(fk.ty))]))
        }
        _ => value.cast(field.value_ty().unwrap_or_default()),
    }
}

/// Loads the row each foreign key points at.
async fn load_parents(
    session: &mut Session,
    schema: &Schema,
    fk: &ForeignKey,
    raw: &[Record],
    selection: &Selection,
) -> Result<Vec<Value>> {
    let target = schema.model(fk.target.model);
    let target_column = schema.field(fk.target).expect_column();

    let keys = distinct(raw.iter().map(|row| &row[&fk.column]));
    let (target_raw, target_rows) =
        load_keyed(session, schema, target, target_column, keys, selection).await?;

    Ok(raw
        .iter()
        .map(|row| {
            let key = &row[&fk.column];
            target_raw
                .iter()
                .position(|target| !key.is_null() && target[target_column] == *key)
                .map(|index| Value::Record(target_rows[index].clone()))
                .unwrap_or(Value::Null)
        })
        .collect())
}

/// Loads the rows whose foreign key points back at each row.
async fn load_children(
    session: &mut Session,
    schema: &Schema,
    related: &Related,
    raw: &[Record],
    selection: &Selection,
) -> Result<Vec<Value>> {
    let target = schema.model(related.target);
    let pair = schema.field(related.pair);
    let pair_column = pair.expect_column();
    let owner_column = filter::referenced_column(schema, pair);

    let keys = distinct(raw.iter().map(|row| &row[owner_column]));
    let (target_raw, target_rows) =
        load_keyed(session, schema, target, pair_column, keys, selection).await?;

    Ok(raw
        .iter()
        .map(|row| {
            let key = &row[owner_column];
            let mut children = target_raw
                .iter()
                .zip(&target_rows)
                .filter(|(target, _)| !key.is_null() && target[pair_column] == *key)
                .map(|(_, row)| Value::Record(row.clone()));

            if related.unique {
                children.next().unwrap_or(Value::Null)
            } else {
                Value::List(children.collect())
            }
        })
        .collect())
}

/// Loads the rows linked to each row through a junction table, in link order.
async fn load_linked(
    session: &mut Session,
    schema: &Schema,
    related: &Related,
    raw: &[Record],
    selection: &Selection,
) -> Result<Vec<Value>> {
    let pair = schema.field(related.pair);
    let pair_column = pair.expect_column();
    let owner_column = filter::referenced_column(schema, pair);

    let Some(through) = related.through.map(|id| schema.field(id)) else {
        return Err(Error::invalid_schema("relation without a junction"));
    };
    let through_column = through.expect_column();
    let junction = schema.model(through.id.model);

    let target = schema.model(related.target);
    let target_column = filter::referenced_column(schema, through);

    let keys = distinct(raw.iter().map(|row| &row[owner_column]));

    let links = if keys.is_empty() {
        vec![]
    } else {
        let mut stmt = Select::new(
            &junction.table,
            Expr::in_list(Expr::column(pair_column), keys.into_iter().map(Expr::Value).collect()),
        )
        .columns([pair_column, through_column]);
        stmt.order_by = match key_order(junction) {
            order if order.is_empty() => vec![OrderBy::asc(pair_column), OrderBy::asc(through_column)],
            order => order,
        };
        session.query(stmt).await?
    };

    let target_keys = distinct(links.iter().map(|link| &link[through_column]));
    let (target_raw, target_rows) =
        load_keyed(session, schema, target, target_column, target_keys, selection).await?;

    Ok(raw
        .iter()
        .map(|row| {
            let key = &row[owner_column];

            let linked = links
                .iter()
                .filter(|link| !key.is_null() && link[pair_column] == *key)
                .filter_map(|link| {
                    target_raw
                        .iter()
                        .position(|target| target[target_column] == link[through_column])
                })
                .map(|index| Value::Record(target_rows[index].clone()))
                .collect();

            Value::List(linked)
        })
        .collect())
}

/// Reads the rows of `model` whose `column` is one of `keys`, returning the
/// stored rows next to their hydrated form.
async fn load_keyed(
    session: &mut Session,
    schema: &Schema,
    model: &Model,
    column: &str,
    keys: Vec<Value>,
    selection: &Selection,
) -> Result<(Vec<Record>, Vec<Record>)> {
    if keys.is_empty() {
        return Ok((vec![], vec![]));
    }

    let mut stmt = Select::new(
        &model.table,
        Expr::in_list(Expr::column(column), keys.into_iter().map(Expr::Value).collect()),
    );
    stmt.order_by = key_order(model);

    let raw = session.query(stmt).await?;
    let rows = hydrate(session, schema, model, &raw, selection).await?;

    Ok((raw, rows))
}

/// Primary key order, for deterministic relation lists.
pub(crate) fn key_order(model: &Model) -> Vec<OrderBy> {
    model
        .primary_key_fields()
        .map(|field| OrderBy::asc(field.expect_column()))
        .collect()
}

/// Non-null values, first occurrence kept.
fn distinct<'a>(values: impl Iterator<Item = &'a Value>) -> Vec<Value> {
    let mut ret: Vec<Value> = vec![];

    for value in values {
        if !value.is_null() && !ret.contains(value) {
            ret.push(value.clone());
        }
    }

    ret
}
