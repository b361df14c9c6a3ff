//! Lowering of filter payloads into statement expressions.
//!
//! A filter is a record of `field -> value` pairs joined with AND, or a list
//! of such records joined with OR. Keys may carry an operator suffix.

use crate::Result;

use tablet_core::{
    schema::{Field, FieldTy, Model, Related, Schema, UniqueKey},
    stmt::{BinaryOp, Expr, Record, Select, Value},
    Error,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    Like,
    NotLike,
}

/// Longest suffixes first, so `_notLike` is not read as `_like`.
const SUFFIXES: &[(&str, Op)] = &[
    ("_notLike", Op::NotLike),
    ("_like", Op::Like),
    ("_ne", Op::Ne),
    ("_lt", Op::Lt),
    ("_le", Op::Le),
    ("_gt", Op::Gt),
    ("_ge", Op::Ge),
    ("_in", Op::In),
];

impl Op {
    fn binary(self) -> Option<BinaryOp> {
        Some(match self {
            Op::Eq => BinaryOp::Eq,
            Op::Ne => BinaryOp::Ne,
            Op::Lt => BinaryOp::Lt,
            Op::Le => BinaryOp::Le,
            Op::Gt => BinaryOp::Gt,
            Op::Ge => BinaryOp::Ge,
            Op::In | Op::Like | Op::NotLike => return None,
        })
    }
}

/// Lowers a filter on `model`. `Null` matches every row.
pub(crate) fn lower(schema: &Schema, model: &Model, filter: &Value) -> Result<Expr> {
    match filter {
        Value::Null => Ok(Expr::true_()),
        Value::Record(record) => lower_record(schema, model, record),
        Value::List(items) => {
            let operands = items
                .iter()
                .map(|item| match item {
                    Value::Record(record) => lower_record(schema, model, record),
                    _ => Err(invalid_filter(model)),
                })
                .collect::<Result<Vec<_>>>()?;

            Ok(Expr::or_from_vec(operands))
        }
        _ => Err(invalid_filter(model)),
    }
}

pub(crate) fn lower_record(schema: &Schema, model: &Model, record: &Record) -> Result<Expr> {
    let operands = record
        .iter()
        .map(|(key, value)| {
            let (field, op) = resolve_key(model, key)?;
            lower_field(schema, model, field, op, value)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Expr::and_from_vec(operands))
}

fn resolve_key<'a>(model: &'a Model, key: &str) -> Result<(&'a Field, Op)> {
    if let Some(field) = model.field(key) {
        return Ok((field, Op::Eq));
    }

    SUFFIXES
        .iter()
        .find_map(|(suffix, op)| {
            let name = key.strip_suffix(suffix)?;
            model.field(name).map(|field| (field, *op))
        })
        .ok_or_else(|| unknown_field(model, key))
}

fn lower_field(schema: &Schema, model: &Model, field: &Field, op: Op, value: &Value) -> Result<Expr> {
    match &field.ty {
        FieldTy::Primitive(primitive) => lower_column(&primitive.column, op, value),
        FieldTy::ForeignKey(fk) => {
            let target = schema.model(fk.target.model);
            let target_field = schema.field(fk.target);

            match value {
                Value::Record(nested) => {
                    if let Some(key) = key_stub(target_field, nested) {
                        return lower_column(&fk.column, op, key);
                    }

                    if op != Op::Eq {
                        return Err(Error::invalid_payload(format!(
                            "nested filter on `{}::{}` only supports equality",
                            model.name, field.name
                        )));
                    }

                    let query = Select::new(&target.table, lower_record(schema, target, nested)?)
                        .columns([target_field.expect_column()]);

                    Ok(Expr::in_subquery(Expr::column(&fk.column), query))
                }
                Value::List(items) => {
                    let items = items
                        .iter()
                        .map(|item| match item {
                            Value::Record(nested) => key_stub(target_field, nested)
                                .cloned()
                                .ok_or_else(|| invalid_filter(model)),
                            item => Ok(item.clone()),
                        })
                        .collect::<Result<Vec<_>>>()?;

                    lower_column(&fk.column, op, &Value::List(items))
                }
                value => lower_column(&fk.column, op, value),
            }
        }
        FieldTy::Related(related) => {
            let Value::Record(nested) = value else {
                return Err(Error::invalid_payload(format!(
                    "filter on relation `{}::{}` must be a record",
                    model.name, field.name
                )));
            };

            if op != Op::Eq {
                return Err(Error::invalid_payload(format!(
                    "filter on relation `{}::{}` only supports equality",
                    model.name, field.name
                )));
            }

            let target = schema.model(related.target);
            let query = Select::new(&target.table, lower_record(schema, target, nested)?);
            Ok(related_in(schema, related, query))
        }
    }
}

/// Restricts the owner of `related` to rows related to a target row selected
/// by `targets`. The projection of `targets` is replaced.
pub(crate) fn related_in(schema: &Schema, related: &Related, targets: Select) -> Expr {
    let pair = schema.field(related.pair);
    let pair_column = pair.expect_column();
    let owner_column = referenced_column(schema, pair);

    let query = match related.through {
        None => targets.columns([pair_column]),
        Some(through) => {
            let through = schema.field(through);
            let junction = schema.model(through.id.model);
            let targets = targets.columns([referenced_column(schema, through)]);

            Select::new(
                &junction.table,
                Expr::in_subquery(Expr::column(through.expect_column()), targets),
            )
            .columns([pair_column])
        }
    };

    Expr::in_subquery(Expr::column(owner_column), query)
}

/// Column referenced by a foreign key field.
pub(crate) fn referenced_column<'a>(schema: &'a Schema, field: &Field) -> &'a str {
    match &field.ty {
        FieldTy::ForeignKey(fk) => schema.field(fk.target).expect_column(),
        _ => panic!("field `{}` is not a foreign key", field.name),
    }
}

fn lower_column(column: &str, op: Op, value: &Value) -> Result<Expr> {
    let lhs = Expr::column(column);

    Ok(match (op, value) {
        (Op::Eq | Op::In, Value::List(items)) => Expr::in_list(lhs, scalars(items)?),
        (Op::Ne, Value::List(items)) => Expr::not(Expr::in_list(lhs, scalars(items)?)),
        (Op::In, value) => Expr::in_list(lhs, vec![scalar(value)?]),
        (Op::Eq, Value::Null) => Expr::is_null(lhs),
        (Op::Ne, Value::Null) => Expr::not(Expr::is_null(lhs)),
        (Op::Like, value) => Expr::like(lhs, scalar(value)?, false),
        (Op::NotLike, value) => Expr::like(lhs, scalar(value)?, true),
        (op, value) => match op.binary() {
            Some(binary) => Expr::binary_op(lhs, binary, scalar(value)?),
            None => unreachable!("operator {op:?} handled above"),
        },
    })
}

fn scalars(items: &[Value]) -> Result<Vec<Expr>> {
    items.iter().map(scalar).collect()
}

fn scalar(value: &Value) -> Result<Expr> {
    if value.is_scalar() {
        Ok(Expr::Value(value.clone()))
    } else {
        Err(Error::invalid_payload(format!(
            "filter value must be a scalar; value={value:?}"
        )))
    }
}

/// The key value of a `{<referenced field>: value}` stub.
pub(crate) fn key_stub<'a>(target_field: &Field, record: &'a Record) -> Option<&'a Value> {
    if record.len() != 1 {
        return None;
    }

    record
        .get(&target_field.name)
        .filter(|value| value.is_scalar())
}

/// The value `value` pins `field` to when used as a plain equality in a
/// filter or payload, with foreign key stubs unwrapped.
pub(crate) fn equality_value<'a>(schema: &Schema, field: &Field, value: &'a Value) -> Option<&'a Value> {
    match (&field.ty, value) {
        (FieldTy::Related(_), _) => None,
        (FieldTy::ForeignKey(fk), Value::Record(record)) => key_stub(schema.field(fk.target), record),
        (_, value) if value.is_scalar() => Some(value),
        _ => None,
    }
}

/// Returns the first unique key of `model` that `filter` pins with plain
/// equalities. With `allow_null` unset, a `null` does not pin a field.
pub(crate) fn covered_key<'a>(
    schema: &Schema,
    model: &'a Model,
    filter: &Record,
    allow_null: bool,
) -> Option<&'a UniqueKey> {
    model.find_unique_key(|field| {
        filter
            .get(&field.name)
            .and_then(|value| equality_value(schema, field, value))
            .is_some_and(|value| allow_null || !value.is_null())
    })
}

/// Checks that `filter` identifies at most one row of `model`: either a raw
/// primary key value, or a record pinning a unique key. Returns the filter as
/// a record.
pub(crate) fn unique_filter(schema: &Schema, model: &Model, filter: &Value) -> Result<Record> {
    match filter {
        Value::Record(record) => {
            if covered_key(schema, model, record, true).is_none() {
                return Err(Error::bad_filter(&model.name, record.keys()));
            }
            Ok(record.clone())
        }
        value if value.is_scalar() && !value.is_null() => key_record(model, value),
        _ => Err(Error::bad_filter(&model.name, Vec::<String>::new())),
    }
}

/// `{<primary key field>: value}` for models with a single-field key.
pub(crate) fn key_record(model: &Model, value: &Value) -> Result<Record> {
    match model.key_field() {
        Some(field) => Ok(Record::from_iter([(field.name.clone(), value.clone())])),
        None => Err(Error::bad_filter(
            &model.name,
            model.primary_key_fields().map(|field| field.name.clone()),
        )),
    }
}

/// Equality on the primary key columns of `model`, each compared against
/// column values read from a row.
pub(crate) fn key_filter(model: &Model, row: &Record) -> Expr {
    Expr::and_from_vec(
        model
            .primary_key_fields()
            .map(|field| {
                let column = field.expect_column();
                Expr::eq(Expr::column(column), row[column].clone())
            })
            .collect(),
    )
}

fn unknown_field(model: &Model, name: &str) -> Error {
    Error::invalid_payload(format!("unknown field `{}::{name}`", model.name))
}

fn invalid_filter(model: &Model) -> Error {
    Error::invalid_payload(format!(
        "filter on `{}` must be a record or a list of records",
        model.name
    ))
}
