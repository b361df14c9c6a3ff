//! Records queued by `Table::append` until `Database::flush`.
//!
//! Queued records live in an arena indexed by [`PendingId`]. Slots are never
//! reused, so a handle keeps pointing at the same record; after a flush the
//! slot holds the row as stored until the record is forgotten.

use crate::{
    engine::{exec, Planner},
    transaction::Transaction,
    Database, Result,
};

use indexmap::IndexMap;
use tablet_core::{
    err,
    schema::{FieldTy, Model, ModelId, Schema},
    stmt::{Expr, PendingId, Record, Value},
    Error,
};
use tracing::debug;

#[derive(Debug, Default)]
pub(crate) struct Queue {
    records: Vec<PendingRecord>,

    /// Handles returned by `append`, per model, in call order
    calls: IndexMap<ModelId, Vec<PendingId>>,
}

#[derive(Debug)]
struct PendingRecord {
    model: ModelId,

    /// Values to insert, or the row as stored once flushed
    data: Record,

    /// Values appended once a flush has taken the record. The next flush
    /// writes them with an update.
    late: Record,

    state: State,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Pending,

    /// Taken by the flush in progress
    Flushing,

    /// Stored, with `late` values still to write
    Stale,

    Flushed,

    /// Flushed, then dropped by `Queue::forget`
    Forgotten,
}

/// Records taken by one flush, in write order.
#[derive(Debug, Default)]
pub(crate) struct Batch {
    entries: Vec<Entry>,

    /// Length of each model's call list when the flush began
    calls: Vec<(ModelId, usize)>,
}

#[derive(Debug)]
struct Entry {
    id: PendingId,
    model: ModelId,
    write: Write,

    /// Field values; references to records flushed earlier are resolved to
    /// their keys, references within the batch remain `Value::Pending`.
    data: Record,
}

#[derive(Debug)]
enum Write {
    Insert,

    /// Update of the stored row with this primary key, keyed by column
    Update(Record),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

impl PendingRecord {
    fn value(&self, name: &str) -> Option<&Value> {
        self.late.get(name).or_else(|| self.data.get(name))
    }

    fn is_stored(&self) -> bool {
        matches!(self.state, State::Stale | State::Flushed)
    }

    fn is_queued(&self) -> bool {
        matches!(self.state, State::Pending | State::Stale)
    }
}

impl Queue {
    pub(crate) fn append(&mut self, schema: &Schema, model: &Model, data: Record) -> Result<PendingId> {
        let data = self.normalize(schema, model, data)?;

        let merge_into = model
            .find_unique_key(|field| data.get(&field.name).is_some_and(|value| !value.is_null()))
            .and_then(|key| {
                self.records.iter().position(|record| {
                    record.model == model.id
                        && matches!(record.state, State::Pending | State::Flushing | State::Stale)
                        && key.fields.iter().all(|id| {
                            let name = &model.fields[id.index].name;
                            record.value(name) == data.get(name)
                        })
                })
            });

        let id = match merge_into {
            Some(index) => {
                let record = &mut self.records[index];

                match record.state {
                    State::Pending => record.data.merge(data),
                    _ => record.late.merge(data),
                }

                PendingId(index)
            }
            None => {
                self.records.push(PendingRecord {
                    model: model.id,
                    data,
                    late: Record::new(),
                    state: State::Pending,
                });
                PendingId(self.records.len() - 1)
            }
        };

        self.calls.entry(model.id).or_default().push(id);
        Ok(id)
    }

    /// The record's current values, including any not written yet.
    pub(crate) fn get(&self, id: PendingId) -> Option<Record> {
        let record = self.records.get(id.0)?;

        if record.state == State::Forgotten {
            return None;
        }

        let mut ret = record.data.clone();
        ret.merge(record.late.clone());
        Some(ret)
    }

    /// Drops the stored row of a flushed record and returns it. Records with
    /// values still to write, or referenced by such records, are kept.
    pub(crate) fn forget(&mut self, id: PendingId) -> Option<Record> {
        let referenced = self
            .records
            .iter()
            .filter(|record| !matches!(record.state, State::Flushed | State::Forgotten))
            .flat_map(|record| record.data.values().chain(record.late.values()))
            .any(|value| *value == Value::Pending(id));

        let record = self.records.get_mut(id.0)?;

        if record.state != State::Flushed || referenced {
            return None;
        }

        record.state = State::Forgotten;
        Some(std::mem::take(&mut record.data))
    }

    /// Number of records with values not written yet.
    pub(crate) fn len(&self) -> usize {
        self.records
            .iter()
            .filter(|record| matches!(record.state, State::Pending | State::Flushing | State::Stale))
            .count()
    }

    pub(crate) fn record_list(&self, model: ModelId) -> Vec<PendingId> {
        self.calls.get(&model).cloned().unwrap_or_default()
    }

    /// Takes every record with values to write, ordered so that each record
    /// comes after the records it references.
    pub(crate) fn begin_flush(&mut self, schema: &Schema) -> Result<Batch> {
        let mut marks = vec![Mark::Unvisited; self.records.len()];
        let mut order = vec![];

        for index in 0..self.records.len() {
            if self.records[index].is_queued() {
                self.visit(index, &mut marks, &mut order)?;
            }
        }

        let mut entries = Vec::with_capacity(order.len());

        for index in order {
            let record = &self.records[index];
            let model = schema.model(record.model);

            let (write, values) = match record.state {
                State::Stale => (Write::Update(stored_key(model, record)), &record.late),
                _ => (Write::Insert, &record.data),
            };

            let mut data = Record::new();

            for (name, value) in values.iter() {
                let value = match value {
                    Value::Pending(dep) if self.records[dep.0].is_stored() => {
                        self.flushed_key(schema, model, name, *dep)?
                    }
                    value => value.clone(),
                };
                data.insert(name, value);
            }

            entries.push(Entry {
                id: PendingId(index),
                model: record.model,
                write,
                data,
            });
        }

        for entry in &entries {
            self.records[entry.id.0].state = State::Flushing;
        }

        let calls = self
            .calls
            .iter()
            .map(|(model, calls)| (*model, calls.len()))
            .collect();

        Ok(Batch { entries, calls })
    }

    /// Stores the written rows, keyed by column, in the batch's slots.
    /// Values appended while the flush ran stay queued for the next one.
    pub(crate) fn complete_flush(&mut self, schema: &Schema, batch: &Batch, rows: Vec<Record>) {
        for (entry, row) in batch.entries.iter().zip(rows) {
            let model = schema.model(entry.model);
            let record = &mut self.records[entry.id.0];

            record.data = model
                .column_fields()
                .map(|field| {
                    let value = row[field.expect_column()].clone();
                    (field.name.clone(), value.cast(field.value_ty().unwrap_or_default()))
                })
                .collect();

            // Late values the stored row already holds need no second write
            let late = std::mem::take(&mut record.late);
            record.late = late
                .into_iter()
                .filter(|(name, value)| record.data.get(name) != Some(value))
                .collect();

            record.state = if record.late.is_empty() {
                State::Flushed
            } else {
                State::Stale
            };
        }

        for (model, taken) in &batch.calls {
            if let Some(calls) = self.calls.get_mut(model) {
                calls.drain(..(*taken).min(calls.len()));
            }
        }
        self.calls.retain(|_, calls| !calls.is_empty());
    }

    /// Returns the batch's records to the queue after a failed flush.
    pub(crate) fn abort_flush(&mut self, batch: &Batch) {
        for entry in &batch.entries {
            let record = &mut self.records[entry.id.0];

            match entry.write {
                Write::Insert => {
                    let late = std::mem::take(&mut record.late);
                    record.data.merge(late);
                    record.state = State::Pending;
                }
                Write::Update(_) => record.state = State::Stale,
            }
        }
    }

    fn visit(&self, index: usize, marks: &mut [Mark], order: &mut Vec<usize>) -> Result<()> {
        match marks[index] {
            Mark::Done => return Ok(()),
            Mark::Visiting => {
                return Err(Error::invalid_payload(format!(
                    "appended records reference each other in a cycle; record={}",
                    PendingId(index)
                )))
            }
            Mark::Unvisited => {}
        }

        marks[index] = Mark::Visiting;

        let record = &self.records[index];

        for value in record.data.values().chain(record.late.values()) {
            if let Value::Pending(dep) = value {
                if self.records[dep.0].state == State::Pending {
                    self.visit(dep.0, marks, order)?;
                }
            }
        }

        marks[index] = Mark::Done;
        order.push(index);
        Ok(())
    }

    /// Key of an already flushed record referenced by foreign key `name`.
    fn flushed_key(&self, schema: &Schema, model: &Model, name: &str, dep: PendingId) -> Result<Value> {
        let target = model
            .field(name)
            .and_then(|field| field.as_foreign_key())
            .map(|fk| schema.field(fk.target))
            .ok_or_else(|| err!("pending reference outside a foreign key; field={name}"))?;

        self.records[dep.0]
            .data
            .get(&target.name)
            .cloned()
            .ok_or_else(|| err!("flushed record has no `{}` value; record={dep}", target.name))
    }

    /// Checks every field against the model, unwrapping foreign key stubs so
    /// that `1` and `{id: 1}` compare equal.
    fn normalize(&self, schema: &Schema, model: &Model, data: Record) -> Result<Record> {
        let mut normalized = Record::new();

        for (name, value) in data {
            let field = model.field(&name).ok_or_else(|| {
                Error::invalid_payload(format!("unknown field `{}::{name}`", model.name))
            })?;

            let value = match (&field.ty, value) {
                (FieldTy::Primitive(_), value) if value.is_scalar() => value,
                (FieldTy::ForeignKey(fk), value) => {
                    let target = schema.field(fk.target);

                    let value = match value {
                        Value::Record(mut stub) if stub.len() == 1 => {
                            stub.remove(&target.name).unwrap_or_else(|| Value::Record(stub))
                        }
                        value => value,
                    };

                    match value {
                        Value::Pending(id) => {
                            let referenced = self
                                .records
                                .get(id.0)
                                .filter(|record| record.state != State::Forgotten);

                            if referenced.map(|record| record.model) != Some(target.id.model) {
                                return Err(Error::invalid_payload(format!(
                                    "`{}::{name}` references {id}, which is not a queued `{}` record",
                                    model.name,
                                    schema.model(target.id.model).name
                                )));
                            }
                            Value::Pending(id)
                        }
                        value if value.is_scalar() => value,
                        _ => return Err(scalar_expected(model, &name)),
                    }
                }
                _ => return Err(scalar_expected(model, &name)),
            };

            normalized.insert(name, value);
        }

        Ok(normalized)
    }
}

/// Primary key of a stored record, keyed by column.
fn stored_key(model: &Model, record: &PendingRecord) -> Record {
    model
        .primary_key_fields()
        .map(|field| {
            let value = record.data.get(&field.name).cloned().unwrap_or_default();
            (field.expect_column().to_string(), value)
        })
        .collect()
}

fn scalar_expected(model: &Model, name: &str) -> Error {
    Error::invalid_payload(format!(
        "appended field `{}::{name}` must hold a scalar, a key stub or a pending record",
        model.name
    ))
}

impl Batch {
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Writes `batch` in one transaction and returns the stored rows, in batch
/// order, keyed by column.
pub(crate) async fn flush(db: &Database, batch: &Batch) -> Result<Vec<Record>> {
    let schema = db.schema();
    let mut planner = Planner::new(schema);
    let mut vars = IndexMap::new();

    for entry in &batch.entries {
        let model = schema.model(entry.model);
        let mut values = vec![];

        for (name, value) in entry.data.iter() {
            let Some(field) = model.field(name) else {
                return Err(Error::invalid_payload(format!("unknown field `{}::{name}`", model.name)));
            };
            let column = field.expect_column();

            let expr = match (value, field.as_foreign_key()) {
                (Value::Pending(dep), Some(fk)) => {
                    let var = vars
                        .get(dep)
                        .copied()
                        .ok_or_else(|| err!("{} referenced before it was flushed", dep))?;
                    Expr::arg(var, schema.field(fk.target).expect_column())
                }
                (value, _) => Expr::Value(value.clone()),
            };

            values.push((column.to_string(), expr));
        }

        let var = match &entry.write {
            Write::Insert => planner.insert(model, values),
            Write::Update(key) => planner.update_key(model, key, values),
        };

        vars.insert(entry.id, var);
    }

    let plan = planner.build();
    debug!(records = batch.entries.len(), "flushing appended records");

    let session = db.session().await?;
    let mut tx = Transaction::begin(session, db.shared.pool.capability().exclusive_begin).await?;

    let result = async {
        let mut bound = exec::execute(&mut tx, schema, &plan).await?;

        vars.values()
            .map(|var| {
                bound
                    .take(*var)
                    .ok_or_else(|| err!("flushed record was not read back"))
            })
            .collect::<Result<Vec<_>>>()
    }
    .await;

    tx.finish(result).await
}
