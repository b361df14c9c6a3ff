mod options;
pub use options::{OrderBy, SelectOptions};

use crate::{
    engine::{self, exec, filter, hydrate, planner, Planner, Selection},
    Database, Result,
};

use tablet_core::{
    err,
    schema::{Model, ModelId},
    stmt::{self, PendingId, Record, Select, Value},
    Error,
};
use tracing::debug;

/// Operations on the rows of one model.
///
/// Rows are read and written by field name. Filters are records mapping
/// field names (optionally suffixed with an operator such as `_like`) to
/// values, or lists of such records, meaning any of them.
#[derive(Debug, Clone)]
pub struct Table {
    db: Database,
    model: ModelId,
}

impl Table {
    pub(crate) fn new(db: Database, model: ModelId) -> Table {
        Table { db, model }
    }

    pub fn model(&self) -> &Model {
        self.db.schema().model(self.model)
    }

    /// The model name
    pub fn name(&self) -> &str {
        &self.model().name
    }

    /// The model, if its rows can be told apart by a primary key. Junction
    /// tables may have none.
    fn keyed_model(&self) -> Result<&Model> {
        let model = self.model();

        if model.primary_key.is_empty() {
            return Err(Error::invalid_payload(format!(
                "`{}` has no primary key; use `insert`, `update` and `delete` on it",
                model.name
            )));
        }

        Ok(model)
    }

    /// Returns the rows matching `options`, with the fields named by
    /// `fields` (see [`Selection`]).
    pub async fn select(&self, fields: &str, options: SelectOptions) -> Result<Vec<Record>> {
        let schema = self.db.schema();
        let model = self.model();
        let selection = Selection::parse(fields)?;

        let mut stmt = Select::new(&model.table, filter::lower(schema, model, &options.filter)?);
        stmt.order_by = options.order_by.lower(model)?;
        stmt.offset = options.offset;
        stmt.limit = options.limit;

        let mut session = self.db.session().await?;
        hydrate::load(&mut session, schema, model, stmt, &selection).await
    }

    /// Number of rows matching `filter`.
    pub async fn count(&self, filter: impl Into<Value>) -> Result<u64> {
        let schema = self.db.schema();
        let model = self.model();

        let stmt = Select::count(&model.table, filter::lower(schema, model, &filter.into())?);

        let mut session = self.db.session().await?;
        let rows = session.query(stmt).await?;

        rows.first()
            .and_then(|row| row["count"].as_i64())
            .map(|count| count as u64)
            .ok_or_else(|| err!("count query returned no rows; table={}", model.table))
    }

    /// Returns the one row identified by `filter`: a primary key value, or a
    /// record pinning the primary key or a unique key.
    ///
    /// A filter that pins no unique key fails with a bad filter error before
    /// any query is issued.
    pub async fn get(&self, filter: impl Into<Value>) -> Result<Option<Record>> {
        let schema = self.db.schema();
        let model = self.model();

        let filter = filter::unique_filter(schema, model, &filter.into())?;
        let stmt = Select::new(&model.table, filter::lower_record(schema, model, &filter)?).limit(2);

        let mut session = self.db.session().await?;
        let mut rows = hydrate::load(&mut session, schema, model, stmt, &Selection::all()).await?;

        if rows.len() > 1 {
            return Err(Error::too_many_records(format!(
                "`{}` filter matched more than one row",
                model.name
            )));
        }

        Ok(rows.pop())
    }

    /// Inserts one row of scalar and foreign key values. Returns the primary
    /// key: a plain value, or a record for composite keys.
    pub async fn insert(&self, data: impl Into<Record>) -> Result<Value> {
        let schema = self.db.schema();
        let model = self.model();

        let values = planner::column_values(schema, model, &data.into())?;

        let mut session = self.db.session().await?;
        let response = session
            .exec_stmt(stmt::Insert {
                table: model.table.clone(),
                values: values.clone(),
            })
            .await?;

        let key = exec::inserted_key(model, &values, response.last_insert_id)?;

        Ok(match model.key_field() {
            Some(field) => key[field.expect_column()].clone(),
            None => Value::Record(
                model
                    .primary_key_fields()
                    .map(|field| (field.name.clone(), key[field.expect_column()].clone()))
                    .collect(),
            ),
        })
    }

    /// Sets scalar and foreign key values on every row matching `filter`.
    /// Returns the number of rows changed.
    pub async fn update(&self, data: impl Into<Record>, filter: impl Into<Value>) -> Result<u64> {
        let schema = self.db.schema();
        let model = self.model();

        let assignments = planner::column_values(schema, model, &data.into())?;

        if assignments.is_empty() {
            return Ok(0);
        }

        let mut stmt = stmt::Update::new(&model.table, filter::lower(schema, model, &filter.into())?);
        stmt.assignments = assignments;

        let mut session = self.db.session().await?;
        Ok(session.exec_stmt(stmt).await?.rows.count())
    }

    /// Deletes every row matching `filter` and returns how many were deleted.
    pub async fn delete(&self, filter: impl Into<Value>) -> Result<u64> {
        let schema = self.db.schema();
        let model = self.model();

        let stmt = stmt::Delete::new(&model.table, filter::lower(schema, model, &filter.into())?);

        let mut session = self.db.session().await?;
        Ok(session.exec_stmt(stmt).await?.rows.count())
    }

    /// Inserts `data` together with its nested relation operations, in one
    /// transaction, and returns the created row with every relation the
    /// payload touched.
    ///
    /// Foreign key fields take a key value, a `{<key>: value}` stub, or one
    /// of `{connect}`, `{create}` and `{upsert}`. Relation fields take a
    /// record of operations (`connect`, `create`, `upsert`), each a payload
    /// or a list of payloads.
    pub async fn create(&self, data: impl Into<Record>) -> Result<Record> {
        let data = data.into();
        let model = self.keyed_model()?;

        let mut planner = Planner::new(self.db.schema());
        let var = planner.create(model, &data)?;

        exec::apply(&self.db, model, planner.build(), var, &Selection::for_payload(model, &data)).await
    }

    /// Applies `data` to the one row `filter` identifies. Besides the
    /// operations `create` accepts, relation fields take `update`
    /// (`{where, data}` on one related row), `delete` and `disconnect`, and
    /// foreign keys take `{disconnect: true}`.
    pub async fn modify(&self, data: impl Into<Record>, filter: impl Into<Value>) -> Result<Record> {
        let data = data.into();
        let model = self.keyed_model()?;

        let mut planner = Planner::new(self.db.schema());
        let var = planner.modify(model, &data, &filter.into())?;

        exec::apply(&self.db, model, planner.build(), var, &Selection::for_payload(model, &data)).await
    }

    /// Inserts `create` unless a row with the same unique key exists. An
    /// existing row gets `update` applied when one is given, and is returned
    /// unchanged otherwise.
    pub async fn upsert(
        &self,
        create: impl Into<Record>,
        update: impl Into<Option<Record>>,
    ) -> Result<Record> {
        let create = create.into();
        let update = update.into();
        let model = self.keyed_model()?;

        let mut planner = Planner::new(self.db.schema());
        let var = planner.upsert(model, &create, update.as_ref())?;

        let mut payload = create.clone();
        if let Some(update) = update {
            payload.merge(update);
        }

        exec::apply(&self.db, model, planner.build(), var, &Selection::for_payload(model, &payload)).await
    }

    /// Picks one row matching `filter` that no concurrent claim has taken,
    /// applies `data` to it and returns it. Returns `None` once no matching
    /// row is left.
    ///
    /// `data` should make the row stop matching `filter`, otherwise the same
    /// row can be claimed again once this claim commits.
    pub async fn claim(&self, filter: impl Into<Value>, data: impl Into<Record>) -> Result<Option<Record>> {
        engine::claim(&self.db, self.keyed_model()?, &filter.into(), &data.into()).await
    }

    /// Queues `data` for insertion on the next [`Database::flush`].
    ///
    /// When `data` provides a unique key that an unflushed record of this
    /// model already has, `data` is merged into that record and its handle
    /// is returned again. A record that a running flush is writing still
    /// merges; the merged values are written by the next flush. Foreign key
    /// fields may hold the handle of another queued record.
    pub fn append(&self, data: impl Into<Record>) -> Result<PendingId> {
        let id = self
            .db
            .queue()
            .append(self.db.schema(), self.keyed_model()?, data.into())?;

        debug!(model = %self.name(), %id, "record appended");
        Ok(id)
    }

    /// Handles returned by every `append` call since the last flush, in call
    /// order.
    pub fn record_list(&self) -> Vec<PendingId> {
        self.db.queue().record_list(self.model)
    }
}
