use crate::stmt::{Record, Value};

#[derive(Debug)]
pub struct Response {
    pub rows: Rows,

    /// Key assigned by the database to the last inserted row, if any
    pub last_insert_id: Option<Value>,
}

#[derive(Debug)]
pub enum Rows {
    /// Number of rows impacted by the operation
    Count(u64),

    /// Rows returned by a query, keyed by column name
    Values(Vec<Record>),
}

impl Response {
    pub fn count(count: u64) -> Self {
        Self {
            rows: Rows::Count(count),
            last_insert_id: None,
        }
    }

    pub fn inserted(count: u64, last_insert_id: Value) -> Self {
        Self {
            rows: Rows::Count(count),
            last_insert_id: Some(last_insert_id),
        }
    }

    pub fn values(values: Vec<Record>) -> Self {
        Self {
            rows: Rows::Values(values),
            last_insert_id: None,
        }
    }
}

impl Rows {
    pub fn is_count(&self) -> bool {
        matches!(self, Self::Count(_))
    }

    pub fn is_values(&self) -> bool {
        matches!(self, Self::Values(_))
    }

    /// Number of affected rows, or the number of returned rows.
    pub fn count(&self) -> u64 {
        match self {
            Rows::Count(count) => *count,
            Rows::Values(values) => values.len() as u64,
        }
    }

    pub fn into_values(self) -> Vec<Record> {
        match self {
            Rows::Values(values) => values,
            Rows::Count(_) => vec![],
        }
    }
}
