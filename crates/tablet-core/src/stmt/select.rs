use super::{Expr, ExprArg, OrderBy, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    /// Table to read from
    pub table: String,

    /// What each returned row contains
    pub projection: Projection,

    /// Which rows to return
    pub filter: Expr,

    pub order_by: Vec<OrderBy>,

    pub limit: Option<u64>,

    pub offset: Option<u64>,

    /// Row locking requested by the caller. Drivers that cannot lock rows
    /// ignore this; the caller is responsible for serializing instead.
    pub lock: Option<Lock>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// Every column, in table order
    All,

    /// The listed columns
    Columns(Vec<String>),

    /// A single `count` column holding the number of matching rows
    Count,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lock {
    /// Lock the selected rows for update, skipping rows already locked by
    /// another transaction.
    ForUpdateSkipLocked,
}

impl Select {
    pub fn new(table: impl Into<String>, filter: Expr) -> Select {
        Select {
            table: table.into(),
            projection: Projection::All,
            filter,
            order_by: vec![],
            limit: None,
            offset: None,
            lock: None,
        }
    }

    pub fn count(table: impl Into<String>, filter: Expr) -> Select {
        Select {
            projection: Projection::Count,
            ..Select::new(table, filter)
        }
    }

    /// Select only `columns`.
    pub fn columns<I>(mut self, columns: I) -> Select
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.projection = Projection::Columns(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn limit(mut self, limit: u64) -> Select {
        self.limit = Some(limit);
        self
    }

    pub fn lock(mut self, lock: Lock) -> Select {
        self.lock = Some(lock);
        self
    }

    pub(super) fn substitute(&mut self, f: &mut impl FnMut(&ExprArg) -> Value) {
        self.filter.substitute(f);
    }
}
