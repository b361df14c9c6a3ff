use crate::Result;

use tablet_core::{
    schema::Model,
    stmt::{self, Value},
    Error,
};

/// Filter, ordering and paging of a `select`.
#[derive(Debug, Clone, Default)]
pub struct SelectOptions {
    pub filter: Value,
    pub order_by: OrderBy,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

/// Field names to sort by; a leading `-` sorts descending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderBy(pub Vec<String>);

impl SelectOptions {
    pub fn new() -> SelectOptions {
        SelectOptions::default()
    }

    /// Rows to return, as a filter record or a list of them. `null` matches
    /// every row.
    pub fn filter(mut self, filter: impl Into<Value>) -> SelectOptions {
        self.filter = filter.into();
        self
    }

    pub fn order_by(mut self, order_by: impl Into<OrderBy>) -> SelectOptions {
        self.order_by = order_by.into();
        self
    }

    pub fn offset(mut self, offset: u64) -> SelectOptions {
        self.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: u64) -> SelectOptions {
        self.limit = Some(limit);
        self
    }
}

impl OrderBy {
    pub(crate) fn lower(&self, model: &Model) -> Result<Vec<stmt::OrderBy>> {
        self.0
            .iter()
            .map(|name| {
                let (field, descending) = match name.strip_prefix('-') {
                    Some(field) => (field, true),
                    None => (name.as_str(), false),
                };

                let column = model
                    .field(field)
                    .and_then(|field| field.column())
                    .ok_or_else(|| {
                        Error::invalid_payload(format!(
                            "cannot order `{}` by `{field}`",
                            model.name
                        ))
                    })?;

                Ok(if descending {
                    stmt::OrderBy::desc(column)
                } else {
                    stmt::OrderBy::asc(column)
                })
            })
            .collect()
    }
}

impl From<&str> for OrderBy {
    fn from(value: &str) -> Self {
        OrderBy(vec![value.to_string()])
    }
}

impl From<String> for OrderBy {
    fn from(value: String) -> Self {
        OrderBy(vec![value])
    }
}

impl From<Vec<&str>> for OrderBy {
    fn from(value: Vec<&str>) -> Self {
        OrderBy(value.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for OrderBy {
    fn from(value: Vec<String>) -> Self {
        OrderBy(value)
    }
}

impl<const N: usize> From<[&str; N]> for OrderBy {
    fn from(value: [&str; N]) -> Self {
        OrderBy(value.into_iter().map(str::to_string).collect())
    }
}
