use super::Expr;

#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub table: String,

    /// Column assignments. An empty list inserts a row of defaults.
    pub values: Vec<(String, Expr)>,
}

impl Insert {
    pub fn new(table: impl Into<String>) -> Insert {
        Insert {
            table: table.into(),
            values: vec![],
        }
    }

    pub fn set(&mut self, column: impl Into<String>, expr: impl Into<Expr>) {
        let column = column.into();
        let expr = expr.into();

        match self.values.iter_mut().find(|(name, _)| *name == column) {
            Some((_, existing)) => *existing = expr,
            None => self.values.push((column, expr)),
        }
    }
}
