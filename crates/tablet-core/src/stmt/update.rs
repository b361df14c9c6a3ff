use super::Expr;

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub table: String,

    pub assignments: Vec<(String, Expr)>,

    pub filter: Expr,
}

impl Update {
    pub fn new(table: impl Into<String>, filter: Expr) -> Update {
        Update {
            table: table.into(),
            assignments: vec![],
            filter,
        }
    }

    pub fn set(&mut self, column: impl Into<String>, expr: impl Into<Expr>) {
        let column = column.into();
        let expr = expr.into();

        match self.assignments.iter_mut().find(|(name, _)| *name == column) {
            Some((_, existing)) => *existing = expr,
            None => self.assignments.push((column, expr)),
        }
    }
}
