mod delete;
pub use delete::Delete;

mod expr;
pub use expr::{BinaryOp, Expr, ExprArg};

mod insert;
pub use insert::Insert;

mod order_by;
pub use order_by::{Direction, OrderBy};

mod pending;
pub use pending::PendingId;

mod record;
pub use record::Record;

mod select;
pub use select::{Lock, Projection, Select};

mod ty;
pub use ty::Type;

mod update;
pub use update::Update;

mod value;
pub use value::Value;

/// A statement sent to a driver.
///
/// Statements reference tables and columns by their storage names; all
/// mapping from model fields happens before a statement is built.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(Select),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
}

impl Statement {
    pub fn table(&self) -> &str {
        match self {
            Statement::Select(stmt) => &stmt.table,
            Statement::Insert(stmt) => &stmt.table,
            Statement::Update(stmt) => &stmt.table,
            Statement::Delete(stmt) => &stmt.table,
        }
    }

    pub fn is_select(&self) -> bool {
        matches!(self, Statement::Select(_))
    }

    /// Replaces every [`Expr::Arg`] in the statement using `f`.
    pub fn substitute(&mut self, f: &mut impl FnMut(&ExprArg) -> Value) {
        match self {
            Statement::Select(stmt) => stmt.substitute(f),
            Statement::Insert(stmt) => {
                for (_, expr) in &mut stmt.values {
                    expr.substitute(f);
                }
            }
            Statement::Update(stmt) => {
                for (_, expr) in &mut stmt.assignments {
                    expr.substitute(f);
                }
                stmt.filter.substitute(f);
            }
            Statement::Delete(stmt) => stmt.filter.substitute(f),
        }
    }
}

impl From<Select> for Statement {
    fn from(value: Select) -> Self {
        Statement::Select(value)
    }
}

impl From<Insert> for Statement {
    fn from(value: Insert) -> Self {
        Statement::Insert(value)
    }
}

impl From<Update> for Statement {
    fn from(value: Update) -> Self {
        Statement::Update(value)
    }
}

impl From<Delete> for Statement {
    fn from(value: Delete) -> Self {
        Statement::Delete(value)
    }
}
