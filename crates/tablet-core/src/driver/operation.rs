use crate::stmt::Statement;

#[derive(Debug)]
pub enum Operation {
    /// Execute a SQL statement
    QuerySql(Statement),

    /// Execute a transaction lifecycle op
    Transaction(Transaction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transaction {
    /// Start a transaction. An exclusive transaction takes the database write
    /// lock immediately instead of on first write.
    Start { exclusive: bool },

    /// Commit a transaction
    Commit,

    /// Rollback a transaction
    Rollback,
}

impl From<Transaction> for Operation {
    fn from(value: Transaction) -> Operation {
        Operation::Transaction(value)
    }
}

impl From<Statement> for Operation {
    fn from(value: Statement) -> Operation {
        Operation::QuerySql(value)
    }
}
