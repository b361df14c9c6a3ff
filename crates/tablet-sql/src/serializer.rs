#[macro_use]
mod fmt;
use fmt::ToSql;

mod delim;
use delim::{Comma, Delimited};

mod flavor;
use flavor::Flavor;

mod ident;
use ident::Ident;

mod params;
pub use params::{Params, Placeholder};

// Fragment serializers
mod expr;
mod statement;
mod value;

use tablet_core::{driver::Transaction, stmt::Statement};

/// Serialize a statement to a SQL string
#[derive(Debug)]
pub struct Serializer {
    /// The database flavor handles the differences between SQL dialects and
    /// supported features.
    flavor: Flavor,
}

struct Formatter<'a, T> {
    /// Handle to the serializer
    serializer: &'a Serializer,

    /// Where to write the serialized SQL
    dst: &'a mut String,

    /// Where to store parameters
    params: &'a mut T,
}

impl Serializer {
    pub fn serialize(&self, stmt: &Statement, params: &mut impl Params) -> String {
        let mut ret = String::new();

        let mut fmt = Formatter {
            serializer: self,
            dst: &mut ret,
            params,
        };

        stmt.to_sql(&mut fmt);

        ret.push(';');
        ret
    }

    /// Serialize a transaction control operation to a SQL string.
    pub fn serialize_transaction(&self, op: &Transaction) -> String {
        match (op, &self.flavor) {
            (Transaction::Start { exclusive: true }, Flavor::Sqlite) => "BEGIN IMMEDIATE",
            (Transaction::Start { .. }, Flavor::Mysql) => "START TRANSACTION",
            (Transaction::Start { .. }, _) => "BEGIN",
            (Transaction::Commit, _) => "COMMIT",
            (Transaction::Rollback, _) => "ROLLBACK",
        }
        .to_string()
    }

    /// Quotes an identifier for this flavor.
    pub fn escape_id(&self, name: &str) -> String {
        let quote = self.flavor.ident_quote();
        let mut ret = String::with_capacity(name.len() + 2);

        ret.push(quote);
        for c in name.chars() {
            if c == quote {
                ret.push(quote);
            }
            ret.push(c);
        }
        ret.push(quote);
        ret
    }
}
