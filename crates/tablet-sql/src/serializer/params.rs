use super::{Flavor, Formatter, ToSql};

use tablet_core::stmt;

pub trait Params {
    fn push(&mut self, param: &stmt::Value) -> Placeholder;
}

/// 1-based position of a bound parameter
pub struct Placeholder(pub usize);

impl Params for Vec<stmt::Value> {
    fn push(&mut self, value: &stmt::Value) -> Placeholder {
        self.push(value.clone());
        Placeholder(self.len())
    }
}

impl ToSql for Placeholder {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        use std::fmt::Write;

        let ret = match f.serializer.flavor {
            Flavor::Mysql => write!(f.dst, "?"),
            Flavor::Sqlite => write!(f.dst, "?{}", self.0),
        };
        ret.expect("writing to a String cannot fail");
    }
}
