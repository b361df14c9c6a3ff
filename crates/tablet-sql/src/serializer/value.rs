use super::{Comma, Formatter, Params, ToSql};

use tablet_core::stmt::Value;

impl ToSql for &Value {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        match self {
            Value::Null => fmt!(f, "NULL"),
            Value::Bool(true) => fmt!(f, "TRUE"),
            Value::Bool(false) => fmt!(f, "FALSE"),
            Value::I64(_) | Value::F64(_) | Value::String(_) => {
                let placeholder = f.params.push(self);
                fmt!(f, placeholder);
            }
            Value::List(items) => fmt!(f, "(" Comma(items) ")"),
            Value::Record(_) | Value::Pending(_) => {
                panic!("value cannot be bound as a statement parameter; value={self:?}")
            }
        }
    }
}
