use super::{Comma, Delimited, Formatter, Ident, Params, ToSql};

use tablet_core::stmt::{BinaryOp, Expr, Value};

impl ToSql for &Expr {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        match self {
            Expr::Value(value) => fmt!(f, value),
            Expr::Column(name) => fmt!(f, Ident(name)),
            Expr::Arg(arg) => panic!("unresolved argument in statement; arg={arg:?}"),
            Expr::BinaryOp { lhs, op, rhs } => {
                let (lhs, rhs) = (lhs.as_ref(), rhs.as_ref());

                match (op, rhs) {
                    (BinaryOp::Eq, Expr::Value(Value::Null)) => fmt!(f, lhs " IS NULL"),
                    (BinaryOp::Ne, Expr::Value(Value::Null)) => fmt!(f, lhs " IS NOT NULL"),
                    _ => fmt!(f, lhs " " op.as_sql() " " rhs),
                }
            }
            Expr::And(operands) => fmt!(f, "(" Delimited(operands, " AND ") ")"),
            Expr::Or(operands) => fmt!(f, "(" Delimited(operands, " OR ") ")"),
            Expr::Not(expr) => fmt!(f, "NOT (" expr.as_ref() ")"),
            Expr::IsNull(expr) => fmt!(f, expr.as_ref() " IS NULL"),
            Expr::InList { list, .. } if list.is_empty() => fmt!(f, "FALSE"),
            Expr::InList { expr, list } => fmt!(f, expr.as_ref() " IN (" Comma(list) ")"),
            Expr::InSubquery { expr, query } => {
                fmt!(f, expr.as_ref() " IN (" query.as_ref() ")")
            }
            Expr::Like {
                expr,
                pattern,
                negated,
            } => {
                let op = if *negated { " NOT LIKE " } else { " LIKE " };
                fmt!(f, expr.as_ref() op pattern.as_ref());
            }
        }
    }
}
