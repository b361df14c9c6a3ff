use super::{Select, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A constant value, bound as a statement parameter
    Value(Value),

    /// Reference to a column of the statement's table
    Column(String),

    /// A value produced by an earlier step of a mutation plan
    Arg(ExprArg),

    BinaryOp {
        lhs: Box<Expr>,
        op: BinaryOp,
        rhs: Box<Expr>,
    },

    And(Vec<Expr>),

    Or(Vec<Expr>),

    Not(Box<Expr>),

    IsNull(Box<Expr>),

    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
    },

    InSubquery {
        expr: Box<Expr>,
        query: Box<Select>,
    },

    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        negated: bool,
    },
}

/// Column `column` of the row bound to plan variable `var`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExprArg {
    pub var: usize,
    pub column: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    pub fn as_sql(self) -> &'static str {
        match self {
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }
}

impl Expr {
    pub fn column(name: impl Into<String>) -> Expr {
        Expr::Column(name.into())
    }

    pub fn value(value: impl Into<Value>) -> Expr {
        Expr::Value(value.into())
    }

    pub fn arg(var: usize, column: impl Into<String>) -> Expr {
        Expr::Arg(ExprArg {
            var,
            column: column.into(),
        })
    }

    pub fn binary_op(lhs: impl Into<Expr>, op: BinaryOp, rhs: impl Into<Expr>) -> Expr {
        Expr::BinaryOp {
            lhs: Box::new(lhs.into()),
            op,
            rhs: Box::new(rhs.into()),
        }
    }

    pub fn eq(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
        Expr::binary_op(lhs, BinaryOp::Eq, rhs)
    }

    pub fn is_null(expr: impl Into<Expr>) -> Expr {
        Expr::IsNull(Box::new(expr.into()))
    }

    pub fn not(expr: impl Into<Expr>) -> Expr {
        Expr::Not(Box::new(expr.into()))
    }

    pub fn in_list(expr: impl Into<Expr>, list: Vec<Expr>) -> Expr {
        Expr::InList {
            expr: Box::new(expr.into()),
            list,
        }
    }

    pub fn in_subquery(expr: impl Into<Expr>, query: Select) -> Expr {
        Expr::InSubquery {
            expr: Box::new(expr.into()),
            query: Box::new(query),
        }
    }

    pub fn like(expr: impl Into<Expr>, pattern: impl Into<Expr>, negated: bool) -> Expr {
        Expr::Like {
            expr: Box::new(expr.into()),
            pattern: Box::new(pattern.into()),
            negated,
        }
    }

    /// Constant `true`, used as the filter of unfiltered statements.
    pub fn true_() -> Expr {
        Expr::Value(Value::Bool(true))
    }

    pub fn false_() -> Expr {
        Expr::Value(Value::Bool(false))
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Expr::Value(Value::Bool(true)))
    }

    pub fn is_false(&self) -> bool {
        matches!(self, Expr::Value(Value::Bool(false)))
    }

    /// Conjunction of `operands`, dropping constant `true` operands.
    pub fn and_from_vec(operands: Vec<Expr>) -> Expr {
        let mut operands: Vec<_> = operands.into_iter().filter(|e| !e.is_true()).collect();

        if operands.iter().any(Expr::is_false) {
            return Expr::false_();
        }

        match operands.len() {
            0 => Expr::true_(),
            1 => operands.remove(0),
            _ => Expr::And(operands),
        }
    }

    /// Disjunction of `operands`, dropping constant `false` operands.
    pub fn or_from_vec(operands: Vec<Expr>) -> Expr {
        let mut operands: Vec<_> = operands.into_iter().filter(|e| !e.is_false()).collect();

        if operands.iter().any(Expr::is_true) {
            return Expr::true_();
        }

        match operands.len() {
            0 => Expr::false_(),
            1 => operands.remove(0),
            _ => Expr::Or(operands),
        }
    }

    pub fn and(self, other: Expr) -> Expr {
        Expr::and_from_vec(vec![self, other])
    }

    /// Replaces every [`Expr::Arg`] using `f`.
    pub fn substitute(&mut self, f: &mut impl FnMut(&ExprArg) -> Value) {
        match self {
            Expr::Arg(arg) => *self = Expr::Value(f(arg)),
            Expr::Value(_) | Expr::Column(_) => {}
            Expr::BinaryOp { lhs, rhs, .. } => {
                lhs.substitute(f);
                rhs.substitute(f);
            }
            Expr::And(operands) | Expr::Or(operands) => {
                for operand in operands {
                    operand.substitute(f);
                }
            }
            Expr::Not(expr) | Expr::IsNull(expr) => expr.substitute(f),
            Expr::InList { expr, list } => {
                expr.substitute(f);
                for item in list {
                    item.substitute(f);
                }
            }
            Expr::InSubquery { expr, query } => {
                expr.substitute(f);
                query.substitute(f);
            }
            Expr::Like { expr, pattern, .. } => {
                expr.substitute(f);
                pattern.substitute(f);
            }
        }
    }

    /// Returns `true` if the expression contains an unresolved [`Expr::Arg`].
    pub fn has_arg(&self) -> bool {
        match self {
            Expr::Arg(_) => true,
            Expr::Value(_) | Expr::Column(_) => false,
            Expr::BinaryOp { lhs, rhs, .. } => lhs.has_arg() || rhs.has_arg(),
            Expr::And(operands) | Expr::Or(operands) => operands.iter().any(Expr::has_arg),
            Expr::Not(expr) | Expr::IsNull(expr) => expr.has_arg(),
            Expr::InList { expr, list } => expr.has_arg() || list.iter().any(Expr::has_arg),
            Expr::InSubquery { expr, query } => expr.has_arg() || query.filter.has_arg(),
            Expr::Like { expr, pattern, .. } => expr.has_arg() || pattern.has_arg(),
        }
    }
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Expr::Value(value)
    }
}

impl From<ExprArg> for Expr {
    fn from(value: ExprArg) -> Self {
        Expr::Arg(value)
    }
}
