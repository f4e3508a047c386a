//! Expression AST shared by the logical and physical plan models.
//!
//! Expressions appear as filter conditions, join conditions, group keys,
//! sort keys and projection bodies. The planner never evaluates them; it
//! only needs their shape (for index matching) and their static result
//! type (for output schema construction), which [`Expr::result_type`]
//! derives from an input [`Schema`].


use common::{EngineError, EngineResult, Schema};
use std::fmt;
use types::{SqlType, Value};

/// Binary arithmetic, comparison and logical operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        }
    }

    fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div
        )
    }
}

/// Unary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
}

/// Expression tree.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Expr {
    Literal(Value),
    /// Column reference with optional relation qualifier (table name or alias).
    Column {
        relation: Option<String>,
        name: String,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    /// Scalar or aggregate function call, e.g. `sum(col2)`.
    Call {
        func: String,
        args: Vec<Expr>,
    },
    /// The `*` projection. `columns` is empty until the planner expands it
    /// against a concrete input schema, one column reference per column.
    All {
        relation: Option<String>,
        columns: Vec<Expr>,
    },
}

impl Expr {
    pub fn column(name: impl Into<String>) -> Expr {
        Expr::Column {
            relation: None,
            name: name.into(),
        }
    }

    pub fn qualified(relation: impl Into<String>, name: impl Into<String>) -> Expr {
        Expr::Column {
            relation: Some(relation.into()),
            name: name.into(),
        }
    }

    pub fn lit(value: Value) -> Expr {
        Expr::Literal(value)
    }

    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Expr {
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn call(func: impl Into<String>, args: Vec<Expr>) -> Expr {
        Expr::Call {
            func: func.into(),
            args,
        }
    }

    pub fn all() -> Expr {
        Expr::All {
            relation: None,
            columns: Vec::new(),
        }
    }

    /// Column name if this expression is a plain column reference.
    pub fn as_column_name(&self) -> Option<&str> {
        match self {
            Expr::Column { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Static result type against the given input schema.
    ///
    /// `All` has no scalar type; it must be expanded before the projection
    /// compiler sees it.
    pub fn result_type(&self, input: &Schema) -> EngineResult<SqlType> {
        match self {
            Expr::Literal(v) => v
                .sql_type()
                .ok_or_else(|| EngineError::Plan("untyped null literal".into())),
            Expr::Column { name, .. } => input
                .iter()
                .find(|c| c.name == *name)
                .map(|c| c.ty)
                .ok_or_else(|| EngineError::Plan(format!("unknown column '{name}'"))),
            Expr::Unary { op, expr } => match op {
                UnaryOp::Not => Ok(SqlType::Bool),
                UnaryOp::Neg => expr.result_type(input),
            },
            Expr::Binary { left, op, right } => {
                if op.is_arithmetic() {
                    let lt = left.result_type(input)?;
                    let rt = right.result_type(input)?;
                    promote_numeric(lt, rt).ok_or_else(|| {
                        EngineError::Plan(format!(
                            "invalid operand types {lt} and {rt} for '{}'",
                            op.symbol()
                        ))
                    })
                } else {
                    Ok(SqlType::Bool)
                }
            }
            Expr::Call { func, args } => match func.to_ascii_lowercase().as_str() {
                "count" => Ok(SqlType::Bigint),
                "avg" => Ok(SqlType::Double),
                "sum" | "min" | "max" => args
                    .first()
                    .ok_or_else(|| {
                        EngineError::Plan(format!("function '{func}' takes one argument"))
                    })?
                    .result_type(input),
                _ => Err(EngineError::Plan(format!("unknown function '{func}'"))),
            },
            Expr::All { .. } => Err(EngineError::Plan(
                "star expression must be expanded before type inference".into(),
            )),
        }
    }
}

/// Numeric promotion for arithmetic: the wider rank wins.
fn promote_numeric(left: SqlType, right: SqlType) -> Option<SqlType> {
    let (lr, rr) = (left.numeric_rank()?, right.numeric_rank()?);
    Some(if lr >= rr { left } else { right })
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(v) => write!(f, "{v}"),
            Expr::Column {
                relation: Some(r),
                name,
            } => write!(f, "{r}.{name}"),
            Expr::Column {
                relation: None,
                name,
            } => f.write_str(name),
            Expr::Unary {
                op: UnaryOp::Not,
                expr,
            } => write!(f, "NOT {expr}"),
            Expr::Unary {
                op: UnaryOp::Neg,
                expr,
            } => write!(f, "-{expr}"),
            Expr::Binary { left, op, right } => {
                write!(f, "{left} {} {right}", op.symbol())
            }
            Expr::Call { func, args } => {
                write!(f, "{func}(")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{a}")?;
                }
                f.write_str(")")
            }
            Expr::All {
                relation: Some(r), ..
            } => write!(f, "{r}.*"),
            Expr::All { relation: None, .. } => f.write_str("*"),
        }
    }
}

/// Ordered sort keys with a shared direction flag.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OrderBy {
    pub keys: Vec<Expr>,
    pub ascending: bool,
}

impl OrderBy {
    pub fn new(keys: Vec<Expr>, ascending: bool) -> Self {
        Self { keys, ascending }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, k) in self.keys.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{k}")?;
        }
        f.write_str(if self.ascending { " ASC" } else { " DESC" })
    }
}
