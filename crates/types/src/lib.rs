use std::cmp::Ordering;
use std::fmt;

/// Scalar column types supported by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SqlType {
    Bool,
    Int,
    Bigint,
    Float,
    Double,
    String,
    Timestamp,
}

impl SqlType {
    /// Rank used for arithmetic promotion. Non-numeric types have no rank.
    pub fn numeric_rank(self) -> Option<u8> {
        match self {
            SqlType::Int => Some(0),
            SqlType::Bigint => Some(1),
            SqlType::Float => Some(2),
            SqlType::Double => Some(3),
            _ => None,
        }
    }

    pub fn is_numeric(self) -> bool {
        self.numeric_rank().is_some()
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SqlType::Bool => "bool",
            SqlType::Int => "int",
            SqlType::Bigint => "bigint",
            SqlType::Float => "float",
            SqlType::Double => "double",
            SqlType::String => "string",
            SqlType::Timestamp => "timestamp",
        };
        f.write_str(name)
    }
}

/// Runtime value carried by literals and request rows.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i32),
    Bigint(i64),
    Float(f32),
    Double(f64),
    String(String),
    Timestamp(i64),
    Null,
}

impl Value {
    /// Static type of the value; `Null` is untyped.
    pub fn sql_type(&self) -> Option<SqlType> {
        match self {
            Value::Bool(_) => Some(SqlType::Bool),
            Value::Int(_) => Some(SqlType::Int),
            Value::Bigint(_) => Some(SqlType::Bigint),
            Value::Float(_) => Some(SqlType::Float),
            Value::Double(_) => Some(SqlType::Double),
            Value::String(_) => Some(SqlType::String),
            Value::Timestamp(_) => Some(SqlType::Timestamp),
            Value::Null => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Compare two values of the same type. Cross-type comparison is rejected.
    pub fn cmp_same_type(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Bigint(a), Value::Bigint(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Bigint(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::String(s) => write!(f, "\"{s}\""),
            Value::Timestamp(v) => write!(f, "{v}"),
            Value::Null => f.write_str("NULL"),
        }
    }
}
