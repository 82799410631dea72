use crate::{context::ExecutionContext, value::Value};
use std::fmt;
use thiserror::Error as ThisError;

///
/// ValueExpr
///
/// Deferred value expression carried by filter clauses and pagination
/// specs until resolution time.
///
/// This is a small, total interpreter rather than compiled closures:
/// every operand a translated query can defer is representable here,
/// and evaluation needs nothing beyond the execution context's
/// parameter map.
///

#[derive(Clone, Debug, PartialEq)]
pub enum ValueExpr {
    /// Literal value known at translation time.
    Constant(Value),

    /// Named runtime parameter.
    Param(String),

    /// Dotted field access on a structured runtime parameter.
    Field { param: String, path: Vec<String> },

    /// Arithmetic over two sub-expressions.
    Binary {
        op: BinaryOp,
        lhs: Box<Self>,
        rhs: Box<Self>,
    },

    /// Exclusive upper bound of a string-prefix range.
    ///
    /// Evaluates the inner expression to text and appends U+FFFF, so
    /// `starts_with(p)` becomes the native range `[p, p + U+FFFF)`.
    PrefixUpperBound(Box<Self>),
}

impl ValueExpr {
    #[must_use]
    pub fn constant(value: impl Into<Value>) -> Self {
        Self::Constant(value.into())
    }

    #[must_use]
    pub fn param(name: impl Into<String>) -> Self {
        Self::Param(name.into())
    }

    /// True if evaluation needs no runtime parameters.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        match self {
            Self::Constant(_) => true,
            Self::Param(_) | Self::Field { .. } => false,
            Self::Binary { lhs, rhs, .. } => lhs.is_literal() && rhs.is_literal(),
            Self::PrefixUpperBound(inner) => inner.is_literal(),
        }
    }

    /// Evaluate against the execution context's parameters.
    pub fn eval(&self, ctx: &ExecutionContext) -> Result<Value, BindError> {
        match self {
            Self::Constant(value) => Ok(value.clone()),

            Self::Param(name) => ctx.param(name).cloned().ok_or_else(|| BindError::UnboundParameter {
                expr: self.to_string(),
                param: name.clone(),
            }),

            Self::Field { param, path } => {
                let mut current = ctx.param(param).ok_or_else(|| BindError::UnboundParameter {
                    expr: self.to_string(),
                    param: param.clone(),
                })?;

                for part in path {
                    current = match current {
                        Value::Map(entries) => {
                            entries.get(part).ok_or_else(|| BindError::MissingField {
                                expr: self.to_string(),
                                field: part.clone(),
                            })?
                        }
                        other => {
                            return Err(BindError::NotStructured {
                                expr: self.to_string(),
                                found: other.to_string(),
                            });
                        }
                    };
                }

                Ok(current.clone())
            }

            Self::Binary { op, lhs, rhs } => {
                let left = lhs.eval(ctx)?;
                let right = rhs.eval(ctx)?;
                op.apply(&left, &right).ok_or_else(|| BindError::InvalidArithmetic {
                    expr: self.to_string(),
                })
            }

            Self::PrefixUpperBound(inner) => match inner.eval(ctx)? {
                Value::Text(prefix) => Ok(Value::Text(format!("{prefix}\u{ffff}"))),
                other => Err(BindError::NotText {
                    expr: self.to_string(),
                    found: other.to_string(),
                }),
            },
        }
    }
}

impl fmt::Display for ValueExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(value) => write!(f, "{value}"),
            Self::Param(name) => write!(f, "${name}"),
            Self::Field { param, path } => write!(f, "${param}.{}", path.join(".")),
            Self::Binary { op, lhs, rhs } => write!(f, "({lhs} {op} {rhs})"),
            Self::PrefixUpperBound(inner) => write!(f, "prefix_upper({inner})"),
        }
    }
}

///
/// BinaryOp
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    /// Apply over int/double operands with numeric widening.
    /// Non-numeric operands and division by zero yield `None`.
    #[must_use]
    fn apply(self, lhs: &Value, rhs: &Value) -> Option<Value> {
        if let (Value::Int(a), Value::Int(b)) = (lhs, rhs) {
            return match self {
                Self::Add => a.checked_add(*b).map(Value::Int),
                Self::Sub => a.checked_sub(*b).map(Value::Int),
                Self::Mul => a.checked_mul(*b).map(Value::Int),
                Self::Div => a.checked_div(*b).map(Value::Int),
            };
        }

        let a = lhs.as_double()?;
        let b = rhs.as_double()?;
        let out = match self {
            Self::Add => a + b,
            Self::Sub => a - b,
            Self::Mul => a * b,
            Self::Div => {
                if b == 0.0 {
                    return None;
                }
                a / b
            }
        };

        Some(Value::Double(out))
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
        };
        write!(f, "{symbol}")
    }
}

///
/// BindError
///
/// Resolution-time binding failure. Carries the offending
/// expression's description so callers can surface what failed to
/// bind, not just that something did.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum BindError {
    #[error("cannot bind '{expr}': parameter '{param}' is not present in the execution context")]
    UnboundParameter { expr: String, param: String },

    #[error("cannot bind '{expr}': field '{field}' is missing on the parameter value")]
    MissingField { expr: String, field: String },

    #[error("cannot bind '{expr}': expected a structured value, found {found}")]
    NotStructured { expr: String, found: String },

    #[error("cannot bind '{expr}': expected text, found {found}")]
    NotText { expr: String, found: String },

    #[error("cannot bind '{expr}': arithmetic over non-numeric operands")]
    InvalidArithmetic { expr: String },
}
