//! # Expression Errors

use thiserror::Error;

/// Result type for expression operations
pub type ExpressionResult<T> = Result<T, ExpressionError>;

/// Expression parse and evaluation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    #[error("Syntax error at offset {offset}: unexpected {found}")]
    Syntax { offset: usize, found: String },

    #[error("Expression nested too deeply at offset {offset}")]
    TooDeep { offset: usize },

    #[error("Unknown identifier: {0}")]
    UnknownIdentifier(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("{function} expects {expected} argument(s), got {actual}")]
    Arity {
        function: String,
        expected: String,
        actual: usize,
    },

    #[error("Operator '{operator}' cannot take a {actual} value")]
    TypeMismatch {
        operator: &'static str,
        actual: &'static str,
    },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Invalid date: {0}")]
    InvalidDate(String),
}

impl ExpressionError {
    /// Stable code for logs and CLI output
    pub fn code(&self) -> &'static str {
        match self {
            ExpressionError::Syntax { .. } => "EXPR_SYNTAX",
            ExpressionError::TooDeep { .. } => "EXPR_TOO_DEEP",
            ExpressionError::UnknownIdentifier(_) => "EXPR_UNKNOWN_IDENTIFIER",
            ExpressionError::UnknownFunction(_) => "EXPR_UNKNOWN_FUNCTION",
            ExpressionError::Arity { .. } => "EXPR_ARITY",
            ExpressionError::TypeMismatch { .. } => "EXPR_TYPE_MISMATCH",
            ExpressionError::DivisionByZero => "EXPR_DIVISION_BY_ZERO",
            ExpressionError::InvalidDate(_) => "EXPR_INVALID_DATE",
        }
    }

    /// Whether the expression failed to parse (as opposed to evaluate).
    pub fn is_syntax(&self) -> bool {
        matches!(self, ExpressionError::Syntax { .. })
    }
}
