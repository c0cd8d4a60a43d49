//! Derived-field expression language
//!
//! A small, side-effect free language for computing a field's value from
//! other fields: arithmetic, string concatenation, comparisons, boolean
//! logic, conditionals and a fixed set of built-in functions.
//!
//! # Failure semantics
//!
//! [`evaluate`] never fails. Any parse or evaluation error is logged at
//! `warn` and the result degrades to `Number(0)`. Callers that need the
//! reason use [`try_evaluate`].
//!
//! # Identifiers
//!
//! Every snapshot entry is a variable named by its field id. Ids that are
//! not plain identifiers are written in backticks.

mod ast;
mod context;
mod errors;
mod eval;
mod functions;
mod parser;

use std::collections::BTreeSet;

use tracing::warn;

use crate::schema::FieldValue;

pub use ast::{BinaryOp, Expr, UnaryOp};
pub use context::{Clock, EvalContext, FixedClock, SystemClock};
pub use errors::{ExpressionError, ExpressionResult};
pub use functions::{parse_date_millis, Builtin, FunctionTable, MILLIS_PER_YEAR};

/// A parsed expression together with its source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    ast: Expr,
}

impl Expression {
    pub fn parse(source: &str) -> ExpressionResult<Self> {
        Ok(Self {
            source: source.to_string(),
            ast: parser::parse(source)?,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ast(&self) -> &Expr {
        &self.ast
    }

    /// Variable names the expression reads.
    pub fn references(&self) -> BTreeSet<String> {
        self.ast.variables()
    }

    pub fn try_evaluate(&self, ctx: &EvalContext<'_>) -> ExpressionResult<FieldValue> {
        eval::eval(&self.ast, ctx)
    }

    /// Evaluates, degrading any error to the fallback value.
    pub fn evaluate(&self, ctx: &EvalContext<'_>) -> FieldValue {
        self.try_evaluate(ctx).unwrap_or_else(|err| {
            warn!(
                expression = %self.source,
                code = err.code(),
                error = %err,
                "expression evaluation failed, using fallback"
            );
            FieldValue::fallback()
        })
    }
}

/// Parses and evaluates `source`, returning the error on failure.
pub fn try_evaluate(source: &str, ctx: &EvalContext<'_>) -> ExpressionResult<FieldValue> {
    Expression::parse(source)?.try_evaluate(ctx)
}

/// Parses and evaluates `source`; failures yield `Number(0)`.
pub fn evaluate(source: &str, ctx: &EvalContext<'_>) -> FieldValue {
    try_evaluate(source, ctx).unwrap_or_else(|err| {
        warn!(
            expression = %source,
            code = err.code(),
            error = %err,
            "expression evaluation failed, using fallback"
        );
        FieldValue::fallback()
    })
}
