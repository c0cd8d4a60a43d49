//! Tree-walking evaluator

use std::cmp::Ordering;

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::context::EvalContext;
use super::errors::{ExpressionError, ExpressionResult};
use crate::schema::FieldValue;

/// Evaluates a parsed expression. Pure: the context is only read.
pub fn eval(expr: &Expr, ctx: &EvalContext<'_>) -> ExpressionResult<FieldValue> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),

        Expr::Variable(name) => ctx
            .variable(name)
            .cloned()
            .ok_or_else(|| ExpressionError::UnknownIdentifier(name.clone())),

        Expr::Call { name, args } => {
            if !ctx.functions().contains(name) {
                return Err(ExpressionError::UnknownFunction(name.clone()));
            }
            let values = args
                .iter()
                .map(|arg| eval(arg, ctx))
                .collect::<ExpressionResult<Vec<_>>>()?;
            ctx.functions().call(name, &values, ctx.clock())
        }

        Expr::Unary { op, operand } => {
            let value = eval(operand, ctx)?;
            match op {
                UnaryOp::Not => Ok(FieldValue::Bool(!value.is_truthy())),
                UnaryOp::Negate => Ok(FieldValue::Number(-numeric(op.as_str(), &value)?)),
                UnaryOp::Plus => Ok(FieldValue::Number(numeric(op.as_str(), &value)?)),
            }
        }

        Expr::Binary { op, left, right } => match op {
            BinaryOp::And => {
                let result = eval(left, ctx)?.is_truthy() && eval(right, ctx)?.is_truthy();
                Ok(FieldValue::Bool(result))
            }
            BinaryOp::Or => {
                let result = eval(left, ctx)?.is_truthy() || eval(right, ctx)?.is_truthy();
                Ok(FieldValue::Bool(result))
            }
            _ => {
                let left = eval(left, ctx)?;
                let right = eval(right, ctx)?;
                apply_binary(*op, &left, &right)
            }
        },

        Expr::Conditional {
            condition,
            then_branch,
            else_branch,
        } => {
            if eval(condition, ctx)?.is_truthy() {
                eval(then_branch, ctx)
            } else {
                eval(else_branch, ctx)
            }
        }
    }
}

fn apply_binary(op: BinaryOp, left: &FieldValue, right: &FieldValue) -> ExpressionResult<FieldValue> {
    let operator = op.as_str();
    let value = match op {
        BinaryOp::Eq => FieldValue::Bool(loosely_equal(left, right)),
        BinaryOp::NotEq => FieldValue::Bool(!loosely_equal(left, right)),
        BinaryOp::Lt => FieldValue::Bool(compare(left, right) == Some(Ordering::Less)),
        BinaryOp::LtEq => FieldValue::Bool(matches!(
            compare(left, right),
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinaryOp::Gt => FieldValue::Bool(compare(left, right) == Some(Ordering::Greater)),
        BinaryOp::GtEq => FieldValue::Bool(matches!(
            compare(left, right),
            Some(Ordering::Greater | Ordering::Equal)
        )),

        BinaryOp::Concat => concat(left, right),
        BinaryOp::Add => match (addend(left), addend(right)) {
            (Some(a), Some(b)) => FieldValue::Number(a + b),
            _ => concat(left, right),
        },

        BinaryOp::Sub => FieldValue::Number(numeric(operator, left)? - numeric(operator, right)?),
        BinaryOp::Mul => FieldValue::Number(numeric(operator, left)? * numeric(operator, right)?),
        BinaryOp::Div | BinaryOp::Rem => {
            let dividend = numeric(operator, left)?;
            let divisor = numeric(operator, right)?;
            if divisor == 0.0 {
                return Err(ExpressionError::DivisionByZero);
            }
            if op == BinaryOp::Div {
                FieldValue::Number(dividend / divisor)
            } else {
                FieldValue::Number(dividend % divisor)
            }
        }
        BinaryOp::Pow => {
            FieldValue::Number(numeric(operator, left)?.powf(numeric(operator, right)?))
        }

        // `eval` short-circuits these before both sides are known
        BinaryOp::And => FieldValue::Bool(left.is_truthy() && right.is_truthy()),
        BinaryOp::Or => FieldValue::Bool(left.is_truthy() || right.is_truthy()),
    };
    Ok(value)
}

fn numeric(operator: &'static str, value: &FieldValue) -> ExpressionResult<f64> {
    value.as_number().ok_or(ExpressionError::TypeMismatch {
        operator,
        actual: value.type_name(),
    })
}

/// Numeric view for `+`. Text counts only when it is a bare number, so
/// `first + " " + last` keeps its spaces and `"10 " + "20"` stays text.
fn addend(value: &FieldValue) -> Option<f64> {
    match value {
        FieldValue::Text(s) if s.is_empty() || s.trim() != s => None,
        other => other.as_number(),
    }
}

fn concat(left: &FieldValue, right: &FieldValue) -> FieldValue {
    let mut text = left.coerce_to_string();
    text.push_str(&right.coerce_to_string());
    FieldValue::Text(text)
}

/// Numeric when both sides are numbers, otherwise by coerced string.
fn compare(left: &FieldValue, right: &FieldValue) -> Option<Ordering> {
    match (left.as_number(), right.as_number()) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ => Some(left.coerce_to_string().cmp(&right.coerce_to_string())),
    }
}

fn loosely_equal(left: &FieldValue, right: &FieldValue) -> bool {
    compare(left, right) == Some(Ordering::Equal)
}
