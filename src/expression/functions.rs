//! Built-in functions
//!
//! - `dateDiff(dob)`: whole years between `dob` and now, 0 when `dob` is falsy
//! - `now()`: epoch milliseconds from the context clock
//! - `abs`, `floor`, `ceil`, `round`, `sqrt`: one numeric argument
//! - `min`, `max`: one or more numeric arguments
//! - `length(x)`: length of `x` as a string
//! - `if(cond, a, b)`: arguments are evaluated eagerly

use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::context::Clock;
use super::errors::{ExpressionError, ExpressionResult};
use crate::schema::FieldValue;

/// Signature of a built-in function
pub type Builtin = fn(&[FieldValue], &dyn Clock) -> ExpressionResult<FieldValue>;

/// Milliseconds in a 365.25-day year
pub const MILLIS_PER_YEAR: f64 = 365.25 * 24.0 * 3600.0 * 1000.0;

/// Named functions callable from expressions
#[derive(Clone, Default)]
pub struct FunctionTable {
    functions: HashMap<String, Builtin>,
}

impl FunctionTable {
    /// Table with no functions
    pub fn empty() -> Self {
        Self::default()
    }

    /// Shared table with every built-in.
    pub fn standard() -> &'static FunctionTable {
        static STANDARD: OnceLock<FunctionTable> = OnceLock::new();
        STANDARD.get_or_init(Self::with_builtins)
    }

    /// Owned copy of the built-in table, for callers that register extras.
    pub fn with_builtins() -> Self {
        let mut table = Self::empty();
        table.register("dateDiff", date_diff);
        table.register("now", now);
        table.register("abs", abs);
        table.register("floor", floor);
        table.register("ceil", ceil);
        table.register("round", round);
        table.register("sqrt", sqrt);
        table.register("min", min);
        table.register("max", max);
        table.register("length", length);
        table.register("if", if_else);
        table
    }

    /// Registers or replaces a function.
    pub fn register(&mut self, name: impl Into<String>, function: Builtin) {
        self.functions.insert(name.into(), function);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn call(
        &self,
        name: &str,
        args: &[FieldValue],
        clock: &dyn Clock,
    ) -> ExpressionResult<FieldValue> {
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| ExpressionError::UnknownFunction(name.to_string()))?;
        function(args, clock)
    }
}

impl std::fmt::Debug for FunctionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.functions.keys().collect();
        names.sort();
        f.debug_struct("FunctionTable").field("functions", &names).finish()
    }
}

// ============================================================================
// Argument helpers
// ============================================================================

fn expect_arity(
    function: &str,
    args: &[FieldValue],
    accepted: std::ops::RangeInclusive<usize>,
) -> ExpressionResult<()> {
    if accepted.contains(&args.len()) {
        return Ok(());
    }
    let expected = if accepted.start() == accepted.end() {
        accepted.start().to_string()
    } else if *accepted.end() == usize::MAX {
        format!("at least {}", accepted.start())
    } else {
        format!("{} or {}", accepted.start(), accepted.end())
    };
    Err(ExpressionError::Arity {
        function: function.to_string(),
        expected,
        actual: args.len(),
    })
}

fn number_arg(function: &'static str, value: &FieldValue) -> ExpressionResult<f64> {
    value.as_number().ok_or(ExpressionError::TypeMismatch {
        operator: function,
        actual: value.type_name(),
    })
}

fn unary_math(
    function: &'static str,
    args: &[FieldValue],
    op: fn(f64) -> f64,
) -> ExpressionResult<FieldValue> {
    expect_arity(function, args, 1..=1)?;
    Ok(FieldValue::Number(op(number_arg(function, &args[0])?)))
}

// ============================================================================
// Built-ins
// ============================================================================

fn date_diff(args: &[FieldValue], clock: &dyn Clock) -> ExpressionResult<FieldValue> {
    expect_arity("dateDiff", args, 0..=1)?;
    let dob = match args.first() {
        Some(value) if value.is_truthy() => value,
        _ => return Ok(FieldValue::Number(0.0)),
    };

    let dob_millis = match dob {
        FieldValue::Number(n) => *n,
        FieldValue::Text(text) => parse_date_millis(text)
            .ok_or_else(|| ExpressionError::InvalidDate(text.clone()))? as f64,
        other => {
            return Err(ExpressionError::TypeMismatch {
                operator: "dateDiff",
                actual: other.type_name(),
            })
        }
    };

    let elapsed = clock.now_millis() as f64 - dob_millis;
    Ok(FieldValue::Number((elapsed / MILLIS_PER_YEAR).floor()))
}

/// Accepts `YYYY-MM-DD` (UTC midnight), RFC 3339, or a naive date-time
/// read as UTC.
pub fn parse_date_millis(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|midnight| midnight.and_utc().timestamp_millis());
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Some(instant.timestamp_millis());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc().timestamp_millis())
}

fn now(args: &[FieldValue], clock: &dyn Clock) -> ExpressionResult<FieldValue> {
    expect_arity("now", args, 0..=0)?;
    Ok(FieldValue::Number(clock.now_millis() as f64))
}

fn abs(args: &[FieldValue], _: &dyn Clock) -> ExpressionResult<FieldValue> {
    unary_math("abs", args, f64::abs)
}

fn floor(args: &[FieldValue], _: &dyn Clock) -> ExpressionResult<FieldValue> {
    unary_math("floor", args, f64::floor)
}

fn ceil(args: &[FieldValue], _: &dyn Clock) -> ExpressionResult<FieldValue> {
    unary_math("ceil", args, f64::ceil)
}

fn round(args: &[FieldValue], _: &dyn Clock) -> ExpressionResult<FieldValue> {
    // halves round toward positive infinity
    unary_math("round", args, |n| (n + 0.5).floor())
}

fn sqrt(args: &[FieldValue], _: &dyn Clock) -> ExpressionResult<FieldValue> {
    unary_math("sqrt", args, f64::sqrt)
}

fn min(args: &[FieldValue], _: &dyn Clock) -> ExpressionResult<FieldValue> {
    fold_numbers("min", args, f64::min)
}

fn max(args: &[FieldValue], _: &dyn Clock) -> ExpressionResult<FieldValue> {
    fold_numbers("max", args, f64::max)
}

fn fold_numbers(
    function: &'static str,
    args: &[FieldValue],
    op: fn(f64, f64) -> f64,
) -> ExpressionResult<FieldValue> {
    expect_arity(function, args, 1..=usize::MAX)?;
    let mut acc = number_arg(function, &args[0])?;
    for arg in &args[1..] {
        acc = op(acc, number_arg(function, arg)?);
    }
    Ok(FieldValue::Number(acc))
}

fn length(args: &[FieldValue], _: &dyn Clock) -> ExpressionResult<FieldValue> {
    expect_arity("length", args, 1..=1)?;
    let len = args[0].coerce_to_string().encode_utf16().count();
    Ok(FieldValue::Number(len as f64))
}

fn if_else(args: &[FieldValue], _: &dyn Clock) -> ExpressionResult<FieldValue> {
    expect_arity("if", args, 3..=3)?;
    let chosen = if args[0].is_truthy() { &args[1] } else { &args[2] };
    Ok(chosen.clone())
}
