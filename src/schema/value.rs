//! Field values and their string coercion
//!
//! A value is whatever a form input holds: nothing yet, a bool, a number,
//! free text, or the selected options of a checkbox group.
//!
//! Coercion rules follow the browser's `String(value)`:
//! - empty -> ""
//! - integral numbers print without a fraction ("24", not "24.0")
//! - magnitudes from 1e21 up and below 1e-6 use exponent form ("1e+21", "1e-7")
//! - lists join with ","

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Mapping from field id to current value for one form instance.
pub type Snapshot = BTreeMap<String, FieldValue>;

/// A single field value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// No value (JSON `null`)
    #[default]
    Empty,
    /// Boolean, produced by comparisons and logical operators
    Bool(bool),
    /// 64-bit float
    Number(f64),
    /// Text input, dates, select/radio choices
    Text(String),
    /// Checked options of a checkbox group
    List(Vec<String>),
}

impl FieldValue {
    /// The value an expression degrades to when it cannot be evaluated.
    pub fn fallback() -> Self {
        FieldValue::Number(0.0)
    }

    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Empty => "empty",
            FieldValue::Bool(_) => "bool",
            FieldValue::Number(_) => "number",
            FieldValue::Text(_) => "text",
            FieldValue::List(_) => "list",
        }
    }

    /// Returns the text if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// String form used for display and change detection.
    pub fn coerce_to_string(&self) -> String {
        match self {
            FieldValue::Empty => String::new(),
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Number(n) => format_number(*n),
            FieldValue::Text(s) => s.clone(),
            FieldValue::List(items) => items.join(","),
        }
    }

    /// Numeric view of the value, if it has one.
    ///
    /// Empty and blank text read as 0 so that untouched number inputs take
    /// part in arithmetic.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Empty => Some(0.0),
            FieldValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Some(0.0);
                }
                trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
            }
            FieldValue::List(_) => None,
        }
    }

    /// Browser truthiness: empty, false, 0, NaN and "" are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Empty => false,
            FieldValue::Bool(b) => *b,
            FieldValue::Number(n) => *n != 0.0 && !n.is_nan(),
            FieldValue::Text(s) => !s.is_empty(),
            FieldValue::List(_) => true,
        }
    }
}

/// Formats a number the way a browser prints it.
fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        // covers -0
        "0".to_string()
    } else if n.abs() >= 1e21 || n.abs() < 1e-6 {
        let text = format!("{:e}", n);
        match text.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{}e+{}", mantissa, exponent)
            }
            _ => text,
        }
    } else {
        n.to_string()
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.coerce_to_string())
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Number(n as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        FieldValue::List(items)
    }
}
