//! Field validator
//!
//! Validation semantics:
//! - Every rule is checked; all violations are collected
//! - `notEmpty` applies to any value, via its string form
//! - Length, email and password rules apply to text values only
//! - Lengths count UTF-16 code units, as the browser does
//! - Output order is fixed by rule order, so results are reproducible

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use super::rules::{Rule, RuleKind, RuleSet};
use crate::schema::{Field, FieldValue, Snapshot};

static EMAIL_PATTERN: OnceLock<Regex> = OnceLock::new();

fn email_pattern() -> &'static Regex {
    EMAIL_PATTERN.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
    })
}

/// A single rule violation, shown to the user next to the field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Which check failed
    pub rule: RuleKind,
    /// Human-readable message
    pub message: String,
}

impl Violation {
    fn new(rule: RuleKind, message: impl Into<String>) -> Self {
        Self {
            rule,
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Returns true if the text looks like an email address.
///
/// One `@`, no whitespace, and a dot somewhere after the `@`.
pub fn is_email(text: &str) -> bool {
    email_pattern().is_match(text)
}

/// Validates a value against a rule set.
///
/// `None` stands for a value that was never set.
pub fn validate(value: Option<&FieldValue>, rules: &RuleSet) -> Vec<Violation> {
    let mut violations = Vec::new();

    for rule in rules.iter() {
        match rule {
            Rule::NotEmpty => {
                if is_blank(value) {
                    violations.push(Violation::new(
                        RuleKind::NotEmpty,
                        "This field is required",
                    ));
                }
            }
            Rule::MinLength(min) => {
                if let Some(text) = text_of(value) {
                    if utf16_len(text) < *min {
                        violations.push(Violation::new(
                            RuleKind::MinLength,
                            format!("Minimum length is {}", min),
                        ));
                    }
                }
            }
            Rule::MaxLength(max) => {
                if let Some(text) = text_of(value) {
                    if utf16_len(text) > *max {
                        violations.push(Violation::new(
                            RuleKind::MaxLength,
                            format!("Maximum length is {}", max),
                        ));
                    }
                }
            }
            Rule::Email => {
                if let Some(text) = text_of(value) {
                    if !is_email(text) {
                        violations.push(Violation::new(RuleKind::Email, "Invalid email"));
                    }
                }
            }
            Rule::Password {
                min_length,
                require_number,
            } => {
                if let Some(text) = text_of(value) {
                    if utf16_len(text) < *min_length {
                        violations.push(Violation::new(
                            RuleKind::PasswordLength,
                            format!("Password must be at least {} chars", min_length),
                        ));
                    }
                    if *require_number && !text.chars().any(|c| c.is_ascii_digit()) {
                        violations.push(Violation::new(
                            RuleKind::PasswordNumber,
                            "Password must contain at least one number",
                        ));
                    }
                }
            }
        }
    }

    violations
}

/// Validates every field of a form against the current values.
///
/// Only fields with at least one violation appear in the result.
pub fn validate_fields(fields: &[Field], values: &Snapshot) -> BTreeMap<String, Vec<Violation>> {
    fields
        .iter()
        .filter_map(|field| {
            let violations = validate(values.get(&field.id), &field.validations);
            if violations.is_empty() {
                None
            } else {
                Some((field.id.clone(), violations))
            }
        })
        .collect()
}

fn is_blank(value: Option<&FieldValue>) -> bool {
    match value {
        None | Some(FieldValue::Empty) => true,
        Some(v) => v.coerce_to_string().trim().is_empty(),
    }
}

fn text_of(value: Option<&FieldValue>) -> Option<&str> {
    value.and_then(FieldValue::as_text)
}

fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}
