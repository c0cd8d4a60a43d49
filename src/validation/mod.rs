//! Validation engine
//!
//! Maps a value and a declarative rule set to an ordered list of
//! violations. Violations are results, not errors: an empty list means the
//! value is valid.

mod rules;
mod validator;

pub use rules::{Rule, RuleKind, RuleSet};
pub use validator::{is_email, validate, validate_fields, Violation};
