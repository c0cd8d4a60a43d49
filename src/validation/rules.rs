//! Declarative validation rules
//!
//! Rules are stored as an explicit list of tagged variants. On the wire they
//! keep the object shape the builder emits:
//!
//! ```json
//! { "notEmpty": true, "minLength": 3, "maxLength": 20, "email": true,
//!   "passwordRule": { "minLength": 8, "requireNumber": true } }
//! ```
//!
//! Unknown keys are ignored. A zero `minLength`/`maxLength` means "not set".

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single validation rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// Value must be present and not blank
    NotEmpty,
    /// Text must have at least this many characters
    MinLength(usize),
    /// Text must have at most this many characters
    MaxLength(usize),
    /// Text must look like an email address
    Email,
    /// Password strength
    Password {
        min_length: usize,
        require_number: bool,
    },
}

impl Rule {
    /// Evaluation order of the rule within a set.
    fn rank(&self) -> u8 {
        match self {
            Rule::NotEmpty => 0,
            Rule::MinLength(_) => 1,
            Rule::MaxLength(_) => 2,
            Rule::Email => 3,
            Rule::Password { .. } => 4,
        }
    }
}

/// Identifies which check produced a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    NotEmpty,
    MinLength,
    MaxLength,
    Email,
    PasswordLength,
    PasswordNumber,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::NotEmpty => "not_empty",
            RuleKind::MinLength => "min_length",
            RuleKind::MaxLength => "max_length",
            RuleKind::Email => "email",
            RuleKind::PasswordLength => "password_length",
            RuleKind::PasswordNumber => "password_number",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered set of rules, at most one per rule type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RuleSpec", into = "RuleSpec")]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Creates an empty rule set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule, replacing any rule of the same type.
    pub fn with(mut self, rule: Rule) -> Self {
        self.rules.retain(|r| r.rank() != rule.rank());
        self.rules.push(rule);
        self.rules.sort_by_key(Rule::rank);
        self
    }

    pub fn not_empty(self) -> Self {
        self.with(Rule::NotEmpty)
    }

    pub fn min_length(self, n: usize) -> Self {
        self.with(Rule::MinLength(n))
    }

    pub fn max_length(self, n: usize) -> Self {
        self.with(Rule::MaxLength(n))
    }

    pub fn email(self) -> Self {
        self.with(Rule::Email)
    }

    pub fn password(self, min_length: usize, require_number: bool) -> Self {
        self.with(Rule::Password {
            min_length,
            require_number,
        })
    }

    /// Rules in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }
}

/// Object shape of a rule set as persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RuleSpec {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    not_empty: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    email: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password_rule: Option<PasswordSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordSpec {
    #[serde(default)]
    min_length: usize,
    #[serde(default)]
    require_number: bool,
}

impl From<RuleSpec> for RuleSet {
    fn from(spec: RuleSpec) -> Self {
        let mut set = RuleSet::new();
        if spec.not_empty {
            set = set.not_empty();
        }
        if let Some(n) = spec.min_length.filter(|n| *n > 0) {
            set = set.min_length(n);
        }
        if let Some(n) = spec.max_length.filter(|n| *n > 0) {
            set = set.max_length(n);
        }
        if spec.email {
            set = set.email();
        }
        if let Some(p) = spec.password_rule {
            set = set.password(p.min_length, p.require_number);
        }
        set
    }
}

impl From<RuleSet> for RuleSpec {
    fn from(set: RuleSet) -> Self {
        let mut spec = RuleSpec::default();
        for rule in set.rules {
            match rule {
                Rule::NotEmpty => spec.not_empty = true,
                Rule::MinLength(n) => spec.min_length = Some(n),
                Rule::MaxLength(n) => spec.max_length = Some(n),
                Rule::Email => spec.email = true,
                Rule::Password {
                    min_length,
                    require_number,
                } => {
                    spec.password_rule = Some(PasswordSpec {
                        min_length,
                        require_number,
                    })
                }
            }
        }
        spec
    }
}
