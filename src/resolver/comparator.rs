//! Change detection between resolver passes

use serde::{Deserialize, Serialize};

use crate::schema::FieldValue;

/// Decides whether a recomputed value counts as a change.
pub trait ValueComparator {
    /// `current` is `None` when the snapshot has no entry for the field.
    fn same(&self, current: Option<&FieldValue>, next: &FieldValue) -> bool;

    fn name(&self) -> &'static str;
}

/// Compares the browser string forms; a missing value reads as `""`.
///
/// `0` and `"0"` are the same, as are `[]` and `""`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringCoercion;

impl ValueComparator for StringCoercion {
    fn same(&self, current: Option<&FieldValue>, next: &FieldValue) -> bool {
        let current = current.map(FieldValue::coerce_to_string).unwrap_or_default();
        current == next.coerce_to_string()
    }

    fn name(&self) -> &'static str {
        "string"
    }
}

/// Typed equality. A missing value equals only `Empty`; NaN equals NaN.
#[derive(Debug, Clone, Copy, Default)]
pub struct Structural;

impl ValueComparator for Structural {
    fn same(&self, current: Option<&FieldValue>, next: &FieldValue) -> bool {
        match (current.unwrap_or(&FieldValue::Empty), next) {
            (FieldValue::Number(a), FieldValue::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (a, b) => a == b,
        }
    }

    fn name(&self) -> &'static str {
        "structural"
    }
}

/// Comparator selection as written in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparatorKind {
    #[default]
    String,
    Structural,
}

impl ComparatorKind {
    pub fn build(self) -> Box<dyn ValueComparator> {
        match self {
            ComparatorKind::String => Box::new(StringCoercion),
            ComparatorKind::Structural => Box::new(Structural),
        }
    }
}
