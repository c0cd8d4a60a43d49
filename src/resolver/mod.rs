//! Derived field resolution
//!
//! Recomputes every derived field of a form until the values stop changing
//! or the pass cap is reached.
//!
//! # Invariants
//!
//! - The input snapshot is never mutated
//! - Derived fields are evaluated in declaration order, and a field sees
//!   updates made earlier in the same pass
//! - At most `max_passes * derived_count` evaluations per call
//! - Hitting the cap is not an error; the last pass wins
//! - Resolving an already resolved snapshot changes nothing

mod comparator;

use std::borrow::Cow;

use tracing::{debug, warn};

use crate::expression::{Clock, EvalContext, Expression, FunctionTable, SystemClock};
use crate::schema::{Field, FieldValue, Snapshot};

pub use comparator::{ComparatorKind, StringCoercion, Structural, ValueComparator};

/// Default cap on resolution passes
pub const DEFAULT_MAX_PASSES: usize = 5;

/// What happened during one resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Passes run
    pub passes: usize,
    /// False when the cap stopped the loop while values were still moving
    pub converged: bool,
    /// Derived fields whose value changed, in first-change order
    pub changed: Vec<String>,
}

/// Fixed-point resolver for derived fields.
pub struct DerivedResolver {
    functions: Cow<'static, FunctionTable>,
    clock: Box<dyn Clock>,
    comparator: Box<dyn ValueComparator>,
    max_passes: usize,
}

impl Default for DerivedResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl DerivedResolver {
    /// Built-in functions, wall clock, string-coercion comparison, 5 passes.
    pub fn new() -> Self {
        Self {
            functions: Cow::Borrowed(FunctionTable::standard()),
            clock: Box::new(SystemClock),
            comparator: Box::new(StringCoercion),
            max_passes: DEFAULT_MAX_PASSES,
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_comparator(mut self, comparator: Box<dyn ValueComparator>) -> Self {
        self.comparator = comparator;
        self
    }

    pub fn with_functions(mut self, functions: FunctionTable) -> Self {
        self.functions = Cow::Owned(functions);
        self
    }

    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    pub fn max_passes(&self) -> usize {
        self.max_passes
    }

    /// Returns a new snapshot with every derived field recomputed.
    pub fn resolve(&self, fields: &[Field], snapshot: &Snapshot) -> Snapshot {
        self.resolve_with_report(fields, snapshot).0
    }

    /// Like [`resolve`](Self::resolve), also reporting passes and changes.
    pub fn resolve_with_report(&self, fields: &[Field], snapshot: &Snapshot) -> (Snapshot, Resolution) {
        let derived: Vec<(&Field, Option<Expression>)> = fields
            .iter()
            .filter(|f| f.is_derived())
            .map(|f| (f, parse_derived(f)))
            .collect();

        let mut ctx = EvalContext::from_snapshot(snapshot, &self.functions, self.clock.as_ref());
        let mut report = Resolution {
            passes: 0,
            converged: true,
            changed: Vec::new(),
        };

        if derived.is_empty() {
            return (ctx.into_variables(), report);
        }

        report.converged = false;
        while report.passes < self.max_passes {
            report.passes += 1;
            let mut pass_changed = false;

            for (field, expression) in &derived {
                let value = match expression {
                    Some(expression) => expression.evaluate(&ctx),
                    None => FieldValue::fallback(),
                };
                if self.comparator.same(ctx.variable(&field.id), &value) {
                    continue;
                }
                pass_changed = true;
                if !report.changed.contains(&field.id) {
                    report.changed.push(field.id.clone());
                }
                ctx.set(field.id.clone(), value);
            }

            if !pass_changed {
                report.converged = true;
                break;
            }
        }

        if !report.converged {
            debug!(
                passes = report.passes,
                comparator = self.comparator.name(),
                "derived fields did not settle before the pass cap"
            );
        }

        (ctx.into_variables(), report)
    }
}

/// Parses once per resolution; a broken expression is reported once and
/// then evaluates to the fallback every pass.
fn parse_derived(field: &Field) -> Option<Expression> {
    let source = field.derived_expression().unwrap_or_default();
    match Expression::parse(source) {
        Ok(expression) => Some(expression),
        Err(err) => {
            warn!(
                field = %field.id,
                expression = %source,
                code = err.code(),
                error = %err,
                "derived expression does not parse, using fallback"
            );
            None
        }
    }
}

/// Resolves with the default resolver.
pub fn resolve(fields: &[Field], snapshot: &Snapshot) -> Snapshot {
    DerivedResolver::new().resolve(fields, snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::FixedClock;
    use crate::schema::{FieldSpec, FieldType};

    fn input(id: &str) -> Field {
        Field::from_spec(id, FieldSpec::new(FieldType::Text, id))
    }

    fn derived(id: &str, parents: &[&str], expression: &str) -> Field {
        Field::from_spec(
            id,
            FieldSpec::new(FieldType::Text, id).with_derived(
                parents.iter().map(|p| p.to_string()).collect(),
                expression,
            ),
        )
    }

    fn values(pairs: &[(&str, FieldValue)]) -> Snapshot {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_no_derived_fields() {
        let fields = vec![input("a")];
        let snapshot = values(&[("a", "x".into())]);
        let (out, report) = DerivedResolver::new().resolve_with_report(&fields, &snapshot);
        assert_eq!(out, snapshot);
        assert_eq!(report.passes, 0);
        assert!(report.converged);
    }

    #[test]
    fn test_chain_settles_within_one_pass_in_order() {
        let fields = vec![
            input("a"),
            derived("b", &["a"], "a * 2"),
            derived("c", &["b"], "b + 1"),
        ];
        let snapshot = values(&[("a", 3i64.into()), ("b", "".into()), ("c", "".into())]);
        let (out, report) = DerivedResolver::new().resolve_with_report(&fields, &snapshot);

        assert_eq!(out["b"], FieldValue::Number(6.0));
        assert_eq!(out["c"], FieldValue::Number(7.0));
        // first pass changes, second confirms
        assert_eq!(report.passes, 2);
        assert!(report.converged);
        assert_eq!(report.changed, vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_reverse_order_needs_extra_pass() {
        let fields = vec![
            derived("c", &["b"], "b + 1"),
            derived("b", &["a"], "a * 2"),
            input("a"),
        ];
        let snapshot = values(&[("a", 3i64.into()), ("b", "".into()), ("c", "".into())]);
        let (out, report) = DerivedResolver::new().resolve_with_report(&fields, &snapshot);
        assert_eq!(out["c"], FieldValue::Number(7.0));
        assert_eq!(report.passes, 3);
    }

    #[test]
    fn test_input_is_not_mutated() {
        let fields = vec![input("a"), derived("b", &["a"], "a + 1")];
        let snapshot = values(&[("a", 1i64.into())]);
        let before = snapshot.clone();
        let _ = resolve(&fields, &snapshot);
        assert_eq!(snapshot, before);
    }

    #[test]
    fn test_cycle_stops_at_cap() {
        let fields = vec![
            derived("x", &["y"], "y + 1"),
            derived("y", &["x"], "x + 1"),
        ];
        let snapshot = values(&[("x", 0i64.into()), ("y", 0i64.into())]);
        let (out, report) = DerivedResolver::new().resolve_with_report(&fields, &snapshot);
        assert_eq!(report.passes, DEFAULT_MAX_PASSES);
        assert!(!report.converged);
        assert_eq!(out["x"], FieldValue::Number(9.0));
        assert_eq!(out["y"], FieldValue::Number(10.0));
    }

    #[test]
    fn test_custom_cap() {
        let fields = vec![derived("x", &["x"], "x + 1")];
        let snapshot = values(&[("x", 0i64.into())]);
        let (out, report) = DerivedResolver::new()
            .with_max_passes(2)
            .resolve_with_report(&fields, &snapshot);
        assert_eq!(report.passes, 2);
        assert_eq!(out["x"], FieldValue::Number(2.0));
    }

    #[test]
    fn test_broken_expression_falls_back_to_zero() {
        let fields = vec![input("a"), derived("b", &["a"], "a +")];
        let snapshot = values(&[("a", 1i64.into()), ("b", "".into())]);
        let out = resolve(&fields, &snapshot);
        assert_eq!(out["b"], FieldValue::Number(0.0));
    }

    #[test]
    fn test_equal_string_forms_are_not_rewritten() {
        let fields = vec![input("a"), derived("b", &["a"], "a")];
        let snapshot = values(&[("a", 5i64.into()), ("b", "5".into())]);
        let (out, report) = DerivedResolver::new().resolve_with_report(&fields, &snapshot);
        assert_eq!(out["b"], FieldValue::from("5"));
        assert!(report.changed.is_empty());

        let (out, report) = DerivedResolver::new()
            .with_comparator(Box::new(Structural))
            .resolve_with_report(&fields, &snapshot);
        assert_eq!(out["b"], FieldValue::Number(5.0));
        assert_eq!(report.changed, vec!["b".to_string()]);
    }

    #[test]
    fn test_age_uses_injected_clock() {
        let fields = vec![input("dob"), derived("age", &["dob"], "dateDiff(dob)")];
        let snapshot = values(&[("dob", "2000-03-10".into()), ("age", "".into())]);
        let out = DerivedResolver::new()
            .with_clock(FixedClock::on_date(2024, 6, 1))
            .resolve(&fields, &snapshot);
        assert_eq!(out["age"], FieldValue::Number(24.0));
    }
}
