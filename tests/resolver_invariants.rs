//! Resolver Invariant Tests
//!
//! - Resolution is idempotent once values have settled
//! - Cyclic definitions terminate at the pass cap
//! - The input snapshot is never mutated
//! - Later fields in a pass see earlier updates
//! - Change detection compares string forms by default

use formbuilder::expression::FixedClock;
use formbuilder::resolver::{DerivedResolver, Structural, DEFAULT_MAX_PASSES};
use formbuilder::schema::{Field, FieldSpec, FieldType, FieldValue, FormSchema, Snapshot};
use serde_json::json;

// =============================================================================
// Helper Functions
// =============================================================================

fn input(id: &str, field_type: FieldType) -> Field {
    Field::from_spec(id, FieldSpec::new(field_type, id))
}

fn derived(id: &str, parents: &[&str], expression: &str) -> Field {
    Field::from_spec(
        id,
        FieldSpec::new(FieldType::Text, id)
            .with_derived(parents.iter().map(|p| p.to_string()).collect(), expression),
    )
}

fn snapshot(value: serde_json::Value) -> Snapshot {
    serde_json::from_value(value).unwrap()
}

fn resolver_in_2024() -> DerivedResolver {
    DerivedResolver::new().with_clock(FixedClock::on_date(2024, 6, 1))
}

fn profile_fields() -> Vec<Field> {
    vec![
        input("first", FieldType::Text),
        input("last", FieldType::Text),
        input("dob", FieldType::Date),
        derived("full", &["first", "last"], "first + \" \" + last"),
        derived("age", &["dob"], "dateDiff(dob)"),
        derived("adult", &["age"], "age >= 18 ? 'yes' : 'no'"),
    ]
}

// =============================================================================
// Idempotence
// =============================================================================

/// Resolving a resolved snapshot returns it unchanged.
#[test]
fn test_resolution_is_idempotent() {
    let fields = profile_fields();
    let start = snapshot(json!({
        "first": "Ada",
        "last": "Lovelace",
        "dob": "2000-01-15",
        "full": "",
        "age": "",
        "adult": ""
    }));
    let resolver = resolver_in_2024();

    let once = resolver.resolve(&fields, &start);
    let (twice, report) = resolver.resolve_with_report(&fields, &once);

    assert_eq!(once, twice);
    assert_eq!(report.passes, 1);
    assert!(report.converged);
    assert!(report.changed.is_empty());
}

/// The canonical profile derivations.
#[test]
fn test_profile_values() {
    let fields = profile_fields();
    let start = snapshot(json!({
        "first": "Ada",
        "last": "Lovelace",
        "dob": "2000-01-15"
    }));
    let out = resolver_in_2024().resolve(&fields, &start);

    assert_eq!(out["full"], FieldValue::from("Ada Lovelace"));
    assert_eq!(out["age"], FieldValue::Number(24.0));
    assert_eq!(out["adult"], FieldValue::from("yes"));
}

/// Numeric-looking name parts are joined, not summed.
#[test]
fn test_full_name_from_numeric_parts() {
    let fields = profile_fields();
    let out = resolver_in_2024().resolve(&fields, &snapshot(json!({"first": "10", "last": "20"})));
    assert_eq!(out["full"], FieldValue::from("10 20"));
}

/// A pathologically nested expression falls back to 0 like any other failure.
#[test]
fn test_deeply_nested_expression_falls_back() {
    let nested = format!("{}n{}", "(".repeat(500), ")".repeat(500));
    let fields = vec![input("n", FieldType::Number), derived("d", &["n"], &nested)];
    let out = DerivedResolver::new().resolve(&fields, &snapshot(json!({"n": 7})));
    assert_eq!(out["d"], FieldValue::Number(0.0));
}

/// A missing date of birth yields age 0, not an error.
#[test]
fn test_missing_dob_is_zero() {
    let fields = profile_fields();
    let out = resolver_in_2024().resolve(&fields, &snapshot(json!({"dob": ""})));
    assert_eq!(out["age"], FieldValue::Number(0.0));
    assert_eq!(out["adult"], FieldValue::from("no"));
}

// =============================================================================
// Termination
// =============================================================================

/// Mutually dependent fields stop after the cap instead of looping.
#[test]
fn test_cycle_terminates_at_cap() {
    let fields = vec![derived("a", &["b"], "b + 1"), derived("b", &["a"], "a + 1")];
    let start = snapshot(json!({"a": 0, "b": 0}));

    let (out, report) = DerivedResolver::new().resolve_with_report(&fields, &start);

    assert_eq!(report.passes, DEFAULT_MAX_PASSES);
    assert!(!report.converged);
    assert!(out.contains_key("a") && out.contains_key("b"));
}

/// A self-referencing field that flips forever is also capped.
#[test]
fn test_oscillation_terminates() {
    let fields = vec![derived("t", &["t"], "t == 'x' ? 'y' : 'x'")];
    let (out, report) = DerivedResolver::new()
        .with_max_passes(3)
        .resolve_with_report(&fields, &snapshot(json!({"t": ""})));

    assert_eq!(report.passes, 3);
    assert_eq!(out["t"], FieldValue::from("x"));
}

/// The store's cycle check and the runtime cap agree on what a cycle is.
#[test]
fn test_schema_cycle_detection() {
    let mut schema = FormSchema::new("Loop", 0);
    schema.fields = vec![derived("a", &["b"], "b + 1"), derived("b", &["a"], "a + 1")];
    assert!(schema.dependency_cycle().is_some());
}

// =============================================================================
// Purity and ordering
// =============================================================================

/// The caller's snapshot is untouched.
#[test]
fn test_input_snapshot_unchanged() {
    let fields = profile_fields();
    let start = snapshot(json!({"first": "Ada", "last": "Lovelace"}));
    let copy = start.clone();
    let _ = DerivedResolver::new().resolve(&fields, &start);
    assert_eq!(start, copy);
}

/// Unrelated entries pass through untouched.
#[test]
fn test_non_derived_values_pass_through() {
    let fields = vec![input("n", FieldType::Number), derived("d", &["n"], "n * 2")];
    let start = snapshot(json!({"n": "21", "extra": ["a", "b"]}));
    let out = DerivedResolver::new().resolve(&fields, &start);

    assert_eq!(out["n"], FieldValue::from("21"));
    assert_eq!(out["d"], FieldValue::Number(42.0));
    assert_eq!(out["extra"], FieldValue::List(vec!["a".into(), "b".into()]));
}

// =============================================================================
// Change detection
// =============================================================================

/// `0` and `"0"` are the same value for change detection.
#[test]
fn test_string_coercion_equality() {
    let fields = vec![derived("z", &["z"], "0")];
    let (out, report) = DerivedResolver::new()
        .resolve_with_report(&fields, &snapshot(json!({"z": "0"})));
    assert!(report.changed.is_empty());
    assert_eq!(out["z"], FieldValue::from("0"));

    let (out, report) = DerivedResolver::new()
        .with_comparator(Box::new(Structural))
        .resolve_with_report(&fields, &snapshot(json!({"z": "0"})));
    assert_eq!(report.changed, vec!["z".to_string()]);
    assert_eq!(out["z"], FieldValue::Number(0.0));
}
