//! Store Persistence Tests
//!
//! - Saved forms survive a reopen through the JSON file
//! - The file is a JSON array under the fixed storage key
//! - Missing or corrupt files open as an empty list
//! - Deletion is written through
//! - A saved form drives a session end to end

use std::fs;

use formbuilder::expression::FixedClock;
use formbuilder::form::{FormSession, SubmitError};
use formbuilder::resolver::DerivedResolver;
use formbuilder::schema::{DerivedConfig, FieldPatch, FieldSpec, FieldType, FieldValue};
use formbuilder::store::{FormStorage, FormStore, JsonFileStorage};
use formbuilder::validation::RuleSet;
use serde_json::Value;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn open(dir: &TempDir) -> FormStore<JsonFileStorage> {
    FormStore::open_with_clock(
        JsonFileStorage::in_dir(dir.path()),
        FixedClock::from_millis(1_700_000_000_000),
    )
}

/// Saves a signup form: email, password, dob and a derived age.
fn save_signup(store: &mut FormStore<JsonFileStorage>) -> String {
    store
        .add_field_with_id(
            "email",
            FieldSpec::new(FieldType::Text, "Email")
                .with_validations(RuleSet::new().not_empty().email())
                .required(),
        )
        .unwrap();
    store
        .add_field_with_id(
            "password",
            FieldSpec::new(FieldType::Text, "Password")
                .with_validations(RuleSet::new().password(6, true)),
        )
        .unwrap();
    store
        .add_field_with_id("dob", FieldSpec::new(FieldType::Date, "Date of birth"))
        .unwrap();
    store
        .add_field_with_id("age", FieldSpec::new(FieldType::Number, "Age"))
        .unwrap();
    store
        .update_field(
            "age",
            FieldPatch {
                derived: Some(DerivedConfig::new(vec!["dob".into()], "dateDiff(dob)")),
                ..FieldPatch::default()
            },
        )
        .unwrap();

    store.save_draft(Some("Signup")).unwrap().id
}

// =============================================================================
// Round trip
// =============================================================================

#[test]
fn test_saved_forms_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let id = {
        let mut store = open(&dir);
        save_signup(&mut store)
    };

    let store = open(&dir);
    let form = store.find_saved(&id).expect("form reloaded");
    assert_eq!(form.name, "Signup");
    assert_eq!(form.created_at, 1_700_000_000_000);
    assert_eq!(form.fields.len(), 4);
    assert_eq!(form.field("age").unwrap().derived_expression(), Some("dateDiff(dob)"));
    assert!(form.field("email").unwrap().required);
}

/// The document keeps the camelCase shape the browser builder wrote.
#[test]
fn test_file_layout() {
    let dir = TempDir::new().unwrap();
    let mut store = open(&dir);
    save_signup(&mut store);

    let raw = fs::read_to_string(dir.path().join("upliance_forms_v1.json")).unwrap();
    let doc: Value = serde_json::from_str(&raw).unwrap();
    let form = &doc[0];

    assert_eq!(form["name"], "Signup");
    assert!(form["createdAt"].is_i64());
    assert_eq!(form["fields"][0]["type"], "text");
    assert_eq!(form["fields"][0]["validations"]["notEmpty"], true);
    assert_eq!(
        form["fields"][1]["validations"]["passwordRule"]["requireNumber"],
        true
    );
    assert_eq!(form["fields"][3]["derived"]["isDerived"], true);
    assert_eq!(form["fields"][3]["derived"]["parents"][0], "dob");
}

// =============================================================================
// Degraded storage
// =============================================================================

#[test]
fn test_missing_file_opens_empty() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    assert!(store.saved().is_empty());
}

#[test]
fn test_corrupt_file_opens_empty() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("upliance_forms_v1.json"), "[{\"broken\"").unwrap();

    let store = open(&dir);
    assert!(store.saved().is_empty());
}

/// Saving over a corrupt file replaces it with a valid document.
#[test]
fn test_save_repairs_corrupt_file() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("upliance_forms_v1.json"), "garbage").unwrap();

    let mut store = open(&dir);
    let id = save_signup(&mut store);

    let reloaded = JsonFileStorage::in_dir(dir.path()).load().unwrap();
    assert_eq!(reloaded.len(), 1);
    assert_eq!(reloaded[0].id, id);
}

// =============================================================================
// Deletion
// =============================================================================

#[test]
fn test_delete_is_persisted() {
    let dir = TempDir::new().unwrap();
    let mut store = open(&dir);
    let keep = save_signup(&mut store);
    let drop = save_signup(&mut store);
    assert_eq!(store.saved().len(), 2);

    store.delete_saved(&drop).unwrap();

    let store = open(&dir);
    let ids: Vec<&str> = store.saved().iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec![keep.as_str()]);
}

// =============================================================================
// End to end
// =============================================================================

#[test]
fn test_saved_form_drives_session() {
    let dir = TempDir::new().unwrap();
    let mut store = open(&dir);
    let id = save_signup(&mut store);

    let form = open(&dir).find_saved(&id).cloned().unwrap();
    let mut session = FormSession::with_resolver(
        form,
        DerivedResolver::new().with_clock(FixedClock::on_date(2024, 6, 1)),
    );

    assert!(matches!(session.submit(), Err(SubmitError::Invalid { .. })));

    session.set_value("email", "ada@example.com".into()).unwrap();
    session.set_value("password", "abc12".into()).unwrap();
    assert_eq!(
        session.errors_for("password")[0].message,
        "Password must be at least 6 chars"
    );
    assert_eq!(session.errors_for("password").len(), 1);

    session.set_value("password", "abcde1".into()).unwrap();
    session.set_value("dob", "2000-01-15".into()).unwrap();

    let values = session.submit().unwrap();
    assert_eq!(values["age"], FieldValue::Number(24.0));
}
