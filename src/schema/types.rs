//! Form schema type definitions
//!
//! Supported field types:
//! - text, textarea, date: free text
//! - number: numeric text
//! - select, radio: one of `options`
//! - checkbox: any subset of `options`
//!
//! JSON field names are camelCase so saved forms stay readable by the
//! browser builder.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value::{FieldValue, Snapshot};
use crate::validation::RuleSet;

/// Supported field types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Textarea,
    Select,
    Radio,
    Checkbox,
    Date,
}

impl FieldType {
    /// Every field type, in palette order.
    pub const ALL: [FieldType; 7] = [
        FieldType::Text,
        FieldType::Number,
        FieldType::Textarea,
        FieldType::Select,
        FieldType::Radio,
        FieldType::Checkbox,
        FieldType::Date,
    ];

    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Textarea => "textarea",
            FieldType::Select => "select",
            FieldType::Radio => "radio",
            FieldType::Checkbox => "checkbox",
            FieldType::Date => "date",
        }
    }

    /// Whether this type picks from a list of options.
    pub fn has_options(&self) -> bool {
        matches!(self, FieldType::Select | FieldType::Radio | FieldType::Checkbox)
    }

    /// Value of a fresh input of this type with no default.
    pub fn blank_value(&self) -> FieldValue {
        match self {
            FieldType::Checkbox => FieldValue::List(Vec::new()),
            _ => FieldValue::Text(String::new()),
        }
    }
}

/// Derived-value configuration of a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedConfig {
    /// Whether the value is computed rather than entered
    pub is_derived: bool,
    /// Fields the expression depends on (for display and self-reference checks)
    #[serde(default)]
    pub parents: Vec<String>,
    /// Expression computing the value
    #[serde(default)]
    pub expression: String,
}

impl DerivedConfig {
    pub fn new(parents: Vec<String>, expression: impl Into<String>) -> Self {
        Self {
            is_derived: true,
            parents,
            expression: expression.into(),
        }
    }
}

/// Everything about a field except its identifier.
///
/// Used when adding a field to a draft; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "RuleSet::is_empty")]
    pub validations: RuleSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived: Option<DerivedConfig>,
}

impl FieldSpec {
    /// Creates a spec with only a type and label set.
    pub fn new(field_type: FieldType, label: impl Into<String>) -> Self {
        Self {
            field_type,
            label: label.into(),
            required: false,
            default_value: None,
            options: None,
            validations: RuleSet::new(),
            derived: None,
        }
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = Some(options.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_default(mut self, value: impl Into<FieldValue>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_validations(mut self, validations: RuleSet) -> Self {
        self.validations = validations;
        self
    }

    pub fn with_derived(mut self, parents: Vec<String>, expression: impl Into<String>) -> Self {
        self.derived = Some(DerivedConfig::new(parents, expression));
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Partial update of a field. Unset members leave the field unchanged.
///
/// The field type cannot be changed after creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validations: Option<RuleSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived: Option<DerivedConfig>,
}

/// One form element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    /// Unique, immutable identifier
    pub id: String,
    /// Field type, fixed at creation
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Display label
    pub label: String,
    /// Advisory flag; does not add a validation rule
    #[serde(default)]
    pub required: bool,
    /// Seed value for a new form instance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<FieldValue>,
    /// Choices for select, radio and checkbox fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    /// Validation rules
    #[serde(default, skip_serializing_if = "RuleSet::is_empty")]
    pub validations: RuleSet,
    /// Derived-value configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived: Option<DerivedConfig>,
}

impl Field {
    /// Builds a field from a spec, dropping options the type does not use.
    pub fn from_spec(id: impl Into<String>, spec: FieldSpec) -> Self {
        let options = if spec.field_type.has_options() {
            spec.options
        } else {
            None
        };
        Self {
            id: id.into(),
            field_type: spec.field_type,
            label: spec.label,
            required: spec.required,
            default_value: spec.default_value,
            options,
            validations: spec.validations,
            derived: spec.derived,
        }
    }

    /// Returns a copy with the patch applied.
    pub fn patched(&self, patch: FieldPatch) -> Self {
        let mut field = self.clone();
        if let Some(label) = patch.label {
            field.label = label;
        }
        if let Some(required) = patch.required {
            field.required = required;
        }
        if let Some(default_value) = patch.default_value {
            field.default_value = Some(default_value);
        }
        if let Some(options) = patch.options {
            field.options = field.field_type.has_options().then_some(options);
        }
        if let Some(validations) = patch.validations {
            field.validations = validations;
        }
        if let Some(derived) = patch.derived {
            field.derived = derived.is_derived.then_some(derived);
        }
        field
    }

    /// Whether the value is computed from an expression.
    pub fn is_derived(&self) -> bool {
        self.derived.as_ref().is_some_and(|d| d.is_derived)
    }

    /// The derived expression, if this field is derived.
    pub fn derived_expression(&self) -> Option<&str> {
        self.derived
            .as_ref()
            .filter(|d| d.is_derived)
            .map(|d| d.expression.as_str())
    }

    /// Declared parents, empty for non-derived fields.
    pub fn parents(&self) -> &[String] {
        match &self.derived {
            Some(d) if d.is_derived => &d.parents,
            _ => &[],
        }
    }

    /// Value a new form instance starts with.
    pub fn initial_value(&self) -> FieldValue {
        self.default_value
            .clone()
            .unwrap_or_else(|| self.field_type.blank_value())
    }

    /// Checks the field definition as the builder enforces it on save.
    ///
    /// `siblings` are the other fields of the same form.
    pub fn check_definition(&self, siblings: &[Field]) -> Result<(), String> {
        if self.label.trim().is_empty() {
            return Err("Label is required".into());
        }

        if self.field_type.has_options() && self.options.as_ref().map_or(true, Vec::is_empty) {
            return Err(format!(
                "Options required for {} fields",
                self.field_type.type_name()
            ));
        }

        if let Some(derived) = self.derived.as_ref().filter(|d| d.is_derived) {
            if derived.parents.is_empty() {
                return Err("Please select at least one parent field".into());
            }
            if derived.expression.trim().is_empty() {
                return Err("Expression is required for derived field".into());
            }
            for parent in &derived.parents {
                if parent == &self.id {
                    return Err("A field cannot be its own parent".into());
                }
                if !siblings.iter().any(|f| &f.id == parent) {
                    return Err(format!("Unknown parent field '{}'", parent));
                }
            }
        }

        Ok(())
    }
}

/// A named, timestamped, ordered sequence of fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSchema {
    /// Unique schema identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Creation (or save) time, epoch milliseconds
    pub created_at: i64,
    /// Fields in display order
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl FormSchema {
    /// Name given to a fresh draft.
    pub const UNTITLED: &'static str = "Untitled";

    /// Creates an empty schema with a fresh identifier.
    pub fn new(name: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            created_at,
            fields: Vec::new(),
        }
    }

    /// Creates an empty "Untitled" draft.
    pub fn untitled(created_at: i64) -> Self {
        Self::new(Self::UNTITLED, created_at)
    }

    /// Looks up a field by id.
    pub fn field(&self, id: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// Returns the position of a field by id.
    pub fn field_index(&self, id: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.id == id)
    }

    /// Fields whose value is computed, in declaration order.
    pub fn derived_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.is_derived())
    }

    /// Values a new form instance starts with.
    pub fn initial_snapshot(&self) -> Snapshot {
        self.fields
            .iter()
            .map(|f| (f.id.clone(), f.initial_value()))
            .collect()
    }
}

/// Generates a new opaque identifier.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field(id: &str, spec: FieldSpec) -> Field {
        Field::from_spec(id, spec)
    }

    #[test]
    fn test_field_type_names() {
        let names: Vec<_> = FieldType::ALL.iter().map(FieldType::type_name).collect();
        assert_eq!(
            names,
            vec!["text", "number", "textarea", "select", "radio", "checkbox", "date"]
        );
    }

    #[test]
    fn test_options_dropped_for_plain_types() {
        let f = field("a", FieldSpec::new(FieldType::Text, "A").with_options(["x"]));
        assert!(f.options.is_none());

        let f = field("b", FieldSpec::new(FieldType::Radio, "B").with_options(["x"]));
        assert_eq!(f.options, Some(vec!["x".to_string()]));
    }

    #[test]
    fn test_initial_values() {
        let text = field("t", FieldSpec::new(FieldType::Text, "T"));
        let boxes = field(
            "c",
            FieldSpec::new(FieldType::Checkbox, "C").with_options(["x", "y"]),
        );
        let seeded = field("n", FieldSpec::new(FieldType::Number, "N").with_default("7"));

        assert_eq!(text.initial_value(), FieldValue::from(""));
        assert_eq!(boxes.initial_value(), FieldValue::List(vec![]));
        assert_eq!(seeded.initial_value(), FieldValue::from("7"));
    }

    #[test]
    fn test_check_definition_label_required() {
        let f = field("a", FieldSpec::new(FieldType::Text, "  "));
        assert_eq!(f.check_definition(&[]).unwrap_err(), "Label is required");
    }

    #[test]
    fn test_check_definition_options_required() {
        let f = field("a", FieldSpec::new(FieldType::Select, "Pick"));
        assert!(f.check_definition(&[]).unwrap_err().contains("Options required"));
    }

    #[test]
    fn test_check_definition_derived() {
        let dob = field("dob", FieldSpec::new(FieldType::Date, "DOB"));
        let siblings = vec![dob];

        let no_parents = field(
            "age",
            FieldSpec::new(FieldType::Number, "Age").with_derived(vec![], "dateDiff(dob)"),
        );
        assert!(no_parents.check_definition(&siblings).is_err());

        let blank_expr = field(
            "age",
            FieldSpec::new(FieldType::Number, "Age").with_derived(vec!["dob".into()], " "),
        );
        assert!(blank_expr.check_definition(&siblings).is_err());

        let own_parent = field(
            "age",
            FieldSpec::new(FieldType::Number, "Age").with_derived(vec!["age".into()], "1"),
        );
        assert!(own_parent
            .check_definition(&siblings)
            .unwrap_err()
            .contains("own parent"));

        let ok = field(
            "age",
            FieldSpec::new(FieldType::Number, "Age")
                .with_derived(vec!["dob".into()], "dateDiff(dob)"),
        );
        assert!(ok.check_definition(&siblings).is_ok());
    }

    #[test]
    fn test_patch_keeps_type_and_clears_derived() {
        let f = field(
            "age",
            FieldSpec::new(FieldType::Number, "Age").with_derived(vec!["dob".into()], "1"),
        );
        let patched = f.patched(FieldPatch {
            label: Some("Years".into()),
            derived: Some(DerivedConfig {
                is_derived: false,
                parents: vec![],
                expression: String::new(),
            }),
            ..Default::default()
        });
        assert_eq!(patched.label, "Years");
        assert_eq!(patched.field_type, FieldType::Number);
        assert!(!patched.is_derived());
        assert!(patched.derived.is_none());
    }

    #[test]
    fn test_schema_json_shape() {
        let schema: FormSchema = serde_json::from_value(json!({
            "id": "s1",
            "name": "Signup",
            "createdAt": 1700000000000i64,
            "fields": [{
                "id": "f1",
                "type": "checkbox",
                "label": "Topics",
                "required": false,
                "defaultValue": ["rust"],
                "options": ["rust", "go"],
                "validations": { "notEmpty": true },
                "derived": null
            }]
        }))
        .unwrap();

        let f = &schema.fields[0];
        assert_eq!(f.field_type, FieldType::Checkbox);
        assert_eq!(f.initial_value(), FieldValue::List(vec!["rust".into()]));
        assert_eq!(f.validations, RuleSet::new().not_empty());
        assert!(!f.is_derived());
        assert_eq!(
            schema.initial_snapshot().get("f1"),
            Some(&FieldValue::List(vec!["rust".into()]))
        );
    }

    #[test]
    fn test_new_ids_are_unique() {
        let a = FormSchema::untitled(0);
        let b = FormSchema::untitled(0);
        assert_ne!(a.id, b.id);
        assert_eq!(a.name, "Untitled");
    }
}
