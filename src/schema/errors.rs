//! Schema error types
//!
//! Error codes:
//! - FORM_FIELD_REJECTED: field definition fails edit-time checks
//! - FORM_DUPLICATE_FIELD: field id already present in the draft
//! - FORM_UNKNOWN_FIELD: no field with the given id
//! - FORM_UNKNOWN_SCHEMA: no saved schema with the given id
//! - FORM_EMPTY_SCHEMA: saving a draft without fields
//! - FORM_INVALID_NAME: blank schema name
//! - FORM_INVALID_REORDER: reorder position out of range

use std::fmt;

/// Schema-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    FormFieldRejected,
    FormDuplicateField,
    FormUnknownField,
    FormUnknownSchema,
    FormEmptySchema,
    FormInvalidName,
    FormInvalidReorder,
}

impl SchemaErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaErrorCode::FormFieldRejected => "FORM_FIELD_REJECTED",
            SchemaErrorCode::FormDuplicateField => "FORM_DUPLICATE_FIELD",
            SchemaErrorCode::FormUnknownField => "FORM_UNKNOWN_FIELD",
            SchemaErrorCode::FormUnknownSchema => "FORM_UNKNOWN_SCHEMA",
            SchemaErrorCode::FormEmptySchema => "FORM_EMPTY_SCHEMA",
            SchemaErrorCode::FormInvalidName => "FORM_INVALID_NAME",
            SchemaErrorCode::FormInvalidReorder => "FORM_INVALID_REORDER",
        }
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Schema error type with full context
#[derive(Debug, Clone)]
pub struct SchemaError {
    code: SchemaErrorCode,
    message: String,
    /// Field the error refers to, if any
    field_id: Option<String>,
    /// Schema the error refers to, if any
    schema_id: Option<String>,
}

impl SchemaError {
    fn new(code: SchemaErrorCode, message: String) -> Self {
        Self {
            code,
            message,
            field_id: None,
            schema_id: None,
        }
    }

    /// Field definition failed an edit-time check
    pub fn field_rejected(field_id: impl Into<String>, reason: impl Into<String>) -> Self {
        let id = field_id.into();
        Self {
            field_id: Some(id.clone()),
            ..Self::new(
                SchemaErrorCode::FormFieldRejected,
                format!("Field '{}' rejected: {}", id, reason.into()),
            )
        }
    }

    pub fn duplicate_field(field_id: impl Into<String>) -> Self {
        let id = field_id.into();
        Self {
            field_id: Some(id.clone()),
            ..Self::new(
                SchemaErrorCode::FormDuplicateField,
                format!("Field '{}' already exists", id),
            )
        }
    }

    pub fn unknown_field(field_id: impl Into<String>) -> Self {
        let id = field_id.into();
        Self {
            field_id: Some(id.clone()),
            ..Self::new(
                SchemaErrorCode::FormUnknownField,
                format!("Field '{}' not found", id),
            )
        }
    }

    pub fn unknown_schema(schema_id: impl Into<String>) -> Self {
        let id = schema_id.into();
        Self {
            schema_id: Some(id.clone()),
            ..Self::new(
                SchemaErrorCode::FormUnknownSchema,
                format!("Form '{}' not found", id),
            )
        }
    }

    pub fn empty_schema(schema_id: impl Into<String>) -> Self {
        let id = schema_id.into();
        Self {
            schema_id: Some(id.clone()),
            ..Self::new(
                SchemaErrorCode::FormEmptySchema,
                "Cannot save a form without fields".into(),
            )
        }
    }

    pub fn invalid_name() -> Self {
        Self::new(
            SchemaErrorCode::FormInvalidName,
            "Form name must not be blank".into(),
        )
    }

    pub fn invalid_reorder(from: usize, to: usize, len: usize) -> Self {
        Self::new(
            SchemaErrorCode::FormInvalidReorder,
            format!(
                "Cannot move field {} to {} in a form with {} fields",
                from, to, len
            ),
        )
    }

    /// Returns the error code
    pub fn code(&self) -> SchemaErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the field ID if applicable
    pub fn field_id(&self) -> Option<&str> {
        self.field_id.as_deref()
    }

    /// Returns the schema ID if applicable
    pub fn schema_id(&self) -> Option<&str> {
        self.schema_id.as_deref()
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for SchemaError {}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;
