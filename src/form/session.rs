//! Form session: one filled-in instance of a saved schema

use std::collections::BTreeMap;

use tracing::{debug, info};

use super::errors::{SessionError, SessionResult, SubmitError};
use crate::resolver::{DerivedResolver, Resolution};
use crate::schema::{FieldValue, FormSchema, Snapshot};
use crate::validation::{validate_fields, Violation};

/// Values and errors for one form instance.
///
/// Every edit re-resolves derived fields and re-validates the whole form,
/// so `values` and `errors` are always consistent with each other.
pub struct FormSession {
    schema: FormSchema,
    resolver: DerivedResolver,
    values: Snapshot,
    errors: BTreeMap<String, Vec<Violation>>,
    resolution: Resolution,
}

impl FormSession {
    /// Seeds values from defaults, then resolves and validates.
    pub fn new(schema: FormSchema) -> Self {
        Self::with_resolver(schema, DerivedResolver::new())
    }

    pub fn with_resolver(schema: FormSchema, resolver: DerivedResolver) -> Self {
        let values = schema.initial_snapshot();
        let mut session = Self {
            schema,
            resolver,
            values,
            errors: BTreeMap::new(),
            resolution: Resolution {
                passes: 0,
                converged: true,
                changed: Vec::new(),
            },
        };
        session.refresh();
        session
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    /// Sets one input value. Derived fields are read-only.
    pub fn set_value(&mut self, id: &str, value: FieldValue) -> SessionResult<()> {
        self.check_editable(id)?;
        self.values.insert(id.to_string(), value);
        self.refresh();
        Ok(())
    }

    /// Sets several input values and refreshes once.
    ///
    /// Nothing is applied if any id is unknown or derived.
    pub fn set_values(&mut self, values: Snapshot) -> SessionResult<()> {
        for id in values.keys() {
            self.check_editable(id)?;
        }
        self.values.extend(values);
        self.refresh();
        Ok(())
    }

    pub fn values(&self) -> &Snapshot {
        &self.values
    }

    pub fn value(&self, id: &str) -> Option<&FieldValue> {
        self.values.get(id)
    }

    /// Violations of every field that has any.
    pub fn errors(&self) -> &BTreeMap<String, Vec<Violation>> {
        &self.errors
    }

    pub fn errors_for(&self, id: &str) -> &[Violation] {
        self.errors.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Text a read-only derived input shows; `None` for non-derived fields.
    pub fn derived_display(&self, id: &str) -> Option<String> {
        let field = self.schema.field(id).filter(|f| f.is_derived())?;
        Some(
            self.values
                .get(&field.id)
                .map(FieldValue::coerce_to_string)
                .unwrap_or_default(),
        )
    }

    /// Outcome of the last resolution.
    pub fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    /// Returns the values if the form has no errors.
    pub fn submit(&self) -> Result<Snapshot, SubmitError> {
        if !self.errors.is_empty() {
            debug!(schema = %self.schema.id, invalid = self.errors.len(), "submit blocked");
            return Err(SubmitError::Invalid {
                errors: self.errors.clone(),
            });
        }
        info!(schema = %self.schema.id, "form submitted");
        Ok(self.values.clone())
    }

    fn check_editable(&self, id: &str) -> SessionResult<()> {
        match self.schema.field(id) {
            None => Err(SessionError::UnknownField(id.to_string())),
            Some(field) if field.is_derived() => Err(SessionError::DerivedField(id.to_string())),
            Some(_) => Ok(()),
        }
    }

    fn refresh(&mut self) {
        let (values, resolution) = self
            .resolver
            .resolve_with_report(&self.schema.fields, &self.values);
        self.values = values;
        self.resolution = resolution;
        self.errors = validate_fields(&self.schema.fields, &self.values);
    }
}
