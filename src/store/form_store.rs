//! # Form Store
//!
//! Holds the one mutable draft and the list of saved forms.
//!
//! - Edits are checked before they reach the draft; a rejected edit leaves
//!   the draft unchanged
//! - Saved forms are immutable apart from deletion
//! - Every change to the saved list is written through to storage. A failed
//!   write is logged and the in-memory list is kept

use tracing::{debug, error, info, warn};

use super::storage::FormStorage;
use crate::expression::{Clock, SystemClock};
use crate::schema::{
    new_id, Field, FieldPatch, FieldSpec, FormSchema, SchemaError, SchemaResult,
};

/// Draft and saved forms over a storage backend
pub struct FormStore<S: FormStorage> {
    storage: S,
    clock: Box<dyn Clock>,
    draft: FormSchema,
    saved: Vec<FormSchema>,
}

impl<S: FormStorage> FormStore<S> {
    /// Opens the store, loading saved forms. Unreadable data loads as empty.
    pub fn open(storage: S) -> Self {
        Self::open_with_clock(storage, SystemClock)
    }

    pub fn open_with_clock(storage: S, clock: impl Clock + 'static) -> Self {
        let saved = load_or_empty(&storage);
        let draft = FormSchema::untitled(clock.now_millis());
        info!(saved = saved.len(), "form store opened");
        Self {
            storage,
            clock: Box::new(clock),
            draft,
            saved,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    // ========================================================================
    // Draft
    // ========================================================================

    pub fn draft(&self) -> &FormSchema {
        &self.draft
    }

    /// Replaces the draft wholesale. Field checks run when it is saved.
    pub fn set_draft(&mut self, draft: FormSchema) {
        debug!(schema = %draft.id, fields = draft.fields.len(), "draft replaced");
        self.draft = draft;
    }

    pub fn rename_draft(&mut self, name: &str) -> SchemaResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SchemaError::invalid_name());
        }
        self.draft.name = name.to_string();
        Ok(())
    }

    /// Appends a field with a fresh id and returns the id.
    pub fn add_field(&mut self, spec: FieldSpec) -> SchemaResult<String> {
        let id = new_id();
        self.add_field_with_id(id.clone(), spec)?;
        Ok(id)
    }

    /// Appends a field under a caller-chosen id.
    pub fn add_field_with_id(&mut self, id: impl Into<String>, spec: FieldSpec) -> SchemaResult<()> {
        let field = Field::from_spec(id, spec);
        if self.draft.field(&field.id).is_some() {
            return Err(SchemaError::duplicate_field(field.id));
        }
        field
            .check_definition(&self.draft.fields)
            .map_err(|reason| SchemaError::field_rejected(&field.id, reason))?;

        debug!(field = %field.id, field_type = field.field_type.type_name(), "field added");
        self.draft.fields.push(field);
        Ok(())
    }

    /// Applies a patch to one field of the draft.
    pub fn update_field(&mut self, id: &str, patch: FieldPatch) -> SchemaResult<()> {
        let index = self
            .draft
            .field_index(id)
            .ok_or_else(|| SchemaError::unknown_field(id))?;

        let updated = self.draft.fields[index].patched(patch);
        updated
            .check_definition(&self.draft.fields)
            .map_err(|reason| SchemaError::field_rejected(id, reason))?;

        debug!(field = %id, "field updated");
        self.draft.fields[index] = updated;
        Ok(())
    }

    /// Removes a field and drops it from every other field's parents.
    pub fn delete_field(&mut self, id: &str) -> SchemaResult<Field> {
        let index = self
            .draft
            .field_index(id)
            .ok_or_else(|| SchemaError::unknown_field(id))?;
        let removed = self.draft.fields.remove(index);

        for field in &mut self.draft.fields {
            if let Some(derived) = field.derived.as_mut() {
                let before = derived.parents.len();
                derived.parents.retain(|p| p != id);
                if derived.parents.len() != before && derived.parents.is_empty() {
                    warn!(field = %field.id, removed = %id, "derived field lost its last parent");
                }
            }
        }

        debug!(field = %id, "field deleted");
        Ok(removed)
    }

    /// Moves the field at `from` so that it ends up at `to`.
    pub fn reorder_fields(&mut self, from: usize, to: usize) -> SchemaResult<()> {
        let len = self.draft.fields.len();
        if from >= len || to >= len {
            return Err(SchemaError::invalid_reorder(from, to, len));
        }
        let field = self.draft.fields.remove(from);
        self.draft.fields.insert(to, field);
        Ok(())
    }

    // ========================================================================
    // Saved forms
    // ========================================================================

    /// Saves the draft, optionally renaming it, and starts a fresh draft.
    ///
    /// Every field is re-checked against its siblings. A dependency cycle
    /// among derived fields is reported but does not block the save.
    pub fn save_draft(&mut self, name: Option<&str>) -> SchemaResult<FormSchema> {
        if let Some(name) = name {
            self.rename_draft(name)?;
        }
        if self.draft.name.trim().is_empty() {
            return Err(SchemaError::invalid_name());
        }
        if self.draft.fields.is_empty() {
            return Err(SchemaError::empty_schema(&self.draft.id));
        }

        for (index, field) in self.draft.fields.iter().enumerate() {
            if self.draft.fields[..index].iter().any(|f| f.id == field.id) {
                return Err(SchemaError::duplicate_field(&field.id));
            }
            field
                .check_definition(&self.draft.fields)
                .map_err(|reason| SchemaError::field_rejected(&field.id, reason))?;
        }

        if let Some(cycle) = self.draft.dependency_cycle() {
            warn!(
                schema = %self.draft.id,
                cycle = %cycle.join(" -> "),
                "derived fields depend on each other; values are capped at runtime"
            );
        }

        let now = self.clock.now_millis();
        let mut schema = std::mem::replace(&mut self.draft, FormSchema::untitled(now));
        schema.created_at = now;

        info!(schema = %schema.id, name = %schema.name, fields = schema.fields.len(), "form saved");
        self.saved.push(schema.clone());
        self.persist();
        Ok(schema)
    }

    /// Re-reads the saved list from storage.
    pub fn reload(&mut self) {
        self.saved = load_or_empty(&self.storage);
    }

    pub fn delete_saved(&mut self, id: &str) -> SchemaResult<FormSchema> {
        let index = self
            .saved
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| SchemaError::unknown_schema(id))?;
        let removed = self.saved.remove(index);

        info!(schema = %id, "form deleted");
        self.persist();
        Ok(removed)
    }

    pub fn saved(&self) -> &[FormSchema] {
        &self.saved
    }

    pub fn find_saved(&self, id: &str) -> Option<&FormSchema> {
        self.saved.iter().find(|s| s.id == id)
    }

    fn persist(&self) {
        if let Err(e) = self.storage.save(&self.saved) {
            error!(code = e.code(), error = %e, "failed to persist saved forms");
        }
    }
}

fn load_or_empty<S: FormStorage>(storage: &S) -> Vec<FormSchema> {
    storage.load().unwrap_or_else(|e| {
        warn!(code = e.code(), error = %e, "could not load saved forms, starting empty");
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::FixedClock;
    use crate::schema::{DerivedConfig, FieldType, SchemaErrorCode};
    use crate::store::MemoryStorage;

    fn store() -> FormStore<MemoryStorage> {
        FormStore::open_with_clock(MemoryStorage::new(), FixedClock::from_millis(1_000))
    }

    fn text(label: &str) -> FieldSpec {
        FieldSpec::new(FieldType::Text, label)
    }

    #[test]
    fn test_fresh_draft() {
        let s = store();
        assert_eq!(s.draft().name, FormSchema::UNTITLED);
        assert!(s.draft().fields.is_empty());
        assert!(s.saved().is_empty());
    }

    #[test]
    fn test_add_field_rejections() {
        let mut s = store();

        let err = s.add_field(text("  ")).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::FormFieldRejected);
        assert!(err.message().contains("Label is required"));

        let err = s.add_field(FieldSpec::new(FieldType::Select, "Pick")).unwrap_err();
        assert!(err.message().contains("Options required for select fields"));

        let err = s
            .add_field_with_id("me", text("Me").with_derived(vec!["me".into()], "1"))
            .unwrap_err();
        assert!(err.message().contains("A field cannot be its own parent"));

        let err = s
            .add_field(text("Sum").with_derived(vec!["ghost".into()], "ghost"))
            .unwrap_err();
        assert!(err.message().contains("Unknown parent field 'ghost'"));

        assert!(s.draft().fields.is_empty());
    }

    #[test]
    fn test_duplicate_id() {
        let mut s = store();
        s.add_field_with_id("a", text("A")).unwrap();
        let err = s.add_field_with_id("a", text("A again")).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::FormDuplicateField);
    }

    #[test]
    fn test_update_field_patch() {
        let mut s = store();
        s.add_field_with_id("a", text("A")).unwrap();
        s.add_field_with_id("b", text("B")).unwrap();

        s.update_field(
            "b",
            FieldPatch {
                label: Some("Double A".into()),
                derived: Some(DerivedConfig::new(vec!["a".into()], "a * 2")),
                ..FieldPatch::default()
            },
        )
        .unwrap();
        let b = s.draft().field("b").unwrap();
        assert_eq!(b.label, "Double A");
        assert!(b.is_derived());

        let err = s
            .update_field(
                "b",
                FieldPatch {
                    derived: Some(DerivedConfig::new(vec!["a".into()], "  ")),
                    ..FieldPatch::default()
                },
            )
            .unwrap_err();
        assert!(err.message().contains("Expression is required"));
        assert_eq!(s.draft().field("b").unwrap().derived_expression(), Some("a * 2"));

        let err = s.update_field("zzz", FieldPatch::default()).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::FormUnknownField);
    }

    #[test]
    fn test_delete_prunes_parents() {
        let mut s = store();
        s.add_field_with_id("a", text("A")).unwrap();
        s.add_field_with_id("b", text("B")).unwrap();
        s.add_field_with_id(
            "c",
            text("C").with_derived(vec!["a".into(), "b".into()], "a + b"),
        )
        .unwrap();

        s.delete_field("a").unwrap();
        assert_eq!(s.draft().field("c").unwrap().parents(), ["b".to_string()]);
        assert!(s.delete_field("a").is_err());
    }

    #[test]
    fn test_reorder() {
        let mut s = store();
        for id in ["a", "b", "c"] {
            s.add_field_with_id(id, text(id)).unwrap();
        }
        s.reorder_fields(0, 2).unwrap();
        let ids: Vec<_> = s.draft().fields.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, ["b", "c", "a"]);

        let err = s.reorder_fields(3, 0).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::FormInvalidReorder);
    }

    #[test]
    fn test_save_resets_draft_and_persists() {
        let mut s = store();
        s.add_field_with_id("a", text("A")).unwrap();
        let draft_id = s.draft().id.clone();

        let saved = s.save_draft(Some("Signup")).unwrap();
        assert_eq!(saved.id, draft_id);
        assert_eq!(saved.name, "Signup");
        assert_eq!(saved.created_at, 1_000);

        assert_eq!(s.draft().name, FormSchema::UNTITLED);
        assert!(s.draft().fields.is_empty());
        assert_ne!(s.draft().id, draft_id);

        let stored = s.storage().load().unwrap();
        assert_eq!(stored, vec![saved]);
    }

    #[test]
    fn test_save_rejections() {
        let mut s = store();
        let err = s.save_draft(None).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::FormEmptySchema);

        s.add_field_with_id("a", text("A")).unwrap();
        let err = s.save_draft(Some("   ")).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::FormInvalidName);
        assert_eq!(s.draft().fields.len(), 1);
    }

    #[test]
    fn test_save_checks_replaced_draft() {
        let mut s = store();
        let mut draft = FormSchema::new("Imported", 0);
        draft.fields.push(Field::from_spec("x", text("")));
        s.set_draft(draft);

        let err = s.save_draft(None).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::FormFieldRejected);
        assert_eq!(err.field_id(), Some("x"));
    }

    #[test]
    fn test_cycle_does_not_block_save() {
        let mut s = store();
        s.add_field_with_id("x", text("X")).unwrap();
        s.add_field_with_id("y", text("Y").with_derived(vec!["x".into()], "x + 1"))
            .unwrap();
        s.update_field(
            "x",
            FieldPatch {
                derived: Some(DerivedConfig::new(vec!["y".into()], "y + 1")),
                ..FieldPatch::default()
            },
        )
        .unwrap();
        assert!(s.draft().dependency_cycle().is_some());
        assert!(s.save_draft(Some("Loop")).is_ok());
    }

    #[test]
    fn test_delete_saved() {
        let mut s = store();
        s.add_field_with_id("a", text("A")).unwrap();
        let saved = s.save_draft(Some("One")).unwrap();

        assert!(s.find_saved(&saved.id).is_some());
        s.delete_saved(&saved.id).unwrap();
        assert!(s.saved().is_empty());
        assert!(s.storage().load().unwrap().is_empty());

        let err = s.delete_saved(&saved.id).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::FormUnknownSchema);
    }

    #[test]
    fn test_failed_write_keeps_memory_state() {
        let mut s = store();
        s.storage().set_read_only(true);
        s.add_field_with_id("a", text("A")).unwrap();
        s.save_draft(Some("Kept")).unwrap();

        assert_eq!(s.saved().len(), 1);
        assert!(s.storage().raw().is_none());

        s.reload();
        assert!(s.saved().is_empty());
    }

    #[test]
    fn test_corrupt_storage_opens_empty() {
        let s = FormStore::open(MemoryStorage::with_raw("[{\"id\":"));
        assert!(s.saved().is_empty());
    }
}
