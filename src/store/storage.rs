//! # Storage Backends
//!
//! The whole saved-forms list is one JSON document under a fixed key.

use std::cell::{Cell, RefCell};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::errors::{StorageError, StorageResult};
use crate::schema::FormSchema;

/// Key the saved-forms list is stored under
pub const DEFAULT_STORAGE_KEY: &str = "upliance_forms_v1";

/// Backend trait for saved-form persistence
pub trait FormStorage {
    /// Reads the saved list. Missing data is an empty list, not an error.
    fn load(&self) -> StorageResult<Vec<FormSchema>>;

    /// Replaces the saved list.
    fn save(&self, forms: &[FormSchema]) -> StorageResult<()>;
}

fn decode(raw: &str) -> StorageResult<Vec<FormSchema>> {
    serde_json::from_str(raw).map_err(|e| StorageError::Corrupt(e.to_string()))
}

fn encode(forms: &[FormSchema]) -> StorageResult<String> {
    serde_json::to_string(forms).map_err(|e| StorageError::Encode(e.to_string()))
}

/// JSON file at `<data_dir>/<storage_key>.json`
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(data_dir: impl AsRef<Path>, storage_key: &str) -> Self {
        Self {
            path: data_dir.as_ref().join(format!("{}.json", storage_key)),
        }
    }

    /// Storage under the default key.
    pub fn in_dir(data_dir: impl AsRef<Path>) -> Self {
        Self::new(data_dir, DEFAULT_STORAGE_KEY)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FormStorage for JsonFileStorage {
    fn load(&self) -> StorageResult<Vec<FormSchema>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => decode(&raw),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, forms: &[FormSchema]) -> StorageResult<()> {
        let raw = encode(forms)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // atomic replace
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// In-memory backend holding the encoded document.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    raw: RefCell<Option<String>>,
    read_only: Cell<bool>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an arbitrary stored document, valid or not.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: RefCell::new(Some(raw.into())),
            read_only: Cell::new(false),
        }
    }

    /// Makes every subsequent save fail.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.set(read_only);
    }

    pub fn raw(&self) -> Option<String> {
        self.raw.borrow().clone()
    }
}

impl FormStorage for MemoryStorage {
    fn load(&self) -> StorageResult<Vec<FormSchema>> {
        match self.raw.borrow().as_deref() {
            Some(raw) => decode(raw),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, forms: &[FormSchema]) -> StorageResult<()> {
        if self.read_only.get() {
            return Err(StorageError::ReadOnly);
        }
        *self.raw.borrow_mut() = Some(encode(forms)?);
        Ok(())
    }
}
