//! # Schema Store
//!
//! Draft editing plus the persisted list of saved forms.
//!
//! - `FormStore`: draft and saved-list operations
//! - `FormStorage`: persistence backend trait
//! - `JsonFileStorage`: one JSON file under the data directory
//! - `MemoryStorage`: in-process backend

pub mod errors;
pub mod form_store;
pub mod storage;

pub use errors::{StorageError, StorageResult};
pub use form_store::FormStore;
pub use storage::{FormStorage, JsonFileStorage, MemoryStorage, DEFAULT_STORAGE_KEY};
