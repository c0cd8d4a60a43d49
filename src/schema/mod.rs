//! Form schema model
//!
//! A schema is an ordered list of fields plus a name, an id and a
//! timestamp. Fields carry their type, options, validation rules and an
//! optional derived-value expression.
//!
//! # Design Principles
//!
//! - Ids are opaque UUIDs, assigned once and never recomputed
//! - Field type is fixed at creation
//! - A field never lists itself as a parent
//! - JSON shape matches what the browser builder stores

mod errors;
mod graph;
mod types;
mod value;

pub use errors::{SchemaError, SchemaErrorCode, SchemaResult};
pub use types::{new_id, DerivedConfig, Field, FieldPatch, FieldSpec, FieldType, FormSchema};
pub use value::{FieldValue, Snapshot};
