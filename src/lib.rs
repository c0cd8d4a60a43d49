//! formbuilder - dynamic form schemas with derived fields and validation
//!
//! The core is a pure schema evaluation engine:
//! - `expression`: parse and evaluate derived-field expressions
//! - `resolver`: recompute derived fields to a fixed point
//! - `validation`: map declarative rules to violations
//!
//! Around it sit the collaborators that drive the engine:
//! - `schema`: fields, forms and values
//! - `store`: draft editing and saved-form persistence
//! - `form`: a headless form session with submit gating
//! - `cli`: JSON-over-stdio command line

pub mod cli;
pub mod expression;
pub mod form;
pub mod logging;
pub mod resolver;
pub mod schema;
pub mod store;
pub mod validation;
