//! CLI module for formbuilder
//!
//! Provides command-line access to:
//! - init: Create the data directory (and a default config)
//! - list / show / delete: Saved forms
//! - create: Build and save a form from JSON
//! - eval: One-shot expression evaluation
//! - resolve / submit: Run a saved form against input values

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command, ConfigArg};
pub use commands::{build_form, run, run_command, CreateRequest, FieldDraft, SUBMIT_INVALID_CODE};
pub use config::Config;
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{error_envelope, ok_envelope, read_request, write_error, write_response};
