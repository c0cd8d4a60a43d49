//! CLI command implementations
//!
//! Every command answers with exactly one JSON line on stdout. Requests
//! the engine rejects (unknown form, invalid field, failed validation)
//! produce an error response and a zero exit; only configuration and I/O
//! failures surface as `CliError`.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::expression::{self, EvalContext, FunctionTable, SystemClock};
use crate::form::{FormSession, SubmitError};
use crate::logging::{self, LogConfig};
use crate::schema::{FieldPatch, FieldSpec, FormSchema, SchemaError, SchemaResult, Snapshot};
use crate::store::{FormStorage, FormStore, JsonFileStorage};

use super::args::{Cli, Command, ConfigArg};
use super::config::Config;
use super::errors::{CliError, CliResult};
use super::io::{read_optional_request, read_request, write_error, write_error_with_details, write_response};

/// Error code for a submission blocked by validation errors
pub const SUBMIT_INVALID_CODE: &str = "FORM_SUBMIT_INVALID";

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command, cli.verbose)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command, verbose: bool) -> CliResult<()> {
    match cmd {
        Command::Init { config, data_dir } => init(&config.config, &data_dir, verbose),
        Command::List { config } => list(&boot(&config, verbose)?),
        Command::Show { config, id } => show(&boot(&config, verbose)?, &id),
        Command::Delete { config, id } => delete(&boot(&config, verbose)?, &id),
        Command::Create { config } => create(&boot(&config, verbose)?),
        Command::Eval { expression, values } => {
            logging::init(&LogConfig {
                filter: None,
                verbose,
            });
            eval(&expression, values.as_deref())
        }
        Command::Resolve { config, id } => resolve(&boot(&config, verbose)?, &id),
        Command::Submit { config, id } => submit(&boot(&config, verbose)?, &id),
    }
}

/// Loads the config and installs logging.
fn boot(arg: &ConfigArg, verbose: bool) -> CliResult<Config> {
    let config = Config::load(&arg.config)?;
    logging::init(&LogConfig {
        filter: config.log_filter.as_deref(),
        verbose,
    });
    Ok(config)
}

/// Creates the data directory and an empty saved-forms document.
///
/// A default config is written first if `config_path` does not exist.
pub fn init(config_path: &Path, data_dir: &str, verbose: bool) -> CliResult<()> {
    let config = if config_path.exists() {
        Config::load(config_path)?
    } else {
        let config = Config::with_data_dir(data_dir);
        config.write(config_path)?;
        config
    };
    logging::init(&LogConfig {
        filter: config.log_filter.as_deref(),
        verbose,
    });

    let storage = config.storage();
    if storage.path().exists() {
        return Err(CliError::already_initialized());
    }

    fs::create_dir_all(config.data_path()).map_err(|e| {
        CliError::config_error(format!(
            "Failed to create directory {:?}: {}",
            config.data_path(),
            e
        ))
    })?;
    storage
        .save(&[])
        .map_err(|e| CliError::io_error(e.to_string()))?;

    info!(data_dir = %config.data_dir, "initialized");
    write_response(json!({
        "initialized": true,
        "data_dir": config.data_dir,
        "storage": storage.path().display().to_string(),
    }))
}

fn open_store(config: &Config) -> CliResult<FormStore<JsonFileStorage>> {
    let storage = config.storage();
    if !storage.path().exists() {
        return Err(CliError::not_initialized());
    }
    Ok(FormStore::open(storage))
}

fn write_schema_error(err: &SchemaError) -> CliResult<()> {
    write_error(err.code().code(), err.message())
}

/// Lists saved forms as summaries.
pub fn list(config: &Config) -> CliResult<()> {
    let store = open_store(config)?;
    let forms: Vec<_> = store
        .saved()
        .iter()
        .map(|form| {
            json!({
                "id": form.id,
                "name": form.name,
                "createdAt": form.created_at,
                "fieldCount": form.fields.len(),
            })
        })
        .collect();
    write_response(json!(forms))
}

pub fn show(config: &Config, id: &str) -> CliResult<()> {
    let store = open_store(config)?;
    match store.find_saved(id) {
        Some(form) => write_response(serde_json::to_value(form)?),
        None => write_schema_error(&SchemaError::unknown_schema(id)),
    }
}

pub fn delete(config: &Config, id: &str) -> CliResult<()> {
    let mut store = open_store(config)?;
    match store.delete_saved(id) {
        Ok(removed) => write_response(json!({"deleted": removed.id})),
        Err(e) => write_schema_error(&e),
    }
}

/// Form definition accepted by `create`
#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDraft>,
}

/// One field of a `create` request; `id` is generated when absent.
#[derive(Debug, Deserialize)]
pub struct FieldDraft {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(flatten)]
    pub spec: FieldSpec,
}

/// Builds a draft from the request through the store's edit checks and
/// saves it.
///
/// Derived configs are attached after every field exists so a field may
/// name a later field as its parent.
pub fn build_form<S: FormStorage>(
    store: &mut FormStore<S>,
    request: CreateRequest,
) -> SchemaResult<FormSchema> {
    store.rename_draft(&request.name)?;

    let mut pending = Vec::new();
    for draft in request.fields {
        let mut spec = draft.spec;
        let derived = spec.derived.take().filter(|d| d.is_derived);
        let id = match draft.id {
            Some(id) => {
                store.add_field_with_id(id.clone(), spec)?;
                id
            }
            None => store.add_field(spec)?,
        };
        if let Some(derived) = derived {
            pending.push((id, derived));
        }
    }

    for (id, derived) in pending {
        store.update_field(
            &id,
            FieldPatch {
                derived: Some(derived),
                ..FieldPatch::default()
            },
        )?;
    }

    store.save_draft(None)
}

pub fn create(config: &Config) -> CliResult<()> {
    let mut store = open_store(config)?;
    let request: CreateRequest = serde_json::from_value(read_request()?)?;
    match build_form(&mut store, request) {
        Ok(form) => write_response(serde_json::to_value(form)?),
        Err(e) => write_schema_error(&e),
    }
}

/// Evaluates one expression against optional JSON values.
pub fn eval(source: &str, values: Option<&str>) -> CliResult<()> {
    let snapshot: Snapshot = match values {
        Some(raw) => serde_json::from_str(raw)?,
        None => Snapshot::new(),
    };
    let clock = SystemClock;
    let ctx = EvalContext::from_snapshot(&snapshot, FunctionTable::standard(), &clock);

    match expression::try_evaluate(source, &ctx) {
        Ok(value) => write_response(json!({
            "value": value,
            "display": value.coerce_to_string(),
        })),
        Err(e) => write_error(e.code(), &e.to_string()),
    }
}

fn read_values() -> CliResult<Snapshot> {
    match read_optional_request()? {
        None => Ok(Snapshot::new()),
        Some(value) => serde_json::from_value(value).map_err(|e| {
            CliError::bad_request(format!("Values must map field ids to values: {}", e))
        }),
    }
}

/// Opens a session on a saved form with the values from stdin applied.
///
/// The inner `Err` has already been written as an error response.
fn open_session(config: &Config, id: &str) -> CliResult<Option<FormSession>> {
    let store = open_store(config)?;
    let Some(schema) = store.find_saved(id).cloned() else {
        write_schema_error(&SchemaError::unknown_schema(id))?;
        return Ok(None);
    };

    let values = read_values()?;
    let mut session = FormSession::with_resolver(schema, config.resolver());
    if let Err(e) = session.set_values(values) {
        write_error(e.code(), &e.to_string())?;
        return Ok(None);
    }
    Ok(Some(session))
}

pub fn resolve(config: &Config, id: &str) -> CliResult<()> {
    let Some(session) = open_session(config, id)? else {
        return Ok(());
    };
    let resolution = session.resolution();
    write_response(json!({
        "values": session.values(),
        "passes": resolution.passes,
        "converged": resolution.converged,
        "changed": resolution.changed,
        "errors": session.errors(),
    }))
}

pub fn submit(config: &Config, id: &str) -> CliResult<()> {
    let Some(session) = open_session(config, id)? else {
        return Ok(());
    };
    match session.submit() {
        Ok(values) => write_response(json!({"submitted": true, "values": values})),
        Err(err) => {
            let SubmitError::Invalid { errors } = &err;
            write_error_with_details(SUBMIT_INVALID_CODE, &err.to_string(), json!(errors))
        }
    }
}
