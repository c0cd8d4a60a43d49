//! CLI argument definitions using clap
//!
//! Commands:
//! - formbuilder init [--data-dir <dir>]
//! - formbuilder list | show <id> | delete <id>
//! - formbuilder create            (form on stdin)
//! - formbuilder eval <expression> [--values <json>]
//! - formbuilder resolve <id>      (values on stdin)
//! - formbuilder submit <id>       (values on stdin)

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// formbuilder - dynamic form schemas with derived fields and validation
#[derive(Parser, Debug)]
#[command(name = "formbuilder")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Debug-level logging on stderr
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Location of the configuration file
#[derive(Args, Debug, Clone)]
pub struct ConfigArg {
    /// Path to configuration file
    #[arg(long, default_value = "./formbuilder.json")]
    pub config: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the data directory, writing a default config if none exists
    Init {
        #[command(flatten)]
        config: ConfigArg,

        /// Data directory for a newly written config
        #[arg(long, default_value = "./formbuilder-data")]
        data_dir: String,
    },

    /// List saved forms
    List {
        #[command(flatten)]
        config: ConfigArg,
    },

    /// Print one saved form
    Show {
        #[command(flatten)]
        config: ConfigArg,

        /// Form id
        id: String,
    },

    /// Delete a saved form
    Delete {
        #[command(flatten)]
        config: ConfigArg,

        /// Form id
        id: String,
    },

    /// Build a form from `{"name", "fields"}` on stdin and save it
    Create {
        #[command(flatten)]
        config: ConfigArg,
    },

    /// Evaluate an expression
    Eval {
        /// Expression source
        expression: String,

        /// JSON object of variable values
        #[arg(long)]
        values: Option<String>,
    },

    /// Resolve derived fields for the values on stdin
    Resolve {
        #[command(flatten)]
        config: ConfigArg,

        /// Form id
        id: String,
    },

    /// Validate the values on stdin and submit if valid
    Submit {
        #[command(flatten)]
        config: ConfigArg,

        /// Form id
        id: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
