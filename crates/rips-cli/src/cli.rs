//! CLI argument definitions.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

use rips_generate::Selection;

#[derive(Parser)]
#[command(
    name = "rips",
    version,
    about = "Generate and validate RIPS healthcare service reports",
    long_about = "Generate RIPS transaction documents from clinical records.\n\n\
                  Documents come from a stored mapping configuration or from explicit \
                  patient/encounter selections, and are always validated before they are written."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for humans, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow patient identifiers in log output.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,

    /// Configuration file (default: ./rips.toml, then the user config directory).
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Store directory for mappings, the audit log and reference tables.
    #[arg(long = "store-dir", value_name = "DIR", global = true)]
    pub store_dir: Option<PathBuf>,

    /// Directory generated documents are written to.
    #[arg(long = "output-dir", value_name = "DIR", global = true)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a document from a stored mapping configuration.
    Generate(GenerateArgs),

    /// Generate a document from explicit patient/encounter selections.
    Select(SelectArgs),

    /// Validate an existing RIPS document.
    Validate(ValidateArgs),

    /// List the document schema's field paths.
    Schema,

    /// Manage stored mapping configurations.
    #[command(subcommand)]
    Mappings(MappingsCommand),
}

/// Options shared by the generating commands.
#[derive(Args)]
pub struct RunArgs {
    /// JSON dataset holding the source tables.
    #[arg(long = "dataset", value_name = "PATH")]
    pub dataset: PathBuf,

    /// Date ages are computed against (default: today).
    #[arg(long = "reference-date", value_name = "YYYY-MM-DD")]
    pub reference_date: Option<NaiveDate>,

    /// Validate and report without writing output files.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct GenerateArgs {
    /// Id of the stored mapping.
    #[arg(long = "mapping", value_name = "ID")]
    pub mapping: u64,

    /// First day of the reporting period.
    #[arg(long = "from", value_name = "YYYY-MM-DD", requires = "to")]
    pub from: Option<NaiveDate>,

    /// Last day of the reporting period (inclusive).
    #[arg(long = "to", value_name = "YYYY-MM-DD", requires = "from")]
    pub to: Option<NaiveDate>,

    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Args)]
pub struct SelectArgs {
    /// A patient and its encounters, as `PATIENT:ENCOUNTER,ENCOUNTER`.
    #[arg(
        long = "patient",
        value_name = "SELECTION",
        value_parser = parse_selection,
        required_unless_present = "selections"
    )]
    pub patients: Vec<Selection>,

    /// JSON file with a list of `{"patientId", "encounterIds"}` selections.
    #[arg(long = "selections", value_name = "PATH", conflicts_with = "patients")]
    pub selections: Option<PathBuf>,

    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// RIPS document to validate.
    #[arg(value_name = "DOCUMENT")]
    pub document: PathBuf,

    /// Date ages are computed against (default: today).
    #[arg(long = "reference-date", value_name = "YYYY-MM-DD")]
    pub reference_date: Option<NaiveDate>,
}

#[derive(Subcommand)]
pub enum MappingsCommand {
    /// List stored mappings.
    List,

    /// Print a stored mapping.
    Show {
        #[arg(value_name = "ID")]
        id: u64,
    },

    /// Store a mapping configuration from a JSON file.
    Import {
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Name to store it under (default: the file stem).
        #[arg(long = "name")]
        name: Option<String>,

        /// Replace the mapping with this id instead of creating a new one.
        #[arg(long = "replace", value_name = "ID")]
        replace: Option<u64>,
    },

    /// Delete a stored mapping.
    Delete {
        #[arg(value_name = "ID")]
        id: u64,
    },
}

/// Parse `PATIENT:ENC,ENC` (encounters optional).
pub fn parse_selection(value: &str) -> Result<Selection, String> {
    let (patient, encounters) = match value.split_once(':') {
        Some((patient, encounters)) => (patient.trim(), encounters),
        None => (value.trim(), ""),
    };
    if patient.is_empty() {
        return Err(format!("missing patient id in '{value}'"));
    }
    let encounters: Vec<&str> = encounters
        .split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .collect();
    Ok(Selection::new(patient, &encounters))
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
