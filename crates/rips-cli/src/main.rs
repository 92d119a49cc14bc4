//! `rips` command-line entry point.

use std::io::{self, IsTerminal};

use clap::{ColorChoice, Parser};
use tracing::level_filters::LevelFilter;

use rips_cli::logging::{LogConfig, LogFormat, init_logging};

mod cli;
mod commands;
mod summary;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg};
use crate::commands::{
    GenerateReport, Workspace, run_generate, run_mappings, run_schema, run_select, run_validate,
};
use crate::summary::{print_findings, print_generation};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }

    let result = match &cli.command {
        Command::Generate(args) => Workspace::open(&cli)
            .and_then(|ws| run_generate(&ws, args))
            .map(report_exit_code),
        Command::Select(args) => Workspace::open(&cli)
            .and_then(|ws| run_select(&ws, args))
            .map(report_exit_code),
        Command::Validate(args) => run_validate(args).map(|findings| {
            print_findings(&findings);
            i32::from(rips_model::error_count(&findings) > 0)
        }),
        Command::Schema => run_schema().map(|()| 0),
        Command::Mappings(command) => Workspace::open(&cli)
            .and_then(|ws| run_mappings(&ws, command))
            .map(|()| 0),
    };

    let exit_code = result.unwrap_or_else(|error| {
        eprintln!("error: {error:#}");
        1
    });
    std::process::exit(exit_code);
}

fn report_exit_code(report: GenerateReport) -> i32 {
    print_generation(&report.output, report.paths.as_ref());
    i32::from(report.output.has_errors())
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.log_data = cli.log_data;
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
