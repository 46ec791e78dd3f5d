//! Pagewright CLI Library
//!
//! Command-line front end for the Pagewright scenario suite: lists the
//! catalog, shows the effective configuration, and runs scenarios against a
//! live Chromium.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::format_push_string)] // String building is clear and correct
#![allow(clippy::missing_errors_doc)] // Error types are self-documenting

mod commands;
mod config;
mod error;
mod logging;
mod output;
mod runner;

pub use commands::{
    Cli, ColorArg, Commands, ConfigArgs, ListArgs, ListFormat, LogFormatArg, RunArgs, SelectArgs,
    SuiteArgs,
};
pub use config::{suite_config, CliConfig, ColorChoice, LogFormat, Verbosity};
pub use error::{CliError, CliResult};
pub use logging::{env_filter, init_logging};
pub use output::Reporter;
pub use runner::{run_suite, select, write_json};
