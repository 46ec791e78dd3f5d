//! CLI command definitions using clap

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Pagewright: storefront e2e scenarios over a resilient resolution layer
#[derive(Parser, Debug)]
#[command(name = "pagewright")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Log line format
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormatArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run scenarios against a live browser
    Run(RunArgs),

    /// List the scenario catalog
    List(ListArgs),

    /// Show the effective suite configuration
    Config(ConfigArgs),
}

/// Which scenarios to pick
#[derive(Args, Debug, Clone, Default)]
pub struct SelectArgs {
    /// Scenario ids (e.g. TC013 TC020); all when omitted
    pub ids: Vec<String>,

    /// Only scenarios whose title matches this regex
    #[arg(short, long)]
    pub grep: Option<String>,
}

/// Suite configuration sources, applied over the YAML file
#[derive(Args, Debug, Clone, Default)]
pub struct SuiteArgs {
    /// YAML suite configuration
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Site root
    #[arg(long, env = "BASE_URL")]
    pub base_url: Option<String>,

    /// Run the browser without a window (true/false)
    #[arg(long, env = "PAGEWRIGHT_HEADLESS", action = clap::ArgAction::Set)]
    pub headless: Option<bool>,

    /// Chromium executable
    #[arg(long, env = "CHROMIUM_PATH")]
    pub chromium_path: Option<String>,

    /// Number of scenarios run concurrently
    #[arg(short = 'j', long)]
    pub jobs: Option<usize>,

    /// Per-scenario budget in milliseconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Scenario selection
    #[command(flatten)]
    pub select: SelectArgs,

    /// Suite configuration
    #[command(flatten)]
    pub suite: SuiteArgs,

    /// Write the outcome summary as JSON to this file
    #[arg(long)]
    pub json_out: Option<PathBuf>,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Scenario selection
    #[command(flatten)]
    pub select: SelectArgs,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: ListFormat,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Suite configuration
    #[command(flatten)]
    pub suite: SuiteArgs,
}

/// Color argument
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColorArg {
    /// Detect from the terminal
    #[default]
    Auto,
    /// Always color
    Always,
    /// Never color
    Never,
}

/// Log format argument
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormatArg {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// List output format
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListFormat {
    /// Table
    #[default]
    Text,
    /// JSON array
    Json,
}
