//! Pagewright CLI: storefront e2e scenarios
//!
//! ## Usage
//!
//! ```bash
//! pagewright list                          # Show the scenario catalog
//! pagewright run                           # Run every scenario
//! pagewright run TC013 TC020 -j 4          # Run two scenarios concurrently
//! pagewright run --grep search --json-out outcome.json
//! pagewright config --config suite.yaml    # Print the effective configuration
//! ```

use clap::Parser;
use pagewright_cli::{
    init_logging, run_suite, select, suite_config, write_json, Cli, CliConfig, CliError,
    CliResult, Commands, ConfigArgs, ListArgs, ListFormat, Reporter, RunArgs,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = CliConfig::from_cli(&cli);
    let use_color = config.color.should_color();
    init_logging(config.verbosity, config.log_format, use_color)?;
    let reporter = Reporter::new(use_color, config.verbosity.is_quiet());

    match cli.command {
        Commands::Run(args) => run_scenarios(&reporter, &args),
        Commands::List(args) => list_scenarios(&reporter, &args),
        Commands::Config(args) => show_config(&args),
    }
}

fn run_scenarios(reporter: &Reporter, args: &RunArgs) -> CliResult<()> {
    let suite = suite_config(&args.suite)?;
    let picked = select(&args.select)?;
    let summary = run_suite(suite, &picked)?;

    reporter.print_summary(&summary);
    if let Some(path) = &args.json_out {
        write_json(&summary, path)?;
    }
    if summary.all_passed() {
        Ok(())
    } else {
        Err(CliError::ScenarioFailures {
            failed: summary.failed_count(),
            total: summary.total(),
        })
    }
}

fn list_scenarios(reporter: &Reporter, args: &ListArgs) -> CliResult<()> {
    let picked = select(&args.select)?;
    match args.format {
        ListFormat::Text => reporter.print_catalog(&picked),
        ListFormat::Json => {
            let entries: Vec<_> = picked
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "id": s.id,
                        "title": s.title,
                        "module": s.module,
                        "skip": s.skip,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
    }
    Ok(())
}

fn show_config(args: &ConfigArgs) -> CliResult<()> {
    let suite = suite_config(&args.suite)?;
    print!("{}", serde_yaml_ng::to_string(&suite)?);
    Ok(())
}
