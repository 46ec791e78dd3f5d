//! Suite execution against a live browser

use std::path::Path;

use pagewright::scenarios::{self, Scenario, SuiteSummary};
use pagewright::SuiteConfig;
use regex::RegexBuilder;
use tracing::info;

use crate::commands::SelectArgs;
use crate::error::{CliError, CliResult};

/// Catalog entries picked by id and title pattern
pub fn select(args: &SelectArgs) -> CliResult<Vec<Scenario>> {
    let grep = args
        .grep
        .as_deref()
        .map(|pattern| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| CliError::invalid_argument(format!("--grep {pattern:?}: {e}")))
        })
        .transpose()?;
    let catalog = scenarios::catalog();
    for id in &args.ids {
        if !catalog.iter().any(|s| s.id.eq_ignore_ascii_case(id)) {
            return Err(CliError::invalid_argument(format!("unknown scenario id {id}")));
        }
    }
    let picked = scenarios::select(&catalog, &args.ids, grep.as_ref());
    if picked.is_empty() {
        return Err(CliError::invalid_argument("no scenarios match the selection"));
    }
    Ok(picked)
}

/// Launch Chromium, run `scenarios`, close the browser
#[cfg(feature = "browser")]
pub fn run_suite(config: SuiteConfig, scenarios: &[Scenario]) -> CliResult<SuiteSummary> {
    use std::sync::Arc;

    use pagewright::{CdpBrowser, ScenarioRunner};

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async {
        let browser = Arc::new(CdpBrowser::launch(&config).await?);
        let runner = ScenarioRunner::new(config, browser.clone());
        let summary = runner.run(scenarios).await;
        drop(runner);
        if let Ok(browser) = Arc::try_unwrap(browser) {
            browser.close().await?;
        }
        Ok::<_, CliError>(summary)
    })
}

/// Without a browser backend nothing can run
#[cfg(not(feature = "browser"))]
pub fn run_suite(_config: SuiteConfig, _scenarios: &[Scenario]) -> CliResult<SuiteSummary> {
    Err(CliError::BrowserUnavailable)
}

/// Write the summary as pretty JSON
pub fn write_json(summary: &SuiteSummary, path: &Path) -> CliResult<()> {
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, json)?;
    info!(path = %path.display(), "wrote outcome summary");
    Ok(())
}
