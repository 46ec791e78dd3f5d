//! Suite configuration
//!
//! Defaults mirror the runner the suite was written against; every value can
//! be overridden from YAML or by the CLI.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::result::{PagewrightError, PagewrightResult};

/// Default site under test
pub const DEFAULT_BASE_URL: &str = "https://www.littmann.in/3M/en_IN/littmann-stethoscopes-in/";

/// Time budgets, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Readiness and `is_loaded` checks
    pub expect_ms: u64,
    /// Resolving an element before acting on it
    pub action_ms: u64,
    /// Confirming arrival after a navigation
    pub navigation_ms: u64,
    /// Whole scenario
    pub test_ms: u64,
    /// Interval between resolution and readiness samples
    pub poll_interval_ms: u64,
    /// Pause before escalating a blocked click to a forced dispatch
    pub click_grace_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            expect_ms: 10_000,
            action_ms: 30_000,
            navigation_ms: 60_000,
            test_ms: 60_000,
            poll_interval_ms: 50,
            click_grace_ms: 500,
        }
    }
}

impl Timeouts {
    /// Readiness budget
    #[must_use]
    pub const fn expect(&self) -> Duration {
        Duration::from_millis(self.expect_ms)
    }

    /// Action resolution budget
    #[must_use]
    pub const fn action(&self) -> Duration {
        Duration::from_millis(self.action_ms)
    }

    /// Navigation confirmation budget
    #[must_use]
    pub const fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_ms)
    }

    /// Scenario budget
    #[must_use]
    pub const fn test(&self) -> Duration {
        Duration::from_millis(self.test_ms)
    }

    /// Poll interval
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Click escalation grace period
    #[must_use]
    pub const fn click_grace(&self) -> Duration {
        Duration::from_millis(self.click_grace_ms)
    }
}

/// Configuration shared by every scenario of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Site root; relative page paths are joined onto it
    pub base_url: String,
    /// Time budgets
    pub timeouts: Timeouts,
    /// Run the browser without a window
    pub headless: bool,
    /// Explicit Chromium executable
    pub chromium_path: Option<String>,
    /// Scenarios run concurrently (each with its own browser context)
    pub parallel_jobs: usize,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeouts: Timeouts::default(),
            headless: true,
            chromium_path: None,
            parallel_jobs: 1,
        }
    }
}

impl SuiteConfig {
    /// Create default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set time budgets
    #[must_use]
    pub const fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set the Chromium executable
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Set the number of concurrent scenarios
    #[must_use]
    pub const fn with_parallel_jobs(mut self, jobs: usize) -> Self {
        self.parallel_jobs = jobs;
        self
    }

    /// Parse from YAML; missing keys keep their defaults
    pub fn from_yaml_str(yaml: &str) -> PagewrightResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> PagewrightResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Parsed base URL
    pub fn base(&self) -> PagewrightResult<Url> {
        Url::parse(&self.base_url).map_err(|e| PagewrightError::Config {
            message: format!("invalid base_url {:?}: {e}", self.base_url),
        })
    }

    /// Check that values are usable
    pub fn validate(&self) -> PagewrightResult<()> {
        let base = self.base()?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(PagewrightError::Config {
                message: format!("base_url must be http(s), got {}", base.scheme()),
            });
        }
        let t = &self.timeouts;
        if [t.expect_ms, t.action_ms, t.navigation_ms, t.test_ms, t.poll_interval_ms]
            .contains(&0)
        {
            return Err(PagewrightError::Config {
                message: "timeouts and poll interval must be positive".to_string(),
            });
        }
        if self.parallel_jobs == 0 {
            return Err(PagewrightError::Config {
                message: "parallel_jobs must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
