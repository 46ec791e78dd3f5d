//! Result and error types for Pagewright.

use std::fmt;

use thiserror::Error;

/// Result type for Pagewright operations
pub type PagewrightResult<T> = Result<T, PagewrightError>;

/// How a navigation attempt tried to reach its destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum NavigationMode {
    /// Simulate a user click on the element (escalating to a forced dispatch)
    SimulateClick,
    /// Transition the document straight to the element's address
    DirectAddress,
}

impl fmt::Display for NavigationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SimulateClick => write!(f, "simulate-click"),
            Self::DirectAddress => write!(f, "direct-address"),
        }
    }
}

/// Errors that can occur in Pagewright
#[derive(Debug, Error)]
pub enum PagewrightError {
    /// No candidate selector matched a visible element within the budget
    #[error("Element '{target}' not found; tried {}", tried.join(" | "))]
    ElementNotFound {
        /// Semantic target name
        target: String,
        /// Descriptions of every candidate that was tried, in order
        tried: Vec<String>,
    },

    /// No readiness condition fired within the budget
    #[error("Page not ready after {timeout_ms}ms; waited for {}", conditions.join(" OR "))]
    ReadinessTimeout {
        /// Names of the conditions that were raced
        conditions: Vec<String>,
        /// Budget in milliseconds
        timeout_ms: u64,
    },

    /// A chosen navigation action failed outright
    #[error("Navigation ({mode}) failed: {message}")]
    Navigation {
        /// Mode that was attempted
        mode: NavigationMode,
        /// Destination address, when one was known
        url: Option<String>,
        /// Underlying cause
        message: String,
    },

    /// A target that requires a unique match matched several elements
    #[error("Element '{target}' is ambiguous: {count} visible matches")]
    AmbiguousMatch {
        /// Semantic target name
        target: String,
        /// Number of visible matches
        count: usize,
    },

    /// Click landed on another element (overlay, animation layer)
    #[error("Click on {handle} intercepted by {by}")]
    ClickIntercepted {
        /// Handle that was clicked
        handle: String,
        /// Description of the intercepting element
        by: String,
    },

    /// Element exists but cannot receive the action
    #[error("Element {handle} is not interactable: {message}")]
    NotInteractable {
        /// Handle that was targeted
        handle: String,
        /// Error message
        message: String,
    },

    /// Handle no longer refers to a node in the current document
    #[error("Element {handle} is detached from the document")]
    StaleElement {
        /// Handle that went stale
        handle: String,
    },

    /// Browser-automation backend error
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Scenario assertion failed
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl PagewrightError {
    /// Create a driver error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Create an assertion failure
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }

    /// Whether a forced dispatch may still succeed after this click failure
    #[must_use]
    pub const fn is_click_blocked(&self) -> bool {
        matches!(
            self,
            Self::ClickIntercepted { .. } | Self::NotInteractable { .. }
        )
    }

    /// Whether the next poll may see a different answer (page mid-navigation)
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::StaleElement { .. } | Self::Driver { .. })
    }

    /// Whether this error is one of the resolution-layer timeouts
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ElementNotFound { .. } | Self::ReadinessTimeout { .. }
        )
    }
}
