//! Log subscriber setup
//!
//! `RUST_LOG` wins when set; otherwise the filter follows the verbosity
//! flags. Log lines go to stderr so stdout stays clean for summaries.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, Verbosity};
use crate::error::{CliError, CliResult};

/// Filter from `RUST_LOG`, falling back to the verbosity default
#[must_use]
pub fn env_filter(verbosity: Verbosity) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directive()))
}

/// Install the global subscriber
pub fn init_logging(verbosity: Verbosity, format: LogFormat, ansi: bool) -> CliResult<()> {
    let registry = tracing_subscriber::registry().with(env_filter(verbosity));
    let result = match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(ansi)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };
    result.map_err(|e| CliError::Logging {
        message: e.to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_an_error() {
        let _ = init_logging(Verbosity::Quiet, LogFormat::Json, false);
        let second = init_logging(Verbosity::Quiet, LogFormat::Text, false);
        assert!(matches!(second, Err(CliError::Logging { .. })));
    }
}
