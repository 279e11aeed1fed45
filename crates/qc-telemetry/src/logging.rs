//! Structured logging setup.
//!
//! Library crates only emit `tracing` events. Binaries and test harnesses
//! call [`init_logging`] once to install a subscriber. Fields every crate
//! uses consistently:
//! - `tx_id`: transaction identifier
//! - `invocation`: invocation sequence number within an attempt
//! - `depth`: call depth
//! - `app`: target application
//! - `reason`: failure kind

use crate::{TelemetryConfig, TelemetryError};
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber.
///
/// Fails if the filter directive is malformed or a subscriber is already
/// installed.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(&config.log_level)
        .map_err(|e| TelemetryError::Config(format!("invalid log filter: {e}")))?;

    let builder = fmt()
        .with_env_filter(filter)
        .with_thread_names(config.thread_names)
        .with_target(false);

    let result = if config.json_logs {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;

    tracing::debug!(
        service = %config.service_name,
        json_logs = config.json_logs,
        "Logging initialised"
    );
    Ok(())
}

/// Install a test subscriber writing through the test harness capture.
/// Repeated calls are ignored.
pub fn init_test_logging() {
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
