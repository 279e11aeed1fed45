//! # QC Telemetry
//!
//! Logging and metrics for the transaction scheduler and contract runtime.
//!
//! ## Components
//!
//! - **Logging**: `tracing-subscriber` with env filter, text or JSON output
//! - **Metrics**: Prometheus counters, gauges and histograms
//!
//! ## Usage
//!
//! ```rust,ignore
//! use qc_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     init_telemetry(&TelemetryConfig::from_env()).expect("Failed to init telemetry");
//!     // Logs and metrics are now being collected
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `QC_SERVICE_NAME` | `qc-runtime` | Service name in logs |
//! | `QC_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `QC_JSON_LOGS` | `false` | JSON log lines |
//! | `QC_THREAD_NAMES` | `true` | Include worker thread names |

#![warn(missing_docs)]

mod config;
pub mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::{init_logging, init_test_logging};
pub use metrics::{
    encode_metrics, record_fault, record_transaction, register_metrics, BATCHES_ABORTED,
    EXECUTION_DURATION, INVOCATION_FAULTS, READY_QUEUE_DEPTH, REPLAYS, TRANSACTIONS_EXECUTED,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// Subscriber could not be installed
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// Metric registration or encoding failed
    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    /// Configuration could not be applied
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Register metrics and install the logging subscriber.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    init_logging(config)?;
    tracing::info!(service = %config.service_name, "Telemetry initialised");
    Ok(())
}
