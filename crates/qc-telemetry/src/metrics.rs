//! Prometheus metrics for the scheduler and contract runtime.
//!
//! All metrics follow the naming convention: `qc_<subsystem>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., replays_total)
//! - **Gauge**: Value that can go up or down (e.g., ready_queue_depth)
//! - **Histogram**: Distribution of values (e.g., execution_duration_seconds)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, Opts, Registry,
    TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // RUNTIME METRICS (Subsystem 11)
    // =========================================================================

    /// Executed transactions by final verdict
    pub static ref TRANSACTIONS_EXECUTED: CounterVec = CounterVec::new(
        Opts::new("qc_runtime_transactions_executed_total", "Transactions executed to a final verdict"),
        &["verdict"]  // verdict: ok/client_error/failed
    ).expect("metric creation failed");

    /// Replay attempts beyond the first
    pub static ref REPLAYS: Counter = Counter::new(
        "qc_runtime_replays_total",
        "Transaction re-executions under a failure record"
    ).expect("metric creation failed");

    /// Contained invocation faults by kind
    pub static ref INVOCATION_FAULTS: CounterVec = CounterVec::new(
        Opts::new("qc_runtime_invocation_faults_total", "Invocation faults by kind"),
        &["kind"]
    ).expect("metric creation failed");

    /// Wall-clock time per transaction, replays included
    pub static ref EXECUTION_DURATION: Histogram = Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "qc_runtime_execution_duration_seconds",
            "Time spent executing a transaction including replays"
        ).buckets(exponential_buckets(0.00001, 2.0, 20).expect("bucket layout"))
    ).expect("metric creation failed");

    // =========================================================================
    // SCHEDULER METRICS (Subsystem 12)
    // =========================================================================

    /// Transactions waiting in the ready queue
    pub static ref READY_QUEUE_DEPTH: Gauge = Gauge::new(
        "qc_scheduler_ready_queue_depth",
        "Transactions ready to run but not yet dispatched"
    ).expect("metric creation failed");

    /// Batches whose workers were stopped by an unrecoverable error
    pub static ref BATCHES_ABORTED: Counter = Counter::new(
        "qc_scheduler_batches_aborted_total",
        "Batches aborted by a worker-fatal error"
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Fails if called twice.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Runtime
        Box::new(TRANSACTIONS_EXECUTED.clone()),
        Box::new(REPLAYS.clone()),
        Box::new(INVOCATION_FAULTS.clone()),
        Box::new(EXECUTION_DURATION.clone()),
        // Scheduler
        Box::new(READY_QUEUE_DEPTH.clone()),
        Box::new(BATCHES_ABORTED.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }
    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Count a transaction's final verdict and its execution time.
pub fn record_transaction(verdict: &str, seconds: f64) {
    TRANSACTIONS_EXECUTED.with_label_values(&[verdict]).inc();
    EXECUTION_DURATION.observe(seconds);
}

/// Count one contained invocation fault.
pub fn record_fault(kind: &str) {
    INVOCATION_FAULTS.with_label_values(&[kind]).inc();
}
