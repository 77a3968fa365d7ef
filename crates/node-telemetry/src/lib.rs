//! # Node Telemetry
//!
//! Observability for the transaction admission pipeline.
//!
//! ## Components
//!
//! - **Logging**: `tracing-subscriber` with an `EnvFilter`, pretty or JSON output
//! - **Metrics**: Prometheus counters and histograms for admission outcomes
//!
//! ## Usage
//!
//! ```rust,ignore
//! use node_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_telemetry(&config).expect("Failed to init telemetry");
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `ADMISSION_SERVICE_NAME` | `ante-chain` | Service name attached to logs |
//! | `ADMISSION_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `ADMISSION_JSON_LOGS` | `false` | Emit JSON lines instead of pretty output |
//! | `ADMISSION_METRICS_PORT` | `9100` | Port the host exposes `/metrics` on |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    encode_metrics, register_metrics, ADMISSIONS_TOTAL, ADMISSION_DURATION, GAS_CONSUMED,
    INTERNAL_FAULTS, REJECTIONS_TOTAL,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize log subscriber: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),
}

/// Initialize logging and register all admission metrics.
///
/// Fails if a global subscriber is already installed or a metric is already
/// registered; hosts call this once at startup.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    init_logging(config)?;
    tracing::info!(
        service = %config.service_name,
        metrics_port = config.metrics_port,
        "Telemetry initialized"
    );
    Ok(())
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}

/// Convenience macro for recording a metric with a value.
#[macro_export]
macro_rules! metric_observe {
    ($metric:expr, $value:expr) => {
        $metric.observe($value)
    };
    ($metric:expr, $labels:expr, $value:expr) => {
        $metric.with_label_values($labels).observe($value)
    };
}
