//! Prometheus metrics for the admission pipeline.
//!
//! All metrics follow the naming convention: `ante_<area>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Histogram, HistogramOpts, HistogramVec,
    Opts, Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Admission attempts by variant and outcome
    pub static ref ADMISSIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("ante_admission_transactions_total", "Transactions run through the ante pipeline"),
        &["variant", "outcome"]  // outcome: accepted/rejected
    ).expect("metric creation failed");

    /// Rejections by error kind
    pub static ref REJECTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("ante_admission_rejections_total", "Rejected transactions by error kind"),
        &["kind"]
    ).expect("metric creation failed");

    /// Faults recovered at the pipeline boundary (for alerting)
    pub static ref INTERNAL_FAULTS: Counter = Counter::new(
        "ante_admission_internal_faults_total",
        "Unexpected faults converted into rejections"
    ).expect("metric creation failed");

    /// Gas consumed by accepted transactions during admission
    pub static ref GAS_CONSUMED: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "ante_admission_gas_consumed",
            "Gas consumed by the ante pipeline per accepted transaction"
        ).buckets(exponential_buckets(1000.0, 2.0, 12).expect("valid buckets"))
    ).expect("metric creation failed");

    /// Pipeline wall-clock duration
    pub static ref ADMISSION_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "ante_admission_duration_seconds",
            "Time spent running the ante pipeline"
        ).buckets(exponential_buckets(0.00001, 2.0, 15).expect("valid buckets")),
        &["variant"]
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(ADMISSIONS_TOTAL.clone()),
        Box::new(REJECTIONS_TOTAL.clone()),
        Box::new(INTERNAL_FAULTS.clone()),
        Box::new(GAS_CONSUMED.clone()),
        Box::new(ADMISSION_DURATION.clone()),
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

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}
