/// Prometheus metrics for provider calls.
///
/// Every request routed through the plugin host increments
/// `mock_providers_provider_requests_total` and observes its latency;
/// providers publish the size of their seeded data set as a gauge.
///
/// # Example
/// ```no_run
/// use ops_mock_providers::metrics::{init_metrics, gather_metrics};
///
/// init_metrics().expect("metrics registry");
/// println!("{}", gather_metrics());
/// ```

mod registry;

pub use registry::MetricsRegistry;

use lazy_static::lazy_static;
use once_cell::sync::OnceCell;
use prometheus::{GaugeVec, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

const NAMESPACE: &str = "mock_providers";

static INITIALIZED: OnceCell<()> = OnceCell::new();

lazy_static! {
    /// Registry holding every provider metric
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    /// Requests handled through the plugin host
    ///
    /// Labels: provider, capability, operation, status
    pub static ref PROVIDER_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("provider_requests_total", "Total number of provider requests")
            .namespace(NAMESPACE),
        &["provider", "capability", "operation", "status"]
    ).expect("Failed to create PROVIDER_REQUESTS_TOTAL metric");

    /// Provider request duration in seconds
    ///
    /// Labels: provider, capability
    pub static ref PROVIDER_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "provider_request_duration_seconds",
            "Provider request duration in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.00001, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1]),
        &["provider", "capability"]
    ).expect("Failed to create PROVIDER_REQUEST_DURATION_SECONDS metric");

    /// Records currently held by each provider
    ///
    /// Labels: provider
    pub static ref PROVIDER_SEEDED_RECORDS: GaugeVec = GaugeVec::new(
        Opts::new("provider_seeded_records", "Records held by each provider")
            .namespace(NAMESPACE),
        &["provider"]
    ).expect("Failed to create PROVIDER_SEEDED_RECORDS metric");
}

/// Register all metrics with the global registry. Safe to call repeatedly.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    INITIALIZED
        .get_or_try_init(|| {
            PROMETHEUS_REGISTRY.register(Box::new(PROVIDER_REQUESTS_TOTAL.clone()))?;
            PROMETHEUS_REGISTRY.register(Box::new(PROVIDER_REQUEST_DURATION_SECONDS.clone()))?;
            PROMETHEUS_REGISTRY.register(Box::new(PROVIDER_SEEDED_RECORDS.clone()))?;
            tracing::debug!("Provider metrics registered");
            Ok(())
        })
        .map(|_| ())
}

/// Record the outcome of one provider request
pub fn record_request(provider: &str, capability: &str, operation: &str, ok: bool, seconds: f64) {
    let status = if ok { "ok" } else { "error" };
    PROVIDER_REQUESTS_TOTAL
        .with_label_values(&[provider, capability, operation, status])
        .inc();
    PROVIDER_REQUEST_DURATION_SECONDS
        .with_label_values(&[provider, capability])
        .observe(seconds);
}

pub fn set_seeded_records(provider: &str, count: usize) {
    PROVIDER_SEEDED_RECORDS
        .with_label_values(&[provider])
        .set(count as f64);
}

/// Export the registry in Prometheus text format
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}
