use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::Arc;

pub const METRICS_NAMESPACE: &str = "iamtokenagent";

/// Prometheus metrics of one authenticator instance and the sinks fed by it.
#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Backend metrics
    pub token_requests: IntCounterVec,
    pub token_request_failures: IntCounterVec,
    pub token_request_duration: HistogramVec,

    // Credential metrics
    pub credential_reloads: IntCounterVec,

    // Token metrics
    pub token_lifetime_seconds: IntGauge,
    pub token_expiry_unix: IntGauge,

    // Sink metrics
    pub sink_propagations: IntCounterVec,
    pub sink_failures: IntCounterVec,

    pub up: IntGauge,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Arc<Self>> {
        let registry = Registry::new_custom(Some(METRICS_NAMESPACE.into()), None)?;

        let metrics = Self {
            token_requests: IntCounterVec::new(Opts::new("token_requests_total", "Authentication backend calls by call kind"), &["call"])?,
            token_request_failures: IntCounterVec::new(Opts::new("token_request_failures_total", "Failed token acquisitions by reason"), &["reason"])?,
            token_request_duration: HistogramVec::new(HistogramOpts::new("token_request_duration_seconds", "Authentication backend call duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]), &["call"])?,

            credential_reloads: IntCounterVec::new(Opts::new("credential_reloads_total", "Root credential reloads by result"), &["result"])?,

            token_lifetime_seconds: IntGauge::new("token_lifetime_seconds", "Remaining lifetime of the last issued token")?,
            token_expiry_unix: IntGauge::new("token_expiry_unix_seconds", "Expiry timestamp of the last issued token")?,

            sink_propagations: IntCounterVec::new(Opts::new("sink_propagations_total", "Total propagations"), &["sink"])?,
            sink_failures: IntCounterVec::new(Opts::new("sink_failures_total", "Sink failures"), &["sink", "reason"])?,

            up: IntGauge::new("up", "1 while the http server is serving")?,

            registry,
        };

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.token_requests.clone()))?;
        reg.register(Box::new(metrics.token_request_failures.clone()))?;
        reg.register(Box::new(metrics.token_request_duration.clone()))?;
        reg.register(Box::new(metrics.credential_reloads.clone()))?;
        reg.register(Box::new(metrics.token_lifetime_seconds.clone()))?;
        reg.register(Box::new(metrics.token_expiry_unix.clone()))?;
        reg.register(Box::new(metrics.sink_propagations.clone()))?;
        reg.register(Box::new(metrics.sink_failures.clone()))?;
        reg.register(Box::new(metrics.up.clone()))?;

        Ok(Arc::new(metrics))
    }
}
