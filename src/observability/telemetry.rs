use std::sync::Arc;

use tracing::{info_span, Span};

use crate::observability::metrics::Metrics;

/// Logging and metrics sink handed to an authenticator at construction.
#[derive(Clone)]
pub struct Telemetry {
    span: Span,
    metrics: Arc<Metrics>,
}

impl Telemetry {
    pub fn new(span: Span, metrics: Arc<Metrics>) -> Self {
        Self { span, metrics }
    }

    /// Span named after the identity plus a fresh metrics registry.
    pub fn for_identity(name: &str) -> prometheus::Result<Self> {
        Ok(Self::new(info_span!("identity", name = %name), Metrics::new()?))
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }
}
