pub mod metrics;
pub mod routes;
pub mod telemetry;
