//! Observability setup: structured logging with optional OpenTelemetry export.

pub mod tracing_setup;

pub use tracing_setup::{LogFormat, ObserveError, TracingOptions, init_tracing, shutdown_tracing};
