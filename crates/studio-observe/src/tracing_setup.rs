//! Tracing subscriber initialization.
//!
//! ```no_run
//! use studio_observe::{TracingOptions, init_tracing, shutdown_tracing};
//!
//! init_tracing(&TracingOptions::default()).unwrap();
//! // ...
//! shutdown_tracing();
//! ```

use std::sync::OnceLock;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, Layer};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,studio_core=debug,studio_infra=debug";

const TRACER_NAME: &str = "studio";

static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

#[derive(Debug, Error)]
pub enum ObserveError {
    #[error("invalid log filter '{filter}': {message}")]
    Filter { filter: String, message: String },

    #[error("global subscriber already installed: {0}")]
    AlreadyInstalled(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingOptions {
    /// Bridge spans to OpenTelemetry with a stdout exporter.
    pub enable_otel: bool,
    pub format: LogFormat,
    /// Overrides `RUST_LOG` when set.
    pub filter: Option<String>,
}

impl Default for TracingOptions {
    fn default() -> Self {
        Self {
            enable_otel: false,
            format: LogFormat::Pretty,
            filter: None,
        }
    }
}

/// Resolve the filter: explicit directive, else `RUST_LOG`, else [`DEFAULT_FILTER`].
pub fn build_filter(explicit: Option<&str>) -> Result<EnvFilter, ObserveError> {
    let parse = |filter: &str| {
        EnvFilter::try_new(filter).map_err(|e| ObserveError::Filter {
            filter: filter.to_string(),
            message: e.to_string(),
        })
    };
    match explicit {
        Some(filter) => parse(filter),
        None => EnvFilter::try_from_default_env().or_else(|_| parse(DEFAULT_FILTER)),
    }
}

/// Install the global subscriber.
///
/// Fails when a subscriber is already installed; the OTel provider is then
/// left unregistered.
pub fn init_tracing(options: &TracingOptions) -> Result<(), ObserveError> {
    let filter = build_filter(options.filter.as_deref())?;

    let fmt_layer = match options.format {
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .boxed(),
    };

    let registry = tracing_subscriber::registry().with(filter).with(fmt_layer);

    if options.enable_otel {
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build();
        let otel_layer = tracing_opentelemetry::layer().with_tracer(provider.tracer(TRACER_NAME));

        registry
            .with(otel_layer)
            .try_init()
            .map_err(|e| ObserveError::AlreadyInstalled(e.to_string()))?;

        let _ = TRACER_PROVIDER.set(provider.clone());
        opentelemetry::global::set_tracer_provider(provider);
    } else {
        registry
            .try_init()
            .map_err(|e| ObserveError::AlreadyInstalled(e.to_string()))?;
    }

    tracing::debug!(otel = options.enable_otel, format = ?options.format, "tracing initialized");
    Ok(())
}

/// Flush and shut down the OTel provider. No-op when OTel was not enabled.
pub fn shutdown_tracing() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(e) = provider.shutdown() {
            eprintln!("Warning: OTel tracer provider shutdown error: {e}");
        }
    }
}
