//! Telemetry initialization for Lambda functions.
//!
//! [`init_telemetry`] wires the whole pipeline once per process, at cold
//! start: propagators and exporters are resolved from the environment (or
//! overridden through [`TelemetryConfig`]), the Lambda resource is detected,
//! the provider is registered globally, and a `tracing` subscriber bridges
//! application spans into OpenTelemetry. The returned [`TelemetryHandle`]
//! is the only thing invocations touch afterwards; global configuration is
//! never mutated again. Re-initialization is guarded by an idempotent check
//! rather than relying on call-site discipline.
//!
//! # Configuration
//!
//! - `OTEL_TRACES_EXPORTER`: `otlp` (default, batched over HTTP), `console`
//!   (synchronous stdout), `none`, or a comma-joined combination
//! - `OTEL_PROPAGATORS`: `tracecontext` (default), `baggage`, `xray`,
//!   `xray-lambda`, `none`
//! - `OTEL_SERVICE_NAME` / `OTEL_RESOURCE_ATTRIBUTES`: resource configuration
//! - `LAMBDA_FLUSH_TIMEOUT_MS`: per-invocation flush deadline
//! - `RUST_LOG` / `AWS_LAMBDA_LOG_LEVEL`: subscriber filter
//! - `LAMBDA_TRACING_ENABLE_FMT_LAYER` / `AWS_LAMBDA_LOG_FORMAT`: console output
//!
//! # Example
//!
//! ```no_run
//! use lambda_otel_wrap::{init_telemetry, traced_handler, TelemetryConfig};
//! use lambda_runtime::{service_fn, Error, LambdaEvent};
//! use serde_json::Value;
//!
//! async fn handler(event: LambdaEvent<Value>) -> Result<Value, Error> {
//!     Ok(event.payload)
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let (_tracer, telemetry) = init_telemetry(TelemetryConfig::default())?;
//!     lambda_runtime::run(service_fn(|event| {
//!         traced_handler("app.handler", event, telemetry.clone(), handler)
//!     }))
//!     .await
//! }
//! ```

use crate::config::{self, ExporterSelection};
use crate::constants::{defaults, env_vars};
use crate::flush::TelemetryHandle;
use crate::logger::Logger;
use crate::propagation::build_propagators;
use crate::resource::get_lambda_resource;
use bon::Builder;
use lambda_runtime::Error;
use opentelemetry::global;
use opentelemetry::propagation::{TextMapCompositePropagator, TextMapPropagator};
use opentelemetry_otlp::{Protocol, WithExportConfig, WithHttpConfig};
use opentelemetry_sdk::{
    trace::{SpanProcessor, TracerProviderBuilder},
    Resource,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use std::{env, sync::Arc};
use tracing_subscriber::layer::SubscriberExt;

static LOGGER: Logger = Logger::new("telemetry");

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Configuration for telemetry initialization.
///
/// `TelemetryConfig::default()` resolves everything from the environment;
/// the builder overrides individual pieces.
///
/// ```no_run
/// use lambda_otel_wrap::TelemetryConfig;
/// use opentelemetry_sdk::Resource;
///
/// let config = TelemetryConfig::builder()
///     .resource(Resource::builder().with_service_name("orders-api").build())
///     .enable_fmt_layer(true)
///     .build();
/// ```
#[derive(Builder)]
pub struct TelemetryConfig {
    #[builder(field)]
    provider_builder: TracerProviderBuilder,

    #[builder(field)]
    has_processor: bool,

    #[builder(field)]
    propagators: Vec<Box<dyn TextMapPropagator + Send + Sync>>,

    /// Also print spans and events to the console. Useful for debugging,
    /// disabled by default.
    #[builder(default = defaults::ENABLE_FMT_LAYER)]
    pub enable_fmt_layer: bool,

    /// Register the provider as the global OpenTelemetry provider.
    #[builder(default = true)]
    pub set_global_provider: bool,

    /// Resource attributes; detected from the Lambda environment when absent.
    pub resource: Option<Resource>,

    /// Environment variable controlling the subscriber filter; `RUST_LOG`
    /// then `AWS_LAMBDA_LOG_LEVEL` when unset.
    pub env_var_name: Option<String>,

    /// Flush deadline; `LAMBDA_FLUSH_TIMEOUT_MS` or 3s when unset.
    pub flush_timeout: Option<Duration>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl<S: telemetry_config_builder::State> TelemetryConfigBuilder<S> {
    /// Add a span processor, replacing the environment-selected exporters.
    pub fn with_span_processor<T>(mut self, processor: T) -> Self
    where
        T: SpanProcessor + 'static,
    {
        self.provider_builder = self.provider_builder.with_span_processor(processor);
        self.has_processor = true;
        self
    }

    /// Add a propagator, replacing the environment-selected ones.
    /// Multiple propagators combine into a composite.
    pub fn with_propagator<T>(mut self, propagator: T) -> Self
    where
        T: TextMapPropagator + Send + Sync + 'static,
    {
        self.propagators.push(Box::new(propagator));
        self
    }
}

fn otlp_exporter() -> Result<opentelemetry_otlp::SpanExporter, Error> {
    // The blocking client keeps the export path independent of the handler's
    // async runtime, which may already be frozen mid-shutdown when the final
    // flush runs.
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_http_client(reqwest::blocking::Client::new())
        .with_protocol(Protocol::HttpBinary)
        .build()?;
    Ok(exporter)
}

/// Initialize OpenTelemetry for this process.
///
/// Returns a tracer for manual instrumentation and the [`TelemetryHandle`]
/// used to flush after each invocation. Intended to be called once at cold
/// start; later calls build a functioning local pipeline but leave global
/// state (propagator, provider, subscriber) untouched.
pub fn init_telemetry(
    mut config: TelemetryConfig,
) -> Result<(opentelemetry_sdk::trace::Tracer, TelemetryHandle), Error> {
    let first_init = !INITIALIZED.swap(true, Ordering::SeqCst);
    if !first_init {
        LOGGER.warn("init_telemetry called more than once; global configuration unchanged");
    }

    if config.propagators.is_empty() {
        config.propagators = build_propagators(&config::propagators_from_env());
    }
    if first_init {
        let composite = TextMapCompositePropagator::new(config.propagators);
        global::set_text_map_propagator(composite);
    }

    if !config.has_processor {
        for selection in config::exporters_from_env() {
            match selection {
                ExporterSelection::Otlp => {
                    config.provider_builder =
                        config.provider_builder.with_batch_exporter(otlp_exporter()?);
                }
                ExporterSelection::Console => {
                    config.provider_builder = config
                        .provider_builder
                        .with_simple_exporter(opentelemetry_stdout::SpanExporter::default());
                }
            }
        }
    }

    let resource = config.resource.unwrap_or_else(get_lambda_resource);
    let provider = Arc::new(config.provider_builder.with_resource(resource).build());

    if config.set_global_provider && first_init {
        global::set_tracer_provider(provider.as_ref().clone());
    }

    let flush_timeout = config
        .flush_timeout
        .unwrap_or_else(config::flush_timeout_from_env);
    let handle = TelemetryHandle::new(provider, flush_timeout);
    let tracer = handle.tracer().clone();

    if first_init {
        let env_var_name = config.env_var_name.as_deref().unwrap_or_else(|| {
            if env::var("RUST_LOG").is_ok() {
                "RUST_LOG"
            } else {
                "AWS_LAMBDA_LOG_LEVEL"
            }
        });
        let env_filter = tracing_subscriber::EnvFilter::builder()
            .with_env_var(env_var_name)
            .from_env_lossy();

        let subscriber = tracing_subscriber::registry::Registry::default()
            .with(tracing_opentelemetry::OpenTelemetryLayer::new(
                tracer.clone(),
            ))
            .with(env_filter);

        let enable_fmt_layer = config.enable_fmt_layer
            || env::var(env_vars::ENABLE_FMT_LAYER)
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false);

        if enable_fmt_layer {
            let is_json = env::var(env_vars::LOG_FORMAT)
                .unwrap_or_default()
                .to_uppercase()
                == "JSON";
            if is_json {
                tracing::subscriber::set_global_default(
                    subscriber.with(
                        tracing_subscriber::fmt::layer()
                            .with_target(false)
                            .without_time()
                            .json(),
                    ),
                )?;
            } else {
                tracing::subscriber::set_global_default(
                    subscriber.with(
                        tracing_subscriber::fmt::layer()
                            .with_target(false)
                            .without_time()
                            .with_ansi(false),
                    ),
                )?;
            }
        } else {
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    Ok((tracer, handle))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use opentelemetry::Context;
    use opentelemetry_sdk::error::OTelSdkResult;
    use opentelemetry_sdk::trace::{SdkTracerProvider, Span, SpanData};
    use std::sync::Mutex;

    pub(crate) type CapturedSpans = Arc<Mutex<Vec<SpanData>>>;

    /// Span processor that stores finished spans for assertions.
    #[derive(Debug)]
    pub(crate) struct CapturingProcessor {
        spans: CapturedSpans,
    }

    impl SpanProcessor for CapturingProcessor {
        fn on_start(&self, _span: &mut Span, _cx: &Context) {}

        fn on_end(&self, span: SpanData) {
            self.spans.lock().unwrap().push(span);
        }

        fn force_flush(&self) -> OTelSdkResult {
            Ok(())
        }

        fn shutdown(&self) -> OTelSdkResult {
            Ok(())
        }
    }

    /// Build a capturing pipeline and install its subscriber as the thread
    /// default. The guard must stay alive for the duration of the test.
    pub(crate) fn setup_capturing_telemetry() -> (
        TelemetryHandle,
        CapturedSpans,
        tracing::subscriber::DefaultGuard,
    ) {
        let spans: CapturedSpans = Arc::new(Mutex::new(Vec::new()));
        let provider = SdkTracerProvider::builder()
            .with_span_processor(CapturingProcessor {
                spans: spans.clone(),
            })
            .with_resource(Resource::builder_empty().build())
            .build();
        let handle = TelemetryHandle::new(Arc::new(provider), Duration::from_secs(1));
        let guard = tracing::subscriber::set_default(
            tracing_subscriber::registry::Registry::default().with(
                tracing_opentelemetry::OpenTelemetryLayer::new(handle.tracer().clone()),
            ),
        );
        (handle, spans, guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealed_test::prelude::*;

    #[sealed_test]
    fn test_init_with_console_exporter() {
        std::env::set_var(env_vars::TRACES_EXPORTER, "console");
        let (_tracer, handle) = init_telemetry(TelemetryConfig::default()).unwrap();
        assert_eq!(handle.flush_timeout(), defaults::FLUSH_TIMEOUT);
    }

    #[sealed_test]
    fn test_init_respects_flush_timeout_env() {
        std::env::set_var(env_vars::TRACES_EXPORTER, "none");
        std::env::set_var(env_vars::FLUSH_TIMEOUT, "1234");
        let (_tracer, handle) = init_telemetry(TelemetryConfig::default()).unwrap();
        assert_eq!(handle.flush_timeout(), Duration::from_millis(1234));
    }

    #[sealed_test]
    fn test_init_is_idempotent() {
        std::env::set_var(env_vars::TRACES_EXPORTER, "none");
        let first = init_telemetry(TelemetryConfig::default());
        assert!(first.is_ok());
        // Second call must not fail on already-registered globals.
        let second = init_telemetry(TelemetryConfig::default());
        assert!(second.is_ok());
    }

    #[sealed_test]
    fn test_config_builder_flags() {
        let config = TelemetryConfig::builder()
            .enable_fmt_layer(true)
            .set_global_provider(false)
            .flush_timeout(Duration::from_millis(500))
            .build();
        assert!(config.enable_fmt_layer);
        assert!(!config.set_global_provider);
        assert!(!config.has_processor);
        assert_eq!(config.flush_timeout, Some(Duration::from_millis(500)));
    }
}
