//! OpenTelemetry instrumentation wrapper for AWS Lambda function handlers.
//!
//! This crate sits between the Lambda runtime and a user handler: it derives
//! a parent trace context from the inbound trigger (API Gateway headers, SQS
//! message attributes, or X-Ray environment propagation), runs the handler
//! inside a span carrying FaaS attributes, and force-flushes telemetry before
//! the execution environment may be frozen.
//!
//! # Architecture
//!
//! - [`telemetry`]: one-time pipeline initialization at cold start
//! - [`propagation`]: parent-context precedence across propagation formats
//! - [`extractors`]: per-trigger span attributes and propagation carriers
//! - [`handler`]: the span lifecycle around each invocation
//! - [`flush`]: deadline-bounded forced export after span closure
//! - [`config`] and [`registry`]: handler-path resolution, validated at cold start
//! - [`instrumentation`]: optional instrumentation loading with per-item recovery
//!
//! Control flow per invocation: event → carrier extraction → parent context →
//! handler span → forced flush → result to the runtime. The handler's result
//! (or error) is always returned unchanged; telemetry failures are logged,
//! never raised.
//!
//! # Wrapping a handler directly
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
//!
//! # Resolving the handler from the environment
//!
//! With [`run_registered`] the handler is picked by the `ORIG_HANDLER` (or
//! `_HANDLER`) path at cold start, mirroring how wrapper layers select the
//! original handler. Missing or malformed configuration fails initialization
//! immediately; no invocation is attempted.
//!
//! ```no_run
//! use lambda_otel_wrap::{run_registered, HandlerRegistry, InstrumentationRegistry};
//! use lambda_runtime::{Error, LambdaEvent};
//! use serde_json::{json, Value};
//!
//! async fn process_order(event: LambdaEvent<Value>) -> Result<Value, Error> {
//!     Ok(json!({"statusCode": 200}))
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let mut handlers = HandlerRegistry::new();
//!     handlers.register("app.process_order", process_order)?;
//!     run_registered(handlers, InstrumentationRegistry::new()).await
//! }
//! ```

pub mod config;
mod constants;
pub mod extractors;
pub mod flush;
pub mod handler;
pub mod instrumentation;
mod logger;
pub mod propagation;
pub mod registry;
pub mod resource;
pub mod telemetry;

pub use config::{ConfigError, ExporterSelection, HandlerPath, PropagatorSelection, WrapperConfig};
pub use extractors::{SpanAttributes, SpanAttributesExtractor, TriggerType};
pub use flush::{FlushOutcome, TelemetryHandle};
pub use handler::{
    invoke_with_span, traced_handler, traced_handler_with_extractor, wrap_handler,
};
pub use instrumentation::{Instrumentation, InstrumentationRegistry};
pub use propagation::{determine_parent_context, LambdaXrayPropagator};
pub use registry::{HandlerRegistry, RegisteredHandler};
pub use resource::get_lambda_resource;
pub use telemetry::{init_telemetry, TelemetryConfig};

use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde::{de::DeserializeOwned, Serialize};

/// Resolve the configured handler, initialize telemetry, and run the runtime.
///
/// The cold-start sequence is strict: configuration is validated first (a
/// missing or malformed handler path aborts before anything else happens),
/// then the pipeline comes up, then optional instrumentations load with
/// per-item error recovery, and only then does the runtime start taking
/// invocations. The span around each invocation is named after the
/// fully-qualified handler path.
pub async fn run_registered<T, R>(
    handlers: HandlerRegistry<T, R>,
    instrumentations: InstrumentationRegistry,
) -> Result<(), Error>
where
    T: SpanAttributesExtractor + DeserializeOwned + Serialize + Send + 'static,
    R: Serialize + Send + 'static,
{
    let config = WrapperConfig::from_env()?;
    let (_tracer, telemetry) = init_telemetry(TelemetryConfig::default())?;
    instrumentations.load_enabled();

    let handler = handlers.resolve(&config.handler)?;
    let name: &'static str = Box::leak(config.handler.qualified().into_boxed_str());

    let wrapped = wrap_handler(name, telemetry, move |event: LambdaEvent<T>| handler(event));
    lambda_runtime::run(service_fn(wrapped)).await
}
