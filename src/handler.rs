//! Span lifecycle around a single handler invocation.
//!
//! [`invoke_with_span`] owns the one span that exists per invocation: it is
//! created after context extraction, entered for exactly one handler call,
//! closed on every exit path (normal or error), and only then is the flush
//! coordinator signalled. Handler errors propagate unchanged to the caller
//! after the span is marked as errored; the wrapper never swallows or rewrites
//! them.
//!
//! [`traced_handler`] is the per-invocation entry point for events whose types
//! implement [`SpanAttributesExtractor`]; [`traced_handler_with_extractor`]
//! substitutes a caller-supplied extraction closure for the default event
//! logic. [`wrap_handler`] composes either into a reusable service closure at
//! startup.

use crate::extractors::{
    set_common_attributes, set_response_attributes, SpanAttributes, SpanAttributesExtractor,
};
use crate::flush::TelemetryHandle;
use crate::propagation::determine_parent_context;
use futures_util::future::BoxFuture;
use lambda_runtime::{Error, LambdaEvent};
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::field::Empty;
use tracing::Instrument;
use tracing_opentelemetry::OpenTelemetrySpanExt;

static IS_COLD_START: AtomicBool = AtomicBool::new(true);

/// Run one handler invocation inside its span.
///
/// The span state machine is linear: created here, active for the single
/// handler call, closed when this function's inner scope ends, in that order
/// on every path. Flushing happens strictly after closure so the span is
/// always part of what gets exported.
pub async fn invoke_with_span<T, R, F, Fut>(
    name: &str,
    attrs: SpanAttributes,
    event: LambdaEvent<T>,
    telemetry: TelemetryHandle,
    handler_fn: F,
) -> Result<R, Error>
where
    T: DeserializeOwned + Serialize + Send + 'static,
    R: Serialize + Send + 'static,
    F: FnOnce(LambdaEvent<T>) -> Fut,
    Fut: Future<Output = Result<R, Error>> + Send,
{
    let result = {
        let span = tracing::info_span!(
            parent: None,
            "handler",
            otel.name = Empty,
            otel.kind = Empty,
            otel.status_code = Empty,
            otel.status_message = Empty,
            requestId = %event.context.request_id,
        );

        span.record("otel.name", name);
        span.record("otel.kind", attrs.kind.as_deref().unwrap_or("SERVER"));
        if let Some(span_name) = &attrs.span_name {
            span.record("otel.name", span_name.as_str());
        }

        let is_cold = IS_COLD_START.swap(false, Ordering::Relaxed);
        set_common_attributes(&span, &event.context, is_cold);
        span.set_attribute("faas.trigger", attrs.trigger.clone());

        for (key, value) in &attrs.attributes {
            span.set_attribute(key.clone(), value.to_string());
        }
        for link in attrs.links {
            span.add_link_with_attributes(link.span_context, link.attributes);
        }

        // Context extraction strictly precedes span activation; the
        // environment-level X-Ray decision is applied even when the event
        // carried no headers at all.
        let parent_context = determine_parent_context(attrs.carrier.as_ref());
        span.set_parent(parent_context);

        let result = handler_fn(event).instrument(span.clone()).await;

        match &result {
            Ok(response) => {
                if let Ok(value) = serde_json::to_value(response) {
                    set_response_attributes(&span, &value);
                }
            }
            Err(error) => {
                span.set_status(opentelemetry::trace::Status::error(error.to_string()));
            }
        }

        result
    };

    // Span is closed; export whatever is buffered before the environment can freeze.
    telemetry.flush_pending().await;
    result
}

/// Wrap one invocation of a handler whose event type describes its own span
/// attributes.
pub async fn traced_handler<T, R, F, Fut>(
    name: &str,
    event: LambdaEvent<T>,
    telemetry: TelemetryHandle,
    handler_fn: F,
) -> Result<R, Error>
where
    T: SpanAttributesExtractor + DeserializeOwned + Serialize + Send + 'static,
    R: Serialize + Send + 'static,
    F: FnOnce(LambdaEvent<T>) -> Fut,
    Fut: Future<Output = Result<R, Error>> + Send,
{
    let attrs = event.payload.extract_span_attributes();
    invoke_with_span(name, attrs, event, telemetry, handler_fn).await
}

/// Wrap one invocation with a caller-supplied attribute extractor.
///
/// The closure replaces the default event extraction entirely; the
/// environment-level X-Ray precedence still applies on top of whatever
/// carrier it returns.
pub async fn traced_handler_with_extractor<T, R, F, Fut, X>(
    name: &str,
    event: LambdaEvent<T>,
    telemetry: TelemetryHandle,
    extractor: X,
    handler_fn: F,
) -> Result<R, Error>
where
    T: DeserializeOwned + Serialize + Send + 'static,
    R: Serialize + Send + 'static,
    F: FnOnce(LambdaEvent<T>) -> Fut,
    Fut: Future<Output = Result<R, Error>> + Send,
    X: FnOnce(&LambdaEvent<T>) -> SpanAttributes,
{
    let attrs = extractor(&event);
    invoke_with_span(name, attrs, event, telemetry, handler_fn).await
}

/// Compose a handler into an instrumented service closure at startup.
///
/// The returned closure has a fixed signature suitable for
/// `lambda_runtime::service_fn`, so instrumentation is a one-time composition
/// rather than per-call-site wiring.
pub fn wrap_handler<T, R, F, Fut>(
    name: &'static str,
    telemetry: TelemetryHandle,
    handler_fn: F,
) -> impl Fn(LambdaEvent<T>) -> BoxFuture<'static, Result<R, Error>> + Clone
where
    T: SpanAttributesExtractor + DeserializeOwned + Serialize + Send + 'static,
    R: Serialize + Send + 'static,
    F: Fn(LambdaEvent<T>) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<R, Error>> + Send + 'static,
{
    move |event| {
        let telemetry = telemetry.clone();
        let handler_fn = handler_fn.clone();
        Box::pin(traced_handler(name, event, telemetry, handler_fn))
    }
}
