//! Trace context propagation for AWS Lambda.
//!
//! This module decides, for one invocation, which upstream trace context the
//! handler span resumes. The precedence protocol:
//!
//! 1. The `_X_AMZN_TRACE_ID` environment header is parsed through the X-Ray
//!    propagator. If it yields a valid context that is sampled ("active
//!    tracing"), that context wins outright: the platform made its sampling
//!    decision before the function started, and application-level headers may
//!    be stale, absent, or unsampled.
//! 2. Otherwise the event-derived carrier (headers or queue message
//!    attributes, built by the extractors) goes through the globally
//!    configured composite propagator.
//! 3. No carrier, or nothing extractable, means no parent: the invocation
//!    starts a fresh trace root.
//!
//! Malformed headers never raise; they produce an invalid context that is
//! ignored, falling through to the next step.

use crate::config::PropagatorSelection;
use crate::constants::env_vars;
use crate::logger::Logger;
use opentelemetry::{
    global,
    propagation::{text_map_propagator::FieldIter, Extractor, Injector, TextMapPropagator},
    trace::TraceContextExt,
    Context,
};
use opentelemetry_aws::trace::XrayPropagator;
use opentelemetry_sdk::propagation::{BaggagePropagator, TraceContextPropagator};
use std::{collections::HashMap, env};

static LOGGER: Logger = Logger::new("propagation");

/// The X-Ray trace header name used in carriers.
const XRAY_HEADER: &str = "x-amzn-trace-id";

fn has_active_span(cx: &Context) -> bool {
    cx.span().span_context().is_valid()
}

/// Parse the `_X_AMZN_TRACE_ID` environment header into a remote context.
///
/// Returns `None` when the variable is unset or unparsable; a malformed header
/// is logged at debug level and swallowed.
pub fn xray_context_from_env() -> Option<Context> {
    let header = env::var(env_vars::XRAY_TRACE_HEADER).ok()?;
    let carrier = HashMap::from([(XRAY_HEADER.to_string(), header)]);
    let cx = XrayPropagator::default().extract(&carrier);
    if has_active_span(&cx) {
        Some(cx)
    } else {
        LOGGER.debug(format!(
            "{} present but not parsable as a trace header",
            env_vars::XRAY_TRACE_HEADER
        ));
        None
    }
}

/// Determine the parent context for one invocation.
///
/// `carrier` is the event-derived propagation carrier, if the event had one.
/// The environment-level X-Ray context takes absolute precedence when it is
/// sampled; an unsampled or absent one falls through to carrier extraction.
/// The returned context has no active span when there is no parent to resume.
pub fn determine_parent_context(carrier: Option<&HashMap<String, String>>) -> Context {
    if let Some(cx) = xray_context_from_env() {
        if cx.span().span_context().is_sampled() {
            LOGGER.debug("using sampled X-Ray trace context from environment");
            return cx;
        }
        LOGGER.debug("environment X-Ray context is unsampled, trying event carrier");
    }

    match carrier {
        Some(carrier) => global::get_text_map_propagator(|propagator| propagator.extract(carrier)),
        None => Context::new(),
    }
}

/// X-Ray propagator with a fallback to the Lambda environment.
///
/// Extracts from the carrier first; when the carrier has no valid X-Ray
/// header, the `_X_AMZN_TRACE_ID` environment variable is consulted instead.
/// Selected with the `xray-lambda` propagator name.
#[derive(Debug, Default)]
pub struct LambdaXrayPropagator {
    inner: XrayPropagator,
}

impl LambdaXrayPropagator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TextMapPropagator for LambdaXrayPropagator {
    fn inject_context(&self, cx: &Context, injector: &mut dyn Injector) {
        self.inner.inject_context(cx, injector)
    }

    fn extract_with_context(&self, cx: &Context, extractor: &dyn Extractor) -> Context {
        let extracted = self.inner.extract_with_context(cx, extractor);
        if has_active_span(&extracted) {
            return extracted;
        }
        match xray_context_from_env() {
            Some(env_cx) => env_cx,
            None => extracted,
        }
    }

    fn fields(&self) -> FieldIter<'_> {
        self.inner.fields()
    }
}

/// Build propagator instances for the configured selections.
pub(crate) fn build_propagators(
    selections: &[PropagatorSelection],
) -> Vec<Box<dyn TextMapPropagator + Send + Sync>> {
    selections
        .iter()
        .map(|selection| -> Box<dyn TextMapPropagator + Send + Sync> {
            match selection {
                PropagatorSelection::TraceContext => Box::new(TraceContextPropagator::new()),
                PropagatorSelection::Baggage => Box::new(BaggagePropagator::new()),
                PropagatorSelection::Xray => Box::new(XrayPropagator::default()),
                PropagatorSelection::XrayLambda => Box::new(LambdaXrayPropagator::new()),
            }
        })
        .collect()
}
