//! Forced telemetry flush before the execution environment can freeze.
//!
//! Lambda may suspend the process immediately after the handler returns, and
//! a suspended environment can be reclaimed instead of resumed. Anything still
//! sitting in the span pipeline's buffer at that point is lost. The
//! [`TelemetryHandle`] therefore drains the pipeline synchronously at the end
//! of every invocation, bounded by a deadline so a stuck exporter cannot eat
//! the remaining invocation time.
//!
//! Flushing is strictly best-effort: a timeout or export failure is logged
//! and reported as a [`FlushOutcome`], never raised, and never changes what
//! the caller receives from the handler.

use crate::logger::Logger;
use opentelemetry::InstrumentationScope;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

static LOGGER: Logger = Logger::new("flush");

/// Result of one forced flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Everything buffered was handed to the exporters.
    Flushed,
    /// The pipeline reported an export failure; some spans may be lost.
    Partial,
    /// The deadline elapsed before the pipeline drained.
    TimedOut,
}

/// Process-wide handle to the tracer pipeline.
///
/// Created once at cold start by [`crate::telemetry::init_telemetry`] and
/// cloned into each invocation; cloning shares the same provider. The handle
/// never mutates global configuration, it only triggers per-invocation
/// flushes.
#[derive(Clone)]
pub struct TelemetryHandle {
    provider: Arc<SdkTracerProvider>,
    tracer: opentelemetry_sdk::trace::Tracer,
    flush_timeout: Duration,
}

impl TelemetryHandle {
    pub(crate) fn new(provider: Arc<SdkTracerProvider>, flush_timeout: Duration) -> Self {
        let scope = InstrumentationScope::builder(env!("CARGO_PKG_NAME"))
            .with_version(Cow::Borrowed(env!("CARGO_PKG_VERSION")))
            .build();
        let tracer = provider.tracer_with_scope(scope);

        Self {
            provider,
            tracer,
            flush_timeout,
        }
    }

    /// The tracer carrying this crate's instrumentation scope.
    pub fn tracer(&self) -> &opentelemetry_sdk::trace::Tracer {
        &self.tracer
    }

    /// The configured flush deadline.
    pub fn flush_timeout(&self) -> Duration {
        self.flush_timeout
    }

    /// Drain the span pipeline, blocking the invocation until it is empty or
    /// the deadline elapses.
    ///
    /// Safe to call any number of times; flushing an empty pipeline succeeds
    /// immediately and exports nothing.
    pub async fn flush_pending(&self) -> FlushOutcome {
        let provider = self.provider.clone();
        let flush = tokio::task::spawn_blocking(move || provider.force_flush());

        match tokio::time::timeout(self.flush_timeout, flush).await {
            Ok(Ok(Ok(()))) => FlushOutcome::Flushed,
            Ok(Ok(Err(err))) => {
                LOGGER.warn(format!("error flushing telemetry: {:?}", err));
                FlushOutcome::Partial
            }
            Ok(Err(join_err)) => {
                LOGGER.warn(format!("flush task failed: {}", join_err));
                FlushOutcome::Partial
            }
            Err(_elapsed) => {
                LOGGER.warn(format!(
                    "telemetry flush did not finish within {:?}",
                    self.flush_timeout
                ));
                FlushOutcome::TimedOut
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::Context;
    use opentelemetry_sdk::error::{OTelSdkError, OTelSdkResult};
    use opentelemetry_sdk::trace::{Span, SpanData, SpanProcessor};
    use opentelemetry_sdk::Resource;
    use std::time::Duration;

    #[derive(Debug)]
    struct SlowProcessor {
        delay: Duration,
    }

    impl SpanProcessor for SlowProcessor {
        fn on_start(&self, _span: &mut Span, _cx: &Context) {}
        fn on_end(&self, _span: SpanData) {}
        fn force_flush(&self) -> OTelSdkResult {
            std::thread::sleep(self.delay);
            Ok(())
        }
        fn shutdown(&self) -> OTelSdkResult {
            Ok(())
        }
    }

    #[derive(Debug)]
    struct FailingProcessor;

    impl SpanProcessor for FailingProcessor {
        fn on_start(&self, _span: &mut Span, _cx: &Context) {}
        fn on_end(&self, _span: SpanData) {}
        fn force_flush(&self) -> OTelSdkResult {
            Err(OTelSdkError::InternalFailure("exporter unreachable".into()))
        }
        fn shutdown(&self) -> OTelSdkResult {
            Ok(())
        }
    }

    #[derive(Debug)]
    struct NoopProcessor;

    impl SpanProcessor for NoopProcessor {
        fn on_start(&self, _span: &mut Span, _cx: &Context) {}
        fn on_end(&self, _span: SpanData) {}
        fn force_flush(&self) -> OTelSdkResult {
            Ok(())
        }
        fn shutdown(&self) -> OTelSdkResult {
            Ok(())
        }
    }

    fn handle_with<P: SpanProcessor + 'static>(processor: P, timeout: Duration) -> TelemetryHandle {
        let provider = SdkTracerProvider::builder()
            .with_span_processor(processor)
            .with_resource(Resource::builder_empty().build())
            .build();
        TelemetryHandle::new(Arc::new(provider), timeout)
    }

    #[tokio::test]
    async fn test_flush_empty_pipeline_is_idempotent() {
        let handle = handle_with(NoopProcessor, Duration::from_secs(1));
        assert_eq!(handle.flush_pending().await, FlushOutcome::Flushed);
        assert_eq!(handle.flush_pending().await, FlushOutcome::Flushed);
    }

    #[tokio::test]
    async fn test_flush_failure_is_reported_not_raised() {
        let handle = handle_with(FailingProcessor, Duration::from_secs(1));
        assert_eq!(handle.flush_pending().await, FlushOutcome::Partial);
    }

    #[tokio::test]
    async fn test_flush_deadline_enforced() {
        let handle = handle_with(
            SlowProcessor {
                delay: Duration::from_millis(500),
            },
            Duration::from_millis(50),
        );
        assert_eq!(handle.flush_pending().await, FlushOutcome::TimedOut);
    }

    #[tokio::test]
    async fn test_flush_within_deadline_succeeds() {
        let handle = handle_with(
            SlowProcessor {
                delay: Duration::from_millis(10),
            },
            Duration::from_secs(1),
        );
        assert_eq!(handle.flush_pending().await, FlushOutcome::Flushed);
    }

    #[tokio::test]
    async fn test_clone_shares_pipeline() {
        let handle = handle_with(NoopProcessor, Duration::from_millis(750));
        let clone = handle.clone();
        assert_eq!(clone.flush_timeout(), Duration::from_millis(750));
        assert_eq!(clone.flush_pending().await, FlushOutcome::Flushed);
    }
}
