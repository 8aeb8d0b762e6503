//! Cold-start configuration from the Lambda environment.
//!
//! Everything that can fail permanently is resolved here, before the first
//! invocation: the handler path, exporter and propagator selections, and the
//! flush deadline. A misconfigured function fails at initialization with a
//! descriptive error instead of failing identically on every invocation.

use crate::constants::{defaults, env_vars};
use crate::logger::Logger;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

static LOGGER: Logger = Logger::new("config");

/// Fatal configuration errors surfaced at cold start.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither `ORIG_HANDLER` nor `_HANDLER` is set.
    #[error("handler path not configured: neither {0} nor {1} is set")]
    MissingHandler(&'static str, &'static str),

    /// The handler path has no `module.function` separator.
    #[error("malformed handler path `{0}`: expected `module.function` or `path/to/module.function`")]
    MalformedHandlerPath(String),

    /// No handler was registered under the configured path.
    #[error("no handler registered for `{0}`")]
    UnknownHandler(String),
}

/// Parsed handler location, `module` and `function` halves of the configured path.
///
/// Slashes in the raw value are treated as module-path separators, so
/// `path/to/module.function` and `path.to.module.function` resolve identically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerPath {
    module: String,
    function: String,
}

impl HandlerPath {
    /// Parse a raw handler path string.
    ///
    /// The split is on the last `.` so module paths may themselves be dotted.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let normalized = raw.trim().replace('/', ".");
        match normalized.rsplit_once('.') {
            Some((module, function)) if !module.is_empty() && !function.is_empty() => Ok(Self {
                module: module.to_string(),
                function: function.to_string(),
            }),
            _ => Err(ConfigError::MalformedHandlerPath(raw.to_string())),
        }
    }

    /// Read the handler path from `ORIG_HANDLER`, falling back to `_HANDLER`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = env::var(env_vars::ORIG_HANDLER)
            .or_else(|_| env::var(env_vars::HANDLER))
            .map_err(|_| {
                ConfigError::MissingHandler(env_vars::ORIG_HANDLER, env_vars::HANDLER)
            })?;
        Self::parse(&raw)
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    /// The fully-qualified `module.function` identifier, used as the span name.
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.module, self.function)
    }
}

impl fmt::Display for HandlerPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.function)
    }
}

/// Span exporters selectable through `OTEL_TRACES_EXPORTER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExporterSelection {
    /// OTLP over HTTP, exported through a batching pipeline.
    Otlp,
    /// Spans written to stdout, exported synchronously.
    Console,
}

/// Context propagators selectable through `OTEL_PROPAGATORS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagatorSelection {
    /// W3C `traceparent`/`tracestate`.
    TraceContext,
    /// W3C `baggage`.
    Baggage,
    /// AWS X-Ray `x-amzn-trace-id` header.
    Xray,
    /// X-Ray with fallback to the `_X_AMZN_TRACE_ID` environment variable.
    XrayLambda,
}

/// Split a comma-separated environment list into trimmed, non-empty entries.
pub(crate) fn env_list(var: &str) -> Option<Vec<String>> {
    let raw = env::var(var).ok()?;
    Some(
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

/// Resolve the exporter selection from `OTEL_TRACES_EXPORTER`.
///
/// Unknown names are logged and skipped; `none` suppresses all exporters.
/// An unset or empty variable selects OTLP.
pub fn exporters_from_env() -> Vec<ExporterSelection> {
    let entries = match env_list(env_vars::TRACES_EXPORTER) {
        Some(entries) if !entries.is_empty() => entries,
        _ => return vec![ExporterSelection::Otlp],
    };

    let mut selections = Vec::new();
    for entry in &entries {
        match entry.to_lowercase().as_str() {
            "otlp" => selections.push(ExporterSelection::Otlp),
            "console" | "stdout" => selections.push(ExporterSelection::Console),
            "none" => return Vec::new(),
            other => {
                LOGGER.warn(format!(
                    "unknown exporter `{}` in {}, skipping",
                    other,
                    env_vars::TRACES_EXPORTER
                ));
            }
        }
    }
    if selections.is_empty() {
        LOGGER.warn(format!(
            "no usable exporter in {}, falling back to otlp",
            env_vars::TRACES_EXPORTER
        ));
        selections.push(ExporterSelection::Otlp);
    }
    selections
}

/// Resolve the propagator selection from `OTEL_PROPAGATORS`.
///
/// Unknown names are logged and skipped; `none` disables extraction entirely.
/// An unset or empty variable selects the W3C trace context propagator.
pub fn propagators_from_env() -> Vec<PropagatorSelection> {
    let entries = match env_list(env_vars::PROPAGATORS) {
        Some(entries) if !entries.is_empty() => entries,
        _ => return vec![PropagatorSelection::TraceContext],
    };

    let mut selections = Vec::new();
    for entry in &entries {
        match entry.to_lowercase().as_str() {
            "tracecontext" => selections.push(PropagatorSelection::TraceContext),
            "baggage" => selections.push(PropagatorSelection::Baggage),
            "xray" => selections.push(PropagatorSelection::Xray),
            "xray-lambda" => selections.push(PropagatorSelection::XrayLambda),
            "none" => return Vec::new(),
            other => {
                LOGGER.warn(format!(
                    "unknown propagator `{}` in {}, skipping",
                    other,
                    env_vars::PROPAGATORS
                ));
            }
        }
    }
    if selections.is_empty() {
        LOGGER.warn(format!(
            "no usable propagator in {}, falling back to tracecontext",
            env_vars::PROPAGATORS
        ));
        selections.push(PropagatorSelection::TraceContext);
    }
    selections
}

/// Resolve the flush deadline from `LAMBDA_FLUSH_TIMEOUT_MS`.
pub fn flush_timeout_from_env() -> Duration {
    env::var(env_vars::FLUSH_TIMEOUT)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(defaults::FLUSH_TIMEOUT)
}

/// Resolve the service name: `OTEL_SERVICE_NAME`, then the function name.
pub fn service_name_from_env() -> String {
    env::var(env_vars::SERVICE_NAME)
        .or_else(|_| env::var(env_vars::AWS_LAMBDA_FUNCTION_NAME))
        .unwrap_or_else(|_| defaults::SERVICE_NAME.to_string())
}

/// Aggregated cold-start configuration.
#[derive(Debug, Clone)]
pub struct WrapperConfig {
    /// Parsed handler location.
    pub handler: HandlerPath,
    /// Deadline for the post-invocation flush.
    pub flush_timeout: Duration,
    /// Service name for telemetry.
    pub service_name: String,
}

impl WrapperConfig {
    /// Build the configuration from the environment, failing fast on fatal errors.
    pub fn from_env() -> Result<Self, ConfigError> {
        let handler = HandlerPath::from_env()?;
        let config = Self {
            handler,
            flush_timeout: flush_timeout_from_env(),
            service_name: service_name_from_env(),
        };
        LOGGER.debug(format!(
            "resolved handler `{}`, flush timeout {:?}",
            config.handler, config.flush_timeout
        ));
        Ok(config)
    }
}
