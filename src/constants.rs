//! Constants for the lambda-otel-wrap crate.
//!
//! Centralizes environment variable names and default values so the rest of
//! the codebase has a single source of truth for configuration parameters.

/// Environment variable names for configuration.
pub mod env_vars {
    /// Original handler path in `module.function` form. Takes precedence over
    /// the runtime-provided `_HANDLER`.
    pub const ORIG_HANDLER: &str = "ORIG_HANDLER";

    /// Handler path provided by the Lambda runtime.
    pub const HANDLER: &str = "_HANDLER";

    /// X-Ray trace header set by the Lambda platform before the function starts.
    pub const XRAY_TRACE_HEADER: &str = "_X_AMZN_TRACE_ID";

    /// Comma-separated list of span exporters to use.
    /// Valid values: otlp, console, none
    pub const TRACES_EXPORTER: &str = "OTEL_TRACES_EXPORTER";

    /// Comma-separated list of context propagators to use.
    /// Valid values: tracecontext, baggage, xray, xray-lambda, none
    pub const PROPAGATORS: &str = "OTEL_PROPAGATORS";

    /// Service name for telemetry.
    pub const SERVICE_NAME: &str = "OTEL_SERVICE_NAME";

    /// Resource attributes in KEY=VALUE,KEY2=VALUE2 format.
    pub const RESOURCE_ATTRIBUTES: &str = "OTEL_RESOURCE_ATTRIBUTES";

    /// Comma-separated list of instrumentations to enable (defaults to all registered).
    pub const ENABLED_INSTRUMENTATIONS: &str = "OTEL_LAMBDA_ENABLED_INSTRUMENTATIONS";

    /// Comma-separated list of instrumentations to disable.
    pub const DISABLED_INSTRUMENTATIONS: &str = "OTEL_LAMBDA_DISABLED_INSTRUMENTATIONS";

    /// Deadline in milliseconds for the forced flush after each invocation.
    pub const FLUSH_TIMEOUT: &str = "LAMBDA_FLUSH_TIMEOUT_MS";

    /// Controls whether to enable the fmt layer for logging regardless of code settings.
    /// Set to "true" to force enable logging output.
    pub const ENABLE_FMT_LAYER: &str = "LAMBDA_TRACING_ENABLE_FMT_LAYER";

    /// Log format selected by the Lambda platform ("JSON" or text).
    pub const LOG_FORMAT: &str = "AWS_LAMBDA_LOG_FORMAT";

    /// AWS Lambda function name (used as fallback service name).
    pub const AWS_LAMBDA_FUNCTION_NAME: &str = "AWS_LAMBDA_FUNCTION_NAME";

    /// AWS Lambda function version.
    pub const AWS_LAMBDA_FUNCTION_VERSION: &str = "AWS_LAMBDA_FUNCTION_VERSION";

    /// AWS Lambda configured memory, in megabytes.
    pub const AWS_LAMBDA_FUNCTION_MEMORY_SIZE: &str = "AWS_LAMBDA_FUNCTION_MEMORY_SIZE";

    /// AWS Lambda log stream, used as the instance id.
    pub const AWS_LAMBDA_LOG_STREAM_NAME: &str = "AWS_LAMBDA_LOG_STREAM_NAME";

    /// AWS region the function runs in.
    pub const AWS_REGION: &str = "AWS_REGION";
}

/// Default values for configuration parameters.
pub mod defaults {
    use std::time::Duration;

    /// Default deadline for the post-invocation flush.
    pub const FLUSH_TIMEOUT: Duration = Duration::from_secs(3);

    /// Default service name if neither OTEL_SERVICE_NAME nor the function name is set.
    pub const SERVICE_NAME: &str = "unknown_service";

    /// Default value for enabling the fmt layer from the environment.
    pub const ENABLE_FMT_LAYER: bool = false;
}
