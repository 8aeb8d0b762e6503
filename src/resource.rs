//! Lambda resource attribute detection.
//!
//! Builds the OpenTelemetry [`Resource`] for the function from the standard
//! Lambda environment variables, plus any custom attributes supplied through
//! `OTEL_RESOURCE_ATTRIBUTES` (URL-encoded values are decoded). The service
//! name falls back to the function name when `OTEL_SERVICE_NAME` is unset.

use crate::constants::env_vars;
use opentelemetry::KeyValue;
use opentelemetry_sdk::Resource;
use std::env;
use urlencoding::decode;

/// Detect Lambda resource attributes from the environment.
pub fn get_lambda_resource() -> Resource {
    let mut attributes = Vec::new();

    if let Ok(region) = env::var(env_vars::AWS_REGION) {
        attributes.push(KeyValue::new("cloud.provider", "aws"));
        attributes.push(KeyValue::new("cloud.region", region));
    }

    let function_name = env::var(env_vars::AWS_LAMBDA_FUNCTION_NAME).ok();
    if let Some(function_name) = &function_name {
        attributes.push(KeyValue::new("faas.name", function_name.clone()));
    }

    if let Ok(version) = env::var(env_vars::AWS_LAMBDA_FUNCTION_VERSION) {
        attributes.push(KeyValue::new("faas.version", version));
    }

    if let Ok(memory) = env::var(env_vars::AWS_LAMBDA_FUNCTION_MEMORY_SIZE) {
        if let Ok(memory_mb) = memory.parse::<i64>() {
            attributes.push(KeyValue::new("faas.max_memory", memory_mb * 1024 * 1024));
        }
    }

    if let Ok(log_stream) = env::var(env_vars::AWS_LAMBDA_LOG_STREAM_NAME) {
        attributes.push(KeyValue::new("faas.instance", log_stream));
    }

    // Custom attributes override the detected ones on key collision.
    if let Ok(raw) = env::var(env_vars::RESOURCE_ATTRIBUTES) {
        for pair in raw.split(',') {
            if let Some((key, value)) = pair.split_once('=') {
                let key = key.trim();
                let value = value.trim();
                if key.is_empty() || value.is_empty() {
                    continue;
                }
                if let Ok(decoded) = decode(value) {
                    attributes.push(KeyValue::new(key.to_string(), decoded.into_owned()));
                }
            }
        }
    }

    let mut builder = Resource::builder();
    if env::var(env_vars::SERVICE_NAME).is_err() {
        if let Some(function_name) = function_name {
            builder = builder.with_service_name(function_name);
        }
    }
    builder.with_attributes(attributes).build()
}
