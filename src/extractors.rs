//! Span attribute and carrier extraction from Lambda events.
//!
//! Each supported trigger shape knows how to describe itself for the handler
//! span: which attributes to set, which span kind and trigger classification
//! apply, and which headers form the propagation carrier. The carrier itself
//! is only a bundle of strings here; the precedence decision over it happens
//! in [`crate::propagation`].
//!
//! Built-in implementations cover API Gateway v1/v2 and ALB (HTTP triggers,
//! SERVER spans), SQS (messaging trigger, CONSUMER spans, W3C context carried
//! in message attributes), and `serde_json::Value` as the opaque fallback for
//! unknown trigger shapes. Custom event types implement
//! [`SpanAttributesExtractor`] to take over extraction entirely.

use aws_lambda_events::event::alb::AlbTargetGroupRequest;
use aws_lambda_events::event::apigw::{ApiGatewayProxyRequest, ApiGatewayV2httpRequest};
use aws_lambda_events::event::sqs::{SqsEvent, SqsMessage};
use aws_lambda_events::http::HeaderMap;
use aws_lambda_events::query_map::QueryMap;
use bon::Builder;
use lambda_runtime::Context;
use opentelemetry::propagation::TextMapPropagator;
use opentelemetry::trace::{Link, Status, TraceContextExt};
use opentelemetry::Value;
use opentelemetry_aws::trace::XrayPropagator;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt::{self, Display};
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::constants::env_vars;

/// Common trigger classifications, following OpenTelemetry FaaS conventions.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum TriggerType {
    /// Database trigger
    Datasource,
    /// HTTP/API trigger
    Http,
    /// Message/event trigger
    PubSub,
    /// Schedule/cron trigger
    Timer,
    /// Other/unknown trigger
    #[default]
    Other,
}

impl Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerType::Datasource => write!(f, "datasource"),
            TriggerType::Http => write!(f, "http"),
            TriggerType::PubSub => write!(f, "pubsub"),
            TriggerType::Timer => write!(f, "timer"),
            TriggerType::Other => write!(f, "other"),
        }
    }
}

/// Data extracted from a Lambda event for span creation.
///
/// The `kind` field accepts standard OpenTelemetry span kinds ("SERVER",
/// "CLIENT", "PRODUCER", "CONSUMER", "INTERNAL"); the wrapper defaults to
/// SERVER when none is provided. The `carrier` holds propagation headers in
/// W3C or X-Ray format, exactly as found on the event; it lives only for the
/// duration of one extraction.
#[derive(Builder)]
pub struct SpanAttributes {
    /// Optional span kind (defaults to SERVER if not provided).
    pub kind: Option<String>,

    /// Optional span name override, e.g. "GET /users/{id}" for HTTP spans.
    pub span_name: Option<String>,

    /// Custom attributes to add to the span, named per OpenTelemetry
    /// semantic conventions.
    #[builder(default)]
    pub attributes: HashMap<String, Value>,

    /// Span links connecting related traces, e.g. per-message producers for a
    /// queue batch.
    #[builder(default)]
    pub links: Vec<Link>,

    /// Carrier headers for context propagation.
    pub carrier: Option<HashMap<String, String>>,

    /// The trigger classification for this invocation.
    #[builder(default = TriggerType::Other.to_string())]
    pub trigger: String,
}

impl Default for SpanAttributes {
    fn default() -> Self {
        Self {
            kind: None,
            span_name: None,
            attributes: HashMap::new(),
            links: Vec::new(),
            carrier: None,
            trigger: TriggerType::Other.to_string(),
        }
    }
}

/// Trait for event types that can describe themselves for span creation.
///
/// Implementations should never fail: when a shape does not match, return a
/// default instance rather than raising, so extraction problems degrade to a
/// fresh trace root instead of breaking the invocation.
pub trait SpanAttributesExtractor {
    fn extract_span_attributes(&self) -> SpanAttributes;
}

/// Collect string-valued headers into a propagation carrier.
fn header_carrier(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
        .collect()
}

/// Reassemble a query string from multi-value query parameters.
fn query_from_multi(params: &QueryMap) -> Option<String> {
    if params.is_empty() {
        return None;
    }
    let mut parts = Vec::new();
    for key in params.iter().map(|(k, _)| k) {
        if let Some(values) = params.all(key) {
            for value in values {
                parts.push(format!(
                    "{}={}",
                    urlencoding::encode(key),
                    urlencoding::encode(value)
                ));
            }
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("&"))
    }
}

/// Record the HTTP protocol version attribute from a "HTTP/x.y" string.
fn protocol_version(attributes: &mut HashMap<String, Value>, protocol: &str) {
    let protocol_lower = protocol.to_lowercase();
    if let Some(version) = protocol_lower.strip_prefix("http/") {
        attributes.insert(
            "network.protocol.version".to_string(),
            Value::String(version.to_string().into()),
        );
    }
}

/// Extract the queue name from an SQS event source ARN
/// (`arn:aws:sqs:{region}:{account}:{queue-name}`).
fn queue_name_from_arn(arn: &str) -> Option<&str> {
    arn.rsplit(':').next()
}

/// Build a carrier from W3C entries stored as queue message attributes.
///
/// Returns `None` unless a `traceparent` entry is present: without it there is
/// nothing to resume, and accidental `tracestate`/`baggage` leftovers must not
/// activate extraction.
fn message_attribute_carrier(message: &SqsMessage) -> Option<HashMap<String, String>> {
    let mut carrier = HashMap::new();
    for key in ["traceparent", "tracestate", "baggage"] {
        if let Some(value) = message
            .message_attributes
            .get(key)
            .and_then(|attribute| attribute.string_value.as_deref())
        {
            carrier.insert(key.to_string(), value.to_string());
        }
    }
    if carrier.contains_key("traceparent") {
        Some(carrier)
    } else {
        None
    }
}

/// Build a span link from an X-Ray header carried in message system attributes.
fn link_from_xray_header(header: &str) -> Option<Link> {
    let carrier = HashMap::from([("x-amzn-trace-id".to_string(), header.to_string())]);
    let cx = XrayPropagator::default().extract(&carrier);
    let span = cx.span();
    let span_context = span.span_context().clone();
    if span_context.is_valid() {
        Some(Link::new(span_context, Vec::new(), 0))
    } else {
        None
    }
}

/// Extract status code from a response if it's an HTTP-shaped response.
pub fn get_status_code(response: &JsonValue) -> Option<i64> {
    response
        .as_object()
        .and_then(|obj| obj.get("statusCode"))
        .and_then(|v| v.as_i64())
}

/// Set response attributes on the span based on the response value.
///
/// 5xx responses mark the span as errored; everything else is OK.
pub fn set_response_attributes(span: &Span, response: &JsonValue) {
    if let Some(status_code) = get_status_code(response) {
        span.set_attribute("http.response.status_code", status_code.to_string());
        if status_code >= 500 {
            span.set_status(Status::error(format!("HTTP {} response", status_code)));
        } else {
            span.set_status(Status::Ok);
        }
    }
}

/// Set common FaaS attributes on the span from the invocation context.
///
/// All values come from the runtime context and the environment, never from
/// the event body.
pub fn set_common_attributes(span: &Span, context: &Context, is_cold_start: bool) {
    span.set_attribute("faas.invocation_id", context.request_id.to_string());
    span.set_attribute(
        "cloud.resource_id",
        context.invoked_function_arn.to_string(),
    );
    if is_cold_start {
        span.set_attribute("faas.coldstart", true);
    }

    // arn:aws:lambda:{region}:{account}:function:{name}
    if let Some(region) = context.invoked_function_arn.split(':').nth(3) {
        span.set_attribute("cloud.region", region.to_string());
    }
    if let Some(account_id) = context.invoked_function_arn.split(':').nth(4) {
        span.set_attribute("cloud.account.id", account_id.to_string());
    }

    span.set_attribute(
        "faas.name",
        std::env::var(env_vars::AWS_LAMBDA_FUNCTION_NAME).unwrap_or_default(),
    );
    span.set_attribute(
        "faas.version",
        std::env::var(env_vars::AWS_LAMBDA_FUNCTION_VERSION).unwrap_or_default(),
    );
}

/// API Gateway V2 HTTP API events: SERVER span, HTTP trigger, headers as carrier.
impl SpanAttributesExtractor for ApiGatewayV2httpRequest {
    fn extract_span_attributes(&self) -> SpanAttributes {
        let mut attributes = HashMap::new();
        let method = self.request_context.http.method.to_string();
        let path = self.raw_path.as_deref().unwrap_or("/");

        attributes.insert(
            "http.request.method".to_string(),
            Value::String(method.clone().into()),
        );
        attributes.insert(
            "url.path".to_string(),
            Value::String(path.to_string().into()),
        );
        if let Some(query) = &self.raw_query_string {
            if !query.is_empty() {
                attributes.insert(
                    "url.query".to_string(),
                    Value::String(query.to_string().into()),
                );
            }
        }
        if let Some(protocol) = &self.request_context.http.protocol {
            protocol_version(&mut attributes, protocol);
        }
        // API Gateway terminates TLS
        attributes.insert("url.scheme".to_string(), Value::String("https".into()));
        if let Some(route_key) = &self.route_key {
            attributes.insert(
                "http.route".to_string(),
                Value::String(route_key.to_string().into()),
            );
        }
        if let Some(source_ip) = &self.request_context.http.source_ip {
            attributes.insert(
                "client.address".to_string(),
                Value::String(source_ip.to_string().into()),
            );
        }
        if let Some(user_agent) = self.headers.get("user-agent").and_then(|h| h.to_str().ok()) {
            attributes.insert(
                "user_agent.original".to_string(),
                Value::String(user_agent.to_string().into()),
            );
        }
        if let Some(domain_name) = &self.request_context.domain_name {
            attributes.insert(
                "server.address".to_string(),
                Value::String(domain_name.to_string().into()),
            );
        }

        SpanAttributes::builder()
            .attributes(attributes)
            .carrier(header_carrier(&self.headers))
            .span_name(format!("{} {}", method, path))
            .trigger(TriggerType::Http.to_string())
            .build()
    }
}

/// API Gateway V1 REST API events: SERVER span, HTTP trigger, headers as carrier.
impl SpanAttributesExtractor for ApiGatewayProxyRequest {
    fn extract_span_attributes(&self) -> SpanAttributes {
        let mut attributes = HashMap::new();
        let method = self.http_method.to_string();
        let route = self.resource.as_deref().unwrap_or("/");

        attributes.insert(
            "http.request.method".to_string(),
            Value::String(method.clone().into()),
        );
        if let Some(path) = &self.path {
            attributes.insert(
                "url.path".to_string(),
                Value::String(path.to_string().into()),
            );
        }
        if let Some(query) = query_from_multi(&self.multi_value_query_string_parameters) {
            attributes.insert("url.query".to_string(), Value::String(query.into()));
        }
        if let Some(protocol) = &self.request_context.protocol {
            protocol_version(&mut attributes, protocol);
        }
        attributes.insert("url.scheme".to_string(), Value::String("https".into()));
        attributes.insert(
            "http.route".to_string(),
            Value::String(route.to_string().into()),
        );
        if let Some(source_ip) = &self.request_context.identity.source_ip {
            attributes.insert(
                "client.address".to_string(),
                Value::String(source_ip.to_string().into()),
            );
        }
        if let Some(user_agent) = self.headers.get("user-agent").and_then(|h| h.to_str().ok()) {
            attributes.insert(
                "user_agent.original".to_string(),
                Value::String(user_agent.to_string().into()),
            );
        }
        if let Some(domain_name) = &self.request_context.domain_name {
            attributes.insert(
                "server.address".to_string(),
                Value::String(domain_name.to_string().into()),
            );
        }

        SpanAttributes::builder()
            .attributes(attributes)
            .carrier(header_carrier(&self.headers))
            .span_name(format!("{} {}", method, route))
            .trigger(TriggerType::Http.to_string())
            .build()
    }
}

/// ALB target group events: SERVER span, HTTP trigger, headers as carrier.
impl SpanAttributesExtractor for AlbTargetGroupRequest {
    fn extract_span_attributes(&self) -> SpanAttributes {
        let mut attributes = HashMap::new();
        let method = self.http_method.to_string();
        let route = self.path.as_deref().unwrap_or("/");

        attributes.insert(
            "http.request.method".to_string(),
            Value::String(method.clone().into()),
        );
        if let Some(path) = &self.path {
            attributes.insert(
                "url.path".to_string(),
                Value::String(path.to_string().into()),
            );
        }
        if let Some(query) = query_from_multi(&self.multi_value_query_string_parameters) {
            attributes.insert("url.query".to_string(), Value::String(query.into()));
        }
        // ALB may front plain HTTP and always speaks HTTP/1.1 to the target
        attributes.insert("url.scheme".to_string(), Value::String("http".into()));
        attributes.insert(
            "network.protocol.version".to_string(),
            Value::String("1.1".into()),
        );
        if let Some(target_group_arn) = &self.request_context.elb.target_group_arn {
            attributes.insert(
                "alb.target_group_arn".to_string(),
                Value::String(target_group_arn.to_string().into()),
            );
        }
        if let Some(forwarded) = self
            .headers
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
        {
            if let Some(client_ip) = forwarded.split(',').next() {
                attributes.insert(
                    "client.address".to_string(),
                    Value::String(client_ip.trim().to_string().into()),
                );
            }
        }
        if let Some(user_agent) = self.headers.get("user-agent").and_then(|h| h.to_str().ok()) {
            attributes.insert(
                "user_agent.original".to_string(),
                Value::String(user_agent.to_string().into()),
            );
        }
        if let Some(host) = self.headers.get("host").and_then(|h| h.to_str().ok()) {
            attributes.insert(
                "server.address".to_string(),
                Value::String(host.to_string().into()),
            );
        }

        SpanAttributes::builder()
            .attributes(attributes)
            .carrier(header_carrier(&self.headers))
            .span_name(format!("{} {}", method, route))
            .trigger(TriggerType::Http.to_string())
            .build()
    }
}

/// SQS events: CONSUMER span, pubsub trigger.
///
/// The parent carrier comes from W3C entries in the first record's message
/// attributes; per-message X-Ray headers in the system attributes become span
/// links, so a batch drawn from several traces stays connected to all of them.
impl SpanAttributesExtractor for SqsEvent {
    fn extract_span_attributes(&self) -> SpanAttributes {
        let mut attributes = HashMap::new();
        attributes.insert(
            "messaging.system".to_string(),
            Value::String("aws_sqs".into()),
        );
        attributes.insert(
            "messaging.operation".to_string(),
            Value::String("process".into()),
        );
        attributes.insert(
            "messaging.batch.message_count".to_string(),
            Value::I64(self.records.len() as i64),
        );

        let queue_name = self
            .records
            .first()
            .and_then(|record| record.event_source_arn.as_deref())
            .and_then(queue_name_from_arn);
        if let Some(queue_name) = queue_name {
            attributes.insert(
                "messaging.destination.name".to_string(),
                Value::String(queue_name.to_string().into()),
            );
        }
        if self.records.len() == 1 {
            if let Some(message_id) = &self.records[0].message_id {
                attributes.insert(
                    "messaging.message.id".to_string(),
                    Value::String(message_id.to_string().into()),
                );
            }
        }

        let carrier = self.records.first().and_then(message_attribute_carrier);

        let links = self
            .records
            .iter()
            .filter_map(|record| record.attributes.get("AWSTraceHeader"))
            .filter_map(|header| link_from_xray_header(header))
            .collect::<Vec<_>>();

        SpanAttributes::builder()
            .kind("CONSUMER".to_string())
            .maybe_span_name(queue_name.map(|queue| format!("{} process", queue)))
            .attributes(attributes)
            .links(links)
            .maybe_carrier(carrier)
            .trigger(TriggerType::PubSub.to_string())
            .build()
    }
}

/// Opaque events: the fallback for unknown trigger shapes.
///
/// Looks for the queue-message shape first (`Records[0].messageAttributes`
/// with a `traceparent` entry), then for a `headers` sub-mapping, and settles
/// for an empty carrier otherwise. Non-mapping events (a bare string, a
/// number) never fail; they simply produce no parent.
impl SpanAttributesExtractor for JsonValue {
    fn extract_span_attributes(&self) -> SpanAttributes {
        if let Some(carrier) = json_queue_carrier(self) {
            return SpanAttributes::builder()
                .kind("CONSUMER".to_string())
                .carrier(carrier)
                .trigger(TriggerType::PubSub.to_string())
                .build();
        }

        let carrier: HashMap<String, String> = self
            .get("headers")
            .and_then(|headers| headers.as_object())
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.to_string(), v.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        SpanAttributes::builder()
            .carrier(carrier)
            .trigger(TriggerType::Other.to_string())
            .build()
    }
}

/// W3C carrier from `Records[0].messageAttributes` in a raw JSON event, with
/// `traceparent` presence as the activation condition.
fn json_queue_carrier(event: &JsonValue) -> Option<HashMap<String, String>> {
    let message_attributes = event
        .get("Records")?
        .get(0)?
        .get("messageAttributes")?
        .as_object()?;

    let mut carrier = HashMap::new();
    for key in ["traceparent", "tracestate", "baggage"] {
        if let Some(value) = message_attributes
            .get(key)
            .and_then(|attribute| attribute.get("stringValue"))
            .and_then(|value| value.as_str())
        {
            carrier.insert(key.to_string(), value.to_string());
        }
    }
    if carrier.contains_key("traceparent") {
        Some(carrier)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_lambda_events::http::Method;
    use serde_json::json;

    const TRACEPARENT: &str = "00-5fb7331105e8bb83207fa31d4d9cdb4c-3328b8445a6dbad2-01";

    #[test]
    fn test_apigw_v2_extraction() {
        let request = ApiGatewayV2httpRequest {
            raw_path: Some("/orders".to_string()),
            route_key: Some("GET /orders".to_string()),
            headers: HeaderMap::new(),
            request_context: aws_lambda_events::apigw::ApiGatewayV2httpRequestContext {
                http: aws_lambda_events::apigw::ApiGatewayV2httpRequestContextHttpDescription {
                    method: Method::GET,
                    path: Some("/orders".to_string()),
                    protocol: Some("HTTP/1.1".to_string()),
                    ..Default::default()
                },
                ..Default::default()
            },
            ..Default::default()
        };

        let attrs = request.extract_span_attributes();
        assert_eq!(attrs.span_name.as_deref(), Some("GET /orders"));
        assert_eq!(attrs.trigger, "http");
        assert_eq!(
            attrs.attributes.get("http.request.method"),
            Some(&Value::String("GET".into()))
        );
        assert_eq!(
            attrs.attributes.get("url.path"),
            Some(&Value::String("/orders".into()))
        );
        assert_eq!(
            attrs.attributes.get("network.protocol.version"),
            Some(&Value::String("1.1".into()))
        );
        assert_eq!(
            attrs.attributes.get("url.scheme"),
            Some(&Value::String("https".into()))
        );
        assert!(attrs.kind.is_none());
    }

    #[test]
    fn test_apigw_v2_header_carrier() {
        let mut headers = HeaderMap::new();
        headers.insert("traceparent", TRACEPARENT.parse().unwrap());
        headers.insert("content-type", "application/json".parse().unwrap());

        let request = ApiGatewayV2httpRequest {
            headers,
            ..Default::default()
        };

        let attrs = request.extract_span_attributes();
        let carrier = attrs.carrier.expect("carrier should be present");
        assert_eq!(carrier.get("traceparent").map(String::as_str), Some(TRACEPARENT));
    }

    #[test]
    fn test_apigw_v1_extraction() {
        let request = ApiGatewayProxyRequest {
            path: Some("/orders/42".to_string()),
            http_method: Method::POST,
            resource: Some("/orders/{id}".to_string()),
            headers: HeaderMap::new(),
            request_context: aws_lambda_events::apigw::ApiGatewayProxyRequestContext {
                protocol: Some("HTTP/1.1".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        let attrs = request.extract_span_attributes();
        assert_eq!(attrs.span_name.as_deref(), Some("POST /orders/{id}"));
        assert_eq!(
            attrs.attributes.get("http.route"),
            Some(&Value::String("/orders/{id}".into()))
        );
        assert_eq!(
            attrs.attributes.get("url.path"),
            Some(&Value::String("/orders/42".into()))
        );
    }

    #[test]
    fn test_alb_extraction() {
        let request = AlbTargetGroupRequest {
            path: Some("/items".to_string()),
            http_method: Method::PUT,
            headers: HeaderMap::new(),
            request_context: aws_lambda_events::alb::AlbTargetGroupRequestContext {
                elb: aws_lambda_events::alb::ElbContext {
                    target_group_arn: Some(
                        "arn:aws:elasticloadbalancing:us-east-1:123456789012:targetgroup/x"
                            .to_string(),
                    ),
                },
            },
            ..Default::default()
        };

        let attrs = request.extract_span_attributes();
        assert_eq!(attrs.span_name.as_deref(), Some("PUT /items"));
        assert_eq!(
            attrs.attributes.get("url.scheme"),
            Some(&Value::String("http".into()))
        );
        assert!(attrs.attributes.contains_key("alb.target_group_arn"));
    }

    fn sqs_event(message_attributes: JsonValue, system_attributes: JsonValue) -> SqsEvent {
        serde_json::from_value(json!({
            "Records": [{
                "messageId": "059f36b4-87a3-44ab-83d2-661975830a7d",
                "receiptHandle": "AQEBwJnKyrHigUMZj6rYigCgxlaS3SLy0a",
                "body": "{\"order\": 42}",
                "md5OfBody": "e4e68fb7bd0e697a0ae8f1bb342846b3",
                "attributes": system_attributes,
                "messageAttributes": message_attributes,
                "eventSource": "aws:sqs",
                "eventSourceARN": "arn:aws:sqs:us-east-1:123456789012:orders-queue",
                "awsRegion": "us-east-1"
            }]
        }))
        .expect("valid SQS event")
    }

    #[test]
    fn test_sqs_extraction_with_traceparent() {
        let event = sqs_event(
            json!({
                "traceparent": {
                    "stringValue": TRACEPARENT,
                    "stringListValues": [],
                    "binaryListValues": [],
                    "dataType": "String"
                },
                "tracestate": {
                    "stringValue": "vendor=opaque",
                    "stringListValues": [],
                    "binaryListValues": [],
                    "dataType": "String"
                },
                "baggage": {
                    "stringValue": "userId=alice",
                    "stringListValues": [],
                    "binaryListValues": [],
                    "dataType": "String"
                }
            }),
            json!({}),
        );

        let attrs = event.extract_span_attributes();
        assert_eq!(attrs.kind.as_deref(), Some("CONSUMER"));
        assert_eq!(attrs.trigger, "pubsub");
        assert_eq!(attrs.span_name.as_deref(), Some("orders-queue process"));

        let carrier = attrs.carrier.expect("carrier should be present");
        assert_eq!(carrier.get("traceparent").map(String::as_str), Some(TRACEPARENT));
        assert_eq!(
            carrier.get("tracestate").map(String::as_str),
            Some("vendor=opaque")
        );
        assert_eq!(
            carrier.get("baggage").map(String::as_str),
            Some("userId=alice")
        );

        assert_eq!(
            attrs.attributes.get("messaging.system"),
            Some(&Value::String("aws_sqs".into()))
        );
        assert_eq!(
            attrs.attributes.get("messaging.destination.name"),
            Some(&Value::String("orders-queue".into()))
        );
        assert_eq!(
            attrs.attributes.get("messaging.batch.message_count"),
            Some(&Value::I64(1))
        );
    }

    #[test]
    fn test_sqs_without_traceparent_has_no_carrier() {
        let event = sqs_event(
            json!({
                "tracestate": {
                    "stringValue": "vendor=opaque",
                    "stringListValues": [],
                    "binaryListValues": [],
                    "dataType": "String"
                }
            }),
            json!({}),
        );

        let attrs = event.extract_span_attributes();
        assert!(attrs.carrier.is_none());
        assert_eq!(attrs.kind.as_deref(), Some("CONSUMER"));
    }

    #[test]
    fn test_sqs_xray_system_attribute_becomes_link() {
        let event = sqs_event(
            json!({}),
            json!({
                "AWSTraceHeader":
                    "Root=1-5759e988-bd862e3fe1be46a994272793;Parent=53995c3f42cd8ad8;Sampled=1"
            }),
        );

        let attrs = event.extract_span_attributes();
        assert_eq!(attrs.links.len(), 1);
        assert!(attrs.links[0].span_context.is_valid());
        assert_eq!(
            attrs.links[0].span_context.trace_id().to_string(),
            "5759e988bd862e3fe1be46a994272793"
        );
    }

    #[test]
    fn test_sqs_malformed_xray_header_is_skipped() {
        let event = sqs_event(json!({}), json!({"AWSTraceHeader": "Root=garbage"}));
        let attrs = event.extract_span_attributes();
        assert!(attrs.links.is_empty());
    }

    #[test]
    fn test_json_value_queue_shape() {
        let event = json!({
            "Records": [{
                "messageAttributes": {
                    "traceparent": {"stringValue": TRACEPARENT, "dataType": "String"},
                    "baggage": {"stringValue": "k=v", "dataType": "String"}
                }
            }]
        });

        let attrs = event.extract_span_attributes();
        assert_eq!(attrs.kind.as_deref(), Some("CONSUMER"));
        assert_eq!(attrs.trigger, "pubsub");
        let carrier = attrs.carrier.expect("carrier should be present");
        assert_eq!(carrier.get("traceparent").map(String::as_str), Some(TRACEPARENT));
        assert_eq!(carrier.get("baggage").map(String::as_str), Some("k=v"));
    }

    #[test]
    fn test_json_value_queue_shape_requires_traceparent() {
        let event = json!({
            "Records": [{
                "messageAttributes": {
                    "baggage": {"stringValue": "k=v", "dataType": "String"}
                }
            }]
        });

        let attrs = event.extract_span_attributes();
        // No traceparent: falls through to the headers lookup, which is absent.
        assert_eq!(attrs.kind, None);
        let carrier = attrs.carrier.expect("carrier defaults to empty");
        assert!(carrier.is_empty());
    }

    #[test]
    fn test_json_value_headers_shape() {
        let event = json!({
            "headers": {
                "traceparent": TRACEPARENT,
                "x-request-id": "abc",
                "not-a-string": 42
            },
            "body": "{}"
        });

        let attrs = event.extract_span_attributes();
        let carrier = attrs.carrier.expect("carrier should be present");
        assert_eq!(carrier.get("traceparent").map(String::as_str), Some(TRACEPARENT));
        assert_eq!(carrier.get("x-request-id").map(String::as_str), Some("abc"));
        assert!(!carrier.contains_key("not-a-string"));
    }

    #[test]
    fn test_json_value_non_mapping_shapes() {
        for event in [json!("bare string"), json!(42), json!(null), json!([1, 2])] {
            let attrs = event.extract_span_attributes();
            assert_eq!(attrs.trigger, "other");
            assert!(attrs.carrier.expect("carrier defaults to empty").is_empty());
        }
    }

    #[test]
    fn test_status_code_extraction() {
        assert_eq!(get_status_code(&json!({"statusCode": 200})), Some(200));
        assert_eq!(get_status_code(&json!({"body": "x"})), None);
        assert_eq!(get_status_code(&json!("not an object")), None);
    }
}
