//! Minimal W3C trace-context propagation.
//!
//! Headers are handled by hand; there is no OpenTelemetry SDK behind this.

use http::{HeaderMap, HeaderName, HeaderValue};

/// W3C Trace Context header name
pub const TRACEPARENT: &str = "traceparent";

/// Raw `traceparent` value from `headers`, if present and valid UTF-8.
pub fn extract_trace_parent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(TRACEPARENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

/// Trace id (second field) of a version-00 `traceparent`.
pub fn parse_trace_id(traceparent: &str) -> Option<String> {
    let mut parts = traceparent.split('-');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some("00"), Some(trace_id), Some(_), Some(_)) if trace_id.len() == 32 => {
            Some(trace_id.to_owned())
        }
        _ => None,
    }
}

/// Build a sampled `traceparent` with a fresh span id, reusing `trace_id` when given.
pub fn new_traceparent(trace_id: Option<&str>) -> String {
    let trace_id = trace_id
        .map(str::to_owned)
        .unwrap_or_else(|| format!("{:032x}", rand::random::<u128>()));
    let span_id = format!("{:016x}", rand::random::<u64>());
    format!("00-{trace_id}-{span_id}-01")
}

/// Add a `traceparent` header unless the caller already set one.
pub fn inject_trace_context(headers: &mut HeaderMap) {
    if headers.contains_key(TRACEPARENT) {
        return;
    }
    if let Ok(value) = HeaderValue::from_str(&new_traceparent(None)) {
        headers.insert(HeaderName::from_static(TRACEPARENT), value);
    }
}
