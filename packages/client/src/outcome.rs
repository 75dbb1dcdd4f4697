//! Boundary result shapes.
//!
//! Every logical request resolves with exactly one JSON-style map. The
//! field-renaming applied to payloads here is load-bearing for downstream
//! consumers: wire `encMSISDN` becomes `publicIdentifier`, wire `opId`
//! becomes `operatorId`, and the error fields pass through with fixed
//! defaults.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::NetworkError;
use crate::response::{self, ConnectionResponse};
use crate::trace::TraceCollector;

/// Message shown when a caller hands over a non-secure URL.
pub const INVALID_SCHEME_DESCRIPTION: &str =
    "Only HTTPS URLs are allowed. Please use HTTPS instead of HTTP.";

/// Payload fields as the verification backend sends them.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WirePayload {
    #[serde(rename = "encMSISDN")]
    enc_msisdn: Option<Value>,
    #[serde(rename = "opId")]
    op_id: Option<Value>,
    #[serde(rename = "errorCode")]
    error_code: Option<Value>,
    #[serde(rename = "errorDesc")]
    error_desc: Option<Value>,
}

fn map_payload(raw: &str) -> Option<Map<String, Value>> {
    let wire: WirePayload = serde_json::from_str(raw).ok()?;
    let mut body = Map::new();
    body.insert(
        "publicIdentifier".to_string(),
        wire.enc_msisdn.unwrap_or_else(|| Value::String(String::new())),
    );
    body.insert(
        "operatorId".to_string(),
        wire.op_id.unwrap_or_else(|| Value::String(String::new())),
    );
    body.insert(
        "errorCode".to_string(),
        wire.error_code
            .unwrap_or_else(|| Value::String("-1".to_string())),
    );
    body.insert(
        "errorDesc".to_string(),
        wire.error_desc
            .unwrap_or_else(|| Value::String("No description".to_string())),
    );
    Some(body)
}

fn debug_map(trace: &TraceCollector) -> Value {
    let info = trace.trace_info();
    let mut debug = Map::new();
    debug.insert(
        "device_info".to_string(),
        Value::String(info.device.device_string()),
    );
    debug.insert("url_trace".to_string(), Value::String(info.trace));
    Value::Object(debug)
}

/// Result map for the pre-flight scheme rejection. Deliberately carries no
/// debug section: it must surface identically whether or not tracing was
/// requested.
#[must_use]
pub fn invalid_scheme_map() -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("error".to_string(), Value::String("invalid_scheme".to_string()));
    map.insert(
        "error_description".to_string(),
        Value::String(INVALID_SCHEME_DESCRIPTION.to_string()),
    );
    map
}

/// Terminal error result.
pub fn network_error_to_map(
    err: &NetworkError,
    trace: &TraceCollector,
    debug: bool,
) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("error".to_string(), Value::String(err.key().to_string()));
    map.insert(
        "error_description".to_string(),
        Value::String(err.to_string()),
    );
    if debug {
        map.insert("debug".to_string(), debug_map(trace));
        trace.stop_trace();
    }
    map
}

/// Terminal completed-response result, for 2xx and non-3xx alike; callers
/// distinguish via `http_status`.
///
/// Body interpretation degrades in order: chunk-stripped JSON parse, then
/// the embedded-JSON fallback over the debug trace, then a raw passthrough
/// of an unparseable body, and only when no body exists at all a generic
/// deserialization error. The passthrough step is a deliberate extension
/// of the documented contract: a non-empty body that is not the expected
/// payload (an HTML error page, say) surfaces as `response_raw_body` next
/// to `http_status` rather than being swallowed by the error case.
pub fn connection_response_to_map(
    resp: &ConnectionResponse,
    trace: &TraceCollector,
    debug: bool,
) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("http_status".to_string(), Value::from(resp.status));
    if debug {
        map.insert("debug".to_string(), debug_map(trace));
        trace.stop_trace();
    }

    if let Some(body) = &resp.body {
        if let Some(stripped) = response::strip_chunked_artifacts(body) {
            if let Some(mapped) = map_payload(stripped) {
                map.insert("response_body".to_string(), Value::Object(mapped));
                return map;
            }
        }
    }

    // Fallback: some gateways only leak the payload into the trace log.
    let trace_text = map
        .get("debug")
        .and_then(|debug| debug.get("url_trace"))
        .and_then(Value::as_str);
    if let Some(mapped) = trace_text
        .and_then(response::embedded_json_object)
        .and_then(map_payload)
    {
        map.insert("response_body".to_string(), Value::Object(mapped));
        return map;
    }

    match &resp.body {
        Some(body) if !body.is_empty() => {
            map.insert(
                "response_raw_body".to_string(),
                Value::String(response::decode(body)),
            );
            map
        }
        _ => {
            let mut error = Map::new();
            error.insert("error".to_string(), Value::String("sdk_error".to_string()));
            error.insert(
                "error_description".to_string(),
                Value::String("JSON deserialization failed".to_string()),
            );
            if let Some(debug_section) = map.remove("debug") {
                error.insert("debug".to_string(), debug_section);
            }
            error
        }
    }
}
