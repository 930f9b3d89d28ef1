//! Message classification
//!
//! Splits an inbound line into a request, a notification, or a malformed
//! message. The decision is purely structural: a message is a request exactly
//! when it carries a non-null `id`, whatever its method name.

use std::fmt;

use serde_json::{json, Map, Value};

use crate::mcp::types::{JsonRpcError, RequestId};

/// A classified inbound message
#[derive(Debug, Clone)]
pub enum Message {
    Request {
        id: RequestId,
        method: String,
        params: Value,
    },
    Notification {
        method: String,
        params: Value,
    },
    /// `id` is set when a correlation token could still be recovered
    Malformed {
        id: Option<RequestId>,
        reason: MalformedReason,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedReason {
    /// Not a JSON object
    ParseError(String),
    /// Well-formed, but `method` is absent, not a string, or empty
    MissingMethod,
}

impl MalformedReason {
    pub fn to_rpc_error(&self) -> JsonRpcError {
        match self {
            MalformedReason::ParseError(detail) => {
                JsonRpcError::parse_error(format!("Parse error: {}", detail))
            }
            MalformedReason::MissingMethod => JsonRpcError::invalid_request("Missing method"),
        }
    }
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedReason::ParseError(detail) => write!(f, "parse error: {}", detail),
            MalformedReason::MissingMethod => write!(f, "missing method"),
        }
    }
}

/// Classify one raw line
pub fn classify(line: &str) -> Message {
    let mut object: Map<String, Value> = match serde_json::from_str::<Value>(line) {
        Ok(Value::Object(object)) => object,
        Ok(other) => {
            return Message::Malformed {
                id: None,
                reason: MalformedReason::ParseError(format!(
                    "expected a JSON object, got {}",
                    json_kind(&other)
                )),
            }
        }
        Err(e) => {
            return Message::Malformed {
                id: None,
                reason: MalformedReason::ParseError(e.to_string()),
            }
        }
    };

    let id = object
        .remove("id")
        .and_then(RequestId::from_value);

    let method = match object.remove("method") {
        Some(Value::String(method)) if !method.is_empty() => method,
        _ => {
            return Message::Malformed {
                id,
                reason: MalformedReason::MissingMethod,
            }
        }
    };

    let params = match object.remove("params") {
        None | Some(Value::Null) => json!({}),
        Some(params) => params,
    };

    match id {
        Some(id) => Message::Request { id, method, params },
        None => Message::Notification { method, params },
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
