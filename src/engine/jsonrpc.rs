//! JSON-RPC 2.0 message classification and reply construction.

use serde_json::{json, Value};

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

/// A classified inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Expects exactly one reply carrying `id`.
    Request {
        id: Value,
        method: String,
        params: Option<Value>,
    },
    /// No reply.
    Notification { method: String },
    /// A client's answer to a server-initiated request.
    Response { id: Value },
}

/// The `error` member of a failure reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorObject {
    pub code: i64,
    pub message: String,
}

impl ErrorObject {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn parse_error(detail: impl std::fmt::Display) -> Self {
        Self::new(PARSE_ERROR, format!("Parse error: {detail}"))
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(INVALID_REQUEST, message)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(METHOD_NOT_FOUND, format!("Method not found: {method}"))
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(INVALID_PARAMS, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(INTERNAL_ERROR, message)
    }

    fn to_value(&self) -> Value {
        json!({"code": self.code, "message": self.message})
    }
}

/// Outgoing reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Success { id: Value, result: Value },
    Failure { id: Value, error: ErrorObject },
}

impl Response {
    pub fn success(id: Value, result: Value) -> Self {
        Self::Success { id, result }
    }

    pub fn failure(id: Value, error: ErrorObject) -> Self {
        Self::Failure { id, error }
    }

    pub fn to_json(&self) -> String {
        let value = match self {
            Self::Success { id, result } => json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": result,
            }),
            Self::Failure { id, error } => json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": error.to_value(),
            }),
        };
        value.to_string()
    }
}

/// Classify a raw message. The error carries the id to reply with, which is
/// `null` when it cannot be recovered.
pub fn parse(raw: &str) -> Result<Message, (Value, ErrorObject)> {
    let value: Value =
        serde_json::from_str(raw).map_err(|err| (Value::Null, ErrorObject::parse_error(err)))?;

    let Value::Object(mut object) = value else {
        return Err((Value::Null, ErrorObject::invalid_request("Request must be a JSON object")));
    };

    let id = object.remove("id");
    let reply_id = id.clone().unwrap_or(Value::Null);

    if object.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
        return Err((reply_id, ErrorObject::invalid_request("jsonrpc must be \"2.0\"")));
    }

    match object.remove("method") {
        Some(Value::String(method)) => {
            Ok(match id {
                Some(id) => Message::Request {
                    id,
                    method,
                    params: object.remove("params"),
                },
                None => Message::Notification { method },
            })
        }
        Some(_) => Err((reply_id, ErrorObject::invalid_request("method must be a string"))),
        None if object.contains_key("result") || object.contains_key("error") => {
            Ok(Message::Response { id: reply_id })
        }
        None => Err((reply_id, ErrorObject::invalid_request("Missing method"))),
    }
}

/// Best-effort id recovery for replies to messages that failed mid-handling.
pub fn extract_id(raw: &str) -> Option<Value> {
    let value: Value = serde_json::from_str(raw).ok()?;
    value.get("id").filter(|id| !id.is_null()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_requests_and_notifications() {
        let request = parse(r#"{"jsonrpc":"2.0","id":7,"method":"ping"}"#).unwrap();
        assert_eq!(
            request,
            Message::Request {
                id: json!(7),
                method: "ping".into(),
                params: None
            }
        );

        let notification =
            parse(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).unwrap();
        assert_eq!(
            notification,
            Message::Notification {
                method: "notifications/initialized".into()
            }
        );

        let response = parse(r#"{"jsonrpc":"2.0","id":"x","result":{}}"#).unwrap();
        assert_eq!(response, Message::Response { id: json!("x") });
    }

    #[test]
    fn malformed_json_is_a_parse_error_with_null_id() {
        let (id, error) = parse("{not json").unwrap_err();
        assert_eq!(id, Value::Null);
        assert_eq!(error.code, PARSE_ERROR);
    }

    #[test]
    fn wrong_version_keeps_the_id() {
        let (id, error) = parse(r#"{"jsonrpc":"1.0","id":3,"method":"ping"}"#).unwrap_err();
        assert_eq!(id, json!(3));
        assert_eq!(error.code, INVALID_REQUEST);

        let (_, error) = parse("[1,2]").unwrap_err();
        assert_eq!(error.code, INVALID_REQUEST);
    }

    #[test]
    fn reply_serialization() {
        let ok: Value =
            serde_json::from_str(&Response::success(json!(1), json!({})).to_json()).unwrap();
        assert_eq!(ok, json!({"jsonrpc": "2.0", "id": 1, "result": {}}));

        let failure: Value = serde_json::from_str(
            &Response::failure(json!("a"), ErrorObject::method_not_found("nope")).to_json(),
        )
        .unwrap();
        assert_eq!(failure["error"]["code"], METHOD_NOT_FOUND);
        assert_eq!(failure["error"]["message"], "Method not found: nope");
        assert!(failure["error"].get("data").is_none());
    }

    #[test]
    fn extract_id_ignores_garbage_and_null() {
        assert_eq!(extract_id(r#"{"id":5}"#), Some(json!(5)));
        assert_eq!(extract_id(r#"{"id":null}"#), None);
        assert_eq!(extract_id("oops"), None);
    }
}
