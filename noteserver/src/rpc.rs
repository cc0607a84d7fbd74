//! JSON-RPC 2.0 envelopes.

use errors::{ErrorObject, ServiceError, code};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const VERSION: &str = "2.0";

/// An incoming call. `id` is `None` for a notification.
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    /// Access token checked by the server's authorizer.
    #[serde(default)]
    pub auth: Option<String>,
}

/// Keeps an explicit `null` id distinct from an absent one.
fn present<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(d).map(Some)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
}

impl Response {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: ErrorObject) -> Self {
        Self {
            jsonrpc: VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    pub fn from_result(id: Value, result: Result<Value, ServiceError>) -> Self {
        match result {
            Ok(value) => Self::success(id, value),
            Err(e) => Self::failure(id, e.to_object()),
        }
    }
}

/// Result of decoding one line from a connection.
#[derive(Debug)]
pub enum Incoming {
    Call(Request),
    /// The line cannot be answered normally; reply with this.
    Reject(Response),
}

/// Decodes one newline-delimited message.
pub fn decode(line: &str) -> Incoming {
    let value: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            return Incoming::Reject(Response::failure(
                Value::Null,
                ErrorObject::new(code::PARSE_ERROR, format!("parse error: {e}")),
            ));
        }
    };
    let id = value.get("id").cloned().unwrap_or(Value::Null);
    let request: Request = match serde_json::from_value(value) {
        Ok(r) => r,
        Err(e) => {
            return Incoming::Reject(Response::failure(
                id,
                ErrorObject::new(code::INVALID_REQUEST, format!("invalid request: {e}")),
            ));
        }
    };
    if let Some(v) = request.jsonrpc.as_deref().filter(|v| *v != VERSION) {
        return Incoming::Reject(Response::failure(
            id,
            ErrorObject::new(
                code::INVALID_REQUEST,
                format!("unsupported jsonrpc version {v:?}"),
            ),
        ));
    }
    Incoming::Call(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(line: &str) -> Request {
        match decode(line) {
            Incoming::Call(r) => r,
            Incoming::Reject(resp) => panic!("rejected: {resp:?}"),
        }
    }

    fn reject(line: &str) -> Response {
        match decode(line) {
            Incoming::Reject(resp) => resp,
            Incoming::Call(r) => panic!("accepted: {r:?}"),
        }
    }

    #[test]
    fn test_decode_request() {
        let r = call(r#"{"jsonrpc":"2.0","id":7,"method":"Clip.List","auth":"t"}"#);
        assert_eq!(r.id, Some(json!(7)));
        assert_eq!(r.method, "Clip.List");
        assert_eq!(r.params, Value::Null);
        assert_eq!(r.auth.as_deref(), Some("t"));
    }

    #[test]
    fn test_notification_vs_null_id() {
        assert_eq!(call(r#"{"method":"Clip.List"}"#).id, None);
        assert_eq!(call(r#"{"id":null,"method":"Clip.List"}"#).id, Some(Value::Null));
    }

    #[test]
    fn test_parse_error_has_null_id() {
        let resp = reject("{not json");
        assert_eq!(resp.id, Value::Null);
        assert_eq!(resp.error.unwrap().code, code::PARSE_ERROR);
    }

    #[test]
    fn test_invalid_request_keeps_id() {
        let resp = reject(r#"{"id":3,"params":{}}"#);
        assert_eq!(resp.id, json!(3));
        assert_eq!(resp.error.unwrap().code, code::INVALID_REQUEST);

        let resp = reject(r#"{"jsonrpc":"1.0","id":4,"method":"x"}"#);
        assert_eq!(resp.error.unwrap().code, code::INVALID_REQUEST);
    }

    #[test]
    fn test_response_serialization_omits_absent_members() {
        let ok = serde_json::to_value(Response::success(json!(1), json!(true))).unwrap();
        assert_eq!(ok, json!({"jsonrpc": "2.0", "id": 1, "result": true}));

        let err = Response::from_result(json!(2), Err(ServiceError::Cancelled));
        let err = serde_json::to_value(err).unwrap();
        assert_eq!(err["error"]["code"], json!(code::USER_CANCELLED));
        assert!(err.get("result").is_none());
    }
}
