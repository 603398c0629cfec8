//! JSON-RPC 2.0 framing (§4.1, §6).
//!
//! Request ids are always [`inspector_types::MessageId::Number`] when this
//! core allocates them; the `id` type stays untagged so inbound requests
//! from a peer using string ids still deserialize cleanly (§4.1).

use inspector_types::{InspectorError, MessageId};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

const JSONRPC_VERSION: &str = "2.0";

/// Marker type that serializes to/deserializes from the literal `"2.0"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonRpcVersion;

impl Serialize for JsonRpcVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(JSONRPC_VERSION)
    }
}

impl<'de> Deserialize<'de> for JsonRpcVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let version = String::deserialize(deserializer)?;
        if version == JSONRPC_VERSION {
            Ok(JsonRpcVersion)
        } else {
            Err(serde::de::Error::custom(format!(
                "unsupported jsonrpc version: {version}"
            )))
        }
    }
}

/// An outbound or inbound JSON-RPC request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: JsonRpcVersion,
    pub id: MessageId,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// A notification: no id, no reply expected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: JsonRpcVersion,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// A JSON-RPC error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorObject {
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: Self::METHOD_NOT_FOUND,
            message: format!("Method not found: {method}"),
            data: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: Self::INTERNAL_ERROR,
            message: message.into(),
            data: None,
        }
    }
}

/// A response, carrying exactly one of `result`/`error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: JsonRpcVersion,
    pub id: MessageId,
    #[serde(flatten)]
    pub payload: JsonRpcResponsePayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcResponsePayload {
    Success { result: Value },
    Error { error: JsonRpcErrorObject },
}

impl JsonRpcResponse {
    pub fn success(id: MessageId, result: Value) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            id,
            payload: JsonRpcResponsePayload::Success { result },
        }
    }

    pub fn error(id: MessageId, error: JsonRpcErrorObject) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            id,
            payload: JsonRpcResponsePayload::Error { error },
        }
    }
}

/// A single inbound or outbound frame, classified per §4.1:
/// `method` + `id` -> request, `method` only -> notification, `id` only -> response.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
    Response(JsonRpcResponse),
}

/// Encode a typed value as a JSON-RPC frame on the wire.
///
/// Failures here are the outbound "schema failure" of §4.1/§7 and must be
/// surfaced to the caller as `ProtocolEncoding`, never silently dropped.
pub fn encode(message: &JsonRpcMessage) -> Result<Vec<u8>, InspectorError> {
    let value = match message {
        JsonRpcMessage::Request(r) => serde_json::to_vec(r),
        JsonRpcMessage::Notification(n) => serde_json::to_vec(n),
        JsonRpcMessage::Response(r) => serde_json::to_vec(r),
    };
    value.map_err(|e| InspectorError::protocol_encoding(e.to_string()))
}

/// Classify and parse a raw inbound frame (§4.1).
///
/// Returns `ProtocolDecoding` for malformed JSON or a shape matching none of
/// the three JSON-RPC message kinds; the caller decides (per §4.1/§7) whether
/// that failure should be paired to a pending request or merely logged.
pub fn decode(raw: &[u8]) -> Result<JsonRpcMessage, InspectorError> {
    let value: Value = serde_json::from_slice(raw)
        .map_err(|e| InspectorError::protocol_decoding(format!("invalid JSON: {e}")))?;

    let has_id = value.get("id").is_some();
    let has_method = value.get("method").is_some();

    match (has_method, has_id) {
        (true, true) => serde_json::from_value(value)
            .map(JsonRpcMessage::Request)
            .map_err(|e| InspectorError::protocol_decoding(format!("malformed request: {e}"))),
        (true, false) => serde_json::from_value(value)
            .map(JsonRpcMessage::Notification)
            .map_err(|e| {
                InspectorError::protocol_decoding(format!("malformed notification: {e}"))
            }),
        (false, true) => serde_json::from_value(value)
            .map(JsonRpcMessage::Response)
            .map_err(|e| InspectorError::protocol_decoding(format!("malformed response: {e}"))),
        (false, false) => Err(InspectorError::protocol_decoding(
            "frame has neither `method` nor `id`",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_request_notification_response() {
        let req = JsonRpcMessage::Request(JsonRpcRequest {
            jsonrpc: JsonRpcVersion,
            id: MessageId::Number(1),
            method: "tools/list".into(),
            params: None,
        });
        let bytes = encode(&req).unwrap();
        assert!(matches!(decode(&bytes).unwrap(), JsonRpcMessage::Request(_)));

        let note = JsonRpcMessage::Notification(JsonRpcNotification {
            jsonrpc: JsonRpcVersion,
            method: "notifications/initialized".into(),
            params: None,
        });
        let bytes = encode(&note).unwrap();
        assert!(matches!(
            decode(&bytes).unwrap(),
            JsonRpcMessage::Notification(_)
        ));

        let resp = JsonRpcMessage::Response(JsonRpcResponse::success(
            MessageId::Number(1),
            json!({"ok": true}),
        ));
        let bytes = encode(&resp).unwrap();
        assert!(matches!(decode(&bytes).unwrap(), JsonRpcMessage::Response(_)));
    }

    #[test]
    fn encode_then_decode_is_identity() {
        let req = JsonRpcRequest {
            jsonrpc: JsonRpcVersion,
            id: MessageId::String("abc".into()),
            method: "ping".into(),
            params: Some(json!({"x": 1})),
        };
        let message = JsonRpcMessage::Request(req.clone());
        let bytes = encode(&message).unwrap();
        let decoded = decode(&bytes).unwrap();
        match decoded {
            JsonRpcMessage::Request(r) => {
                assert_eq!(r.id, req.id);
                assert_eq!(r.method, req.method);
                assert_eq!(r.params, req.params);
            }
            _ => panic!("expected request"),
        }
    }

    #[test]
    fn malformed_json_is_protocol_decoding_error() {
        let err = decode(b"not json").unwrap_err();
        assert_eq!(err.kind, inspector_types::ErrorKind::ProtocolDecoding);
    }

    #[test]
    fn frame_without_method_or_id_is_rejected() {
        let err = decode(br#"{"jsonrpc":"2.0"}"#).unwrap_err();
        assert_eq!(err.kind, inspector_types::ErrorKind::ProtocolDecoding);
    }
}
