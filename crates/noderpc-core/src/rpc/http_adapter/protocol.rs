use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::error::RpcError;

pub(crate) const JSONRPC_VERSION: &str = "1.0";

#[derive(Serialize)]
pub(super) struct RpcRequest<'a, P: ?Sized> {
    pub(super) method: &'a str,
    pub(super) params: &'a P,
    pub(super) id: u64,
    pub(super) jsonrpc: &'static str,
}

/// Decoded JSON-RPC response envelope.
///
/// `result` is kept as raw JSON so callers decode it into whatever type the
/// method returns. `error` is left loosely typed: Bitcoin Core sends
/// `{"code": <int>, "message": <string>}`, other servers do not always.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub result: Option<Box<RawValue>>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

/// Standard-shape JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerErrorObject {
    #[serde(default)]
    pub code: Option<i64>,
    pub message: String,
}

impl RpcResponse {
    /// Raw JSON text of `result`, if the server sent a non-null one.
    pub fn raw_result(&self) -> Option<&str> {
        self.result.as_deref().map(RawValue::get)
    }

    /// Structured view of the error field when it has the standard shape.
    pub fn rpc_error(&self) -> Option<ServerErrorObject> {
        match &self.error {
            None | Some(serde_json::Value::Null) => None,
            Some(err) => ServerErrorObject::deserialize(err).ok(),
        }
    }

    /// Decode `result` into `T`, surfacing a populated error field as
    /// [`RpcError::ServerError`] first.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, RpcError> {
        if let Some(err) = self.error.as_ref().filter(|e| !e.is_null()) {
            return Err(match self.rpc_error() {
                Some(parsed) => RpcError::ServerError {
                    code: parsed.code,
                    message: parsed.message,
                },
                None => RpcError::ServerError {
                    code: None,
                    message: format!("non-standard JSON-RPC error: {err}"),
                },
            });
        }

        let raw = self.raw_result().unwrap_or("null");
        serde_json::from_str(raw).map_err(RpcError::Decoding)
    }
}

/// Best-effort envelope parse for non-200 bodies. A malformed body must not
/// mask the HTTP failure, so parse errors yield an empty envelope. Fields
/// are picked out one by one: an `id` of the wrong type still leaves
/// `error` and `result` usable.
pub(super) fn parse_error_body(body: &[u8]) -> RpcResponse {
    let Ok(serde_json::Value::Object(mut fields)) = serde_json::from_slice(body) else {
        return RpcResponse::default();
    };
    let present = |value: Option<serde_json::Value>| value.filter(|v| !v.is_null());

    RpcResponse {
        id: fields.get("id").and_then(serde_json::Value::as_u64),
        result: present(fields.remove("result"))
            .and_then(|result| serde_json::value::to_raw_value(&result).ok()),
        error: present(fields.remove("error")),
    }
}

/// Message for a non-200 response: the error object's `message` when the
/// envelope has one, the HTTP status line otherwise.
pub(super) fn status_error_message(
    response: &RpcResponse,
    status: reqwest::StatusCode,
) -> String {
    response
        .error
        .as_ref()
        .and_then(|err| err.get("message"))
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned)
        .unwrap_or_else(|| format!("HTTP error: {status}"))
}
