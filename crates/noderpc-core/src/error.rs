use std::time::Duration;

use crate::rpc::RpcResponse;

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClientBuild(#[source] reqwest::Error),

    #[error("failed to encode rpc request: {0}")]
    Encoding(#[source] serde_json::Error),

    #[error("failed to create new http request: {0}")]
    RequestBuild(#[source] reqwest::Error),

    #[error("timeout reading data from server after {0:?}")]
    Timeout(Duration),

    #[error("failed to do request: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("request task ended without delivering a response")]
    Interrupted,

    #[error("failed to read response: {0}")]
    BodyRead(#[source] reqwest::Error),

    #[error("failed to unmarshal response: {0}")]
    Decoding(#[source] serde_json::Error),

    /// Non-200 HTTP status. `response` carries the best-effort parsed
    /// envelope for buffered calls and is `None` for streaming calls.
    #[error("unexpected response code {code}: {message}")]
    UnexpectedStatus {
        code: u16,
        message: String,
        response: Option<Box<RpcResponse>>,
    },

    #[error("JSON-RPC error {}: {message}", display_code(.code))]
    ServerError { code: Option<i64>, message: String },
}

impl RpcError {
    /// HTTP status code for `UnexpectedStatus`, `None` for everything else.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::UnexpectedStatus { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

fn display_code(code: &Option<i64>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "(no code)".to_owned(),
    }
}
