use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use serde::de::DeserializeOwned;

use crate::error::RpcError;

/// Open response body returned by [`HttpRpcClient::read`].
///
/// The handle owns the underlying connection. It is released once the body
/// has been read to the end or the handle is dropped; a handle that is kept
/// alive without being drained pins that connection indefinitely, so callers
/// must consume or drop it promptly.
///
/// [`HttpRpcClient::read`]: super::HttpRpcClient::read
#[derive(Debug)]
pub struct RpcStream {
    response: reqwest::Response,
}

impl RpcStream {
    pub(crate) fn new(response: reqwest::Response) -> Self {
        Self { response }
    }

    pub fn status(&self) -> reqwest::StatusCode {
        self.response.status()
    }

    pub fn content_length(&self) -> Option<u64> {
        self.response.content_length()
    }

    /// Next chunk of the body, or `None` once it is exhausted.
    pub async fn chunk(&mut self) -> Result<Option<Bytes>, RpcError> {
        self.response.chunk().await.map_err(RpcError::BodyRead)
    }

    pub fn into_bytes_stream(self) -> impl Stream<Item = Result<Bytes, RpcError>> {
        self.response.bytes_stream().map_err(RpcError::BodyRead)
    }

    /// Buffer whatever remains of the body.
    pub async fn into_bytes(self) -> Result<Bytes, RpcError> {
        self.response.bytes().await.map_err(RpcError::BodyRead)
    }

    /// Buffer the remaining body and deserialize it as `T`. No envelope
    /// shape is assumed.
    pub async fn decode<T: DeserializeOwned>(self) -> Result<T, RpcError> {
        let body = self.into_bytes().await?;
        serde_json::from_slice(&body).map_err(RpcError::Decoding)
    }
}
