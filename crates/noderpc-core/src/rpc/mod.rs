//! Bitcoin-style node RPC layer.
//!
//! Defines the [`RpcExchange`] trait and its HTTP implementation
//! ([`HttpRpcClient`]), plus the envelope and streaming-body types both call
//! shapes hand back.

mod http_adapter;
mod stream;

pub use http_adapter::{
    ClientOptions, DebugFlags, HttpRpcClient, RpcResponse, ServerErrorObject, DEFAULT_TIMEOUT,
};
pub use stream::RpcStream;

use async_trait::async_trait;

use crate::error::RpcError;

/// The two call shapes a node endpoint supports.
///
/// Typed method wrappers build on this trait rather than on a concrete
/// transport, so they can be pointed at any implementation.
#[async_trait]
pub trait RpcExchange: Send + Sync {
    /// Buffered call: the response body is fully read and parsed.
    async fn call(&self, method: &str, params: serde_json::Value) -> Result<RpcResponse, RpcError>;

    /// Streaming call: the open body is handed to the caller, who must drain
    /// or drop it to release the connection.
    async fn read(&self, method: &str, params: serde_json::Value) -> Result<RpcStream, RpcError>;
}
