//! JSON-RPC 1.0 exchange engine over HTTP(S).
//!
//! Builds request envelopes, races each exchange against a per-call
//! deadline, and classifies the outcome into a parsed envelope, a streaming
//! body, or an [`RpcError`](crate::error::RpcError).

mod client;
mod connection;
mod protocol;
mod trace;

pub use client::{ClientOptions, HttpRpcClient, DEFAULT_TIMEOUT};
pub use protocol::{RpcResponse, ServerErrorObject};
pub use trace::DebugFlags;
