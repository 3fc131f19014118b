pub mod error;
pub mod logger;
pub mod rpc;

pub use error::RpcError;
pub use logger::{Logger, TracingLogger};
pub use rpc::{ClientOptions, DebugFlags, HttpRpcClient, RpcExchange, RpcResponse, RpcStream};
