use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header, StatusCode};
use serde::Serialize;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::error::RpcError;
use crate::logger::{Logger, TracingLogger};

use super::super::stream::RpcStream;
use super::super::RpcExchange;
use super::connection::{build_http_client, endpoint_url, resolve_auth};
use super::protocol::{
    parse_error_body, status_error_message, RpcRequest, RpcResponse, JSONRPC_VERSION,
};
use super::trace::{dump_request, dump_response_body, dump_response_head, DebugFlags};

/// Per-call deadline applied when no override is given.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

// ==============================================================================
// Options
// ==============================================================================

/// Construction-time overrides for [`HttpRpcClient`].
///
/// Defaults: 120 s timeout, [`TracingLogger`], all debug flags off.
#[derive(Clone)]
pub struct ClientOptions {
    timeout: Duration,
    logger: Arc<dyn Logger>,
    debug: DebugFlags,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            logger: Arc::new(TracingLogger),
            debug: DebugFlags::default(),
        }
    }
}

impl ClientOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_debug(mut self, debug: DebugFlags) -> Self {
        self.debug = debug;
        self
    }
}

// ==============================================================================
// HttpRpcClient
// ==============================================================================

/// JSON-RPC 1.0 client for a single Bitcoin-style node endpoint.
///
/// Every call is bounded by the configured timeout. The client holds only
/// read-only configuration plus an atomic id counter, so one instance can
/// serve many concurrent calls.
pub struct HttpRpcClient {
    client: reqwest::Client,
    url: String,
    auth: Option<(String, String)>,
    timeout: Duration,
    logger: Arc<dyn Logger>,
    debug: DebugFlags,
    last_id: AtomicU64,
}

impl HttpRpcClient {
    /// Create a client for `host:port` with an optional `path`.
    ///
    /// Fails with [`RpcError::InvalidArgument`] when `host` is empty. The
    /// path is normalized to a single leading `/` and no trailing `/`.
    /// Basic auth is attached to every request when `user` or `pass` is
    /// non-empty. With `use_tls`, the server certificate is NOT verified.
    pub fn new(
        host: &str,
        port: u16,
        path: &str,
        user: &str,
        pass: &str,
        use_tls: bool,
        options: ClientOptions,
    ) -> Result<Self, RpcError> {
        let url = endpoint_url(host, port, path, use_tls)?;
        let client = build_http_client(use_tls, options.debug.trace_connections, &options.logger)?;

        Ok(Self {
            client,
            url,
            auth: resolve_auth(user, pass),
            timeout: options.timeout,
            logger: options.logger,
            debug: options.debug,
            last_id: AtomicU64::new(0),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Issue `method` and return the fully read, parsed response envelope.
    ///
    /// The timeout covers the whole exchange, including reading the body; a
    /// server that stalls mid-body fails the call with
    /// [`RpcError::Timeout`]. A populated `error` field in a 200 response is not treated as a
    /// failure here; use [`RpcResponse::decode`] to surface it. On non-200
    /// the best-effort parsed envelope travels inside
    /// [`RpcError::UnexpectedStatus`].
    pub async fn call<P>(&self, method: &str, params: &P) -> Result<RpcResponse, RpcError>
    where
        P: Serialize + Sync + ?Sized,
    {
        let id = self.next_request_id();
        debug!(rpc.id = id, rpc.method = method, "rpc call");
        let request = self.build_request(id, method, params)?;
        let deadline = Instant::now() + self.timeout;
        let response = self.execute(id, request, deadline).await?;
        let status = response.status();

        let body = self.read_body(id, response, deadline).await?;
        debug!(rpc.id = id, rpc.method = method, %status, body_len = body.len(), "rpc response");
        trace!(
            rpc.id = id,
            rpc.method = method,
            body = %String::from_utf8_lossy(&body),
            "rpc response body"
        );
        if self.debug.dump_http && self.debug.dump_body {
            dump_response_body(self.logger.as_ref(), id, &body);
        }

        if status != StatusCode::OK {
            let envelope = parse_error_body(&body);
            let message = status_error_message(&envelope, status);
            return Err(RpcError::UnexpectedStatus {
                code: status.as_u16(),
                message,
                response: Some(Box::new(envelope)),
            });
        }

        serde_json::from_slice(&body).map_err(RpcError::Decoding)
    }

    /// Issue `method` and hand back the open response body.
    ///
    /// The timeout bounds the exchange up to the response head only; reading
    /// the returned [`RpcStream`] is not time-limited. The caller owns the
    /// connection until the stream is drained or dropped. On non-200 the
    /// body is consumed here to build the error and no stream is returned.
    pub async fn read<P>(&self, method: &str, params: &P) -> Result<RpcStream, RpcError>
    where
        P: Serialize + Sync + ?Sized,
    {
        let id = self.next_request_id();
        debug!(rpc.id = id, rpc.method = method, "rpc stream call");
        let request = self.build_request(id, method, params)?;
        let deadline = Instant::now() + self.timeout;
        let response = self.execute(id, request, deadline).await?;
        let status = response.status();
        debug!(rpc.id = id, rpc.method = method, %status, "rpc stream response");

        if status != StatusCode::OK {
            let body = self.read_body(id, response, deadline).await?;
            let envelope = parse_error_body(&body);
            return Err(RpcError::UnexpectedStatus {
                code: status.as_u16(),
                message: status_error_message(&envelope, status),
                response: None,
            });
        }

        Ok(RpcStream::new(response))
    }

    /// Timestamp-derived id, forced strictly above the previous one so ids
    /// stay unique within this client even when the clock stalls.
    fn next_request_id(&self) -> u64 {
        let now = now_nanos();
        let step = |last: u64| now.max(last.saturating_add(1));
        match self
            .last_id
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |last| Some(step(last)))
        {
            Ok(prev) | Err(prev) => step(prev),
        }
    }

    fn build_request<P>(
        &self,
        id: u64,
        method: &str,
        params: &P,
    ) -> Result<reqwest::Request, RpcError>
    where
        P: Serialize + ?Sized,
    {
        let envelope = RpcRequest {
            method,
            params,
            id,
            jsonrpc: JSONRPC_VERSION,
        };
        let payload = serde_json::to_vec(&envelope).map_err(RpcError::Encoding)?;

        let mut builder = self
            .client
            .post(&self.url)
            .header(header::CONTENT_TYPE, "application/json;charset=utf-8")
            .header(header::ACCEPT, "application/json")
            .body(payload);
        if let Some((ref user, ref pass)) = self.auth {
            builder = builder.basic_auth(user, Some(pass));
        }
        builder.build().map_err(RpcError::RequestBuild)
    }

    async fn read_body(
        &self,
        id: u64,
        response: reqwest::Response,
        deadline: Instant,
    ) -> Result<Bytes, RpcError> {
        match tokio::time::timeout_at(deadline, response.bytes()).await {
            Ok(body) => body.map_err(RpcError::BodyRead),
            Err(_) => {
                warn!(rpc.id = id, timeout = ?self.timeout, "rpc body read timed out");
                Err(RpcError::Timeout(self.timeout))
            }
        }
    }

    /// Race the HTTP exchange against the call deadline.
    ///
    /// The exchange runs on its own task and reports through a one-slot
    /// channel. If the deadline wins, the task is aborted so the in-flight
    /// request and its connection are released.
    async fn execute(
        &self,
        id: u64,
        request: reqwest::Request,
        deadline: Instant,
    ) -> Result<reqwest::Response, RpcError> {
        let timer = tokio::time::sleep_until(deadline);

        let client = self.client.clone();
        let logger = Arc::clone(&self.logger);
        let flags = self.debug;
        let (done_tx, done_rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            if flags.dump_http {
                dump_request(logger.as_ref(), &request, flags.dump_body);
            }
            let outcome = client.execute(request).await;
            // The receiver is gone only if the deadline already fired.
            let _ = done_tx.send(outcome);
        });

        let outcome = tokio::select! {
            outcome = done_rx => outcome.map_err(|_| RpcError::Interrupted)?,
            () = timer => {
                task.abort();
                warn!(rpc.id = id, timeout = ?self.timeout, "rpc call timed out");
                return Err(RpcError::Timeout(self.timeout));
            }
        };

        match outcome {
            Ok(response) => {
                if self.debug.dump_http {
                    dump_response_head(self.logger.as_ref(), &response);
                }
                Ok(response)
            }
            Err(err) => {
                if self.debug.dump_http {
                    self.logger.error(format_args!("ERROR: {err}\n\n"));
                }
                Err(RpcError::Transport(err))
            }
        }
    }
}

#[async_trait]
impl RpcExchange for HttpRpcClient {
    async fn call(&self, method: &str, params: serde_json::Value) -> Result<RpcResponse, RpcError> {
        HttpRpcClient::call(self, method, &params).await
    }

    async fn read(&self, method: &str, params: serde_json::Value) -> Result<RpcStream, RpcError> {
        HttpRpcClient::read(self, method, &params).await
    }
}

fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_client(options: ClientOptions) -> HttpRpcClient {
        HttpRpcClient::new("127.0.0.1", 8332, "", "", "", false, options)
            .expect("client must construct")
    }

    #[test]
    fn new_rejects_empty_host() {
        let result =
            HttpRpcClient::new("", 8332, "", "user", "pass", false, ClientOptions::default());
        assert!(matches!(result, Err(RpcError::InvalidArgument(_))));
    }

    #[test]
    fn new_applies_options_and_normalizes_path() {
        let client = HttpRpcClient::new(
            "node.local",
            18443,
            "wallet/main/",
            "",
            "",
            true,
            ClientOptions::default().with_timeout(Duration::from_secs(5)),
        )
        .expect("client must construct");
        assert_eq!(client.url(), "https://node.local:18443/wallet/main");
        assert_eq!(client.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn default_timeout_is_two_minutes() {
        assert_eq!(local_client(ClientOptions::default()).timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn request_ids_are_time_derived_and_strictly_increasing() {
        let client = local_client(ClientOptions::default());
        let before = now_nanos();
        let first = client.next_request_id();
        let second = client.next_request_id();
        assert!(first >= before);
        assert!(second > first);
    }

    #[test]
    fn build_request_sets_headers_and_auth() {
        let client = HttpRpcClient::new(
            "127.0.0.1",
            8332,
            "",
            "alice",
            "secret",
            false,
            ClientOptions::default(),
        )
        .expect("client must construct");
        let request = client
            .build_request(9, "getblockcount", &serde_json::json!([]))
            .expect("request must build");

        assert_eq!(request.method(), &reqwest::Method::POST);
        assert_eq!(
            request.headers()[header::CONTENT_TYPE],
            "application/json;charset=utf-8"
        );
        assert_eq!(request.headers()[header::ACCEPT], "application/json");
        assert!(request.headers().contains_key(header::AUTHORIZATION));

        let body = request
            .body()
            .and_then(reqwest::Body::as_bytes)
            .expect("body must be buffered");
        let decoded: serde_json::Value = serde_json::from_slice(body).expect("body must be JSON");
        assert_eq!(
            decoded,
            serde_json::json!({"method": "getblockcount", "params": [], "id": 9, "jsonrpc": "1.0"})
        );
    }

    #[test]
    fn build_request_without_credentials_has_no_auth() {
        let request = local_client(ClientOptions::default())
            .build_request(1, "getblockcount", &serde_json::json!([]))
            .expect("request must build");
        assert!(!request.headers().contains_key(header::AUTHORIZATION));
    }

    #[test]
    fn build_request_reports_encoding_failure() {
        struct Unencodable;
        impl Serialize for Unencodable {
            fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
                Err(serde::ser::Error::custom("refuses to encode"))
            }
        }

        let err = local_client(ClientOptions::default())
            .build_request(1, "getblockcount", &Unencodable)
            .expect_err("encoding must fail");
        assert!(matches!(err, RpcError::Encoding(_)));
    }
}
