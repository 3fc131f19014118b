//! Opt-in wire diagnostics: request/response dumps and connection tracing.
//!
//! Everything here writes through the configured [`Logger`]; nothing reads
//! the environment. The surrounding application decides the flags.

use std::error::Error as StdError;
use std::fmt::Write as _;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use hyper_util::client::legacy::connect::{Connection, HttpInfo};
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::header::{HeaderMap, AUTHORIZATION};
use tower::{Layer, Service};

use crate::logger::Logger;

/// Verbose diagnostics switches, all off by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebugFlags {
    /// Dump request and response heads at info level.
    pub dump_http: bool,
    /// Include bodies in the dump. Has no effect without `dump_http`.
    pub dump_body: bool,
    /// Log DNS resolutions and the connected peer address at debug level.
    pub trace_connections: bool,
}

// ==============================================================================
// DNS tracing
// ==============================================================================

/// System resolver that reports each lookup to the logger.
pub(super) struct TracingResolver {
    logger: Arc<dyn Logger>,
}

impl TracingResolver {
    pub(super) fn new(logger: Arc<dyn Logger>) -> Self {
        Self { logger }
    }
}

impl Resolve for TracingResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let logger = Arc::clone(&self.logger);
        Box::pin(async move {
            let host = name.as_str().to_owned();
            let looked_up = tokio::net::lookup_host((host.as_str(), 0)).await;
            match looked_up {
                Ok(addrs) => {
                    let addrs: Vec<SocketAddr> = addrs.collect();
                    logger.debug(format_args!("HTTP_TRACE - DNS: {host} -> {addrs:?}"));
                    let addrs: Addrs = Box::new(addrs.into_iter());
                    Ok(addrs)
                }
                Err(err) => {
                    logger.debug(format_args!("HTTP_TRACE - DNS: {host} failed: {err}"));
                    Err(Box::new(err) as Box<dyn StdError + Send + Sync>)
                }
            }
        })
    }
}

// ==============================================================================
// Connection tracing
// ==============================================================================

/// Connector layer that reports the peer of every newly established
/// connection, before any request is written to it.
#[derive(Clone)]
pub(super) struct ConnectionTraceLayer {
    logger: Arc<dyn Logger>,
}

impl ConnectionTraceLayer {
    pub(super) fn new(logger: Arc<dyn Logger>) -> Self {
        Self { logger }
    }
}

impl<S> Layer<S> for ConnectionTraceLayer {
    type Service = ConnectionTrace<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ConnectionTrace {
            inner,
            logger: Arc::clone(&self.logger),
        }
    }
}

#[derive(Clone)]
pub(super) struct ConnectionTrace<S> {
    inner: S,
    logger: Arc<dyn Logger>,
}

impl<S, Target> Service<Target> for ConnectionTrace<S>
where
    S: Service<Target>,
    S::Response: Connection + Send + 'static,
    S::Error: Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<S::Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, target: Target) -> Self::Future {
        let logger = Arc::clone(&self.logger);
        let connecting = self.inner.call(target);
        Box::pin(async move {
            let conn = connecting.await?;
            trace_connection(logger.as_ref(), peer_addr(&conn));
            Ok(conn)
        })
    }
}

fn peer_addr(conn: &impl Connection) -> Option<SocketAddr> {
    let mut extensions = http::Extensions::new();
    conn.connected().get_extras(&mut extensions);
    extensions.get::<HttpInfo>().map(HttpInfo::remote_addr)
}

pub(super) fn trace_connection(logger: &dyn Logger, remote: Option<SocketAddr>) {
    match remote {
        Some(addr) => logger.debug(format_args!("HTTP_TRACE - Conn: {addr}")),
        None => logger.debug(format_args!("HTTP_TRACE - Conn: remote address unavailable")),
    }
}

// ==============================================================================
// Dumps
// ==============================================================================

pub(super) fn dump_request(logger: &dyn Logger, request: &reqwest::Request, include_body: bool) {
    let mut out = format!("{} {}\n", request.method(), request.url());
    write_headers(&mut out, request.headers());
    if include_body {
        if let Some(body) = request.body().and_then(reqwest::Body::as_bytes) {
            out.push('\n');
            out.push_str(&String::from_utf8_lossy(body));
        }
    }
    logger.info(format_args!("{out}\n\n"));
}

pub(super) fn dump_response_head(logger: &dyn Logger, response: &reqwest::Response) {
    let mut out = format!("{:?} {}\n", response.version(), response.status());
    write_headers(&mut out, response.headers());
    logger.info(format_args!("{out}\n\n"));
}

pub(super) fn dump_response_body(logger: &dyn Logger, id: u64, body: &[u8]) {
    logger.info(format_args!(
        "response body (id {id}):\n{}\n\n",
        String::from_utf8_lossy(body)
    ));
}

fn write_headers(out: &mut String, headers: &HeaderMap) {
    for (name, value) in headers {
        if name == AUTHORIZATION {
            let _ = writeln!(out, "{name}: <redacted>");
        } else {
            let _ = writeln!(out, "{name}: {}", String::from_utf8_lossy(value.as_bytes()));
        }
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::{HeaderValue, CONTENT_TYPE};

    use super::*;
    use crate::logger::capture::CaptureLogger;

    fn sample_request() -> reqwest::Request {
        let mut request = reqwest::Request::new(
            reqwest::Method::POST,
            "http://127.0.0.1:8332/wallet".parse().expect("static url must parse"),
        );
        request.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json;charset=utf-8"),
        );
        request
            .headers_mut()
            .insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        *request.body_mut() = Some(reqwest::Body::from(r#"{"method":"getblockcount"}"#));
        request
    }

    #[test]
    fn request_dump_redacts_authorization() {
        let logger = CaptureLogger::default();
        dump_request(&logger, &sample_request(), false);

        let lines = logger.messages("info");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("POST http://127.0.0.1:8332/wallet\n"));
        assert!(lines[0].contains("content-type: application/json;charset=utf-8"));
        assert!(lines[0].contains("authorization: <redacted>"));
        assert!(!lines[0].contains("dXNlcjpwYXNz"));
        assert!(!lines[0].contains("getblockcount"));
    }

    #[test]
    fn request_dump_includes_body_when_asked() {
        let logger = CaptureLogger::default();
        dump_request(&logger, &sample_request(), true);

        let lines = logger.messages("info");
        assert!(lines[0].contains(r#"{"method":"getblockcount"}"#));
    }

    #[test]
    fn connection_trace_logs_at_debug() {
        let logger = CaptureLogger::default();
        trace_connection(&logger, Some("127.0.0.1:8332".parse().expect("addr must parse")));

        assert_eq!(logger.messages("debug"), vec!["HTTP_TRACE - Conn: 127.0.0.1:8332"]);
        assert!(logger.messages("info").is_empty());
    }
}
