use std::sync::Arc;
use std::time::Duration;

use crate::error::RpcError;
use crate::logger::Logger;

use super::trace::{ConnectionTraceLayer, TracingResolver};

/// Strip trailing separators and make sure a non-empty path starts with
/// exactly one `/`. An empty or all-separator path means the server root.
pub(super) fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

/// Compose the endpoint URL. No escaping is applied: callers must supply a
/// well-formed host and path.
pub(super) fn endpoint_url(
    host: &str,
    port: u16,
    path: &str,
    use_tls: bool,
) -> Result<String, RpcError> {
    if host.is_empty() {
        return Err(RpcError::InvalidArgument(
            "bad call missing argument host".to_owned(),
        ));
    }
    let scheme = if use_tls { "https" } else { "http" };
    Ok(format!("{scheme}://{host}:{port}{}", normalize_path(path)))
}

/// Basic-auth credentials are sent when either half is non-empty.
pub(super) fn resolve_auth(user: &str, pass: &str) -> Option<(String, String)> {
    if user.is_empty() && pass.is_empty() {
        None
    } else {
        Some((user.to_owned(), pass.to_owned()))
    }
}

/// Build the shared transport. With TLS, server certificates are not
/// verified: nodes commonly serve self-signed certificates.
pub(super) fn build_http_client(
    use_tls: bool,
    trace_connections: bool,
    logger: &Arc<dyn Logger>,
) -> Result<reqwest::Client, RpcError> {
    let mut builder = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(32)
        .tcp_nodelay(true);
    if use_tls {
        builder = builder.danger_accept_invalid_certs(true);
    }
    if trace_connections {
        builder = builder
            .dns_resolver(Arc::new(TracingResolver::new(Arc::clone(logger))))
            .connector_layer(ConnectionTraceLayer::new(Arc::clone(logger)));
    }
    builder.build().map_err(RpcError::HttpClientBuild)
}
