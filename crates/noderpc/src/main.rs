mod cli;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use eyre::{eyre, WrapErr};

use noderpc_core::rpc::{ClientOptions, DebugFlags, HttpRpcClient, RpcExchange};
use noderpc_core::RpcError;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let args = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter(&args))),
        )
        .with_writer(std::io::stderr)
        .with_level(true)
        .init();

    let debug = DebugFlags {
        dump_http: args.debug_http,
        dump_body: args.debug_http_dump_body,
        trace_connections: args.http_trace,
    };
    let options = ClientOptions::default()
        .with_timeout(Duration::from_secs(args.timeout_secs))
        .with_debug(debug);

    let rpc: Arc<dyn RpcExchange> = Arc::new(
        HttpRpcClient::new(
            &args.host,
            args.port,
            &args.path,
            &args.user,
            &args.pass,
            args.tls,
            options,
        )
        .context("construct RPC client")?,
    );
    if args.tls {
        tracing::warn!("TLS enabled without certificate verification");
    }

    let params =
        serde_json::Value::Array(args.params.iter().map(|p| cli::parse_param(p)).collect());
    let endpoint = format!("{}:{}", args.host, args.port);

    if args.stream {
        let mut stream = rpc
            .read(&args.method, params)
            .await
            .map_err(|err| connect_error(&endpoint, &args.method, err))?;

        let mut stdout = std::io::stdout().lock();
        while let Some(chunk) = stream.chunk().await.context("read response body")? {
            stdout.write_all(&chunk).context("write to stdout")?;
        }
        stdout.flush().context("flush stdout")?;
        return Ok(());
    }

    let response = rpc
        .call(&args.method, params)
        .await
        .map_err(|err| connect_error(&endpoint, &args.method, err))?;
    let result: serde_json::Value = response
        .decode()
        .wrap_err_with(|| format!("`{}` returned an error", args.method))?;

    tracing::debug!(id = ?response.id, "rpc call completed");
    println!(
        "{}",
        serde_json::to_string_pretty(&result).context("format result")?
    );

    Ok(())
}

/// Connection tracing is emitted at debug level under `noderpc::wire`.
fn default_filter(args: &cli::Cli) -> &'static str {
    if args.http_trace {
        "info,noderpc::wire=debug"
    } else {
        "info"
    }
}

fn connect_error(endpoint: &str, method: &str, err: RpcError) -> eyre::Report {
    let message = format_rpc_error(endpoint, &err);
    eyre!(message).wrap_err(format!("while calling `{method}`"))
}

fn format_rpc_error(endpoint: &str, err: &RpcError) -> String {
    let mut lines = vec![
        format!("RPC call to `{endpoint}` failed"),
        format!("RPC error: {err}"),
    ];
    let detail: String =
        std::iter::successors(std::error::Error::source(err), |source| source.source())
            .map(|source| format!("{source}; "))
            .collect();

    match err {
        RpcError::Timeout(_) => lines.push(
            "hint: the node did not answer in time; raise --timeout-secs or check node load"
                .into(),
        ),
        RpcError::UnexpectedStatus { code: 401 | 403, .. } => {
            lines.push("hint: authentication failed; verify --user/--pass".into())
        }
        RpcError::UnexpectedStatus {
            code: 404, message, ..
        } if message.starts_with("HTTP error") => {
            lines.push("hint: endpoint path is invalid; verify --path".into())
        }
        RpcError::Transport(_) if detail.contains("dns error") => lines.push(
            "hint: hostname resolution failed; verify --host and your DNS/network".into(),
        ),
        RpcError::Transport(_)
            if detail.contains("tls") || detail.contains("certificate") || detail.contains("SSL") =>
        {
            lines.push("hint: TLS handshake failed; verify the node actually serves HTTPS".into())
        }
        RpcError::Transport(_) => lines.push(
            "hint: request could not be sent; verify --host/--port and that the node is reachable"
                .into(),
        ),
        _ => {}
    }

    lines.join("\n")
}
