use clap::builder::FalseyValueParser;
use clap::Parser;

/// noderpc — issue one JSON-RPC call against a Bitcoin-style node.
#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// Node hostname or IP address.
    #[arg(long, default_value = "127.0.0.1", env = "NODERPC_HOST")]
    pub host: String,

    /// Node RPC port.
    #[arg(long, default_value = "8332", env = "NODERPC_PORT")]
    pub port: u16,

    /// Endpoint path, e.g. `wallet/<name>` for wallet-scoped calls.
    #[arg(long, default_value = "", env = "NODERPC_PATH")]
    pub path: String,

    /// RPC username.
    #[arg(long, default_value = "", env = "NODERPC_USER")]
    pub user: String,

    /// RPC password.
    #[arg(long, default_value = "", env = "NODERPC_PASS", hide_env_values = true)]
    pub pass: String,

    /// Use HTTPS. The server certificate is not verified.
    #[arg(long)]
    pub tls: bool,

    /// Per-call timeout in seconds.
    #[arg(long, default_value = "120")]
    pub timeout_secs: u64,

    /// Copy the raw response body to stdout instead of decoding `result`.
    #[arg(long)]
    pub stream: bool,

    /// Dump request and response heads.
    ///
    /// Through the environment, any value other than an empty string, `0`,
    /// `false`, `no`, `off`, `n` or `f` (case-insensitive) turns it on.
    #[arg(long, env = "debug_http", value_parser = FalseyValueParser::new())]
    pub debug_http: bool,

    /// Include bodies in the dump.
    ///
    /// Through the environment, any value other than an empty string, `0`,
    /// `false`, `no`, `off`, `n` or `f` (case-insensitive) turns it on.
    #[arg(long, env = "debug_http_dump_body", value_parser = FalseyValueParser::new())]
    pub debug_http_dump_body: bool,

    /// Trace DNS resolution and connection establishment.
    ///
    /// Through the environment, any value other than an empty string, `0`,
    /// `false`, `no`, `off`, `n` or `f` (case-insensitive) turns it on.
    #[arg(long, env = "HTTP_TRACE", value_parser = FalseyValueParser::new())]
    pub http_trace: bool,

    /// RPC method name.
    pub method: String,

    /// Positional parameters. Each is parsed as JSON, falling back to a
    /// plain string.
    pub params: Vec<String>,
}

/// Parse a positional parameter as JSON, or treat it as a string literal.
pub fn parse_param(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_owned()))
}
