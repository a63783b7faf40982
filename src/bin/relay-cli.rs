use clap::{Parser, Subcommand};
use reqwest::Method;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

use relay_proxy::config::{load_or_default, RelayProxyConfig};
use relay_proxy::network::HttpTransport;
use relay_proxy::observability::logging;
use relay_proxy::transform::redact;
use relay_proxy::{LogicalRequest, NetworkLayer, RelayError, RelayRegistry, RequestTransformer};

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Drive calls through the relay chain", long_about = None)]
struct Cli {
    /// TOML config file (falls back to $RELAY_CONFIG, then defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bearer token for upstream calls
    #[arg(short, long, env = "RELAY_TOKEN", default_value = "")]
    token: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe every relay and print its health
    Probe,
    /// Send a GraphQL query through the relay chain
    Query {
        /// Query text, or @file to read it from a file
        query: String,
        /// Variables as a JSON object
        #[arg(long, default_value = "{}")]
        variables: String,
    },
    /// GET a REST path through the relay chain
    Get {
        /// Upstream path, e.g. /members/self
        path: String,
    },
    /// Print the concrete request each relay would receive
    Transform {
        /// Upstream path
        path: String,
    },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => exit_with(json!({ "error": "invalid_config", "message": e.to_string() })),
    };
    if let Err(e) = logging::init_logging(&config.observability) {
        eprintln!("logging disabled: {}", e);
    }

    match run(cli.command, &cli.token, config).await {
        Ok(output) => print_json(&output),
        Err(e) => exit_with(envelope(&e)),
    }
}

async fn run(command: Commands, token: &str, config: RelayProxyConfig) -> Result<Value, CliError> {
    match command {
        Commands::Probe => {
            let transport = Arc::new(HttpTransport::new(&config.timeouts)?);
            let registry = RelayRegistry::from_config(&config, transport);
            for endpoint in registry.endpoints() {
                let healthy = registry.tracker().probe(endpoint).await;
                if healthy {
                    registry.tracker().mark_healthy(endpoint);
                } else {
                    registry.tracker().mark_unhealthy(endpoint);
                }
            }
            Ok(serde_json::to_value(registry.snapshot())?)
        }
        Commands::Query { query, variables } => {
            let query = match query.strip_prefix('@') {
                Some(path) => std::fs::read_to_string(path)?,
                None => query,
            };
            let variables: Value = serde_json::from_str(&variables)?;
            let layer = NetworkLayer::from_config(&config)?;
            Ok(layer.graphql(&query, variables, token).await?)
        }
        Commands::Get { path } => {
            let layer = NetworkLayer::from_config(&config)?;
            let response = layer.rest(Method::GET, &path, token).await?;
            Ok(response.to_json())
        }
        Commands::Transform { path } => {
            let transformer = RequestTransformer::new(&config.upstream);
            let mut request = LogicalRequest::get(path);
            if !token.is_empty() {
                request = request.with_bearer(token)?;
            }
            let transport = Arc::new(HttpTransport::new(&config.timeouts)?);
            let registry = RelayRegistry::from_config(&config, transport);

            let mut rows = Vec::new();
            for endpoint in registry.endpoints() {
                let concrete = transformer.transform(endpoint, &request)?;
                let headers: Vec<&str> = concrete.headers.keys().map(|k| k.as_str()).collect();
                rows.push(json!({
                    "relay": endpoint.name(),
                    "kind": endpoint.kind().label(),
                    "method": concrete.method.as_str(),
                    "url": redact(&concrete.url),
                    "headers": headers,
                }));
            }
            Ok(Value::Array(rows))
        }
        Commands::Config => Ok(serde_json::to_value(&config)?),
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Relay(#[from] RelayError),
    #[error(transparent)]
    Transport(#[from] relay_proxy::TransportError),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn envelope(error: &CliError) -> Value {
    let code = match error {
        CliError::Relay(e) => e.code(),
        CliError::Transport(_) => "transport_error",
        CliError::Json(_) => "invalid_input",
        CliError::Io(_) => "io_error",
    };
    json!({ "error": code, "message": error.to_string() })
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(_) => println!("{}", value),
    }
}

fn exit_with(value: Value) -> ! {
    match serde_json::to_string_pretty(&value) {
        Ok(text) => eprintln!("{}", text),
        Err(_) => eprintln!("{}", value),
    }
    std::process::exit(1)
}
