use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use stubsmith::config::Config;
use stubsmith::server::{ServerState, StubServer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "stubsmith", version, about = "HTTP stub server")]
struct Args {
    /// YAML configuration file
    #[arg(short, long, env = "STUBSMITH_CONFIG")]
    config: Option<PathBuf>,

    /// Listen port (overrides the config file)
    #[arg(short, long, env = "STUBSMITH_PORT")]
    port: Option<u16>,

    /// Directory holding body files and scripts (overrides the config file)
    #[arg(long, env = "STUBSMITH_FILES_ROOT")]
    files_root: Option<PathBuf>,

    /// Default tracing directive, e.g. `info` or `stubsmith=debug`
    #[arg(long, env = "STUBSMITH_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,
}

fn init_tracing(level: &str, format: LogFormat) -> Result<(), anyhow::Error> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("Invalid log level '{level}'"))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();
    init_tracing(&args.log_level, args.log_format)?;

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(port) = args.port {
        config.listen.port = port;
    }
    if let Some(root) = args.files_root {
        config.files.root = root;
    }

    let addr: SocketAddr = format!("{}:{}", config.listen.host, config.listen.port)
        .parse()
        .with_context(|| format!("Invalid listen address '{}'", config.listen.host))?;

    info!(
        "Starting stubsmith {} (files: {}, script engine: {})",
        env!("CARGO_PKG_VERSION"),
        config.files.root.display(),
        config.scripting.engine
    );

    let state = ServerState::from_config(&config)?;
    let server = StubServer::new(addr, state);

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            Ok(())
        }
    }
}
