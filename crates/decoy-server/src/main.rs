use anyhow::Context;
use clap::Parser;
use decoy_server::admin_api::AdminApiServer;
use decoy_server::config::{load_expectations, Config, LogFormat};
use decoy_server::expectation::ExpectationStore;
use decoy_server::metrics;
use decoy_server::server::{CallbackRegistry, EchoCallback, MockServer};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "decoy", version, about = "HTTP mock server driven by request expectations")]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, env = "DECOY_CONFIG")]
    config: Option<PathBuf>,

    /// Port for mocked traffic (overrides the config file)
    #[arg(long, env = "DECOY_MOCK_PORT")]
    mock_port: Option<u16>,

    /// Port for the admin API (overrides the config file)
    #[arg(long, env = "DECOY_ADMIN_PORT")]
    admin_port: Option<u16>,

    /// Log level (overrides the config file; RUST_LOG wins over both)
    #[arg(long, env = "DECOY_LOG_LEVEL")]
    log_level: Option<String>,

    /// JSON file with expectations to register at startup
    #[arg(long, env = "DECOY_EXPECTATIONS")]
    expectations: Option<PathBuf>,
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(port) = args.mock_port {
        config.mock.port = port;
    }
    if let Some(port) = args.admin_port {
        config.admin.port = port;
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if let Some(path) = &args.expectations {
        config.initial_expectations = Some(path.clone());
    }
    config.validate()?;
    Ok(config)
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.to_lowercase()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    init_tracing(&config);

    let store = Arc::new(ExpectationStore::with_log_capacity(
        config.request_log_capacity,
    ));
    if let Some(path) = &config.initial_expectations {
        let ids = load_expectations(path, &store)?;
        info!("Loaded {} expectation(s) from {}", ids.len(), path.display());
        metrics::record_registered(ids.len());
        metrics::set_active_expectations(store.active().len());
    }

    let callbacks = Arc::new(CallbackRegistry::new());
    callbacks.register("echo", Arc::new(EchoCallback));

    let mock = MockServer::bind(config.mock.socket_addr(), Arc::clone(&store), callbacks)
        .await
        .context("Failed to start mock listener")?;
    let admin = AdminApiServer::bind(config.admin.socket_addr(), Arc::clone(&store)).await?;

    tokio::select! {
        res = mock.run() => res?,
        res = admin.run() => res?,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }
    Ok(())
}
