use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use marquee::api::notify::TracingNotifier;
use marquee::config::{load_config, ApiConfig};
use marquee::lifecycle::signals;
use marquee::store::MemoryStore;
use marquee::{ApiServer, Shutdown, Stores};

#[derive(Debug, Parser)]
#[command(name = "marquee", version, about = "Movie catalog JSON API")]
struct Args {
    /// Path to a TOML config file; defaults apply when omitted.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the configured bind address.
    #[arg(long, value_name = "ADDR")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ApiConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.server.bind_address = bind;
    }

    marquee::observability::logging::init(&config.observability, &config.server.environment);

    tracing::info!(
        bind_address = %config.server.bind_address,
        environment = %config.server.environment,
        limiter_enabled = config.limiter.enabled,
        "configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => marquee::observability::metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.server.bind_address).await?;

    let shutdown = Shutdown::new();
    signals::spawn_listener(shutdown.clone());

    let stores = Stores::from_memory(Arc::new(MemoryStore::new()));
    let server = ApiServer::new(config, stores, Arc::new(TracingNotifier));
    server.run(listener, shutdown).await?;

    Ok(())
}
