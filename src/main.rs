use anyhow::Result;
use clap::Parser;
use lotus_exporter::{config::Config, server};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the env file holding the Lotus connection settings
    /// (default: /etc/lotus_exporter/.env)
    #[arg(short, long, env = "LOTUS_EXPORTER_CONFIG_PATH")]
    config_path: Option<String>,

    /// Address to listen on, `:PORT` binds every interface (overrides config)
    #[arg(short, long, env = "LOTUS_EXPORTER_LISTEN_ADDRESS")]
    listen_address: Option<String>,

    /// Path under which to expose metrics (overrides config)
    #[arg(short, long, env = "LOTUS_EXPORTER_METRICS_PATH")]
    metrics_path: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Lotus Prometheus Exporter v{}",
        env!("CARGO_PKG_VERSION")
    );

    let args = Args::parse();

    let mut config = Config::load(args.config_path.as_deref())?;

    if let Some(listen_address) = args.listen_address {
        config.server.listen_address = listen_address;
    }
    if let Some(metrics_path) = args.metrics_path {
        config.server.metrics_path = metrics_path;
    }

    info!("Configuration loaded successfully");
    if let Some(owner_id) = &config.lotus.owner_id {
        info!("Displaying owner as {}", owner_id);
    }
    info!(
        "Metrics endpoint: http://{}{}",
        config.server.bind_address(),
        config.server.metrics_path
    );

    if let Err(e) = server::start(config).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
