//! Virtual Product Mock Server - CLI Entry Point

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use virtual_product_mock_server::{api, config::program_dir, MockApiService, MockServerConfig};

#[derive(Parser, Debug)]
#[command(
    name = "virtual-product-mock-server",
    about = "Mock virtual product API - catalog, idempotent purchases, latency and failure simulation",
    version
)]
struct Args {
    /// Catalog JSON file (overrides DATA_FILE)
    data_file: Option<PathBuf>,

    /// Optional YAML configuration file; environment variables take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, default_value = "info")]
    log_level: Level,

    /// Print a sample configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Validate configuration and catalog, then exit
    #[arg(long)]
    validate: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    if args.print_config {
        let default_config = include_str!("../demos/default-config.yaml");
        println!("{}", default_config);
        return ExitCode::SUCCESS;
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => {
            info!(path = ?path, "Loading configuration");
            MockServerConfig::from_file(path)?
        }
        None => MockServerConfig::default(),
    };

    let mut config = config.apply_env()?;
    if let Some(data_file) = args.data_file {
        config.data_file = data_file;
    }
    let config = config.resolve_data_file(&program_dir()?);
    config.validate()?;

    info!(
        port = config.port,
        data_file = %config.data_file.display(),
        "Starting mock server"
    );
    info!(
        response_delay_ms = config.delay.fixed_ms,
        fail_purchase = config.fail_purchase,
        "Config"
    );

    let addr = format!("{}:{}", config.host, config.port);
    let service = Arc::new(MockApiService::new(config));

    // Load the catalog before accepting connections
    let catalog = service.catalog().await?;

    if args.validate {
        println!(
            "Configuration is valid ({} SKUs loaded)",
            catalog.skus.len()
        );
        return Ok(());
    }

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", addr, e))?;
    info!(addr = %listener.local_addr()?, "Mock server listening");

    axum::serve(listener, api::router(service.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let stats = service.stats();
    info!(
        confirmed = stats.confirmed(),
        failed = stats.failed(),
        replayed = stats.replayed(),
        "Mock server stopped"
    );

    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
