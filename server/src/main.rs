// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Chainsight Server
//!
//! Entry point for the `chainsight-server` binary. Parses CLI arguments,
//! initializes logging and metrics, opens the chain index, and serves the
//! explorer API.
//!
//! - `run`     — serve the API and metrics endpoints
//! - `import`  — load a JSON block dump into the chain index
//! - `version` — print build version information

mod api;
mod cli;
mod import;
mod logging;
mod metrics;
mod settings;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

use chainsight_explorer::rpc::NodeRpcClient;
use chainsight_explorer::storage::CachedAddressIndex;
use chainsight_explorer::Explorer;

use cli::{ChainsightCli, Commands};
use logging::LogFormat;
use metrics::{MetricsDiagnostics, ServerMetrics};
use settings::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = ChainsightCli::parse();

    match cli.command {
        Commands::Run(args) => run_server(args).await,
        Commands::Import(args) => {
            logging::init_logging(logging::DEFAULT_FILTER, LogFormat::Pretty);
            let count = import::run_import(&args)?;
            println!("Imported {} blocks into {}", count, args.data_dir.display());
            Ok(())
        }
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Serves the API and metrics endpoints until a shutdown signal arrives.
async fn run_server(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        logging::DEFAULT_FILTER,
        LogFormat::from_str_lossy(&args.log_format),
    );

    let mut settings = Settings::load(args.config.as_deref())?;
    settings.apply_overrides(&args);
    settings.validate()?;

    tracing::info!(
        port = args.port,
        metrics_port = args.metrics_port,
        data_dir = %args.data_dir.display(),
        fanout_concurrency = settings.listing.fanout_concurrency,
        max_range_width = settings.listing.max_range_width,
        rpc_url = %settings.rpc.url,
        "starting chainsight-server"
    );

    // --- Chain index ---
    let store = Arc::new(import::open_store(&args.data_dir)?);

    // --- Metrics ---
    let server_metrics = Arc::new(ServerMetrics::new().context("failed to register metrics")?);

    // --- Explorer ---
    let explorer = Explorer::new(
        store.clone(),
        Arc::new(CachedAddressIndex::new(store.clone())),
        store,
    )
    .with_config(settings.listing)
    .with_diagnostics(Arc::new(MetricsDiagnostics::new(server_metrics.clone())));

    // --- Upstream node ---
    let rpc = NodeRpcClient::new(&settings.rpc).context("failed to build node RPC client")?;

    let app_state = api::AppState {
        version: env!("CARGO_PKG_VERSION").to_string(),
        explorer,
        rpc: Arc::new(rpc),
        metrics: server_metrics.clone(),
        request_timeout: Duration::from_secs(args.request_timeout_secs),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(server_metrics);
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
        }
    }

    tracing::info!("chainsight-server stopped");
    Ok(())
}

fn print_version() {
    println!("chainsight-server {}", env!("CARGO_PKG_VERSION"));
    println!("page length       {}", chainsight_explorer::config::PAGE_LENGTH);
}

/// Waits for SIGINT or SIGTERM. Only Ctrl+C on non-Unix platforms.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
