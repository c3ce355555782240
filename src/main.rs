//! solanoid-watch - waits for configured bridge deposits
//!
//! Starts one awaiter per configured watch, logs every delivered deposit and
//! keeps checking the ledger node until all watches finish or a shutdown
//! signal arrives.

use anyhow::Result;
use std::fmt::Debug;
use std::sync::Arc;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use solanoid::awaiter::{
    self, cancel_pair, CancelToken, DepositAwaiter, ExplorerAwaiter, LedgerAwaiter,
};
use solanoid::chain::HttpLedgerRpc;
use solanoid::config::{LogFormat, Settings, WatchConfig, WatchKind};
use solanoid::metrics::{self, MetricsServer};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging();

    info!("Starting solanoid-watch v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let settings = Settings::load()?;
    info!("Loaded configuration with {} watches", settings.watches.len());

    let ledger = Arc::new(HttpLedgerRpc::new(
        &settings.ledger.rpc_url,
        &settings.ledger.commitment,
    )?);

    // Start metrics server
    let metrics_handle = if settings.metrics.enabled {
        let server = MetricsServer::new(settings.metrics.port);
        Some(tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!("Metrics server error: {}", e);
            }
        }))
    } else {
        None
    };

    // Start awaiters
    let (cancel, token) = cancel_pair();
    let mut watch_handles = Vec::with_capacity(settings.watches.len());
    for watch in &settings.watches {
        let cfg = watch.to_watch_config()?;
        let watched = cfg.watch_address.clone();
        let handle = match watch.kind {
            WatchKind::Explorer => {
                let explorer = settings
                    .explorer
                    .as_ref()
                    .ok_or_else(|| anyhow::anyhow!("Watch {} needs an explorer", watch.name))?;
                let mut awaiter = ExplorerAwaiter::new(&explorer.api_url, &explorer.api_key)?;
                awaiter.set_cfg(cfg);
                run_watch(watch, awaiter, token.clone())
            }
            WatchKind::Ledger => {
                let rpc = HttpLedgerRpc::new(&settings.ledger.rpc_url, &settings.ledger.commitment)?;
                let mut awaiter = LedgerAwaiter::new(rpc);
                awaiter.set_cfg(cfg);
                run_watch(watch, awaiter, token.clone())
            }
        };
        info!("Watching {} ({:?}) at {}", watch.name, watch.kind, watched);
        watch_handles.push(handle);
    }

    // Health check loop
    let health_handle = tokio::spawn({
        let ledger = ledger.clone();
        let interval = settings.ledger.health_check_interval_secs;
        async move {
            loop {
                tokio::time::sleep(tokio::time::Duration::from_secs(interval)).await;

                if ledger.health_check().await {
                    metrics::record_health_check();
                } else {
                    warn!("Ledger node {} health check failed", ledger.endpoint());
                    metrics::record_health_check_failure();
                }
            }
        }
    });

    info!("solanoid-watch is running");
    if settings.metrics.enabled {
        info!("Metrics: http://0.0.0.0:{}/metrics", settings.metrics.port);
    }

    let all_watches = futures::future::join_all(watch_handles.iter_mut());
    tokio::select! {
        _ = shutdown_signal() => {
            info!("Shutdown signal received, stopping...");
            cancel.cancel();
        }
        _ = all_watches => {
            info!("All watches finished");
        }
    }

    // Abort background tasks
    for handle in &watch_handles {
        handle.abort();
    }
    health_handle.abort();
    if let Some(h) = metrics_handle {
        h.abort();
    }

    info!("solanoid-watch stopped");
    Ok(())
}

/// Spawn `source` and log what it delivers.
fn run_watch<A>(watch: &WatchConfig, source: A, token: CancelToken) -> JoinHandle<()>
where
    A: DepositAwaiter + 'static,
    A::Event: Debug,
{
    let name = watch.name.clone();
    let (mut deposits, task) = awaiter::spawn(source, token);

    tokio::spawn(async move {
        while let Some(deposit) = deposits.recv().await {
            info!("{}: deposit received: {:?}", name, deposit);
        }

        match task.await {
            Ok(Ok(())) => info!("{}: watch complete", name),
            Ok(Err(e)) => warn!("{}: watch stopped: {}", name, e),
            Err(e) => error!("{}: watch task failed: {}", name, e),
        }
    })
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,solanoid=debug,solanoid_watch=debug,hyper=warn"));

    let registry = tracing_subscriber::registry().with(filter);
    match LogFormat::from_env() {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(true))
            .init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
