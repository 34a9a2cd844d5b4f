use anyhow::{bail, Context};
use clap::Parser;
use tokio::{net::TcpListener, task};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

use depwatch::Config;

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::CliArgs::parse();
    tracing_subscriber::registry()
        .with(args.log_level)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    let listen = args.listen.unwrap_or(config.listen);
    let path = config.path.clone();
    if config.dependencies.is_empty() {
        warn!("No dependency configured");
    }

    // Registration probes every dependency once, which blocks
    let check = task::spawn_blocking(move || config.into_service_check())
        .await?
        .context("Failed to set up service check")?;

    if let Some(timeout) = args.wait_timeout {
        info!("Waiting up to {:?} for dependencies", timeout);
        if !check.wait_for_healthy(timeout).await {
            bail!("Dependencies still unhealthy after {:?}", timeout);
        }
    }

    let shutdown = CancellationToken::new();
    let checking = check.start_until(shutdown.clone());
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", err);
                return;
            }
            info!("Shutting down");
            shutdown.cancel();
        }
    });

    let listener = TcpListener::bind(listen)
        .await
        .with_context(|| format!("Failed to bind on {}", listen))?;
    info!("Serving [{}] health on http://{}{}", check.name(), listen, path);
    axum::serve(listener, depwatch::router(check, &path))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .context("HTTP server failed")?;
    checking.await?;
    Ok(())
}
