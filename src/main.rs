/*!
 * Unit Supervisor - Main Entry Point
 *
 * Hosts submitted program sources as child processes and exposes
 * lifecycle control and live logs over HTTP.
 */

use anyhow::Context;
use std::sync::Arc;
use tracing::{error, info};

use unit_supervisor::api::{serve, ServerConfig};
use unit_supervisor::{init_tracing, Registry, SupervisorConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Unit supervisor starting...");

    let config = SupervisorConfig::from_env().context("invalid configuration")?;
    info!(
        workspace = %config.workspace_dir.display(),
        runtime = %config.runtime.command,
        addr = %config.bind_addr,
        "Configuration loaded"
    );

    let registry = Arc::new(Registry::from_config(&config).context("failed to initialize registry")?);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    };

    let served = serve(ServerConfig::from(&config), Arc::clone(&registry), shutdown).await;

    // Hosted processes never outlive the supervisor
    registry.shutdown().await;

    served.context("HTTP server failed")?;
    info!("Unit supervisor stopped");
    Ok(())
}
