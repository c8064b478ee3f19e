use std::sync::Arc;

use kube::Client;
use tokio::signal;
use tracing::{error, info};

use db_orchestrator::config::Settings;
use db_orchestrator::health::{HealthState, run_health_server};
use db_orchestrator::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("db_orchestrator=info".parse()?)
                .add_directive("kube=info".parse()?),
        )
        .init();

    info!("Starting db-orchestrator");

    let settings = Settings::from_env();
    info!(namespace = %settings.namespace, strict = settings.strict, "Loaded settings");

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    // Create shared health state and start the probe/metrics server;
    // the orchestrator records operation metrics into the same registry.
    let health_state = Arc::new(HealthState::new());
    let _orchestrator = Arc::new(Orchestrator::with_metrics(
        client,
        settings,
        health_state.metrics.clone(),
    ));
    let health_handle = {
        let health_state = health_state.clone();
        tokio::spawn(async move {
            if let Err(e) = run_health_server(health_state).await {
                error!("Health server error: {}", e);
            }
        })
    };

    // The orchestrator is request/response; once the client is up it
    // is ready to serve callers.
    health_state.set_ready(true).await;

    tokio::select! {
        result = health_handle => {
            if let Err(e) = result {
                error!("Health server task panicked: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Received shutdown signal, shutting down");
            health_state.set_ready(false).await;
        }
    }

    info!("Orchestrator stopped");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
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
