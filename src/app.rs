use crate::{
    auth::{CredentialService, InMemoryUserStore},
    config::Config,
    registry::{ArtifactKind, ArtifactStatus, ModelRegistry},
    server::{HttpServer, SharedState},
    telemetry::Metrics,
};
use std::sync::Arc;
use tokio::{signal, sync::broadcast};

pub async fn start_app(config: Config) -> anyhow::Result<()> {
    // Every artifact is settled before the listener exists.
    let models = config.models.clone();
    let registry = tokio::task::spawn_blocking(move || ModelRegistry::load(&models)).await?;
    for kind in ArtifactKind::ALL {
        match registry.status(kind) {
            ArtifactStatus::Loaded => tracing::info!(artifact = %kind, "Artifact ready"),
            ArtifactStatus::Failed(reason) => {
                tracing::warn!(artifact = %kind, "Artifact unavailable: {}", reason)
            }
            ArtifactStatus::Unloaded => tracing::warn!(artifact = %kind, "Artifact not loaded"),
        }
    }

    let metrics = Arc::new(Metrics::new()?);
    let credentials = Arc::new(CredentialService::new(
        Arc::new(InMemoryUserStore::new()),
        &config.auth,
    ));
    let state = SharedState {
        registry: Arc::new(registry),
        credentials,
        metrics,
    };

    let server = HttpServer::new(state, &config.server).await?;

    let (shutdown_tx, _) = broadcast::channel(1);
    let server_handle = server.run(shutdown_tx.subscribe()).await?;

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown.");

    let _ = shutdown_tx.send(());
    server_handle.await??;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
