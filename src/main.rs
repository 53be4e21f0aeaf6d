use anyhow::{Context, Result};
use axum::Router;
use std::{io::ErrorKind, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;
mod state;
mod views;

use config::{AppConfig, StorageBackend};
use services::{
    container::{AzureContainer, BlobContainer, MemoryContainer},
    storage_service::BlobStorageService,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config ---
    let cfg = AppConfig::from_env_and_args()?;

    tracing::info!("Starting blob-upload with config: {:?}", cfg);

    // --- Storage backend ---
    let container = build_container(&cfg)?;
    let storage = Arc::new(BlobStorageService::new(container));
    tracing::info!(
        container = %storage.container_name(),
        backend = ?cfg.backend,
        "storage gateway ready"
    );

    // --- Build router ---
    let views = views::Views::new().context("loading page templates")?;
    let state = state::AppState::new(storage, cfg.max_upload_bytes, views);
    let app: Router = routes::routes::routes(cfg.max_upload_bytes).with_state(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Open the configured container. Credentials are left to the environment.
fn build_container(cfg: &AppConfig) -> Result<Arc<dyn BlobContainer>> {
    match cfg.backend {
        StorageBackend::Memory => {
            tracing::warn!("using in-memory storage; uploads are lost on restart");
            Ok(Arc::new(MemoryContainer::new(cfg.container.clone())))
        }
        StorageBackend::Azure => {
            let account = cfg
                .account
                .as_deref()
                .context("storage account is not configured")?;
            let endpoint = cfg
                .blob_endpoint()
                .context("blob endpoint could not be determined")?;
            let container = AzureContainer::new(account, &cfg.container, &endpoint)
                .with_context(|| format!("configuring Azure container `{}`", cfg.container))?;
            Ok(Arc::new(container))
        }
    }
}
