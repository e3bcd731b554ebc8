use anyhow::{Context, Result};
use doss_metadata::{
    auth::StaticTokens,
    config::AppConfig,
    services::kv_store::{KvStore, StoreOptions},
    state::AppState,
};
use std::{fs, io::ErrorKind, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = AppConfig::from_env_and_args()?;

    tracing::info!(
        addr = %cfg.addr(),
        database_url = %cfg.database_url,
        owners = cfg.tokens.len(),
        "starting doss-metadata"
    );

    // --- Ensure the database directory exists ---
    let db_path = Path::new(
        cfg.database_url
            .trim_start_matches("sqlite://")
            .trim_start_matches("sqlite:")
            .trim_start_matches("file:"),
    );
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating database directory {}", parent.display()))?;
            tracing::info!("Created missing directory {:?}", parent);
        }
    }

    // --- Open the store (applies the schema) ---
    let options = StoreOptions {
        busy_timeout: cfg.busy_timeout,
        ..StoreOptions::default()
    };
    let store = Arc::new(
        KvStore::open(&cfg.database_url, &options)
            .await
            .with_context(|| format!("opening metadata store at {}", cfg.database_url))?,
    );

    // --- Handle migration mode ---
    if migrate {
        tracing::info!("Database migration complete.");
        store.close().await;
        return Ok(());
    }

    let owners = StaticTokens::new(cfg.tokens.clone());
    if owners.is_empty() {
        tracing::warn!("no bearer tokens configured; every request will be rejected");
    }

    // --- Build router ---
    let app = doss_metadata::app(AppState::new(store.clone(), Arc::new(owners)));

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
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    tracing::info!("metadata store closed");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
