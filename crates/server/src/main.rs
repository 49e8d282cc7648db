use anyhow::Context;
use billsync_core::BillStore;
use billsync_import::Reconciler;
use billsync_server::{router, telemetry, AppState, ServerConfig};
use billsync_storage::{create_db, MemoryBillStore, SqliteBillStore};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_subscriber("billsync-server", "info")?;

    let config = ServerConfig::load()?;

    let pool = if config.memory {
        None
    } else {
        let pool = create_db(&config.database_path)
            .await
            .with_context(|| format!("Failed to open database {}", config.database_path.display()))?;
        Some(pool)
    };

    let store: Arc<dyn BillStore> = match &pool {
        Some(pool) => Arc::new(SqliteBillStore::new(pool.clone())),
        None => {
            tracing::warn!("Using in-memory bill store; bills are lost on shutdown");
            Arc::new(MemoryBillStore::new())
        }
    };

    let mut reconciler = Reconciler::new(store);
    if let Some(timeout) = config.store_timeout() {
        reconciler = reconciler.with_store_timeout(timeout);
    }

    let app = router(
        AppState {
            reconciler: Arc::new(reconciler),
        },
        config.max_upload_bytes,
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    tracing::info!("Server is running on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down...");
    if let Some(pool) = pool {
        pool.close().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
}
