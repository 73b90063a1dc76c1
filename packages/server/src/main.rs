use std::path::PathBuf;
use std::sync::Arc;

use common::storage::filesystem::FilesystemStore;
use tracing::{Level, info};
use vault_core::Vault;

use server::config::AppConfig;
use server::state::AppState;
use server::throttle::RateLimiter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load()?;

    let store = Arc::new(
        FilesystemStore::new(
            PathBuf::from(&config.storage.root),
            config.storage.max_blob_size,
        )
        .await?,
    );
    let vault = Arc::new(Vault::new(store, config.storage.quota_bytes));
    let throttle = Arc::new(RateLimiter::new(config.rate_limit.per_second));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState {
        vault,
        throttle,
        config,
    };

    let app = server::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("File vault listening at http://{addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
