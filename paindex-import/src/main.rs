//! paindex-import service entry point

use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use paindex_common::config::ServiceConfig;
use paindex_common::events::EventBus;
use paindex_import::object_store::HttpObjectStore;
use paindex_import::wp::WpClient;
use paindex_import::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("Starting paindex-import service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = match std::env::var("PAINDEX_CONFIG") {
        Ok(path) => ServiceConfig::load(std::path::Path::new(&path))?,
        Err(_) => ServiceConfig::from_env(),
    };
    info!("Database: {}", config.database_path.display());

    let db = paindex_import::store::init_database_pool(&config.database_path).await?;
    info!("Database connection established");

    let event_bus = EventBus::new(config.event_capacity);
    let object_store = Arc::new(HttpObjectStore::new(
        &config.object_store_base_url,
        config.http_timeout_secs,
    )?);
    let wp_source = Arc::new(WpClient::new(
        &config.wordpress_base_url,
        config.http_timeout_secs,
    )?);

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(db, event_bus, config, object_store, wp_source);
    let app = paindex_import::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
