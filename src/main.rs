mod actions;
mod api_doc;
mod auth;
mod config;
mod error;
mod handlers;
mod models;
mod routes;
mod state;
mod store;

use std::sync::Arc;

use config::{Config, StoreBackend};
use state::AppState;
use store::{KvStore, MemoryStore, SpannerStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; real deployments set the environment directly
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kvman=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("kvman starting");

    let config = Config::from_env()?;
    config.log_startup();

    let store = open_store(&config).await?;
    let addr = format!("{}:{}", config.service_host, config.service_port);

    let state = AppState {
        store,
        config: Arc::new(config),
    };
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn KvStore>> {
    match (config.backend, &config.spanner) {
        (StoreBackend::Spanner, Some(spanner)) => {
            Ok(Arc::new(SpannerStore::from_config(spanner).await?))
        }
        (StoreBackend::Spanner, None) => {
            anyhow::bail!("Spanner backend selected without Spanner settings")
        }
        (StoreBackend::Memory, _) => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
