use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hotel_booking::cache::{start_cache_warmer, AppCache};
use hotel_booking::config::Config;
use hotel_booking::db::{HotelRepository, PgRepository};
use hotel_booking::{routes, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("hotel_booking=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let repo = PgRepository::connect(&config.database_url, config.database_max_connections)
        .await
        .context("failed to connect to the database")?;
    let repo: Arc<dyn HotelRepository> = Arc::new(repo);

    let cache = AppCache::new();
    tokio::spawn(start_cache_warmer(cache.clone(), repo.clone()));

    let bind_addr = config.bind_addr;
    let state = AppState {
        repo,
        cache,
        config: Arc::new(config),
    };

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Listening on {}", bind_addr);

    axum::serve(listener, routes::router(state)).await?;
    Ok(())
}
