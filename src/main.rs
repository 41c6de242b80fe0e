use anyhow::{Context, Result};
use racesync::config::Config;
use racesync::db::{self, Queries, RaceRepository};
use racesync::handlers::{self, AppState};
use racesync::remote::RaceApiClient;
use racesync::sync;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "racesync=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenv::dotenv().ok();
    let config = Config::from_env()?;

    // Set up database
    tracing::info!("Connecting to database");
    let db_pool = db::create_pool(config.database.clone())
        .await
        .context("Failed to connect to DB")?;

    tracing::info!("Running database migrations");
    db::run_migrations(&db_pool)
        .await
        .context("Failed to init DB")?;

    let queries = match &config.query_dir {
        Some(dir) => Queries::load(dir)
            .await
            .with_context(|| format!("Failed to load queries from {}", dir.display()))?,
        None => Queries::embedded(),
    };
    let repository = RaceRepository::new(db_pool, Arc::new(queries));
    let source = RaceApiClient::new(config.data_url.clone());

    // Populate from the race source before serving, or keep doing it on a timer
    match config.sync_interval {
        Some(period) => {
            tracing::info!("Syncing from {} every {:?}", source.endpoint(), period);
            sync::spawn_periodic_sync(Arc::new(repository.clone()), Arc::new(source), period);
        }
        None => {
            tracing::info!("Syncing once from {}", source.endpoint());
            sync::run_sync_cycle(&repository, &source).await;
        }
    }

    let app = handlers::router(AppState::new(repository));

    // Start server
    let addr = config.bind_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
