use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use filedrop::config::Config;
use filedrop::db::Database;
use filedrop::repo::FileRepository;
use filedrop::services::FileLifecycle;
use filedrop::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "filedrop=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting filedrop...");

    // Load configuration
    let config = Config::load()?;
    let config = Arc::new(config);
    tracing::info!("Configuration loaded");

    // Initialize database
    let db = Database::new(&config.database.path).await?;
    db.run_migrations().await?;
    tracing::info!("Database initialized");

    // Remote collaborators are constructed once here and injected; they live
    // for the whole process
    let store = filedrop::storage::from_config(&config)?;
    tracing::info!("Blob store backend: {}", store.store_type());

    let mailer = filedrop::mail::from_config(&config);

    let lifecycle = Arc::new(FileLifecycle::new(
        FileRepository::new(db.clone()),
        store,
        mailer.clone(),
        config.server.public_url.clone(),
    ));

    // Create app state
    let state = AppState {
        db,
        config: config.clone(),
        lifecycle,
        mailer,
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
