//! PadelTower
//!
//! Main application entry point

use std::sync::Arc;
use anyhow::Context;
use tracing::{info, warn};

use PadelTower::{
    config::Settings,
    database::{create_pool, run_migrations, DatabaseService},
    lifecycle::LifecycleScheduler,
    services::ServiceFactory,
    utils::{clock::SystemClock, logging},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new().context("loading configuration")?;
    settings.validate().context("validating configuration")?;

    // Initialize logging; the guard flushes the file appender on exit
    let _log_guard = logging::init_logging(&settings.logging)?;

    info!("Starting {}...", PadelTower::info());

    // Initialize database connection
    info!("Connecting to database...");
    let pool = create_pool(&settings.database)
        .await
        .context("connecting to database")?;

    // Run database migrations
    info!("Running database migrations...");
    run_migrations(&pool).await?;

    let database_service = DatabaseService::new(pool);

    // Initialize services
    info!("Initializing services...");
    let services = ServiceFactory::new(settings.clone(), database_service).await?;

    let health = services.health_check().await;
    for issue in health.get_issues() {
        warn!("Service issue: {}", issue);
    }

    let coordinator = Arc::new(services.coordinator(Arc::new(SystemClock))?);
    let scheduler = LifecycleScheduler::spawn(coordinator, settings.lifecycle.poll_interval());

    info!("PadelTower is running");

    tokio::signal::ctrl_c().await.context("waiting for shutdown signal")?;
    info!("Shutdown signal received");

    scheduler.shutdown().await;

    info!("PadelTower has been shut down.");

    Ok(())
}
