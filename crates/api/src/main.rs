use anyhow::{Context, Result};
use partyhub_api::{
    app::{create_app, AppState},
    config::Config,
    jobs::{JobScheduler, PoolMetricsJob, RetirementSweepJob},
    middleware::{init_metrics, logging::init_logging},
};
use persistence::repositories::{ChannelRepository, MemberRepository};
use persistence::PgPartyStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const JOB_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load().context("Failed to load configuration")?;

    init_logging(&config.logging).context("Failed to initialize logging")?;
    init_metrics().context("Failed to install metrics recorder")?;

    info!("Starting Partyhub API v{}", env!("CARGO_PKG_VERSION"));

    let pool = persistence::db::create_pool(&config.database.pool_config()).await?;
    persistence::db::run_migrations(&pool).await?;
    info!("Migrations completed");

    let store = Arc::new(PgPartyStore::new(
        pool.clone(),
        config.database.statement_timeout_ms,
    ));
    let members = Arc::new(MemberRepository::new(pool.clone()));
    let channels = Arc::new(ChannelRepository::new(pool.clone()));

    let addr = config.socket_addr()?;
    let retirement = config.retirement.clone();
    let state = AppState::new(config, store, members, channels)
        .context("Failed to initialize access token verification")?;

    let mut scheduler = JobScheduler::new();
    scheduler.register(PoolMetricsJob::new(pool));
    if retirement.enabled {
        scheduler.register(RetirementSweepJob::new(
            state.lifecycle.clone(),
            retirement.interval_minutes,
        ));
    } else {
        info!("Retirement sweep disabled");
    }
    scheduler.start();

    let app = create_app(state);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown();
    scheduler.wait_for_shutdown(JOB_SHUTDOWN_TIMEOUT).await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
