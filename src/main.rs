use std::sync::Arc;

use talent_pipeline::{
    config::Config,
    database::pool::{create_pool, run_migrations},
    routes,
    services::{record_store::RecordStore, simulator::SimulatedGateway},
    AppState,
};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    let gateway = SimulatedGateway::new(RecordStore::new(pool), config.simulation);
    let app_state = AppState::new(Arc::new(gateway), config.default_page_size);

    if let Err(e) = app_state.jobs.load().await {
        warn!(error = ?e, "Initial job load failed, board starts empty");
    }
    if let Err(e) = app_state.pipeline.load().await {
        warn!(error = ?e, "Initial candidate load failed, pipeline starts empty");
    }

    let app = routes::router(app_state);

    let listener = TcpListener::bind(&config.server_address).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
