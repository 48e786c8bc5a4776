//! Example server: reads settings from the environment, bootstraps the database,
//! mounts the operational routes and the site front controller.

use andromeda_mvc::{
    app, default_registry, ensure_database_exists, ensure_schema, AppState, PgExecutor, Settings,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("andromeda_mvc=info".parse()?))
        .init();

    let settings = Settings::from_env()?;
    ensure_database_exists(&settings.database_url).await?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(&settings.database_url)
        .await?;
    ensure_schema(&pool).await?;
    tokio::fs::create_dir_all(&settings.upload_dir).await?;

    let bind_addr = settings.bind_addr.clone();
    let state = AppState::new(Arc::new(PgExecutor::new(pool)), default_registry(), settings)?;

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
