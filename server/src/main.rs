//! Civic API server: resolves the resource catalog, connects the pool, mounts common and resource routes.

use civic_api::{app, catalog, init_tracing, load_from_path, resolve, AppState, PaginationSettings, PgStore};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_tracing("civic_api=info,civic_api_server=info,tower_http=info");

    let config = match std::env::var("CONFIG_PATH") {
        Ok(path) => load_from_path(&path).await?,
        Err(_) => catalog::openstates()?,
    };
    let model = resolve(&config)?;
    let settings = PaginationSettings::from_env()?;
    tracing::info!(
        resources = model.resources.len(),
        default_per_page = settings.default_per_page,
        max_per_page = settings.max_per_page,
        "catalog resolved"
    );

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/openstates".into());
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    let state = AppState::new(Arc::new(PgStore::new(pool)), model, settings);
    let app = app(state).layer(TraceLayer::new_for_http());

    let bind = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = TcpListener::bind(&bind).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
