mod error;
mod handlers;
mod routes;
mod state;

pub use error::{AppError, AppResult};
pub use state::AppState;

use crate::{Config, Database};
use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

/// Builds the site router over an already migrated database.
pub fn app(config: Config, db: Database) -> Result<Router> {
    let state = Arc::new(AppState::new(config, db)?);

    let app = Router::new()
        .merge(routes::public_routes())
        .fallback(handlers::public::not_found)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

pub async fn serve(config: Config, db: Database, addr: &str) -> Result<()> {
    tracing::info!(
        "Ranking posts by {}, tags by {}",
        config.ranking.posts,
        config.ranking.tags
    );
    let app = app(config, db)?;

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
