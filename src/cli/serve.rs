use crate::services::ranking::PostRanking;
use crate::{web, Config, Database};
use anyhow::Result;
use std::path::Path;

pub async fn run(
    config_path: &Path,
    host: Option<String>,
    port: Option<u16>,
    ranking: Option<PostRanking>,
) -> Result<()> {
    let mut config = Config::load(config_path)?;
    if let Some(ranking) = ranking {
        config.ranking.posts = ranking;
    }
    let db = Database::open_with_pool_size(&config.database.path, config.database.pool_size)?;

    db.migrate()?;

    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let addr = format!("{}:{}", host, port);
    tracing::info!(
        "Starting server at http://{} (posts ranked by {})",
        addr,
        config.ranking.posts
    );

    web::serve(config, db, &addr).await?;

    Ok(())
}
