use crate::services::seed::{self, Fixture};
use crate::{Config, Database};
use anyhow::{Context, Result};
use std::path::Path;

pub async fn run(config_path: &Path, fixture_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;
    let db = Database::open_with_pool_size(&config.database.path, config.database.pool_size)?;
    db.migrate()?;

    let raw = std::fs::read_to_string(fixture_path)
        .with_context(|| format!("Could not read fixture '{}'", fixture_path.display()))?;
    let fixture: Fixture = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid fixture '{}'", fixture_path.display()))?;

    let summary = seed::load_fixture(&db, &fixture)?;

    tracing::info!(
        "Load complete: {} post(s) loaded, {} skipped, {} comment(s), {} like(s)",
        summary.posts,
        summary.skipped,
        summary.comments,
        summary.likes
    );
    Ok(())
}
