use crate::services::repository::SqliteRepository;
use crate::services::views::ViewAssembler;
use crate::{Config, Database};
use anyhow::Result;
use std::collections::HashMap;
use std::path::PathBuf;
use tera::{Tera, Value};

pub struct AppState {
    pub config: Config,
    pub repo: SqliteRepository,
    pub templates: Tera,
    pub media_dir: PathBuf,
}

impl AppState {
    pub fn new(config: Config, db: Database) -> Result<Self> {
        let mut templates = Tera::default();

        templates.register_filter("format_date", format_date_filter);
        templates.add_raw_templates(vec![
            ("base.html", include_str!("../../templates/base.html")),
            ("macros.html", include_str!("../../templates/macros.html")),
            ("index.html", include_str!("../../templates/index.html")),
            ("post-details.html", include_str!("../../templates/post-details.html")),
            ("posts-list.html", include_str!("../../templates/posts-list.html")),
            ("contacts.html", include_str!("../../templates/contacts.html")),
            ("404.html", include_str!("../../templates/404.html")),
        ])?;

        let media_dir = PathBuf::from(&config.media.upload_dir);
        let repo = SqliteRepository::new(db, &config.ranking);

        Ok(Self {
            config,
            repo,
            templates,
            media_dir,
        })
    }

    pub fn views(&self) -> ViewAssembler<'_> {
        ViewAssembler::new(&self.repo, &self.config.pages, &self.config.media)
    }
}

fn format_date_filter(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let date_str = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("format_date requires a string"))?;

    let format = args
        .get("format")
        .and_then(|v| v.as_str())
        .unwrap_or("%d %B %Y, %H:%M");

    match chrono::DateTime::parse_from_rfc3339(date_str) {
        Ok(dt) => Ok(Value::String(dt.format(format).to_string())),
        Err(_) => Ok(Value::String(date_str.to_string())),
    }
}
