use crate::services::ranking::{PostRanking, TagRanking};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub media: MediaConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub pages: PagesConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteConfig {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub url: String,
    #[serde(default = "default_language")]
    pub language: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub path: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MediaConfig {
    pub upload_dir: String,
    /// Prefix joined with a post's image name to build its public URL.
    #[serde(default = "default_media_url_prefix")]
    pub url_prefix: String,
}

impl MediaConfig {
    pub fn image_url(&self, image: &str) -> String {
        format!(
            "{}/{}",
            self.url_prefix.trim_end_matches('/'),
            image.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RankingConfig {
    #[serde(default)]
    pub posts: PostRanking,
    #[serde(default)]
    pub tags: TagRanking,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PagesConfig {
    #[serde(default = "default_sidebar_limit")]
    pub popular_posts: usize,
    #[serde(default = "default_sidebar_limit")]
    pub fresh_posts: usize,
    #[serde(default = "default_sidebar_limit")]
    pub popular_tags: usize,
    #[serde(default = "default_tagged_posts")]
    pub tagged_posts: usize,
    #[serde(default = "default_teaser_length")]
    pub teaser_length: usize,
}

impl Default for PagesConfig {
    fn default() -> Self {
        Self {
            popular_posts: default_sidebar_limit(),
            fresh_posts: default_sidebar_limit(),
            popular_tags: default_sidebar_limit(),
            tagged_posts: default_tagged_posts(),
            teaser_length: default_teaser_length(),
        }
    }
}

impl PagesConfig {
    const MAX_LIMIT: usize = 100;
    const MAX_TEASER_LENGTH: usize = 10000;

    pub fn validate(&self) -> Result<()> {
        let limits = [
            ("pages.popular_posts", self.popular_posts),
            ("pages.fresh_posts", self.fresh_posts),
            ("pages.popular_tags", self.popular_tags),
            ("pages.tagged_posts", self.tagged_posts),
        ];
        for (name, value) in limits {
            if value == 0 {
                anyhow::bail!("{} must be greater than 0", name);
            }
            if value > Self::MAX_LIMIT {
                anyhow::bail!("{} must be {} or less", name, Self::MAX_LIMIT);
            }
        }
        if self.teaser_length == 0 {
            anyhow::bail!("pages.teaser_length must be greater than 0");
        }
        if self.teaser_length > Self::MAX_TEASER_LENGTH {
            anyhow::bail!(
                "pages.teaser_length must be {} or less",
                Self::MAX_TEASER_LENGTH
            );
        }
        Ok(())
    }
}

fn default_language() -> String {
    "en".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_pool_size() -> u32 {
    10
}

fn default_media_url_prefix() -> String {
    "/media/".to_string()
}

fn default_sidebar_limit() -> usize {
    5
}

fn default_tagged_posts() -> usize {
    20
}

fn default_teaser_length() -> usize {
    200
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!(
                "Could not read config file '{}': {}. Did you run 'blog init'?",
                path.display(),
                e
            )
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.pool_size == 0 {
            anyhow::bail!("database.pool_size must be greater than 0");
        }
        self.pages.validate()?;
        Ok(())
    }
}
