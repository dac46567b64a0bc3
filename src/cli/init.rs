use anyhow::Result;
use std::path::{Path, PathBuf};

pub async fn run(path: PathBuf, name: Option<String>) -> Result<()> {
    let site_name = name.unwrap_or_else(|| "My Blog".to_string());
    write_site(&path, &site_name)?;

    tracing::info!("Created new blog at {:?}", path);
    tracing::info!("Run 'blog load <fixture.json>' to add posts");
    tracing::info!("Run 'blog serve' to start the server");

    Ok(())
}

fn write_site(path: &Path, site_name: &str) -> Result<()> {
    let config_path = path.join("blog.toml");
    if config_path.exists() {
        anyhow::bail!("{} already exists", config_path.display());
    }

    std::fs::create_dir_all(path.join("data/media"))?;

    let config = format!(
        r#"[site]
title = "{}"
description = "A small blog"
url = "http://localhost:3000"
language = "en"

[server]
host = "127.0.0.1"
port = 3000

[database]
path = "./data/blog.db"

[media]
upload_dir = "./data/media"
url_prefix = "/media/"

[ranking]
# likes | comments
posts = "likes"
tags = "posts"

[pages]
popular_posts = 5
fresh_posts = 5
popular_tags = 5
tagged_posts = 20
teaser_length = 200
"#,
        site_name.replace('"', "\\\"")
    );

    std::fs::write(config_path, config)?;
    Ok(())
}
