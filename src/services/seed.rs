//! Writes used to populate the store: fixture loading and test setup. The
//! page views themselves never write.

use crate::Database;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use slug::slugify;

pub fn generate_slug(title: &str) -> String {
    slugify(title)
}

pub fn validate_slug(slug: &str) -> bool {
    if slug.is_empty() || slug.len() > 200 {
        return false;
    }
    slug.chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub text: String,
    pub published_at: Option<String>,
    pub image: Option<String>,
    #[serde(skip)]
    pub author_id: i64,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: i64,
    pub author_id: i64,
    pub text: String,
    pub published_at: Option<String>,
}

/// Stores timestamps as UTC RFC 3339 with second precision, so that text
/// ordering in SQL matches chronological ordering.
fn normalize_timestamp(value: Option<&str>) -> Result<String> {
    let utc = match value {
        Some(raw) => chrono::DateTime::parse_from_rfc3339(raw)
            .with_context(|| format!("Invalid timestamp '{}'", raw))?
            .with_timezone(&chrono::Utc),
        None => chrono::Utc::now(),
    };
    Ok(utc.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
}

pub fn create_user(db: &Database, username: &str) -> Result<i64> {
    let conn = db.get()?;
    conn.execute("INSERT INTO users (username) VALUES (?)", [username])?;
    Ok(conn.last_insert_rowid())
}

/// Returns the id of the user, creating it when missing.
pub fn ensure_user(db: &Database, username: &str) -> Result<i64> {
    let conn = db.get()?;
    conn.execute(
        "INSERT OR IGNORE INTO users (username) VALUES (?)",
        [username],
    )?;
    let id = conn.query_row(
        "SELECT id FROM users WHERE username = ?",
        [username],
        |row| row.get(0),
    )?;
    Ok(id)
}

pub fn create_tag(db: &Database, title: &str) -> Result<i64> {
    let conn = db.get()?;
    conn.execute("INSERT OR IGNORE INTO tags (title) VALUES (?)", [title])?;
    let id = conn.query_row("SELECT id FROM tags WHERE title = ?", [title], |row| {
        row.get(0)
    })?;
    Ok(id)
}

pub fn create_post(db: &Database, input: &NewPost) -> Result<i64> {
    let slug = input
        .slug
        .clone()
        .unwrap_or_else(|| generate_slug(&input.title));

    if !validate_slug(&slug) {
        bail!(
            "Invalid slug '{}': must be 1-200 characters, lowercase letters, numbers, and hyphens only",
            slug
        );
    }

    let published_at = normalize_timestamp(input.published_at.as_deref())
        .with_context(|| format!("Invalid published_at for post '{}'", slug))?;

    let mut conn = db.get()?;
    let tx = conn.transaction()?;
    tx.execute(
        r#"
        INSERT INTO posts (title, slug, text, published_at, image, author_id)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
        (
            &input.title,
            &slug,
            &input.text,
            &published_at,
            &input.image,
            input.author_id,
        ),
    )?;
    let post_id = tx.last_insert_rowid();

    for title in &input.tags {
        tx.execute("INSERT OR IGNORE INTO tags (title) VALUES (?)", [title])?;
        tx.execute(
            "INSERT OR IGNORE INTO post_tags (post_id, tag_id) SELECT ?, id FROM tags WHERE title = ?",
            (post_id, title),
        )?;
    }
    tx.commit()?;

    Ok(post_id)
}

pub fn create_comment(db: &Database, input: &NewComment) -> Result<i64> {
    let published_at = normalize_timestamp(input.published_at.as_deref())?;
    let conn = db.get()?;
    conn.execute(
        "INSERT INTO comments (post_id, author_id, text, published_at) VALUES (?, ?, ?, ?)",
        (input.post_id, input.author_id, &input.text, &published_at),
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn like_post(db: &Database, post_id: i64, user_id: i64) -> Result<()> {
    let conn = db.get()?;
    conn.execute(
        "INSERT OR IGNORE INTO post_likes (post_id, user_id) VALUES (?, ?)",
        (post_id, user_id),
    )?;
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub users: Vec<FixtureUser>,
    #[serde(default)]
    pub tags: Vec<FixtureTag>,
    #[serde(default)]
    pub posts: Vec<FixturePost>,
    #[serde(default)]
    pub comments: Vec<FixtureComment>,
}

#[derive(Debug, Deserialize)]
pub struct FixtureUser {
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct FixtureTag {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct FixturePost {
    #[serde(flatten)]
    pub post: NewPost,
    pub author: String,
    #[serde(default)]
    pub likes: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct FixtureComment {
    /// Slug of the commented post.
    pub post: String,
    pub author: String,
    pub text: String,
    pub published_at: Option<String>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub posts: usize,
    pub skipped: usize,
    pub comments: usize,
    pub likes: usize,
}

/// Loads a fixture. Posts whose slug already exists are skipped along with
/// their likes; comments referencing an unknown slug are an error.
pub fn load_fixture(db: &Database, fixture: &Fixture) -> Result<LoadSummary> {
    let mut summary = LoadSummary::default();

    for user in &fixture.users {
        ensure_user(db, &user.username)?;
    }
    for tag in &fixture.tags {
        create_tag(db, &tag.title)?;
    }

    for entry in &fixture.posts {
        let mut post = entry.post.clone();
        let slug = post
            .slug
            .clone()
            .unwrap_or_else(|| generate_slug(&post.title));
        if post_id_by_slug(db, &slug)?.is_some() {
            tracing::warn!("Post '{}' already exists, skipping", slug);
            summary.skipped += 1;
            continue;
        }

        post.slug = Some(slug);
        post.author_id = ensure_user(db, &entry.author)?;
        let post_id = create_post(db, &post)?;
        summary.posts += 1;

        for username in &entry.likes {
            let user_id = ensure_user(db, username)?;
            like_post(db, post_id, user_id)?;
            summary.likes += 1;
        }
    }

    for entry in &fixture.comments {
        let post_id = post_id_by_slug(db, &entry.post)?
            .with_context(|| format!("Comment references unknown post '{}'", entry.post))?;
        let author_id = ensure_user(db, &entry.author)?;
        create_comment(
            db,
            &NewComment {
                post_id,
                author_id,
                text: entry.text.clone(),
                published_at: entry.published_at.clone(),
            },
        )?;
        summary.comments += 1;
    }

    Ok(summary)
}

fn post_id_by_slug(db: &Database, slug: &str) -> Result<Option<i64>> {
    use rusqlite::OptionalExtension;

    let conn = db.get()?;
    let id = conn
        .query_row("SELECT id FROM posts WHERE slug = ?", [slug], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(id)
}
