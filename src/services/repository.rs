use crate::config::RankingConfig;
use crate::models::{
    Comment, CommentWithAuthor, Post, PostListing, PostWithAuthor, Tag, TagWithCount,
};
use crate::services::ranking::{PostRanking, TagRanking, FRESH_ORDER, TAG_ORDER};
use crate::Database;
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, ToSql};
use std::collections::HashMap;

/// Read access to posts, tags and their aggregate counts.
///
/// Every listing carries its annotations (comment counts, post counts) and
/// its prefetched relations, so callers never go back to the store per item.
/// A `limit` of zero yields an empty list.
pub trait BlogRepository: Send + Sync {
    fn popular_posts(&self, limit: usize) -> Result<Vec<PostListing>>;

    fn fresh_posts(&self, limit: usize) -> Result<Vec<PostListing>>;

    fn popular_tags(&self, limit: usize) -> Result<Vec<TagWithCount>>;

    /// Annotates the given tags with post counts, returned in tag order.
    /// Unknown ids are skipped.
    fn tags_with_post_counts(&self, tag_ids: &[i64]) -> Result<Vec<TagWithCount>>;

    fn post_by_slug(&self, slug: &str) -> Result<Option<PostWithAuthor>>;

    fn tag_by_title(&self, title: &str) -> Result<Option<Tag>>;

    /// Freshest posts carrying `tag`.
    fn tagged_posts(&self, tag: &Tag, limit: usize) -> Result<Vec<PostListing>>;

    /// The post's comments, oldest first.
    fn post_comments(&self, post_id: i64) -> Result<Vec<CommentWithAuthor>>;

    fn post_likes(&self, post_id: i64) -> Result<i64>;

    /// The post's own tags in tag order, each with its post count.
    fn post_tags(&self, post_id: i64) -> Result<Vec<TagWithCount>>;
}

/// [`BlogRepository`] over the SQLite store.
#[derive(Clone)]
pub struct SqliteRepository {
    db: Database,
    post_ranking: PostRanking,
    tag_ranking: TagRanking,
}

impl SqliteRepository {
    pub fn new(db: Database, ranking: &RankingConfig) -> Self {
        Self {
            db,
            post_ranking: ranking.posts,
            tag_ranking: ranking.tags,
        }
    }

    fn list_posts(
        &self,
        filter: &str,
        order_by: &str,
        params: &[&dyn ToSql],
    ) -> Result<Vec<PostListing>> {
        let conn = self.db.get()?;
        let sql = format!("{} {} ORDER BY {} LIMIT ?", LISTING_SELECT, filter, order_by);
        let mut stmt = conn.prepare(&sql)?;
        let mut posts = stmt
            .query_map(params, row_to_listing)?
            .collect::<Result<Vec<_>, _>>()?;
        attach_tags(&conn, &mut posts)?;
        Ok(posts)
    }
}

const LISTING_SELECT: &str = r#"
    SELECT p.id, p.title, p.slug, p.text, p.published_at, p.image, p.author_id, u.username,
           (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comments_count,
           (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id) AS likes_count
    FROM posts p
    JOIN users u ON u.id = p.author_id
"#;

const TAG_COUNT_SELECT: &str = r#"
    SELECT t.id, t.title, COUNT(pt.post_id) AS posts_with_tag
    FROM tags t
    LEFT JOIN post_tags pt ON pt.tag_id = t.id
"#;

impl BlogRepository for SqliteRepository {
    fn popular_posts(&self, limit: usize) -> Result<Vec<PostListing>> {
        if limit == 0 {
            return Ok(vec![]);
        }
        let limit = limit as i64;
        self.list_posts("", self.post_ranking.order_by(), &[&limit])
    }

    fn fresh_posts(&self, limit: usize) -> Result<Vec<PostListing>> {
        if limit == 0 {
            return Ok(vec![]);
        }
        let limit = limit as i64;
        self.list_posts("", FRESH_ORDER, &[&limit])
    }

    fn popular_tags(&self, limit: usize) -> Result<Vec<TagWithCount>> {
        if limit == 0 {
            return Ok(vec![]);
        }
        let conn = self.db.get()?;
        let sql = format!(
            "{} GROUP BY t.id ORDER BY {} LIMIT ?",
            TAG_COUNT_SELECT,
            self.tag_ranking.order_by()
        );
        let mut stmt = conn.prepare(&sql)?;
        let tags = stmt
            .query_map([limit as i64], row_to_tag_with_count)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tags)
    }

    fn tags_with_post_counts(&self, tag_ids: &[i64]) -> Result<Vec<TagWithCount>> {
        if tag_ids.is_empty() {
            return Ok(vec![]);
        }
        let conn = self.db.get()?;
        let sql = format!(
            "{} WHERE t.id IN ({}) GROUP BY t.id ORDER BY {}",
            TAG_COUNT_SELECT,
            placeholders(tag_ids.len()),
            TAG_ORDER
        );
        let mut stmt = conn.prepare(&sql)?;
        let params: Vec<&dyn ToSql> = tag_ids.iter().map(|id| id as &dyn ToSql).collect();
        let tags = stmt
            .query_map(params.as_slice(), row_to_tag_with_count)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tags)
    }

    fn post_by_slug(&self, slug: &str) -> Result<Option<PostWithAuthor>> {
        let conn = self.db.get()?;
        let post = conn
            .query_row(
                r#"
                SELECT p.id, p.title, p.slug, p.text, p.published_at, p.image, p.author_id, u.username
                FROM posts p
                JOIN users u ON u.id = p.author_id
                WHERE p.slug = ?
                "#,
                [slug],
                |row| {
                    Ok(PostWithAuthor {
                        post: row_to_post(row)?,
                        author: row.get(7)?,
                    })
                },
            )
            .optional()?;
        Ok(post)
    }

    fn tag_by_title(&self, title: &str) -> Result<Option<Tag>> {
        let conn = self.db.get()?;
        let tag = conn
            .query_row(
                "SELECT id, title FROM tags WHERE title = ?",
                [title],
                |row| {
                    Ok(Tag {
                        id: row.get(0)?,
                        title: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(tag)
    }

    fn tagged_posts(&self, tag: &Tag, limit: usize) -> Result<Vec<PostListing>> {
        if limit == 0 {
            return Ok(vec![]);
        }
        let limit = limit as i64;
        self.list_posts(
            "JOIN post_tags pt ON pt.post_id = p.id WHERE pt.tag_id = ?",
            FRESH_ORDER,
            &[&tag.id, &limit],
        )
    }

    fn post_comments(&self, post_id: i64) -> Result<Vec<CommentWithAuthor>> {
        let conn = self.db.get()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT c.id, c.post_id, c.author_id, c.text, c.published_at, u.username
            FROM comments c
            JOIN users u ON u.id = c.author_id
            WHERE c.post_id = ?
            ORDER BY c.published_at ASC, c.id ASC
            "#,
        )?;
        let comments = stmt
            .query_map([post_id], |row| {
                Ok(CommentWithAuthor {
                    comment: Comment {
                        id: row.get(0)?,
                        post_id: row.get(1)?,
                        author_id: row.get(2)?,
                        text: row.get(3)?,
                        published_at: row.get(4)?,
                    },
                    author: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(comments)
    }

    fn post_likes(&self, post_id: i64) -> Result<i64> {
        let conn = self.db.get()?;
        let likes = conn.query_row(
            "SELECT COUNT(*) FROM post_likes WHERE post_id = ?",
            [post_id],
            |row| row.get(0),
        )?;
        Ok(likes)
    }

    fn post_tags(&self, post_id: i64) -> Result<Vec<TagWithCount>> {
        let conn = self.db.get()?;
        let sql = format!(
            r#"
            SELECT t.id, t.title,
                   (SELECT COUNT(*) FROM post_tags x WHERE x.tag_id = t.id) AS posts_with_tag
            FROM post_tags pt
            JOIN tags t ON t.id = pt.tag_id
            WHERE pt.post_id = ?
            ORDER BY {}
            "#,
            TAG_ORDER
        );
        let mut stmt = conn.prepare(&sql)?;
        let tags = stmt
            .query_map([post_id], row_to_tag_with_count)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tags)
    }
}

/// Loads the tags of every listed post in one statement, each tag annotated
/// with its post count, and distributes them in tag order.
fn attach_tags(conn: &Connection, posts: &mut [PostListing]) -> Result<()> {
    if posts.is_empty() {
        return Ok(());
    }

    let post_ids: Vec<i64> = posts.iter().map(|p| p.post.id).collect();
    let sql = format!(
        r#"
        SELECT pt.post_id, t.id, t.title,
               (SELECT COUNT(*) FROM post_tags x WHERE x.tag_id = t.id) AS posts_with_tag
        FROM post_tags pt
        JOIN tags t ON t.id = pt.tag_id
        WHERE pt.post_id IN ({})
        ORDER BY {}
        "#,
        placeholders(post_ids.len()),
        TAG_ORDER
    );

    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn ToSql> = post_ids.iter().map(|id| id as &dyn ToSql).collect();
    let rows = stmt.query_map(params.as_slice(), |row| {
        Ok((
            row.get::<_, i64>(0)?,
            TagWithCount {
                tag: Tag {
                    id: row.get(1)?,
                    title: row.get(2)?,
                },
                posts_with_tag: row.get(3)?,
            },
        ))
    })?;

    let mut tags_by_post: HashMap<i64, Vec<TagWithCount>> = HashMap::new();
    for row in rows {
        let (post_id, tag) = row?;
        tags_by_post.entry(post_id).or_default().push(tag);
    }

    for post in posts.iter_mut() {
        post.tags = tags_by_post.remove(&post.post.id).unwrap_or_default();
    }

    tracing::debug!("Prefetched tags for {} post(s)", post_ids.len());
    Ok(())
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(",")
}

fn row_to_post(row: &Row) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        text: row.get(3)?,
        published_at: row.get(4)?,
        image: row.get(5)?,
        author_id: row.get(6)?,
    })
}

fn row_to_listing(row: &Row) -> rusqlite::Result<PostListing> {
    Ok(PostListing {
        post: row_to_post(row)?,
        author: row.get(7)?,
        comments_count: row.get(8)?,
        tags: vec![],
    })
}

fn row_to_tag_with_count(row: &Row) -> rusqlite::Result<TagWithCount> {
    Ok(TagWithCount {
        tag: Tag {
            id: row.get(0)?,
            title: row.get(1)?,
        },
        posts_with_tag: row.get(2)?,
    })
}
