use super::TagWithCount;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub text: String,
    pub published_at: String,
    pub image: Option<String>,
    pub author_id: i64,
}

/// A post as it appears in listings: joined author, prefetched tags and the
/// comment count computed alongside the row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostListing {
    #[serde(flatten)]
    pub post: Post,
    pub author: String,
    pub comments_count: i64,
    pub tags: Vec<TagWithCount>,
}

impl PostListing {
    pub fn first_tag(&self) -> Option<&TagWithCount> {
        self.tags.first()
    }
}

/// A post fetched by slug, with its author's display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostWithAuthor {
    #[serde(flatten)]
    pub post: Post,
    pub author: String,
}
