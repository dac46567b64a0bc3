//! Page contexts: ranked and annotated entities shaped into flat records
//! ready for the template renderer.

use crate::config::{MediaConfig, PagesConfig};
use crate::models::{CommentWithAuthor, PostListing, TagWithCount};
use crate::services::repository::BlogRepository;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("{kind} '{key}' not found")]
    NotFound { kind: &'static str, key: String },
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl ViewError {
    fn not_found(kind: &'static str, key: &str) -> Self {
        Self::NotFound {
            kind,
            key: key.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type ViewResult<T> = Result<T, ViewError>;

/// A page context together with the template that renders it.
pub trait Page: Serialize {
    const TEMPLATE: &'static str;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagRecord {
    pub title: String,
    pub posts_with_tag: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeaserRecord {
    pub title: String,
    pub teaser_text: String,
    pub author: String,
    pub comments_amount: i64,
    pub image_url: Option<String>,
    pub published_at: String,
    pub slug: String,
    pub tags: Vec<TagRecord>,
    pub first_tag_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentRecord {
    pub text: String,
    pub published_at: String,
    pub author: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FullTextRecord {
    pub title: String,
    pub text: String,
    pub author: String,
    pub comments: Vec<CommentRecord>,
    pub likes_amount: i64,
    pub image_url: Option<String>,
    pub published_at: String,
    pub slug: String,
    pub tags: Vec<TagRecord>,
}

#[derive(Debug, Serialize)]
pub struct IndexPage {
    pub most_popular_posts: Vec<TeaserRecord>,
    pub page_posts: Vec<TeaserRecord>,
    pub popular_tags: Vec<TagRecord>,
}

impl Page for IndexPage {
    const TEMPLATE: &'static str = "index.html";
}

#[derive(Debug, Serialize)]
pub struct PostDetailPage {
    pub post: FullTextRecord,
    pub popular_tags: Vec<TagRecord>,
    pub most_popular_posts: Vec<TeaserRecord>,
}

impl Page for PostDetailPage {
    const TEMPLATE: &'static str = "post-details.html";
}

#[derive(Debug, Serialize)]
pub struct TagFilterPage {
    pub tag: String,
    pub popular_tags: Vec<TagRecord>,
    pub posts: Vec<TeaserRecord>,
    pub most_popular_posts: Vec<TeaserRecord>,
}

impl Page for TagFilterPage {
    const TEMPLATE: &'static str = "posts-list.html";
}

#[derive(Debug, Serialize)]
pub struct ContactsPage {}

impl Page for ContactsPage {
    const TEMPLATE: &'static str = "contacts.html";
}

/// First `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

pub struct ViewAssembler<'a> {
    repo: &'a dyn BlogRepository,
    pages: &'a PagesConfig,
    media: &'a MediaConfig,
}

impl<'a> ViewAssembler<'a> {
    pub fn new(
        repo: &'a dyn BlogRepository,
        pages: &'a PagesConfig,
        media: &'a MediaConfig,
    ) -> Self {
        Self { repo, pages, media }
    }

    pub fn index(&self) -> ViewResult<IndexPage> {
        let popular = self.repo.popular_posts(self.pages.popular_posts)?;
        let fresh = self.repo.fresh_posts(self.pages.fresh_posts)?;

        Ok(IndexPage {
            most_popular_posts: self.teasers(&popular),
            page_posts: self.teasers(&fresh),
            popular_tags: self.popular_tags()?,
        })
    }

    pub fn post_detail(&self, slug: &str) -> ViewResult<PostDetailPage> {
        let found = self
            .repo
            .post_by_slug(slug)?
            .ok_or_else(|| ViewError::not_found("post", slug))?;

        let comments = self.repo.post_comments(found.post.id)?;
        let likes = self.repo.post_likes(found.post.id)?;
        let tags = self.repo.post_tags(found.post.id)?;

        let post = FullTextRecord {
            title: found.post.title,
            text: found.post.text,
            author: found.author,
            comments: comments.iter().map(comment_record).collect(),
            likes_amount: likes,
            image_url: found.post.image.as_deref().map(|i| self.media.image_url(i)),
            published_at: found.post.published_at,
            slug: found.post.slug,
            tags: tags.iter().map(tag_record).collect(),
        };

        Ok(PostDetailPage {
            post,
            popular_tags: self.popular_tags()?,
            most_popular_posts: self.popular_teasers()?,
        })
    }

    pub fn tag_filter(&self, title: &str) -> ViewResult<TagFilterPage> {
        let tag = self
            .repo
            .tag_by_title(title)?
            .ok_or_else(|| ViewError::not_found("tag", title))?;

        let related = self.repo.tagged_posts(&tag, self.pages.tagged_posts)?;

        Ok(TagFilterPage {
            tag: tag.title,
            popular_tags: self.popular_tags()?,
            posts: self.teasers(&related),
            most_popular_posts: self.popular_teasers()?,
        })
    }

    pub fn contacts(&self) -> ContactsPage {
        ContactsPage {}
    }

    fn popular_tags(&self) -> ViewResult<Vec<TagRecord>> {
        let tags = self.repo.popular_tags(self.pages.popular_tags)?;
        Ok(tags.iter().map(tag_record).collect())
    }

    fn popular_teasers(&self) -> ViewResult<Vec<TeaserRecord>> {
        let posts = self.repo.popular_posts(self.pages.popular_posts)?;
        Ok(self.teasers(&posts))
    }

    fn teasers(&self, posts: &[PostListing]) -> Vec<TeaserRecord> {
        posts.iter().map(|p| self.teaser(p)).collect()
    }

    pub fn teaser(&self, listing: &PostListing) -> TeaserRecord {
        let post = &listing.post;
        TeaserRecord {
            title: post.title.clone(),
            teaser_text: truncate_chars(&post.text, self.pages.teaser_length),
            author: listing.author.clone(),
            comments_amount: listing.comments_count,
            image_url: post.image.as_deref().map(|i| self.media.image_url(i)),
            published_at: post.published_at.clone(),
            slug: post.slug.clone(),
            tags: listing.tags.iter().map(tag_record).collect(),
            first_tag_title: listing.first_tag().map(|t| t.tag.title.clone()),
        }
    }
}

fn tag_record(tag: &TagWithCount) -> TagRecord {
    TagRecord {
        title: tag.tag.title.clone(),
        posts_with_tag: tag.posts_with_tag,
    }
}

fn comment_record(comment: &CommentWithAuthor) -> CommentRecord {
    CommentRecord {
        text: comment.comment.text.clone(),
        published_at: comment.comment.published_at.clone(),
        author: comment.author.clone(),
    }
}
