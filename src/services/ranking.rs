//! Named popularity metrics used to order posts and tags.
//!
//! A metric maps to an `ORDER BY` clause over the aggregate columns that the
//! listing statements compute next to each row (`likes_count`,
//! `comments_count` for posts, `posts_with_tag` for tags). Every clause ends
//! with a unique key so repeated queries return rows in the same order.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PostRanking {
    /// Most liked first.
    #[default]
    Likes,
    /// Most commented first.
    Comments,
}

impl PostRanking {
    pub fn order_by(self) -> &'static str {
        match self {
            Self::Likes => "likes_count DESC, p.published_at DESC, p.id DESC",
            Self::Comments => "comments_count DESC, p.published_at DESC, p.id DESC",
        }
    }
}

impl FromStr for PostRanking {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "likes" => Ok(Self::Likes),
            "comments" => Ok(Self::Comments),
            _ => Err(format!(
                "unknown post ranking '{}', expected 'likes' or 'comments'",
                s
            )),
        }
    }
}

impl std::fmt::Display for PostRanking {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Likes => write!(f, "likes"),
            Self::Comments => write!(f, "comments"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TagRanking {
    /// Most posts tagged first.
    #[default]
    Posts,
}

impl TagRanking {
    pub fn order_by(self) -> &'static str {
        match self {
            Self::Posts => "posts_with_tag DESC, t.title ASC, t.id ASC",
        }
    }
}

impl std::fmt::Display for TagRanking {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Posts => write!(f, "posts"),
        }
    }
}

/// Ordering applied to freshly published listings.
pub const FRESH_ORDER: &str = "p.published_at DESC, p.id DESC";

/// Ordering of a post's own tags; the first tag in this order is the post's
/// "first tag".
pub const TAG_ORDER: &str = "t.title ASC, t.id ASC";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_ranking_round_trips_through_str() {
        for ranking in [PostRanking::Likes, PostRanking::Comments] {
            assert_eq!(ranking.to_string().parse::<PostRanking>(), Ok(ranking));
        }
        assert_eq!("LIKES".parse::<PostRanking>(), Ok(PostRanking::Likes));
        assert!("views".parse::<PostRanking>().is_err());
    }

    #[test]
    fn test_order_clauses_end_with_unique_key() {
        assert!(PostRanking::Likes.order_by().ends_with("p.id DESC"));
        assert!(PostRanking::Comments.order_by().ends_with("p.id DESC"));
        assert!(TagRanking::Posts.order_by().ends_with("t.id ASC"));
        assert!(FRESH_ORDER.ends_with("p.id DESC"));
    }
}
