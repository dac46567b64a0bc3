use axum::body::Body;
use axum::http::{Request, StatusCode};
use blog_views::config::RankingConfig;
use blog_views::services::repository::{BlogRepository, SqliteRepository};
use blog_views::services::seed::{self, NewComment, NewPost};
use blog_views::services::views::ViewAssembler;
use blog_views::{web, Config, Database};
use tower::ServiceExt;

fn create_test_db() -> Database {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let id: u32 = rng.gen();
    let name = format!("test_db_{}", id);

    let db = Database::open_memory(&name).expect("Failed to create test database");
    db.migrate().expect("Failed to run migrations");
    db
}

fn test_config(media_dir: &str) -> Config {
    Config::from_toml(&format!(
        r#"
[site]
title = "Test Blog"
url = "http://localhost:3000"

[database]
path = ":memory:"

[media]
upload_dir = "{}"
"#,
        media_dir
    ))
    .expect("Failed to parse test config")
}

fn add_post(db: &Database, author: i64, title: &str, day: u32, tags: &[&str]) -> i64 {
    seed::create_post(
        db,
        &NewPost {
            title: title.to_string(),
            slug: None,
            text: format!("{} {}", title, "lorem ipsum ".repeat(30)),
            published_at: Some(format!("2024-05-{:02}T08:30:00+00:00", day)),
            image: None,
            author_id: author,
            tags: tags.iter().map(|t| t.to_string()).collect(),
        },
    )
    .expect("Failed to create post")
}

fn add_comment(db: &Database, post_id: i64, author_id: i64, text: &str) {
    seed::create_comment(
        db,
        &NewComment {
            post_id,
            author_id,
            text: text.to_string(),
            published_at: None,
        },
    )
    .expect("Failed to create comment");
}

/// Eight posts by two authors; "python" is on six of them.
fn populated_db() -> Database {
    let db = create_test_db();
    let ann = seed::create_user(&db, "ann").unwrap();
    let bob = seed::create_user(&db, "bob").unwrap();

    let mine = seed::create_post(
        &db,
        &NewPost {
            title: "My Post".to_string(),
            slug: Some("my-post".to_string()),
            text: "Short body".to_string(),
            published_at: Some("2024-05-20T12:00:00+00:00".to_string()),
            image: Some("cover.png".to_string()),
            author_id: ann,
            tags: vec!["python".to_string(), "django".to_string()],
        },
    )
    .unwrap();
    add_comment(&db, mine, bob, "First!");
    add_comment(&db, mine, ann, "Thanks");
    seed::like_post(&db, mine, ann).unwrap();
    seed::like_post(&db, mine, bob).unwrap();

    for day in 1..=5 {
        let id = add_post(&db, bob, &format!("Python {}", day), day, &["python"]);
        if day % 2 == 0 {
            add_comment(&db, id, ann, "Nice");
        }
    }
    add_post(&db, ann, "Rust", 10, &["rust"]);
    add_post(&db, ann, "Untagged", 11, &[]);

    db
}

mod ranking_integration_tests {
    use super::*;

    fn repo(db: &Database) -> SqliteRepository {
        SqliteRepository::new(db.clone(), &RankingConfig::default())
    }

    #[test]
    fn test_listings_are_bounded_and_annotated() {
        let db = populated_db();
        let repo = repo(&db);
        let conn = db.get().unwrap();

        let popular = repo.popular_posts(5).unwrap();
        let fresh = repo.fresh_posts(5).unwrap();
        assert_eq!(popular.len(), 5);
        assert_eq!(fresh.len(), 5);

        for listing in popular.iter().chain(fresh.iter()) {
            let comments: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM comments WHERE post_id = ?",
                    [listing.post.id],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(listing.comments_count, comments);
        }

        assert_eq!(popular[0].post.slug, "my-post");
        assert_eq!(fresh[0].post.slug, "my-post");
        assert_eq!(fresh[1].post.slug, "untagged");
    }

    #[test]
    fn test_tag_counts_match_post_tags() {
        let db = populated_db();
        let repo = repo(&db);
        let conn = db.get().unwrap();

        for tag in repo.popular_tags(100).unwrap() {
            let tagged: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM post_tags WHERE tag_id = ?",
                    [tag.tag.id],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(tag.posts_with_tag, tagged);
        }

        let top = repo.popular_tags(1).unwrap();
        assert_eq!(top[0].tag.title, "python");
        assert_eq!(top[0].posts_with_tag, 6);
    }

    #[test]
    fn test_post_tags_round_trip_through_counts() {
        let db = populated_db();
        let repo = repo(&db);
        let post = repo.post_by_slug("my-post").unwrap().unwrap();
        let own = repo.post_tags(post.post.id).unwrap();

        let pairs: Vec<(&str, i64)> = own
            .iter()
            .map(|t| (t.tag.title.as_str(), t.posts_with_tag))
            .collect();
        assert_eq!(pairs, vec![("django", 1), ("python", 6)]);

        let ids: Vec<i64> = own.iter().rev().map(|t| t.tag.id).collect();
        assert_eq!(repo.tags_with_post_counts(&ids).unwrap(), own);
    }

    #[test]
    fn test_comment_ranking_changes_order() {
        let db = populated_db();
        let by_comments = SqliteRepository::new(
            db.clone(),
            &RankingConfig {
                posts: "comments".parse().unwrap(),
                tags: Default::default(),
            },
        );
        let posts = by_comments.popular_posts(3).unwrap();
        let counts: Vec<i64> = posts.iter().map(|p| p.comments_count).collect();
        assert_eq!(counts, vec![2, 1, 1]);
    }
}

mod view_integration_tests {
    use super::*;

    #[test]
    fn test_post_detail_page() {
        let db = populated_db();
        let config = test_config("./data/media");
        let repo = SqliteRepository::new(db, &config.ranking);
        let views = ViewAssembler::new(&repo, &config.pages, &config.media);

        let page = views.post_detail("my-post").unwrap();
        assert_eq!(page.post.slug, "my-post");
        assert_eq!(page.post.text, "Short body");
        assert_eq!(page.post.likes_amount, 2);
        assert_eq!(page.post.image_url.as_deref(), Some("/media/cover.png"));
        let comments: Vec<(&str, &str)> = page
            .post
            .comments
            .iter()
            .map(|c| (c.text.as_str(), c.author.as_str()))
            .collect();
        assert_eq!(comments, vec![("First!", "bob"), ("Thanks", "ann")]);
        assert_eq!(page.popular_tags.len(), 3);
        assert_eq!(page.most_popular_posts.len(), 5);

        assert!(views.post_detail("does-not-exist").unwrap_err().is_not_found());
    }

    #[test]
    fn test_tag_filter_page() {
        let db = populated_db();
        let config = test_config("./data/media");
        let repo = SqliteRepository::new(db, &config.ranking);
        let views = ViewAssembler::new(&repo, &config.pages, &config.media);

        let page = views.tag_filter("python").unwrap();
        assert_eq!(page.tag, "python");
        assert!(page.posts.len() <= 20);
        assert_eq!(page.posts.len(), 6);
        assert!(page
            .posts
            .iter()
            .all(|p| p.tags.iter().any(|t| t.title == "python")));

        assert!(views.tag_filter("cobol").unwrap_err().is_not_found());
    }

    #[test]
    fn test_index_teasers_truncated() {
        let db = populated_db();
        let config = test_config("./data/media");
        let repo = SqliteRepository::new(db, &config.ranking);
        let views = ViewAssembler::new(&repo, &config.pages, &config.media);

        let page = views.index().unwrap();
        for teaser in page.page_posts.iter().chain(page.most_popular_posts.iter()) {
            assert!(teaser.teaser_text.chars().count() <= 200);
        }
        let python = page
            .page_posts
            .iter()
            .find(|p| p.slug == "python-5")
            .unwrap();
        assert_eq!(python.teaser_text.chars().count(), 200);
        assert_eq!(python.first_tag_title.as_deref(), Some("python"));

        let again = views.index().unwrap();
        assert_eq!(page.page_posts, again.page_posts);
        assert_eq!(page.most_popular_posts, again.most_popular_posts);
        assert_eq!(page.popular_tags, again.popular_tags);
    }
}

mod http_integration_tests {
    use super::*;

    async fn get(app: axum::Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn app(media_dir: &str) -> axum::Router {
        web::app(test_config(media_dir), populated_db()).unwrap()
    }

    #[tokio::test]
    async fn test_index_renders() {
        let (status, body) = get(app("./data/media"), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("My Post"));
        assert!(body.contains("/tags/python"));
    }

    #[tokio::test]
    async fn test_post_detail_renders_and_404s() {
        let (status, body) = get(app("./data/media"), "/posts/my-post").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("First!"));
        assert!(body.contains("2 likes"));

        let (status, body) = get(app("./data/media"), "/posts/does-not-exist").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("Page not found"));
    }

    #[tokio::test]
    async fn test_tag_filter_renders_and_404s() {
        let (status, body) = get(app("./data/media"), "/tags/python").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Python 5"));
        assert!(body.contains("Posts tagged"));

        let (status, _) = get(app("./data/media"), "/tags/cobol").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_tag_link_with_slash_resolves() {
        let db = populated_db();
        let ann = seed::create_user(&db, "carol").unwrap();
        add_post(&db, ann, "Pointers", 21, &["c/c++"]);
        let app = || web::app(test_config("./data/media"), db.clone()).unwrap();

        let (status, body) = get(app(), "/").await;
        assert_eq!(status, StatusCode::OK);
        let start = body.find("href=\"/tags/c").expect("tag link rendered") + "href=\"".len();
        let end = start + body[start..].find('"').unwrap();
        let link = &body[start..end];
        assert_eq!(link, "/tags/c%2Fc%2B%2B");

        let (status, body) = get(app(), link).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Pointers"));
    }

    #[tokio::test]
    async fn test_contacts_and_unknown_route() {
        let (status, body) = get(app("./data/media"), "/contacts").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Contacts"));

        let (status, _) = get(app("./data/media"), "/nowhere").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_media_served_without_traversal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cover.png"), b"png-bytes").unwrap();
        let media_dir = dir.path().to_string_lossy().to_string();

        let (status, body) = get(app(&media_dir), "/media/cover.png").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "png-bytes");

        let (status, _) = get(app(&media_dir), "/media/..%2Fsecret").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = get(app(&media_dir), "/media/missing.png").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
