use super::handlers;
use super::state::AppState;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::public::index))
        .route("/posts/:slug", get(handlers::public::post_detail))
        .route("/tags/:title", get(handlers::public::tag_filter))
        .route("/contacts", get(handlers::public::contacts))
        .route("/media/:filename", get(handlers::public::serve_media))
}
