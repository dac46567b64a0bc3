use crate::services::views::{Page, ViewError, ViewResult};
use crate::web::error::{AppError, AppResult};
use crate::web::state::AppState;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use std::sync::Arc;
use tera::Context;

fn make_context<P: Page>(state: &AppState, page: &P) -> AppResult<Context> {
    let mut ctx = Context::from_serialize(page)?;
    ctx.insert("site", &state.config.site);
    Ok(ctx)
}

fn render<P: Page>(state: &AppState, page: ViewResult<P>) -> AppResult<Response> {
    match page {
        Ok(page) => {
            let ctx = make_context(state, &page)?;
            let html = state.templates.render(P::TEMPLATE, &ctx)?;
            Ok(Html(html).into_response())
        }
        Err(err @ ViewError::NotFound { .. }) => {
            tracing::debug!("{}", err);
            render_not_found(state)
        }
        Err(ViewError::Storage(err)) => Err(AppError::Internal(err)),
    }
}

fn render_not_found(state: &AppState) -> AppResult<Response> {
    let mut ctx = Context::new();
    ctx.insert("site", &state.config.site);
    let html = state.templates.render("404.html", &ctx)?;
    Ok((StatusCode::NOT_FOUND, Html(html)).into_response())
}

pub async fn index(State(state): State<Arc<AppState>>) -> AppResult<Response> {
    render(&state, state.views().index())
}

pub async fn post_detail(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> AppResult<Response> {
    render(&state, state.views().post_detail(&slug))
}

pub async fn tag_filter(
    State(state): State<Arc<AppState>>,
    Path(title): Path<String>,
) -> AppResult<Response> {
    render(&state, state.views().tag_filter(&title))
}

pub async fn contacts(State(state): State<Arc<AppState>>) -> AppResult<Response> {
    render(&state, Ok(state.views().contacts()))
}

pub async fn not_found(State(state): State<Arc<AppState>>) -> AppResult<Response> {
    render_not_found(&state)
}

pub async fn serve_media(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> AppResult<Response> {
    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        return Err(AppError::NotFound);
    }

    let file_path = state.media_dir.join(&filename);

    // The resolved path must stay inside media_dir
    let canonical_media = state.media_dir.canonicalize().unwrap_or_default();
    let canonical_file = match file_path.canonicalize() {
        Ok(p) => p,
        Err(_) => return Err(AppError::NotFound),
    };

    if !canonical_file.starts_with(&canonical_media) {
        return Err(AppError::NotFound);
    }

    let content = tokio::fs::read(&canonical_file).await?;
    let mime = mime_guess::from_path(&filename).first_or_octet_stream();

    Ok(([(header::CONTENT_TYPE, mime.as_ref())], content).into_response())
}
