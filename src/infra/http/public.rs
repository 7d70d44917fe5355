use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::{
    application::article::ArticleService,
    config::SiteSettings,
    presentation::views::{
        ArticleDetailContext, ArticleTemplate, SiteChrome, render_not_found_response,
        render_template_response,
    },
};

use super::middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub articles: Arc<ArticleService>,
    pub site: SiteSettings,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/articles/{id}", get(article_detail))
        .route("/_health", get(health))
        .route(
            "/static/public/{*path}",
            get(crate::infra::assets::serve_public),
        )
        .fallback(fallback_router)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn article_detail(State(state): State<HttpState>, Path(id): Path<String>) -> Response {
    let chrome = site_chrome(&state.site);

    match state.articles.load(&id).await {
        Some(page) => {
            let canonical = canonical_url(&state.site.public_url, &format!("/articles/{id}"));
            let chrome = chrome.with_share_links(&canonical, &page.article.title);
            let content = ArticleDetailContext::from_page(page, canonical);
            render_template_response(ArticleTemplate { chrome, content }, StatusCode::OK)
        }
        None => render_not_found_response(chrome),
    }
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn fallback_router(State(state): State<HttpState>) -> Response {
    render_not_found_response(site_chrome(&state.site)).into_response()
}

fn site_chrome(site: &SiteSettings) -> SiteChrome {
    SiteChrome::new(site.title.clone(), site.recruit_widget_url.clone())
}

fn canonical_url(public_url: &str, path: &str) -> String {
    let base = public_url.trim_end_matches('/');
    format!("{base}{path}")
}

#[cfg(test)]
mod tests {
    use super::canonical_url;

    #[test]
    fn canonical_url_joins_without_double_slash() {
        assert_eq!(
            canonical_url("https://blog.example/", "/articles/42"),
            "https://blog.example/articles/42"
        );
        assert_eq!(
            canonical_url("https://blog.example", "/articles/42"),
            "https://blog.example/articles/42"
        );
    }
}
