use std::{sync::Arc, time::Duration};

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    routing::get,
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use rivista::{
    application::{article::ArticleService, render::render_service},
    config::SiteSettings,
    infra::{
        cms::CmsClient,
        http::{HttpState, build_router},
    },
};

async fn spawn_stub_cms(payload: Value) -> String {
    let app = Router::new()
        .route("/api/articles", get(stub_articles))
        .with_state(payload);
    spawn(app).await
}

async fn spawn_failing_cms() -> String {
    let app = Router::new().route("/api/articles", get(stub_failure));
    spawn(app).await
}

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let addr = listener.local_addr().expect("stub addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub serve");
    });
    format!("http://{addr}")
}

async fn stub_articles(State(payload): State<Value>) -> Json<Value> {
    Json(payload)
}

async fn stub_failure() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

fn site_settings() -> SiteSettings {
    SiteSettings {
        public_url: "http://blog.example".to_string(),
        title: "Tech Blog".to_string(),
        recruit_widget_url: "https://en-gage.net/raisex_jobs/widget/?banner=1".to_string(),
    }
}

fn app_for(cms_base: &str) -> Router {
    let cms = CmsClient::new(cms_base, Duration::from_secs(2)).expect("cms client");
    let site = site_settings();
    let articles = Arc::new(ArticleService::new(cms, render_service(), site.clone()));
    build_router(HttpState { articles, site })
}

async fn get_page(app: Router, path: &str) -> (StatusCode, String) {
    let response = app
        .oneshot(
            Request::builder()
                .uri(path)
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    (status, String::from_utf8(bytes.to_vec()).expect("utf8 body"))
}

fn flat_article() -> Value {
    json!({
        "data": [{
            "id": 7,
            "documentId": "42",
            "title": "Hello",
            "content": "**hi** run `cargo fmt`\n\n```go\npackage main\n```",
            "publishedAt": "2024-05-17T09:30:00.000Z",
            "updatedAt": "2024-05-18T10:00:00.000Z",
            "tags": [{ "id": 1, "name": "go" }],
            "thumbnail": [{
                "url": "/uploads/full.png",
                "formats": { "medium": { "url": "/uploads/medium.png" } }
            }]
        }]
    })
}

fn wrapped_article() -> Value {
    json!({
        "data": [{
            "id": 7,
            "attributes": {
                "title": "Hello",
                "content": "**hi**\n\n```go\npackage main\n```",
                "publishedAt": "2024-05-17T09:30:00.000Z",
                "updatedAt": "2024-05-18T10:00:00.000Z",
                "tags": { "data": [{ "id": 1, "attributes": { "name": "go" } }] },
                "thumbnail": { "data": [{ "attributes": { "url": "/uploads/full.png" } }] }
            }
        }]
    })
}

#[tokio::test]
async fn article_page_renders_from_flat_envelope() {
    let base = spawn_stub_cms(flat_article()).await;
    let (status, body) = get_page(app_for(&base), "/articles/42").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Hello"), "missing title: {body}");
    assert!(body.contains("go"), "missing tag badge: {body}");
    assert!(
        body.contains("<strong>hi</strong>"),
        "markdown body not rendered: {body}"
    );
    assert!(
        body.contains("data-role=\"code-copy-button\""),
        "code block lost its copy control: {body}"
    );
    assert!(
        body.contains("/uploads/medium.png"),
        "medium thumbnail not preferred: {body}"
    );
    assert!(
        body.contains("https://twitter.com/share?url=http%3A%2F%2Fblog.example%2Farticles%2F42"),
        "share link missing canonical URL: {body}"
    );
    assert!(
        body.contains("<code class=\"inline-code\">cargo fmt</code>"),
        "inline code lost its highlight class: {body}"
    );
}

#[tokio::test]
async fn article_header_precedes_thumbnail_and_body() {
    let base = spawn_stub_cms(flat_article()).await;
    let (status, body) = get_page(app_for(&base), "/articles/42").await;
    assert_eq!(status, StatusCode::OK);

    let title = body.find("<h1 class=\"article-title\"").expect("title");
    let meta = body.find("class=\"article-meta\"").expect("meta");
    let thumbnail = body.find("class=\"article-thumbnail\"").expect("thumbnail");
    let article_body = body.find("data-role=\"article-body\"").expect("body");

    assert!(title < meta, "title must come before tag badges and dates");
    assert!(meta < thumbnail, "metadata must come before the thumbnail");
    assert!(thumbnail < article_body, "thumbnail must come before the body");
}

#[tokio::test]
async fn recruit_banner_renders_on_every_page() {
    let base = spawn_stub_cms(flat_article()).await;

    let (_, article_body) = get_page(app_for(&base), "/articles/42").await;
    assert!(
        article_body.contains("class=\"engage-recruit-widget\""),
        "article page missing recruit widget: {article_body}"
    );
    assert!(
        article_body
            .contains("data-url=\"https://en-gage.net/raisex_jobs/widget/?banner=1\""),
        "recruit widget missing its data-url: {article_body}"
    );
    assert!(article_body.contains("合同会社raisexでは一緒に働く仲間を募集中です。"));

    let (_, not_found_body) = get_page(app_for(&base), "/nope").await;
    assert!(
        not_found_body.contains("class=\"engage-recruit-widget\""),
        "not-found page missing recruit widget: {not_found_body}"
    );
}

#[tokio::test]
async fn wrapped_envelope_renders_the_same_page() {
    let base = spawn_stub_cms(wrapped_article()).await;
    let (status, body) = get_page(app_for(&base), "/articles/42").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Hello"));
    assert!(body.contains("go"));
    assert!(body.contains("<strong>hi</strong>"));
}

#[tokio::test]
async fn empty_result_set_renders_not_found() {
    let base = spawn_stub_cms(json!({ "data": [] })).await;
    let (status, body) = get_page(app_for(&base), "/articles/missing").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("Article not found"), "body: {body}");
}

#[tokio::test]
async fn cms_failure_renders_not_found() {
    let base = spawn_failing_cms().await;
    let (status, body) = get_page(app_for(&base), "/articles/42").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("Article not found"), "body: {body}");
}

#[tokio::test]
async fn unknown_route_renders_not_found() {
    let base = spawn_stub_cms(flat_article()).await;
    let (status, body) = get_page(app_for(&base), "/nope").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("Article not found"));
}

#[tokio::test]
async fn health_endpoint_responds() {
    let base = spawn_stub_cms(flat_article()).await;
    let (status, _) = get_page(app_for(&base), "/_health").await;

    assert_eq!(status, StatusCode::NO_CONTENT);
}
