use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::application::{
    article::ArticlePage,
    error::{ErrorReport, HttpError},
    share::{ShareTarget, share_url},
};

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: SiteChrome) -> Response {
    let mut response =
        render_template_response(NotFoundTemplate { chrome }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Article not found",
    )
    .attach(&mut response);
    response
}

/// Fixed header shown on every page: brand link plus share buttons.
#[derive(Clone)]
pub struct SiteChrome {
    pub brand: BrandView,
    pub share_links: Vec<ShareLinkView>,
    pub recruit_widget_url: String,
}

impl SiteChrome {
    pub fn new(title: impl Into<String>, recruit_widget_url: impl Into<String>) -> Self {
        Self {
            brand: BrandView {
                title: title.into(),
                href: "/".to_string(),
            },
            share_links: Vec::new(),
            recruit_widget_url: recruit_widget_url.into(),
        }
    }

    /// Populate the share buttons for a concrete page URL and title.
    pub fn with_share_links(mut self, page_url: &str, title: &str) -> Self {
        self.share_links = ShareTarget::ALL
            .iter()
            .map(|&target| ShareLinkView {
                href: share_url(target, page_url, title),
                icon: target.icon_path().to_string(),
                label: target.label().to_string(),
            })
            .collect();
        self
    }
}

#[derive(Clone)]
pub struct BrandView {
    pub title: String,
    pub href: String,
}

#[derive(Clone)]
pub struct ShareLinkView {
    pub href: String,
    pub icon: String,
    pub label: String,
}

#[derive(Clone)]
pub struct TagBadge {
    pub label: String,
}

/// Everything the article template needs.
pub struct ArticleDetailContext {
    pub title: String,
    pub body_html: String,
    pub published_label: String,
    pub updated_label: String,
    pub badges: Vec<TagBadge>,
    pub thumbnail_url: Option<String>,
    pub canonical_url: String,
}

impl ArticleDetailContext {
    pub fn from_page(page: ArticlePage, canonical_url: String) -> Self {
        let badges = page
            .article
            .tags
            .iter()
            .map(|tag| TagBadge {
                label: tag.name.clone(),
            })
            .collect();

        Self {
            title: page.article.title,
            body_html: page.body_html,
            published_label: page.published_label,
            updated_label: page.updated_label,
            badges,
            thumbnail_url: page.article.thumbnail_url,
            canonical_url,
        }
    }
}

#[derive(Template)]
#[template(path = "article.html")]
pub struct ArticleTemplate {
    pub chrome: SiteChrome,
    pub content: ArticleDetailContext,
}

#[derive(Template)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub chrome: SiteChrome,
}
