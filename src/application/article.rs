//! Article page orchestration: fetch, normalize, render.

use std::sync::Arc;

use time::{OffsetDateTime, format_description::well_known::Rfc3339, macros::format_description};
use tracing::{debug, warn};

use crate::{
    application::render::{ComrakRenderService, RenderRequest, RenderService},
    config::SiteSettings,
    domain::article::Article,
    infra::cms::{CmsClient, normalize},
};

/// Fully prepared data for one article page.
#[derive(Debug, Clone)]
pub struct ArticlePage {
    pub article: Article,
    pub body_html: String,
    pub published_label: String,
    pub updated_label: String,
    pub contains_code: bool,
    pub contains_mermaid: bool,
}

/// Loads one article per request. Any failure along the way, a backend error,
/// a missing record, or an undisplayable payload, collapses into `None` so the
/// page layer only ever distinguishes "article" from "not found".
pub struct ArticleService {
    cms: CmsClient,
    renderer: Arc<ComrakRenderService>,
    site: SiteSettings,
}

impl ArticleService {
    pub fn new(cms: CmsClient, renderer: Arc<ComrakRenderService>, site: SiteSettings) -> Self {
        Self {
            cms,
            renderer,
            site,
        }
    }

    pub async fn load(&self, id: &str) -> Option<ArticlePage> {
        let raw = match self.cms.fetch_article(id).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(
                    target = "rivista::article",
                    article_id = id,
                    error = %err,
                    "CMS fetch failed; treating as not found"
                );
                return None;
            }
        };

        debug!(
            target = "rivista::article",
            article_id = id,
            payload = %raw,
            "raw CMS payload"
        );

        let article = normalize(raw)?;
        if !article.is_displayable() {
            warn!(
                target = "rivista::article",
                article_id = id,
                "normalized article has no title; treating as not found"
            );
            return None;
        }

        let request = RenderRequest::new(article.content.clone())
            .with_public_site_url(self.site.public_url.clone());
        let output = match self.renderer.render(&request) {
            Ok(output) => output,
            Err(err) => {
                warn!(
                    target = "rivista::article",
                    article_id = id,
                    error = %err,
                    "markdown rendering failed; treating as not found"
                );
                return None;
            }
        };

        let published_label = format_timestamp(&article.published_at);
        let updated_label = format_timestamp(&article.updated_at);

        Some(ArticlePage {
            article,
            body_html: output.html,
            published_label,
            updated_label,
            contains_code: output.contains_code,
            contains_mermaid: output.contains_mermaid,
        })
    }
}

/// Render an RFC 3339 timestamp as a `YYYY-MM-DD` label; anything that fails
/// to parse is shown verbatim.
fn format_timestamp(raw: &str) -> String {
    let format = format_description!("[year]-[month]-[day]");
    OffsetDateTime::parse(raw, &Rfc3339)
        .ok()
        .and_then(|parsed| parsed.format(&format).ok())
        .unwrap_or_else(|| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_rfc3339_timestamps_as_dates() {
        assert_eq!(
            format_timestamp("2024-05-17T09:30:00.000Z"),
            "2024-05-17"
        );
    }

    #[test]
    fn unparseable_timestamps_pass_through() {
        assert_eq!(format_timestamp("yesterday"), "yesterday");
        assert_eq!(format_timestamp(""), "");
    }
}
