use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rendering request passed into the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRequest {
    /// Source markdown captured from the CMS.
    pub markdown: String,
    /// Normalised public site URL used for same-origin checks during link classification.
    #[serde(default)]
    pub public_site_url: Option<String>,
}

impl RenderRequest {
    pub fn new(markdown: impl Into<String>) -> Self {
        Self {
            markdown: markdown.into(),
            public_site_url: None,
        }
    }

    pub fn with_public_site_url(mut self, public_site_url: impl Into<String>) -> Self {
        let normalized = normalize_public_site_url(public_site_url.into().as_str());
        if !normalized.is_empty() {
            self.public_site_url = Some(normalized);
        }
        self
    }
}

fn normalize_public_site_url(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let without_trailing = trimmed.trim_end_matches('/');
    format!("{without_trailing}/")
}

/// Deterministic rendering result returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOutput {
    /// Sanitised HTML ready for the article template.
    pub html: String,
    /// Indicates whether the rendered HTML contains any code blocks.
    pub contains_code: bool,
    /// Indicates whether the rendered HTML contains Mermaid diagrams.
    pub contains_mermaid: bool,
}

/// Structured errors surfaced by the rendering pipeline.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("markdown parsing failed: {message}")]
    Markdown { message: String },
    #[error("syntax highlighting failed: {language}: {message}")]
    Highlighting { language: String, message: String },
    #[error("document processing failed: {message}")]
    Document { message: String },
}

/// Trait exposed by the rendering pipeline. Implementations must be pure and
/// deterministic: given the same input, they return identical outputs or errors.
pub trait RenderService: Send + Sync {
    fn render(&self, request: &RenderRequest) -> Result<RenderOutput, RenderError>;
}
