use serde::{Deserialize, Serialize};

/// A tag attached to an article. Order is preserved from the CMS response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// Canonical article record produced by the response normalizer.
///
/// Constructed once per request and never mutated afterwards; every field is
/// already defaulted, so the renderer never sees an absent value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// CMS primary key.
    pub id: i64,
    pub title: String,
    /// Raw Markdown with embedded HTML permitted.
    pub content: String,
    /// ISO-8601 timestamp strings as delivered by the CMS; empty when absent.
    pub published_at: String,
    pub updated_at: String,
    pub tags: Vec<Tag>,
    pub thumbnail_url: Option<String>,
}

impl Article {
    /// An article without a title is not displayable; the page renderer treats
    /// it the same as a missing record.
    pub fn is_displayable(&self) -> bool {
        !self.title.trim().is_empty()
    }
}
