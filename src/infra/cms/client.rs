use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CmsError {
    #[error("invalid CMS base URL: {0}")]
    BaseUrl(#[from] url::ParseError),
    #[error("failed to build HTTP client: {0}")]
    Client(reqwest::Error),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("CMS responded with status {status}")]
    Status { status: StatusCode },
    #[error("failed to decode CMS response body: {0}")]
    Decode(serde_json::Error),
}

/// Thin read-only client for the article endpoint of a Strapi backend.
///
/// The query shape is pinned to the v5 contract: filter by `documentId` and
/// expand the `tags` and `thumbnail` relations. Envelope differences between
/// backend versions are absorbed downstream by the normalizer.
#[derive(Debug, Clone)]
pub struct CmsClient {
    client: Client,
    base: Url,
}

impl CmsClient {
    pub fn new(base: &str, timeout: Duration) -> Result<Self, CmsError> {
        let base = Url::parse(base)?.join("/")?;
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .build()
            .map_err(CmsError::Client)?;
        Ok(Self { client, base })
    }

    pub fn user_agent() -> &'static str {
        concat!("rivista/", env!("CARGO_PKG_VERSION"))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Fetch the raw payload for one article id. One GET per page view, no
    /// retries; the caller decides what a failure means for the page.
    pub async fn fetch_article(&self, id: &str) -> Result<Value, CmsError> {
        let mut url = self.base.join("api/articles")?;
        url.query_pairs_mut()
            .append_pair("filters[documentId][$eq]", id)
            .append_pair("populate[tags]", "true")
            .append_pair("populate[thumbnail]", "true");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CmsError::Status { status });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(CmsError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized_to_site_root() {
        let client = CmsClient::new("http://localhost:1337/some/path", Duration::from_secs(5))
            .expect("client");
        assert_eq!(client.base().as_str(), "http://localhost:1337/");
    }

    #[test]
    fn rejects_unparseable_base_url() {
        let err = CmsClient::new("not a url", Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, CmsError::BaseUrl(_)));
    }
}
