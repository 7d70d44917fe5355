//! Headless CMS integration: the HTTP client and the envelope normalizer.

mod client;
mod envelope;

pub use client::{CmsClient, CmsError};
pub use envelope::normalize;
