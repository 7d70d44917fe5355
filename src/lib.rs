//! rivista — a server-rendered viewer for Strapi-backed blog articles.
//!
//! One request, one article: the route id drives a CMS fetch, the payload is
//! normalized into a canonical [`domain::article::Article`], the Markdown body
//! runs through the comrak pipeline, and askama renders the page.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
