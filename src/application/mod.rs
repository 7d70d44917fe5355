//! Application services orchestrating CMS data into page contexts.

pub mod article;
pub mod error;
pub mod render;
pub mod share;
