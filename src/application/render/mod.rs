//! Markdown rendering pipeline.

pub mod service;
pub mod types;

pub use service::{
    ComrakRenderService, RenderConfigError, RenderPipelineConfig, configure_render_service,
    render_service,
};
pub use types::{RenderError, RenderOutput, RenderRequest, RenderService};
