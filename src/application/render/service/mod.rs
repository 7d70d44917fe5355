mod config;
mod highlight;
mod links;
mod mermaid;
mod rewrite;

use std::{path::PathBuf, sync::Arc};

use comrak::{Arena, format_html, nodes::AstNode, parse_document};
use once_cell::sync::{Lazy, OnceCell};
use syntect::{html::ClassStyle, parsing::SyntaxSet};
use thiserror::Error;
use tracing::warn;

use crate::application::render::types::{RenderError, RenderOutput, RenderRequest, RenderService};
use crate::config::{DEFAULT_MERMAID_CACHE_DIR, DEFAULT_MERMAID_CLI_PATH};

use self::mermaid::{MermaidRenderError, MermaidRenderer};
use config::{build_sanitizer, default_options};
use links::ProcessedHtml;
use rewrite::rewrite_ast;

/// Default Comrak-based rendering pipeline with Syntect highlighting and Ammonia sanitisation.
pub struct ComrakRenderService {
    options: comrak::Options<'static>,
    syntax_set: SyntaxSet,
    class_style: ClassStyle,
    sanitizer: ammonia::Builder<'static>,
    mermaid: Option<MermaidRenderer>,
}

impl ComrakRenderService {
    /// Construct a new renderer with markdown extensions enabled and syntax
    /// highlighting configured to emit `syntax-` prefixed CSS classes.
    fn new() -> Self {
        let options = default_options();
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let class_style = ClassStyle::SpacedPrefixed { prefix: "syntax-" };
        let sanitizer = build_sanitizer();
        let config = active_render_config();
        let mermaid = match MermaidRenderer::new(
            config.mermaid_cli_path.clone(),
            config.mermaid_cache_dir.clone(),
        ) {
            Ok(renderer) => Some(renderer),
            Err(err) => {
                log_mermaid_init_error(&err, &config);
                None
            }
        };

        Self {
            options,
            syntax_set,
            class_style,
            sanitizer,
            mermaid,
        }
    }
}

static RENDER_SERVICE: Lazy<Arc<ComrakRenderService>> =
    Lazy::new(|| Arc::new(ComrakRenderService::new()));

/// Access the shared render service instance, initialised on first use.
pub fn render_service() -> Arc<ComrakRenderService> {
    Arc::clone(&RENDER_SERVICE)
}

impl Default for ComrakRenderService {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderService for ComrakRenderService {
    fn render(&self, request: &RenderRequest) -> Result<RenderOutput, RenderError> {
        let arena = Arena::new();
        let root = parse_document(&arena, &request.markdown, &self.options);

        let rewrite_outcome = rewrite_stage(
            root,
            &self.syntax_set,
            &self.class_style,
            self.mermaid.as_ref(),
        )?;

        let rendered_html = render_html_stage(root, &self.options)?;
        let sanitized_html = self.sanitizer.clean(&rendered_html).to_string();
        let restored_html = restore_stage(sanitized_html, &rewrite_outcome);

        let ProcessedHtml {
            html,
            contains_code: processed_contains_code,
            contains_mermaid: processed_contains_mermaid,
        } = links::post_process(&restored_html, request.public_site_url.as_deref())?;

        Ok(RenderOutput {
            html,
            contains_code: rewrite_outcome.contains_code || processed_contains_code,
            contains_mermaid: rewrite_outcome.contains_mermaid || processed_contains_mermaid,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RenderPipelineConfig {
    pub mermaid_cli_path: PathBuf,
    pub mermaid_cache_dir: PathBuf,
}

impl Default for RenderPipelineConfig {
    fn default() -> Self {
        Self {
            mermaid_cli_path: PathBuf::from(DEFAULT_MERMAID_CLI_PATH),
            mermaid_cache_dir: PathBuf::from(DEFAULT_MERMAID_CACHE_DIR),
        }
    }
}

impl From<&crate::config::RenderSettings> for RenderPipelineConfig {
    fn from(settings: &crate::config::RenderSettings) -> Self {
        Self {
            mermaid_cli_path: settings.mermaid_cli_path.clone(),
            mermaid_cache_dir: settings.mermaid_cache_dir.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RenderConfigError {
    #[error("render service already configured")]
    AlreadyConfigured,
}

static RENDER_PIPELINE_CONFIG: OnceCell<RenderPipelineConfig> = OnceCell::new();

/// Pin the pipeline configuration before the first render. Later calls fail
/// once the shared service has been built.
pub fn configure_render_service(config: RenderPipelineConfig) -> Result<(), RenderConfigError> {
    RENDER_PIPELINE_CONFIG
        .set(config)
        .map_err(|_| RenderConfigError::AlreadyConfigured)
}

fn active_render_config() -> RenderPipelineConfig {
    RENDER_PIPELINE_CONFIG.get().cloned().unwrap_or_default()
}

fn log_mermaid_init_error(error: &MermaidRenderError, config: &RenderPipelineConfig) {
    warn!(
        target = "rivista::render::mermaid",
        cli_path = %config.mermaid_cli_path.display(),
        cache_dir = %config.mermaid_cache_dir.display(),
        error = %error,
        "Mermaid renderer disabled"
    );
}

fn rewrite_stage<'a>(
    root: &'a AstNode<'a>,
    syntax_set: &SyntaxSet,
    class_style: &ClassStyle,
    mermaid_renderer: Option<&MermaidRenderer>,
) -> Result<rewrite::RewriteOutcome, RenderError> {
    rewrite_ast(root, syntax_set, class_style, mermaid_renderer)
}

fn render_html_stage<'a>(
    root: &'a AstNode<'a>,
    options: &comrak::Options<'static>,
) -> Result<String, RenderError> {
    let mut html = String::new();
    format_html(root, options, &mut html).map_err(|err| RenderError::Markdown {
        message: err.to_string(),
    })?;
    Ok(html)
}

fn restore_stage(html: String, rewrite_outcome: &rewrite::RewriteOutcome) -> String {
    rewrite_outcome
        .mermaid_fragments
        .iter()
        .fold(html, |acc, fragment| {
            let placeholder = format!("<div>{}</div>", fragment.placeholder);
            acc.replace(&placeholder, &fragment.html)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(markdown: &str) -> RenderOutput {
        let service = ComrakRenderService::default();
        service
            .render(&RenderRequest::new(markdown).with_public_site_url("https://blog.example"))
            .expect("render")
    }

    #[test]
    fn renders_emphasis_to_html() {
        let output = render("**hi**");
        assert!(output.html.contains("<strong>hi</strong>"));
        assert!(!output.contains_code);
    }

    #[test]
    fn renders_fenced_code_with_copy_control() {
        let output = render("```go\npackage main\n```");
        assert!(output.contains_code);
        assert!(output.html.contains("data-role=\"code-copy-button\""));
        assert!(output.html.contains("data-language=\"go\""));
    }

    #[test]
    fn sanitizes_raw_script_blocks() {
        let output = render("hello\n\n<script>alert(1)</script>");
        assert!(output.html.contains("hello"));
        assert!(!output.html.contains("<script>"));
    }

    #[test]
    fn external_links_are_classified() {
        let output = render("[out](https://other.example/x)");
        assert!(output.html.contains("data-link-kind=\"external\""));
        assert!(output.html.contains("target=\"_blank\""));
    }
}
