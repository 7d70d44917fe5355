use comrak::nodes::{AstNode, NodeHtmlBlock, NodeValue};
use syntect::html::ClassStyle;
use syntect::parsing::SyntaxSet;
use tracing::warn;

use crate::application::render::types::RenderError;

use super::{highlight, mermaid::MermaidRenderer};

#[derive(Default)]
pub(crate) struct RewriteOutcome {
    pub(crate) contains_code: bool,
    pub(crate) contains_mermaid: bool,
    pub(crate) mermaid_fragments: Vec<MermaidFragment>,
    mermaid_counter: usize,
}

/// Rendered SVG kept out of the sanitiser via a placeholder, swapped back in
/// after sanitisation.
#[derive(Clone)]
pub(crate) struct MermaidFragment {
    pub(crate) placeholder: String,
    pub(crate) html: String,
}

pub(crate) fn rewrite_ast<'a>(
    root: &'a AstNode<'a>,
    syntax_set: &SyntaxSet,
    class_style: &ClassStyle,
    mermaid: Option<&MermaidRenderer>,
) -> Result<RewriteOutcome, RenderError> {
    let mut walker = RewriteWalker::new(syntax_set, class_style, mermaid);
    walker.visit_nodes(root)?;
    Ok(walker.outcome)
}

struct RewriteWalker<'a> {
    syntax_set: &'a SyntaxSet,
    class_style: &'a ClassStyle,
    outcome: RewriteOutcome,
    mermaid: Option<&'a MermaidRenderer>,
}

impl<'a> RewriteWalker<'a> {
    fn new(
        syntax_set: &'a SyntaxSet,
        class_style: &'a ClassStyle,
        mermaid: Option<&'a MermaidRenderer>,
    ) -> Self {
        Self {
            syntax_set,
            class_style,
            outcome: RewriteOutcome::default(),
            mermaid,
        }
    }

    fn visit_nodes(&mut self, node: &AstNode<'_>) -> Result<(), RenderError> {
        if {
            let data = node.data.borrow();
            matches!(data.value, NodeValue::Image(_))
        } {
            process_image_node(node)?;
        }

        process_inline_code_node(node);

        if let Some((info, literal)) = extract_code_block(node) {
            let mut segments = info.split_whitespace();
            let language_owned = segments.next().map(|s| s.to_string());
            let meta_string = segments.collect::<Vec<_>>().join(" ");
            let language_ref = language_owned.as_deref();

            if self.handle_mermaid_block(node, language_ref, &literal)? {
                // Mermaid block handled (rendered or gracefully degraded).
            } else {
                let meta_ref = (!meta_string.is_empty()).then_some(meta_string.as_str());
                let html = highlight::highlight_code(
                    language_ref,
                    meta_ref,
                    &literal,
                    self.syntax_set,
                    self.class_style,
                )?;
                self.outcome.contains_code = true;
                let mut data = node.data.borrow_mut();
                data.value = NodeValue::HtmlBlock(NodeHtmlBlock {
                    block_type: 0,
                    literal: html,
                });
            }
        }

        let mut child = node.first_child();
        while let Some(next) = child {
            self.visit_nodes(next)?;
            child = next.next_sibling();
        }

        Ok(())
    }

    fn handle_mermaid_block(
        &mut self,
        node: &AstNode<'_>,
        language: Option<&str>,
        literal: &str,
    ) -> Result<bool, RenderError> {
        let Some(lang) = language.map(|lang| lang.to_ascii_lowercase()) else {
            return Ok(false);
        };

        if lang != "mermaid" {
            return Ok(false);
        }

        let Some(renderer) = self.mermaid else {
            warn!(
                target = "rivista::render::mermaid",
                "Mermaid renderer unavailable; falling back to code block"
            );
            self.apply_mermaid_fallback(node, language, literal)?;
            return Ok(true);
        };

        match renderer.render_svg(literal) {
            Ok(svg) => {
                let fragment = format!("<figure data-role=\"diagram-mermaid\">{svg}</figure>");
                let placeholder_key =
                    format!("__MERMAID_PLACEHOLDER_{}__", self.outcome.mermaid_counter);
                self.outcome.mermaid_counter = self.outcome.mermaid_counter.saturating_add(1);
                self.outcome.mermaid_fragments.push(MermaidFragment {
                    placeholder: placeholder_key.clone(),
                    html: fragment,
                });

                let mut data = node.data.borrow_mut();
                data.value = NodeValue::HtmlBlock(NodeHtmlBlock {
                    block_type: 0,
                    literal: format!("<div>{placeholder_key}</div>"),
                });
                self.outcome.contains_mermaid = true;
                Ok(true)
            }
            Err(err) => {
                warn!(
                    target = "rivista::render::mermaid",
                    "Mermaid CLI failed: {err}"
                );
                self.apply_mermaid_fallback(node, language, literal)?;
                Ok(true)
            }
        }
    }

    fn apply_mermaid_fallback(
        &mut self,
        node: &AstNode<'_>,
        language: Option<&str>,
        literal: &str,
    ) -> Result<(), RenderError> {
        let highlighted =
            highlight::highlight_code(language, None, literal, self.syntax_set, self.class_style)
                .unwrap_or_else(|_| build_plain_code_block(language.unwrap_or("text"), literal));

        self.outcome.contains_code = true;

        let mut data = node.data.borrow_mut();
        data.value = NodeValue::HtmlBlock(NodeHtmlBlock {
            block_type: 0,
            literal: highlighted,
        });

        Ok(())
    }
}

fn build_plain_code_block(language: &str, literal: &str) -> String {
    let escaped_code = ammonia::clean_text(literal);
    let mut html = String::from("<pre class=\"syntax-highlight\"");
    if !language.is_empty() {
        html.push_str(" data-language=\"");
        html.push_str(&escape_attribute(language));
        html.push('"');
    }
    html.push_str("><code>");
    html.push_str(&escaped_code);
    if !escaped_code.ends_with('\n') {
        html.push('\n');
    }
    html.push_str("</code></pre>");
    html
}

/// Replace markdown images with lightbox-ready inline HTML. The page script
/// opens the overlay for any image carrying the article-image role.
fn process_image_node(node: &AstNode<'_>) -> Result<(), RenderError> {
    let (src, title) = {
        let data = node.data.borrow();
        match &data.value {
            NodeValue::Image(link) => (link.url.clone(), link.title.clone()),
            _ => return Ok(()),
        }
    };

    let alt_raw = collect_inline_text(node);
    let alt = alt_raw.split_whitespace().collect::<Vec<_>>().join(" ");

    let html = build_image_html(&src, alt.trim(), (!title.is_empty()).then_some(title.as_str()));

    {
        let mut data = node.data.borrow_mut();
        data.value = NodeValue::HtmlInline(html);
    }

    while let Some(child) = node.first_child() {
        child.detach();
    }

    Ok(())
}

fn build_image_html(src: &str, alt: &str, title: Option<&str>) -> String {
    let mut html = String::with_capacity(src.len() + alt.len() + 64);
    html.push_str("<img data-role=\"article-image\"");
    html.push_str(" src=\"");
    html.push_str(&escape_attribute(src));
    html.push('"');

    html.push_str(" alt=\"");
    html.push_str(&escape_attribute(alt));
    html.push('"');

    if let Some(title) = title.and_then(|t| (!t.is_empty()).then_some(t)) {
        html.push_str(" title=\"");
        html.push_str(&escape_attribute(title));
        html.push('"');
    }

    html.push_str(" />");
    html
}

/// Inline code spans carry a fixed highlight class; unlike fenced blocks they
/// get no language detection and no copy control.
fn process_inline_code_node(node: &AstNode<'_>) {
    let literal = {
        let data = node.data.borrow();
        match &data.value {
            NodeValue::Code(code) => code.literal.clone(),
            _ => return,
        }
    };

    let escaped = escape_text(&literal);
    let mut data = node.data.borrow_mut();
    data.value = NodeValue::HtmlInline(format!("<code class=\"inline-code\">{escaped}</code>"));
}

/// Escape text content for inline HTML, leaving whitespace untouched.
fn escape_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

pub(crate) fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\n' | '\r' | '\t' => escaped.push(' '),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn collect_inline_text(node: &AstNode<'_>) -> String {
    fn walk(node: &AstNode<'_>, buffer: &mut String) {
        {
            let data = node.data.borrow();
            match &data.value {
                NodeValue::Text(text) => buffer.push_str(text),
                NodeValue::Code(code) => buffer.push_str(&code.literal),
                NodeValue::LineBreak | NodeValue::SoftBreak => buffer.push(' '),
                _ => {}
            }
        }
        let mut child = node.first_child();
        while let Some(next) = child {
            walk(next, buffer);
            child = next.next_sibling();
        }
    }

    let mut text = String::new();
    let mut child = node.first_child();
    while let Some(next) = child {
        walk(next, &mut text);
        child = next.next_sibling();
    }
    text
}

fn extract_code_block(node: &AstNode<'_>) -> Option<(String, String)> {
    let data = node.data.borrow();
    if let NodeValue::CodeBlock(block) = &data.value {
        let info = block.info.trim().to_string();
        let literal = block.literal.clone();
        Some((info, literal))
    } else {
        None
    }
}
