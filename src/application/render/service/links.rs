use std::{cell::RefCell, collections::BTreeSet, rc::Rc};

use lol_html::{RewriteStrSettings, element, rewrite_str};
use url::Url;

use crate::application::render::types::RenderError;

pub(crate) struct ProcessedHtml {
    pub(crate) html: String,
    pub(crate) contains_code: bool,
    pub(crate) contains_mermaid: bool,
}

#[derive(Default, Clone)]
struct AugmentState {
    code_blocks: u32,
    mermaid_diagrams: u32,
}

/// Final HTML pass: classify links against the public site origin, give
/// images lazy-loading defaults, and detect code/diagram presence for the
/// template.
pub(crate) fn post_process(
    html: &str,
    public_site_url: Option<&str>,
) -> Result<ProcessedHtml, RenderError> {
    let state = Rc::new(RefCell::new(AugmentState::default()));
    let site_host = public_site_url.and_then(host_of);

    let rewritten = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("img", |el| {
                    if el.get_attribute("alt").is_none() {
                        el.set_attribute("alt", "")?;
                    }
                    if el.get_attribute("loading").is_none() {
                        el.set_attribute("loading", "lazy")?;
                    }
                    if el.get_attribute("decoding").is_none() {
                        el.set_attribute("decoding", "async")?;
                    }
                    Ok(())
                }),
                element!("a", {
                    let site_host = site_host.clone();
                    move |el| {
                        if let Some(href) = el.get_attribute("href") {
                            match classify_link(&href, site_host.as_deref()) {
                                LinkKind::External => {
                                    el.set_attribute("target", "_blank")?;
                                    let rel_value = merge_rel(
                                        el.get_attribute("rel"),
                                        &["noopener", "noreferrer"],
                                    );
                                    el.set_attribute("rel", &rel_value)?;
                                    el.set_attribute("data-link-kind", "external")?;
                                }
                                LinkKind::Internal => {
                                    el.set_attribute("data-link-kind", "internal")?;
                                }
                                LinkKind::Anchor => {
                                    el.set_attribute("data-link-kind", "anchor")?;
                                }
                                LinkKind::Other => {
                                    el.set_attribute("data-link-kind", "other")?;
                                }
                            }
                        }
                        Ok(())
                    }
                }),
                element!("pre", {
                    let state = Rc::clone(&state);
                    move |el| {
                        {
                            let mut state = state.borrow_mut();
                            state.code_blocks = state.code_blocks.saturating_add(1);
                        }

                        if let Some(lang) = el.get_attribute("data-language") {
                            let trimmed = lang.trim();
                            if !trimmed.is_empty() && el.get_attribute("aria-label").is_none() {
                                let label = format!("Code block in {trimmed}");
                                el.set_attribute("aria-label", &label)?;
                            }
                        }
                        Ok(())
                    }
                }),
                element!("figure", {
                    let state = Rc::clone(&state);
                    move |el| {
                        if el.get_attribute("data-role").as_deref() == Some("diagram-mermaid") {
                            let mut state = state.borrow_mut();
                            state.mermaid_diagrams = state.mermaid_diagrams.saturating_add(1);
                        }
                        Ok(())
                    }
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| RenderError::Document {
        message: err.to_string(),
    })?;

    let state = Rc::try_unwrap(state)
        .map(|cell| cell.into_inner())
        .unwrap_or_else(|rc| rc.borrow().clone());

    Ok(ProcessedHtml {
        html: rewritten,
        contains_code: state.code_blocks > 0,
        contains_mermaid: state.mermaid_diagrams > 0,
    })
}

#[derive(Debug, Clone)]
enum LinkKind {
    Internal,
    External,
    Anchor,
    Other,
}

fn classify_link(href: &str, site_host: Option<&str>) -> LinkKind {
    if href.starts_with('#') || href.is_empty() {
        return LinkKind::Anchor;
    }

    if is_http_url(href) {
        // Absolute links back to the site origin stay internal.
        if let (Some(site), Some(target)) = (site_host, host_of(href))
            && site == target
        {
            return LinkKind::Internal;
        }
        return LinkKind::External;
    }

    if is_internal_path(href) {
        return LinkKind::Internal;
    }

    LinkKind::Other
}

fn is_internal_path(href: &str) -> bool {
    href.starts_with('/')
        || href.starts_with("./")
        || href.starts_with("../")
        || (!href.contains(':') && !href.starts_with("//"))
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
}

fn merge_rel(existing: Option<String>, required: &[&str]) -> String {
    let mut tokens: BTreeSet<String> = existing
        .unwrap_or_default()
        .split_whitespace()
        .filter(|token| !token.is_empty())
        .map(|token| token.to_string())
        .collect();
    for &token in required {
        tokens.insert(token.to_string());
    }
    tokens.into_iter().collect::<Vec<_>>().join(" ")
}
