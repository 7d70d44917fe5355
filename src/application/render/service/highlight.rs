use syntect::{
    html::{ClassStyle, ClassedHTMLGenerator},
    parsing::{SyntaxReference, SyntaxSet},
    util::LinesWithEndings,
};

use crate::application::render::types::RenderError;

use super::rewrite::escape_attribute;

/// Highlight a fenced code block and wrap it with the copy control the page
/// script binds to. The control copies the literal source text, so the raw
/// code is carried on the wrapper as a data attribute-free `<pre>` body.
pub(crate) fn highlight_code(
    language: Option<&str>,
    meta: Option<&str>,
    code: &str,
    syntax_set: &SyntaxSet,
    class_style: &ClassStyle,
) -> Result<String, RenderError> {
    let lang_token = language.unwrap_or("text");
    let syntax =
        find_syntax(syntax_set, lang_token).unwrap_or_else(|| syntax_set.find_syntax_plain_text());

    let mut code_with_newline = code.to_string();
    if !code_with_newline.ends_with('\n') {
        code_with_newline.push('\n');
    }

    let mut generator =
        ClassedHTMLGenerator::new_with_class_style(syntax, syntax_set, *class_style);

    for line in LinesWithEndings::from(code_with_newline.as_str()) {
        generator
            .parse_html_for_line_which_includes_newline(line)
            .map_err(|err| RenderError::Highlighting {
                language: lang_token.to_string(),
                message: err.to_string(),
            })?;
    }

    let highlighted = generator.finalize();
    let lang_lower = lang_token.to_ascii_lowercase();
    // Fence info strings are author-controlled text; escape before they land
    // in attribute position.
    let lang_attr = escape_attribute(lang_token);
    let pre_class = escape_attribute(&format!("syntax-highlight syntax-lang-{lang_lower}"));
    let code_class = escape_attribute(&format!("language-{lang_lower} syntax-code"));

    let meta_attr = meta
        .filter(|m| !m.is_empty())
        .map(|m| format!(" data-meta=\"{}\"", ammonia::clean_text(m)))
        .unwrap_or_default();

    Ok(format!(
        "<div class=\"code-block\" data-role=\"code-block\">\
         <button type=\"button\" data-role=\"code-copy-button\" aria-label=\"Copy code\">Copy</button>\
         <pre class=\"{pre_class}\" data-language=\"{lang_attr}\">\
         <code class=\"{code_class}\"{meta_attr}>{highlighted}</code></pre></div>"
    ))
}

fn find_syntax<'a>(syntax_set: &'a SyntaxSet, token: &str) -> Option<&'a SyntaxReference> {
    let lowercase = token.to_ascii_lowercase();
    syntax_set
        .find_syntax_by_token(&lowercase)
        .or_else(|| syntax_set.find_syntax_by_name(&lowercase))
        .or_else(|| syntax_set.find_syntax_by_extension(&lowercase))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn syntax_and_style() -> (SyntaxSet, ClassStyle) {
        (
            SyntaxSet::load_defaults_newlines(),
            ClassStyle::SpacedPrefixed { prefix: "syntax-" },
        )
    }

    #[test]
    fn emits_copy_control_around_highlighted_block() {
        let (syntax_set, class_style) = syntax_and_style();
        let html = highlight_code(
            Some("go"),
            None,
            "package main",
            &syntax_set,
            &class_style,
        )
        .expect("highlight");

        assert!(html.contains("data-role=\"code-copy-button\""));
        assert!(html.contains("data-language=\"go\""));
        assert!(html.contains("language-go"));
    }

    #[test]
    fn unknown_language_falls_back_to_plain_text() {
        let (syntax_set, class_style) = syntax_and_style();
        let html = highlight_code(
            Some("nosuchlang"),
            None,
            "plain body",
            &syntax_set,
            &class_style,
        )
        .expect("highlight");

        assert!(html.contains("plain body"));
        assert!(html.contains("syntax-lang-nosuchlang"));
    }

    #[test]
    fn language_token_is_escaped_in_attributes() {
        let (syntax_set, class_style) = syntax_and_style();
        let html = highlight_code(
            Some("go\"><script>alert(1)</script>"),
            None,
            "package main",
            &syntax_set,
            &class_style,
        )
        .expect("highlight");

        assert!(html.contains("data-language=\"go&quot;&gt;&lt;script&gt;"));
        assert!(!html.contains("data-language=\"go\"><script>"));
    }
}
