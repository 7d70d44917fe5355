use std::collections::HashSet;

use ammonia::Builder as AmmoniaBuilder;
use comrak::options::{ListStyleType, Options};

pub(crate) fn default_options() -> Options<'static> {
    let mut options = Options::default();
    configure_extensions(&mut options);
    options
}

pub(crate) fn build_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    let tags: HashSet<&'static str> = HashSet::from([
        "a",
        "abbr",
        "blockquote",
        "br",
        "button",
        "code",
        "div",
        "em",
        "figcaption",
        "figure",
        "h1",
        "h2",
        "h3",
        "h4",
        "h5",
        "h6",
        "hr",
        "i",
        "img",
        "input",
        "ins",
        "kbd",
        "li",
        "ol",
        "p",
        "pre",
        "s",
        "section",
        "span",
        "strong",
        "sub",
        "sup",
        "u",
        "table",
        "tbody",
        "td",
        "th",
        "thead",
        "tr",
        "ul",
        "dl",
        "dt",
        "dd",
        "del",
        "mark",
        // SVG subset required for inlined Mermaid diagrams.
        "svg",
        "g",
        "path",
        "rect",
        "circle",
        "ellipse",
        "polygon",
        "polyline",
        "line",
        "marker",
        "defs",
        "linearGradient",
        "lineargradient",
        "stop",
        "title",
        "desc",
        "text",
        "tspan",
        "use",
        "clipPath",
        "clippath",
    ]);
    builder.tags(tags);

    let generic: HashSet<&'static str> = HashSet::from([
        "class",
        "id",
        "title",
        "lang",
        "dir",
        "aria-hidden",
        "aria-label",
        "role",
        "data-role",
        "data-footnote-ref",
        "data-footnotes",
        "data-footnote-backref",
        "data-footnote-backref-idx",
    ]);
    builder.generic_attributes(generic);

    builder.add_tag_attributes("a", &["target"]);
    builder.add_tag_attributes(
        "img",
        &["title", "width", "height", "alt", "loading", "decoding"],
    );
    builder.add_tag_attributes("button", &["type", "data-copy-state"]);
    builder.add_tag_attributes("code", &["data-meta", "data-language", "class"]);
    builder.add_tag_attributes("pre", &["class", "data-language"]);
    builder.add_tag_attributes("div", &["class", "data-footnotes"]);
    builder.add_tag_attributes("span", &["class"]);
    builder.add_tag_attributes("th", &["align", "colspan", "rowspan", "scope"]);
    builder.add_tag_attributes("td", &["align", "colspan", "rowspan"]);
    builder.add_tag_attributes("input", &["type", "checked", "disabled", "class"]);
    builder.add_tag_attributes(
        "svg",
        &[
            "viewBox",
            "xmlns",
            "xmlns:xlink",
            "width",
            "height",
            "preserveAspectRatio",
            "version",
        ],
    );
    builder.add_tag_attributes("g", &["transform", "class", "id", "data-name"]);
    builder.add_tag_attributes(
        "path",
        &[
            "d",
            "fill",
            "stroke",
            "stroke-width",
            "stroke-linecap",
            "stroke-linejoin",
            "marker-end",
            "marker-start",
            "opacity",
            "class",
        ],
    );
    builder.add_tag_attributes(
        "rect",
        &[
            "x",
            "y",
            "width",
            "height",
            "rx",
            "ry",
            "fill",
            "stroke",
            "stroke-width",
            "class",
            "opacity",
        ],
    );
    builder.add_tag_attributes(
        "circle",
        &[
            "cx",
            "cy",
            "r",
            "fill",
            "stroke",
            "stroke-width",
            "class",
            "opacity",
        ],
    );
    builder.add_tag_attributes(
        "ellipse",
        &[
            "cx",
            "cy",
            "rx",
            "ry",
            "fill",
            "stroke",
            "stroke-width",
            "class",
            "opacity",
        ],
    );
    builder.add_tag_attributes(
        "polygon",
        &[
            "points",
            "fill",
            "stroke",
            "stroke-width",
            "class",
            "opacity",
        ],
    );
    builder.add_tag_attributes(
        "polyline",
        &[
            "points",
            "fill",
            "stroke",
            "stroke-width",
            "class",
            "opacity",
        ],
    );
    builder.add_tag_attributes(
        "line",
        &[
            "x1",
            "x2",
            "y1",
            "y2",
            "stroke",
            "stroke-width",
            "class",
            "opacity",
        ],
    );
    builder.add_tag_attributes(
        "marker",
        &[
            "id",
            "refX",
            "refY",
            "orient",
            "markerWidth",
            "markerHeight",
            "viewBox",
        ],
    );
    builder.add_tag_attributes(
        "text",
        &[
            "x",
            "y",
            "fill",
            "stroke",
            "stroke-width",
            "text-anchor",
            "dominant-baseline",
            "class",
            "font-size",
        ],
    );
    builder.add_tag_attributes(
        "tspan",
        &["x", "y", "dx", "dy", "font-size", "fill", "class"],
    );
    builder.add_tag_attributes(
        "linearGradient",
        &["id", "gradientUnits", "x1", "x2", "y1", "y2"],
    );
    builder.add_tag_attributes(
        "lineargradient",
        &["id", "gradientUnits", "x1", "x2", "y1", "y2"],
    );
    builder.add_tag_attributes("stop", &["offset", "stop-color", "stop-opacity"]);
    builder.add_tag_attributes("use", &["href", "xlink:href", "x", "y", "width", "height"]);
    builder.add_tag_attributes("clipPath", &["id"]);
    builder.add_tag_attributes("clippath", &["id"]);

    builder.add_url_schemes(["http", "https", "mailto", "tel"].iter().copied());

    builder
}

fn configure_extensions(options: &mut Options<'static>) {
    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.tagfilter = false;
    ext.table = true;
    ext.autolink = true;
    ext.tasklist = true;
    ext.footnotes = true;
    ext.description_lists = true;
    ext.multiline_block_quotes = true;
    ext.alerts = true;
    ext.underline = true;
    ext.subscript = true;
    ext.superscript = true;
    ext.cjk_friendly_emphasis = true;

    let render = &mut options.render;
    render.github_pre_lang = true;
    render.full_info_string = true;
    render.tasklist_classes = true;
    render.list_style = ListStyleType::Dash;
    render.r#unsafe = true;
    render.figure_with_caption = true;
    render.sourcepos = false;
    render.escaped_char_spans = true;
    render.gfm_quirks = true;
}

#[cfg(test)]
mod tests {
    use super::build_sanitizer;

    #[test]
    fn sanitizer_keeps_copy_button_markup() {
        let sanitizer = build_sanitizer();
        let html = sanitizer
            .clean(
                "<div data-role=\"code-block\"><button type=\"button\" \
                 data-role=\"code-copy-button\" aria-label=\"Copy code\">Copy</button>\
                 <pre><code>x</code></pre></div>",
            )
            .to_string();

        assert!(html.contains("data-role=\"code-copy-button\""));
        assert!(html.contains("aria-label=\"Copy code\""));
    }

    #[test]
    fn sanitizer_strips_script_tags() {
        let sanitizer = build_sanitizer();
        let html = sanitizer
            .clean("<p>ok</p><script>alert(1)</script>")
            .to_string();

        assert!(html.contains("<p>ok</p>"));
        assert!(!html.contains("script"));
    }

    #[test]
    fn sanitizer_preserves_strikethrough() {
        let sanitizer = build_sanitizer();
        let html = sanitizer
            .clean("<p><del>Removed</del> text</p>")
            .to_string();

        assert!(html.contains("<del>Removed</del>"));
    }
}
