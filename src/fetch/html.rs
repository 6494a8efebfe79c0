//! HTML to Markdown conversion and link discovery for a fetched document.
//!
//! The document body is re-serialized without non-content elements
//! (scripts, styles, embedded frames, ...) and handed to `html2md`.

use scraper::{ElementRef, Html, Node, Selector};

/// Elements whose whole subtree is dropped before conversion.
const DROPPED_ELEMENTS: &[&str] = &[
    "head", "script", "style", "noscript", "template", "svg", "iframe", "object",
];

/// Elements serialized without a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Attributes html2md reads. Everything else is noise for conversion.
const KEPT_ATTRIBUTES: &[&str] = &["href", "src", "alt", "title"];

/// Result of parsing one HTML document.
#[derive(Debug, Clone, Default)]
pub struct ParsedHtml {
    pub title: Option<String>,
    pub markdown: String,
    /// Raw `href` values of every `<a href>`, in document order.
    pub links: Vec<String>,
    /// Raw `src` values of every `<iframe src>`, in document order.
    pub iframes: Vec<String>,
    /// Raw `href` of the first `<base href>`, if any.
    pub base_href: Option<String>,
}

pub fn parse_html(html: &str) -> ParsedHtml {
    let doc = Html::parse_document(html);
    ParsedHtml {
        title: page_title(&doc),
        markdown: to_markdown(&doc),
        links: attr_values(&doc, "a[href]", "href"),
        iframes: attr_values(&doc, "iframe[src]", "src"),
        base_href: attr_values(&doc, "base[href]", "href").into_iter().next(),
    }
}

fn to_markdown(doc: &Html) -> String {
    let cleaned = clean_body(doc);
    tidy_markdown(&html2md::parse_html(&cleaned))
}

fn page_title(doc: &Html) -> Option<String> {
    let sel = Selector::parse("title").ok()?;
    doc.select(&sel)
        .next()
        .map(|e| e.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn attr_values(doc: &Html, selector: &str, attr: &str) -> Vec<String> {
    let Ok(sel) = Selector::parse(selector) else {
        return Vec::new();
    };
    doc.select(&sel)
        .filter_map(|e| e.value().attr(attr))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

/// Serialize `<body>` (or the whole document if there is none) minus dropped elements.
fn clean_body(doc: &Html) -> String {
    let root = doc.root_element();
    let body = root
        .children()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "body")
        .unwrap_or(root);
    let mut out = String::new();
    render_children(body, &mut out);
    out
}

fn render_children(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => push_escaped(out, text),
            Node::Element(_) => {
                if let Some(el) = ElementRef::wrap(child) {
                    render_element(el, out);
                }
            }
            _ => {}
        }
    }
}

fn render_element(el: ElementRef<'_>, out: &mut String) {
    let name = el.value().name();
    if DROPPED_ELEMENTS.contains(&name) {
        return;
    }
    out.push('<');
    out.push_str(name);
    for (key, value) in el.value().attrs() {
        if KEPT_ATTRIBUTES.contains(&key) {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            push_escaped(out, value);
            out.push('"');
        }
    }
    out.push('>');
    if VOID_ELEMENTS.contains(&name) {
        return;
    }
    render_children(el, out);
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn push_escaped(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

/// Collapse runs of blank lines to one and trim the ends.
///
/// Lines inside fenced code blocks are copied untouched, and trailing
/// spaces on text lines are kept since they encode hard line breaks.
fn tidy_markdown(md: &str) -> String {
    let mut out = String::with_capacity(md.len());
    let mut in_fence = false;
    let mut blank_run = 0;
    for line in md.lines() {
        let marker = line.trim_start();
        if marker.starts_with("```") || marker.starts_with("~~~") {
            in_fence = !in_fence;
            blank_run = 0;
        } else if !in_fence && line.trim().is_empty() {
            blank_run += 1;
            if blank_run == 1 {
                out.push('\n');
            }
            continue;
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim_start_matches('\n').trim_end().to_string()
}
