//! HTML parser for extracting links, titles and visible text
//!
//! This module handles parsing HTML content to extract:
//! - Root-relative links to follow
//! - Page title
//! - The text a reader would see, which feeds both indexing and snippets

use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Elements whose whole subtree is left out of the visible text
const HIDDEN_ELEMENTS: &[&str] = &[
    "script",
    "style",
    "code",
    "pre",
    "noscript",
    "iframe",
    "object",
    "embed",
    "link",
    "meta",
    "nav",
    "footer",
    "aside",
    "form",
    "input",
    "button",
    "select",
    "textarea",
    "label",
    "canvas",
    "svg",
    "figure",
    "figcaption",
    "picture",
    "source",
    "template",
];

/// Title and visible text of a page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageText {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Visible body text with whitespace collapsed
    pub text: String,
}

/// Extracted information from a fetched HTML page
#[derive(Debug, Clone)]
pub struct ParsedPage {
    pub title: Option<String>,
    pub text: String,

    /// Root-relative links found on the page, resolved to absolute URLs
    pub links: Vec<String>,
}

/// Parses HTML content and extracts links, title and visible text
///
/// # Link Extraction Rules
///
/// Only `<a>` elements whose `href` starts with `/` are followed. They are
/// resolved against `base_url`; site and file-type filtering happens later
/// in the crawl task.
///
/// # Example
///
/// ```
/// use lexicrawl::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links, vec!["https://example.com/page".to_string()]);
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        text: extract_visible_text(&document),
        links: extract_links(&document, base_url),
    }
}

/// Extracts the title and visible text of stored page content
pub fn extract_page_text(html: &str) -> PageText {
    let document = Html::parse_document(html);

    PageText {
        title: extract_title(&document),
        text: extract_visible_text(&document),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Extracts root-relative links from the HTML document
fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse(r#"a[href^="/"]"#) {
        for element in document.select(&a_selector) {
            if let Some(href) = element.value().attr("href") {
                if let Ok(absolute_url) = base_url.join(href.trim()) {
                    links.push(absolute_url.to_string());
                }
            }
        }
    }

    links
}

/// Collects the visible text of `<body>`, or of the whole document if it has none
fn extract_visible_text(document: &Html) -> String {
    let root = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .unwrap_or_else(|| document.root_element());

    let mut raw = String::new();
    collect_text(root, &mut raw);
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_element) = ElementRef::wrap(child) {
            if is_hidden(child_element) {
                continue;
            }
            collect_text(child_element, out);
            out.push(' ');
        }
    }
}

fn is_hidden(element: ElementRef<'_>) -> bool {
    let value = element.value();
    if HIDDEN_ELEMENTS.contains(&value.name()) {
        return true;
    }

    value.attr("style").map_or(false, |style| {
        let compact: String = style
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        compact.contains("display:none")
    })
}
