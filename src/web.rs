//! Web page loader: fetch a URL and strip it down to readable text.

use reqwest::Url;
use scraper::{Html, Node, Selector};

use crate::error::SummarizeError;
use crate::models::{Extraction, Origin, TextSegment};

/// Elements whose text is never part of the readable page.
const SKIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "template", "svg", "head", "iframe",
];

/// Fetches `url` and returns one segment per visible text block.
///
/// # Errors
///
/// [`SummarizeError::Fetch`] on network errors and non-2xx responses. A page
/// with no visible text yields an empty [`Extraction`], not an error.
#[tracing::instrument(skip_all, fields(url = %url))]
pub async fn fetch_page_text(http: &reqwest::Client, url: &Url) -> Result<Extraction, SummarizeError> {
    let response = http
        .get(url.clone())
        .header("Accept-Language", "en-US,en;q=0.9")
        .send()
        .await
        .map_err(|e| SummarizeError::Fetch(format!("{}: {}", url, e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SummarizeError::Fetch(format!("{} returned {}", url, status)));
    }

    let html = response
        .text()
        .await
        .map_err(|e| SummarizeError::Fetch(format!("{}: {}", url, e)))?;

    let segments = html_to_segments(&html);
    tracing::debug!(blocks = segments.len(), "page text extracted");

    Ok(Extraction {
        segments,
        origin: Origin::Web,
    })
}

/// Elements that start a new text block. Text under anything else (links,
/// emphasis, spans) flows into the nearest enclosing block.
const BLOCK_ELEMENTS: &[&str] = &[
    "html", "body", "main", "article", "section", "header", "footer", "nav", "aside",
    "div", "p", "blockquote", "pre", "address", "figure", "figcaption", "form",
    "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "li", "dl", "dt", "dd",
    "table", "caption", "thead", "tbody", "tfoot", "tr", "td", "th",
];

/// Visible text blocks of an HTML document, whitespace-normalized, in
/// document order. Plain-text bodies come back as a single block.
///
/// Consecutive text nodes that share the same nearest block-level ancestor
/// are joined, so inline markup does not break a sentence apart.
pub fn html_to_segments(html: &str) -> Vec<TextSegment> {
    let document = Html::parse_document(html);
    let root = Selector::parse("body")
        .ok()
        .and_then(|body| document.select(&body).next())
        .unwrap_or_else(|| document.root_element());

    let mut segments = Vec::new();
    let mut current = String::new();
    let mut current_block = None;

    for node in root.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };

        let mut hidden = false;
        let mut block = None;
        for ancestor in node.ancestors() {
            let Some(el) = ancestor.value().as_element() else {
                continue;
            };
            if SKIPPED_ELEMENTS.contains(&el.name()) {
                hidden = true;
                break;
            }
            if block.is_none() && BLOCK_ELEMENTS.contains(&el.name()) {
                block = Some(ancestor.id());
            }
        }
        if hidden {
            continue;
        }

        if block != current_block {
            flush_block(&mut current, &mut segments);
            current_block = block;
        }
        current.push_str(text);
    }
    flush_block(&mut current, &mut segments);

    segments
}

fn flush_block(current: &mut String, segments: &mut Vec<TextSegment>) {
    let normalized = normalize_whitespace(current);
    if !normalized.is_empty() {
        segments.push(TextSegment::new(normalized, Origin::Web));
    }
    current.clear();
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
