// src/crawl/extract.rs
// =============================================================================
// This module pulls links out of HTML pages.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Is built on html5ever (Mozilla's HTML parser), so broken markup still
//   produces a tree
//
// Bodies are decoded leniently, so a page in a legacy encoding still gives
// up its links. Only binary bodies are refused.
//
// Only absolute http:// and https:// hrefs are kept. Relative links
// ("/about"), fragments and other schemes (mailto:, javascript:) are
// skipped on purpose - we never resolve or rewrite URLs.
//
// Rust concepts:
// - Iterators: links() is lazy and can be restarted by calling it again
// - Lifetimes: the iterator borrows from the parsed document
// =============================================================================

use scraper::{ElementRef, Html};

use super::error::PageError;

// Yields every absolute http(s) href in document order
//
// The walk is a pre-order traversal of the element tree, which is the order
// the anchors appear in the source.
pub fn links(document: &Html) -> impl Iterator<Item = String> + '_ {
    document
        .tree
        .root()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|element| element.value().name() == "a")
        .filter_map(|element| element.value().attr("href"))
        .map(str::trim)
        .filter(|href| is_absolute_http(href))
        .map(str::to_string)
}

// How much of the body we scan when deciding whether it is binary
const BINARY_SNIFF_LEN: usize = 8000;

// Parses a fetched body and collects its links
//
// Html is not Send, so the document is built and dropped inside this
// function and never held across an .await.
pub fn page_links(url: &str, body: &[u8]) -> Result<Vec<String>, PageError> {
    // Images, archives and PDFs are not pages; a NUL byte near the start
    // gives them away (HTML never contains one)
    if looks_binary(body) {
        return Err(PageError::Parse {
            url: url.to_string(),
            message: "body is binary, not HTML".to_string(),
        });
    }

    // Pages in Latin-1 or windows-1252 are still pages: bad bytes become
    // U+FFFD and the ASCII hrefs survive untouched
    let text = String::from_utf8_lossy(body);

    let document = Html::parse_document(&text);
    Ok(links(&document).collect())
}

fn looks_binary(body: &[u8]) -> bool {
    let head = &body[..body.len().min(BINARY_SNIFF_LEN)];
    head.contains(&0)
}

fn is_absolute_http(href: &str) -> bool {
    href.starts_with("http://") || href.starts_with("https://")
}
