//! Small lookups over a page that do not need a full section split: content
//! between two identified headings, visible text lines of a fragment, and
//! ordered lists located by style or by a preceding heading.

use super::node::{DomNode, Node};
use super::text::{inline_text, stripped_strings};
use super::{parse_selector, Document};
use crate::config::validate_heading_tag;
use crate::error::ParseError;

/// How to recognise the heading an ordered list follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadingMatch {
    Id(String),
    TextContains(String),
}

/// Outer HTML of the siblings after the heading with `id=start_id`.
///
/// Stops at the heading with `id=end_id`, or at the next heading of the same
/// tag when `end_id` is `None`. A missing start heading yields an empty string.
pub fn extract_between_headings(
    html: &str,
    heading_tag: &str,
    start_id: &str,
    end_id: Option<&str>,
) -> Result<String, ParseError> {
    let tag = validate_heading_tag(heading_tag)?;
    let doc = Document::parse(html)?;
    let selector = parse_selector(&tag)?;

    let Some(start) = doc.select(&selector).find(|h| h.attr("id") == Some(start_id)) else {
        return Ok(String::new());
    };

    let mut out = String::new();
    let mut sibling = start.next_element_sibling();
    while let Some(node) = sibling {
        if node.tag() == Some(tag.as_str()) {
            match end_id {
                None => break,
                Some(end) if node.attr("id") == Some(end) => break,
                Some(_) => {}
            }
        }
        out.push_str(&node.outer_html());
        sibling = node.next_element_sibling();
    }
    Ok(out)
}

/// Trimmed, non-empty visible text strings of an HTML fragment, in order.
pub fn text_lines(html: &str) -> Vec<String> {
    let doc = Document::parse_fragment(html);
    stripped_strings(doc.root())
}

/// Item texts of the first `<ol>` whose `style` contains `style_substring`.
pub fn ordered_list_by_style(html: &str, style_substring: &str) -> Result<Vec<String>, ParseError> {
    let doc = Document::parse(html)?;
    let ol = parse_selector("ol")?;
    let found = doc
        .select(&ol)
        .find(|n| n.attr("style").is_some_and(|s| s.contains(style_substring)));
    Ok(found.map(list_items).unwrap_or_default())
}

/// Item texts of the first `<ol>` after the matching heading, either as a
/// later sibling or nested inside one.
pub fn ordered_list_after_heading(
    html: &str,
    heading_tag: &str,
    which: &HeadingMatch,
) -> Result<Vec<String>, ParseError> {
    let tag = validate_heading_tag(heading_tag)?;
    let doc = Document::parse(html)?;
    let selector = parse_selector(&tag)?;

    let heading = doc.select(&selector).find(|h| match which {
        HeadingMatch::Id(id) => h.attr("id") == Some(id.as_str()),
        HeadingMatch::TextContains(needle) => {
            let text = inline_text(*h);
            !text.is_empty() && text.contains(needle.as_str())
        }
    });
    let Some(heading) = heading else {
        return Ok(Vec::new());
    };

    let mut sibling = heading.next_element_sibling();
    while let Some(node) = sibling {
        if let Some(ol) = node.descendants().find(|n| n.tag() == Some("ol")) {
            return Ok(list_items(ol));
        }
        sibling = node.next_element_sibling();
    }
    Ok(Vec::new())
}

fn list_items(ol: DomNode<'_>) -> Vec<String> {
    ol.descendants()
        .filter(|n| n.tag() == Some("li"))
        .map(inline_text)
        .collect()
}

// ── Tests ──
