use scraper::Selector;
use serde::Serialize;
use tracing::{debug, warn};

use super::node::{DomNode, Node};
use super::text::{inline_text, render_lines};
use super::{parse_selector, Document};
use crate::config::{BodyFormat, ExtractConfig};
use crate::error::ParseError;

/// Attributes that name the panel a toggle controls, by id.
const REFERENCE_ATTRS: &[&str] = &["aria-controls", "data-target", "data-bs-target"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccordionEntry {
    pub title: String,
    pub body: String,
}

/// One entry per header matched by `accordion_selector`, in document order.
///
/// A header whose panel cannot be located is kept with an empty body.
pub fn extract(doc: &Document, cfg: &ExtractConfig) -> Result<Vec<AccordionEntry>, ParseError> {
    let header_sel = parse_selector(&cfg.accordion_selector)?;
    let body_sel = cfg
        .accordion_body_selector
        .as_deref()
        .map(parse_selector)
        .transpose()?;

    let mut entries = Vec::new();
    for header in doc.select(&header_sel) {
        let title = inline_text(header);
        let body = match resolve_panel(doc, header, &header_sel, body_sel.as_ref()) {
            Some(panel) => render_panel(panel, cfg.body_format),
            None => {
                warn!("Accordion header {:?} has no resolvable body", title);
                String::new()
            }
        };
        entries.push(AccordionEntry { title, body });
    }

    debug!(count = entries.len(), "extracted accordion entries");
    Ok(entries)
}

fn resolve_panel<'a>(
    doc: &'a Document,
    header: DomNode<'a>,
    header_sel: &Selector,
    body_sel: Option<&Selector>,
) -> Option<DomNode<'a>> {
    referenced_panel(doc, header)
        .or_else(|| following_panel(header, header_sel, body_sel))
        .or_else(|| body_sel.and_then(|sel| enclosed_panel(header, header_sel, sel)))
}

/// Panel named by an id reference on the header or on a toggle inside it.
fn referenced_panel<'a>(doc: &'a Document, header: DomNode<'a>) -> Option<DomNode<'a>> {
    header
        .descendants()
        .filter_map(panel_id)
        .find_map(|id| doc.find_by_id(id))
        .filter(|panel| !panel.contains(header))
}

fn panel_id(node: DomNode<'_>) -> Option<&str> {
    let from_attrs = REFERENCE_ATTRS
        .iter()
        .filter_map(|a| node.attr(a))
        .filter_map(|v| v.split_whitespace().next())
        .map(|v| v.trim_start_matches('#'))
        .find(|id| !id.is_empty());
    from_attrs.or_else(|| {
        node.attr("href")
            .and_then(|h| h.strip_prefix('#'))
            .filter(|id| !id.is_empty())
    })
}

/// First later sibling that looks like a panel, stopping at the next header.
fn following_panel<'a>(
    header: DomNode<'a>,
    header_sel: &Selector,
    body_sel: Option<&Selector>,
) -> Option<DomNode<'a>> {
    let mut sibling = header.next_element_sibling();
    while let Some(node) = sibling {
        if node.matches(header_sel) {
            return None;
        }
        match body_sel {
            None => return Some(node),
            Some(sel) if node.matches(sel) => return Some(node),
            Some(_) => {}
        }
        sibling = node.next_element_sibling();
    }
    None
}

/// Panel inside the smallest ancestor that wraps this header and no other.
fn enclosed_panel<'a>(
    header: DomNode<'a>,
    header_sel: &Selector,
    body_sel: &Selector,
) -> Option<DomNode<'a>> {
    let mut container = header.parent();
    while let Some(node) = container {
        if node.descendants().filter(|n| n.matches(header_sel)).count() > 1 {
            return None;
        }
        let panel = node
            .descendants()
            .find(|n| n.matches(body_sel) && !n.contains(header) && !header.contains(*n));
        if panel.is_some() {
            return panel;
        }
        container = node.parent();
    }
    None
}

fn render_panel(panel: DomNode<'_>, format: BodyFormat) -> String {
    match format {
        BodyFormat::Text => render_lines(panel).join("\n"),
        BodyFormat::Html => panel.inner_html().trim().to_string(),
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::extract_accordion_items;

    fn items(html: &str, cfg: &ExtractConfig) -> Vec<(String, String)> {
        extract_accordion_items(html, cfg)
            .unwrap()
            .into_iter()
            .map(|e| (e.title, e.body))
            .collect()
    }

    fn pair(t: &str, b: &str) -> (String, String) {
        (t.to_string(), b.to_string())
    }

    const ABET_LIST: &str = r#"
        <ul class="block-accordion">
          <li class="block-accordion-item">
            <h4 class="accordion-header">Mission</h4>
            <div class="accordion-content"><p>Serve students</p></div>
          </li>
          <li class="block-accordion-item">
            <h4 class="accordion-header">Vision</h4>
            <div class="accordion-content"><p>Lead</p><p>globally</p></div>
          </li>
        </ul>"#;

    #[test]
    fn mission_entry() {
        let got = items(ABET_LIST, &ExtractConfig::default());
        assert!(got.contains(&pair("Mission", "Serve students")));
        assert_eq!(got[1], pair("Vision", "Lead\nglobally"));
    }

    #[test]
    fn html_bodies() {
        let cfg = ExtractConfig {
            body_format: BodyFormat::Html,
            ..Default::default()
        };
        let got = items(ABET_LIST, &cfg);
        assert_eq!(got[0], pair("Mission", "<p>Serve students</p>"));
    }

    #[test]
    fn aria_controls_reference() {
        let html = r#"
            <div class="accordion">
              <h3 class="acc"><button aria-controls="p1">Mission</button></h3>
              <h3 class="acc"><button aria-controls="p2">Goals</button></h3>
            </div>
            <div id="p2" hidden>Graduate</div>
            <div id="p1" hidden>Serve students</div>"#;
        let cfg = ExtractConfig {
            accordion_selector: "h3.acc".into(),
            accordion_body_selector: None,
            ..Default::default()
        };
        assert_eq!(
            items(html, &cfg),
            vec![pair("Mission", "Serve students"), pair("Goals", "Graduate")]
        );
    }

    #[test]
    fn href_reference() {
        let html = r##"<a class="toggle" href="#faq-1">Why ABET?</a><section id="faq-1">Quality</section>"##;
        let cfg = ExtractConfig {
            accordion_selector: "a.toggle".into(),
            accordion_body_selector: Some("div.nothing".into()),
            ..Default::default()
        };
        assert_eq!(items(html, &cfg), vec![pair("Why ABET?", "Quality")]);
    }

    #[test]
    fn next_sibling_without_body_selector() {
        let html = "<dl><dt class=\"q\">Mission</dt><dd>Serve students</dd><dt class=\"q\">Vision</dt><dd>Lead</dd></dl>";
        let cfg = ExtractConfig {
            accordion_selector: "dt.q".into(),
            accordion_body_selector: None,
            ..Default::default()
        };
        assert_eq!(
            items(html, &cfg),
            vec![pair("Mission", "Serve students"), pair("Vision", "Lead")]
        );
    }

    #[test]
    fn panel_nested_in_container() {
        let html = r#"
            <li class="block-accordion-item">
              <div class="head-wrap"><h4 class="accordion-header">Mission</h4></div>
              <div class="accordion-content">Serve students</div>
            </li>"#;
        assert_eq!(
            items(html, &ExtractConfig::default()),
            vec![pair("Mission", "Serve students")]
        );
    }

    #[test]
    fn missing_body_is_empty_not_fatal() {
        let html = r#"
            <h4 class="accordion-header">Orphan</h4>
            <h4 class="accordion-header">Mission</h4>
            <div class="accordion-content">Serve students</div>"#;
        let got = items(html, &ExtractConfig::default());
        assert_eq!(got, vec![pair("Orphan", ""), pair("Mission", "Serve students")]);
    }

    #[test]
    fn no_headers_no_entries() {
        assert!(items("<p>plain page</p>", &ExtractConfig::default()).is_empty());
    }

    #[test]
    fn bad_selector_is_parse_error() {
        let cfg = ExtractConfig {
            accordion_selector: "h4..x".into(),
            ..Default::default()
        };
        let err = extract_accordion_items("<p>x</p>", &cfg).unwrap_err();
        assert!(matches!(err, ParseError::InvalidSelector { .. }));
    }

    #[test]
    fn repeated_calls_agree() {
        let cfg = ExtractConfig::default();
        let doc = Document::parse(ABET_LIST).unwrap();
        assert_eq!(doc.accordion_items(&cfg).unwrap(), doc.accordion_items(&cfg).unwrap());
    }

    #[test]
    fn engineering_criteria_fixture() {
        let html = std::fs::read_to_string("tests/fixtures/engineering_criteria.html").unwrap();
        let entries = extract_accordion_items(&html, &ExtractConfig::default()).unwrap();
        let titles: Vec<&str> = entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Aerospace and Similarly Named Engineering Programs",
                "Computer and Similarly Named Engineering Programs",
                "Systems and Similarly Named Engineering Programs",
            ]
        );
        let systems = &entries[2];
        assert!(systems.body.starts_with("Lead Society:"));
        assert!(systems.body.contains("Curriculum"));
    }
}
