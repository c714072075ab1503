pub mod accordion;
pub mod fragments;
pub mod node;
pub mod sections;
pub mod text;

use std::sync::LazyLock;

use scraper::{Html, Selector};

use crate::config::ExtractConfig;
use crate::error::ParseError;
use accordion::AccordionEntry;
use node::DomNode;
use sections::Sections;

static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());

/// A parsed HTML page. Parse once, run any number of extractors over it.
pub struct Document {
    html: Html,
}

impl Document {
    /// Parse a full document. Fails only on empty input; broken markup is
    /// repaired by the HTML5 tree builder.
    pub fn parse(input: &str) -> Result<Document, ParseError> {
        if input.trim().is_empty() {
            return Err(ParseError::EmptyInput);
        }
        Ok(Document {
            html: Html::parse_document(input),
        })
    }

    /// Parse a snippet such as an accordion panel's inner HTML.
    pub fn parse_fragment(input: &str) -> Document {
        Document {
            html: Html::parse_fragment(input),
        }
    }

    pub fn root(&self) -> DomNode<'_> {
        DomNode::from_element(self.html.root_element())
    }

    pub fn body(&self) -> Option<DomNode<'_>> {
        self.select(&BODY).next()
    }

    pub fn select<'a, 'b>(
        &'a self,
        selector: &'b Selector,
    ) -> impl Iterator<Item = DomNode<'a>> + use<'a, 'b> {
        self.html.select(selector).map(DomNode::from_element)
    }

    pub fn find_by_id(&self, id: &str) -> Option<DomNode<'_>> {
        self.root()
            .descendants()
            .find(|n| n.element().is_some_and(|e| e.value().id() == Some(id)))
    }

    pub fn sections(&self, cfg: &ExtractConfig) -> Result<Sections, ParseError> {
        sections::extract(self, cfg)
    }

    pub fn accordion_items(&self, cfg: &ExtractConfig) -> Result<Vec<AccordionEntry>, ParseError> {
        accordion::extract(self, cfg)
    }
}

/// Parse `html` and split it into heading-delimited sections.
pub fn extract_sections(html: &str, cfg: &ExtractConfig) -> Result<Sections, ParseError> {
    Document::parse(html)?.sections(cfg)
}

/// Parse `html` and collect accordion (title, body) entries in document order.
pub fn extract_accordion_items(
    html: &str,
    cfg: &ExtractConfig,
) -> Result<Vec<AccordionEntry>, ParseError> {
    Document::parse(html)?.accordion_items(cfg)
}

pub fn parse_selector(css: &str) -> Result<Selector, ParseError> {
    Selector::parse(css).map_err(|e| ParseError::InvalidSelector {
        selector: css.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(Document::parse("").err(), Some(ParseError::EmptyInput));
        assert_eq!(Document::parse(" \n\t").err(), Some(ParseError::EmptyInput));
        assert_eq!(
            extract_sections("", &ExtractConfig::default()).unwrap_err(),
            ParseError::EmptyInput
        );
        assert_eq!(
            extract_accordion_items("   ", &ExtractConfig::default()).unwrap_err(),
            ParseError::EmptyInput
        );
    }

    #[test]
    fn garbage_still_parses() {
        let doc = Document::parse("<<<>>> </div></div> <p").unwrap();
        assert!(doc.body().is_some());
    }

    #[test]
    fn body_of_full_and_fragment_input() {
        let doc = Document::parse("<p>no explicit body</p>").unwrap();
        let body = doc.body().unwrap();
        assert_eq!(node::Node::tag(&body), Some("body"));
        assert_eq!(node::Node::text(&body), "no explicit body");

        assert!(Document::parse_fragment("<p>x</p>").body().is_none());
    }

    #[test]
    fn lookup_by_id() {
        let doc = Document::parse("<div><section id=\"panel-2\">body</section></div>").unwrap();
        let found = doc.find_by_id("panel-2").unwrap();
        assert_eq!(node::Node::tag(&found), Some("section"));
        assert!(doc.find_by_id("panel-3").is_none());
    }

    #[test]
    fn invalid_selector() {
        let err = parse_selector("h4[").unwrap_err();
        assert!(matches!(err, ParseError::InvalidSelector { selector, .. } if selector == "h4["));
    }
}
