use ego_tree::NodeRef;
use scraper::{ElementRef, Node as HtmlNode, Selector};

use super::text;

/// Read-only view of one node in a parsed HTML tree.
///
/// Text nodes have no tag; their `text()` is their own content.
pub trait Node<'a>: Copy {
    fn tag(&self) -> Option<&'a str>;
    fn attr(&self, name: &str) -> Option<&'a str>;
    /// Visible text, one line per block-level element.
    fn text(&self) -> String;
    fn inner_html(&self) -> String;
    fn outer_html(&self) -> String;
    fn children(&self) -> Vec<Self>;
    fn next_sibling(&self) -> Option<Self>;
    fn parent(&self) -> Option<Self>;
}

/// [`Node`] over the `scraper` crate's tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DomNode<'a>(NodeRef<'a, HtmlNode>);

impl<'a> DomNode<'a> {
    pub fn from_element(element: ElementRef<'a>) -> Self {
        DomNode(*element)
    }

    pub fn element(&self) -> Option<ElementRef<'a>> {
        ElementRef::wrap(self.0)
    }

    pub fn as_text(&self) -> Option<&'a str> {
        self.0.value().as_text().map(|t| &**t)
    }

    pub fn is_element(&self) -> bool {
        self.0.value().is_element()
    }

    pub fn matches(&self, selector: &Selector) -> bool {
        self.element().is_some_and(|e| selector.matches(&e))
    }

    pub fn next_element_sibling(&self) -> Option<DomNode<'a>> {
        self.0
            .next_siblings()
            .map(DomNode)
            .find(|n| n.is_element())
    }

    /// This node followed by everything below it, in document order.
    pub fn descendants(&self) -> impl Iterator<Item = DomNode<'a>> + 'a {
        self.0.descendants().map(DomNode)
    }

    /// True when `other` is this node or sits anywhere below it.
    pub fn contains(&self, other: DomNode<'a>) -> bool {
        other == *self || other.0.ancestors().any(|a| a == self.0)
    }
}

impl<'a> Node<'a> for DomNode<'a> {
    fn tag(&self) -> Option<&'a str> {
        self.0.value().as_element().map(|e| e.name())
    }

    fn attr(&self, name: &str) -> Option<&'a str> {
        self.0.value().as_element().and_then(|e| e.attr(name))
    }

    fn text(&self) -> String {
        text::render_lines(*self).join("\n")
    }

    fn inner_html(&self) -> String {
        match self.element() {
            Some(e) => e.inner_html(),
            None => self.as_text().map(text::escape_html).unwrap_or_default(),
        }
    }

    fn outer_html(&self) -> String {
        match self.element() {
            Some(e) => e.html(),
            None => self.as_text().map(text::escape_html).unwrap_or_default(),
        }
    }

    fn children(&self) -> Vec<Self> {
        self.0.children().map(DomNode).collect()
    }

    fn next_sibling(&self) -> Option<Self> {
        self.0.next_sibling().map(DomNode)
    }

    fn parent(&self) -> Option<Self> {
        self.0.parent().map(DomNode)
    }
}
