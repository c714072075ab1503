use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::debug;

use super::node::{DomNode, Node};
use super::text::{inline_text, render_lines};
use super::{parse_selector, Document};
use crate::config::{
    BodyFormat, DuplicatePolicy, ExtractConfig, PreamblePolicy, RootPolicy, PREAMBLE_KEY,
};
use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Section {
    pub title: String,
    pub body: String,
}

/// Ordered title → body mapping, in heading order.
///
/// Serialises as a JSON object whose keys keep document order.
///
/// A kept preamble is always the first entry and never merges with a heading
/// that happens to be titled "preamble".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sections {
    entries: Vec<Section>,
    has_preamble: bool,
}

impl Sections {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Body kept from before the first heading, if any.
    pub fn preamble(&self) -> Option<&str> {
        self.has_preamble.then(|| self.entries[0].body.as_str())
    }

    /// Body of the first entry with this title.
    pub fn get(&self, title: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|s| s.title == title)
            .map(|s| s.body.as_str())
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|s| s.title.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Section> {
        self.entries.iter()
    }

    pub fn into_vec(self) -> Vec<Section> {
        self.entries
    }

    fn insert_preamble(&mut self, body: String) {
        self.entries.insert(
            0,
            Section {
                title: PREAMBLE_KEY.to_string(),
                body,
            },
        );
        self.has_preamble = true;
    }

    fn insert(&mut self, title: String, body: String, policy: DuplicatePolicy, format: BodyFormat) {
        let skip = usize::from(self.has_preamble);
        let Some(existing) = self.entries[skip..].iter_mut().find(|s| s.title == title) else {
            self.entries.push(Section { title, body });
            return;
        };
        match policy {
            DuplicatePolicy::Overwrite => existing.body = body,
            DuplicatePolicy::Append => append_body(&mut existing.body, &body, format),
        }
    }
}

impl<'a> IntoIterator for &'a Sections {
    type Item = &'a Section;
    type IntoIter = std::slice::Iter<'a, Section>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl Serialize for Sections {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for s in &self.entries {
            map.serialize_entry(&s.title, &s.body)?;
        }
        map.end()
    }
}

/// Partition `doc` into sections delimited by the configured heading tag.
pub fn extract(doc: &Document, cfg: &ExtractConfig) -> Result<Sections, ParseError> {
    let heading = cfg.heading()?;
    let root = resolve_root(doc, &heading, cfg)?;
    let sections = cluster_sections(root, &heading, cfg);
    debug!(
        root = root.tag().unwrap_or("#document"),
        count = sections.len(),
        "extracted sections"
    );
    Ok(sections)
}

/// Configured root, else `<body>` (or the first heading's parent when
/// [`RootPolicy::HeadingParent`] is set), else the document root.
fn resolve_root<'a>(
    doc: &'a Document,
    heading: &str,
    cfg: &ExtractConfig,
) -> Result<DomNode<'a>, ParseError> {
    if let Some(css) = &cfg.root_selector {
        let selector = parse_selector(css)?;
        let found = doc.select(&selector).next();
        return found.ok_or_else(|| ParseError::RootNotFound(css.clone()));
    }
    let heading_parent = match cfg.root_policy {
        RootPolicy::Body => None,
        RootPolicy::HeadingParent => {
            let heading_sel = parse_selector(heading)?;
            let first = doc.select(&heading_sel).next();
            first.and_then(|h| h.parent())
        }
    };
    let root = heading_parent
        .or_else(|| doc.body())
        .unwrap_or_else(|| doc.root());
    Ok(root)
}

/// Walk the root's children once, starting a new section at every heading.
pub fn cluster_sections(root: DomNode<'_>, heading: &str, cfg: &ExtractConfig) -> Sections {
    let mut sections = Sections::default();
    let mut current_title: Option<String> = None;
    let mut current_parts: Vec<String> = Vec::new();

    for child in root.children() {
        if child.tag() == Some(heading) {
            let parts = std::mem::take(&mut current_parts);
            close_section(&mut sections, current_title.take(), parts, cfg);
            current_title = Some(inline_text(child));
            continue;
        }
        let rendered = render_node(child, cfg.body_format);
        if !rendered.is_empty() {
            current_parts.push(rendered);
        }
    }
    close_section(&mut sections, current_title, current_parts, cfg);

    sections
}

fn close_section(
    sections: &mut Sections,
    title: Option<String>,
    parts: Vec<String>,
    cfg: &ExtractConfig,
) {
    let body = join_parts(parts, cfg.body_format);
    match title {
        Some(title) => sections.insert(title, body, cfg.duplicates, cfg.body_format),
        None if cfg.preamble == PreamblePolicy::Keep && !body.is_empty() => {
            sections.insert_preamble(body)
        }
        None => {}
    }
}

fn render_node(node: DomNode<'_>, format: BodyFormat) -> String {
    match format {
        BodyFormat::Text => render_lines(node).join("\n"),
        BodyFormat::Html => {
            let html = node.outer_html();
            if html.trim().is_empty() {
                String::new()
            } else {
                html
            }
        }
    }
}

fn join_parts(parts: Vec<String>, format: BodyFormat) -> String {
    let sep = match format {
        BodyFormat::Text => "\n",
        BodyFormat::Html => "",
    };
    parts.join(sep).trim().to_string()
}

fn append_body(existing: &mut String, more: &str, format: BodyFormat) {
    if more.is_empty() {
        return;
    }
    if !existing.is_empty() && format == BodyFormat::Text {
        existing.push('\n');
    }
    existing.push_str(more);
}

// ── Tests ──
