use super::node::{DomNode, Node};

/// Elements whose boundaries end the current line of text.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "details", "dialog", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section", "summary", "table",
    "tbody", "td", "tfoot", "th", "thead", "tr", "ul",
];

/// Elements whose text never reaches the reader.
const HIDDEN_TAGS: &[&str] = &["head", "script", "style", "noscript", "template"];

#[derive(Default)]
struct Lines {
    done: Vec<String>,
    current: String,
}

impl Lines {
    fn push(&mut self, text: &str) {
        self.current.push_str(text);
    }

    fn end_line(&mut self) {
        let line = normalize_ws(&self.current);
        if !line.is_empty() {
            self.done.push(line);
        }
        self.current.clear();
    }

    fn finish(mut self) -> Vec<String> {
        self.end_line();
        self.done
    }
}

/// Visible text under `node`, one whitespace-normalised line per block.
pub fn render_lines(node: DomNode<'_>) -> Vec<String> {
    let mut lines = Lines::default();
    walk(node, &mut lines);
    lines.finish()
}

/// Visible text under `node` on a single line (titles, list items).
pub fn inline_text(node: DomNode<'_>) -> String {
    render_lines(node).join(" ")
}

enum Step<'a> {
    Enter(DomNode<'a>),
    /// Closing boundary of a block element.
    Leave,
}

fn walk(node: DomNode<'_>, out: &mut Lines) {
    let mut stack = vec![Step::Enter(node)];
    while let Some(step) = stack.pop() {
        let node = match step {
            Step::Enter(node) => node,
            Step::Leave => {
                out.end_line();
                continue;
            }
        };
        if let Some(text) = node.as_text() {
            out.push(text);
            continue;
        }
        // no tag: document root, comments, doctype
        let block = match node.tag() {
            None => false,
            Some(tag) if HIDDEN_TAGS.contains(&tag) => continue,
            Some("br") => {
                out.end_line();
                continue;
            }
            Some(tag) => BLOCK_TAGS.contains(&tag),
        };
        if block {
            out.end_line();
            stack.push(Step::Leave);
        }
        stack.extend(node.children().into_iter().rev().map(Step::Enter));
    }
}

/// Each visible text node under `node`, trimmed, empty ones dropped.
pub fn stripped_strings(node: DomNode<'_>) -> Vec<String> {
    let mut out = Vec::new();
    let mut stack = vec![node];
    while let Some(n) = stack.pop() {
        if let Some(text) = n.as_text() {
            let t = text.trim();
            if !t.is_empty() {
                out.push(t.to_string());
            }
            continue;
        }
        if n.tag().is_some_and(|t| HIDDEN_TAGS.contains(&t)) {
            continue;
        }
        stack.extend(n.children().into_iter().rev());
    }
    out
}

/// Collapse every whitespace run (including non-breaking spaces) to one space.
pub fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn root_lines(html: &str) -> Vec<String> {
        let doc = Html::parse_fragment(html);
        render_lines(DomNode::from_element(doc.root_element()))
    }

    #[test]
    fn blocks_become_lines() {
        let lines = root_lines("<p>Serve <b>students</b></p><ul><li>one</li><li>two</li></ul>");
        assert_eq!(lines, vec!["Serve students", "one", "two"]);
    }

    #[test]
    fn br_breaks_and_whitespace_collapses() {
        let lines = root_lines("<p>first\n   line<br>second&nbsp;&nbsp;line</p>");
        assert_eq!(lines, vec!["first line", "second line"]);
    }

    #[test]
    fn scripts_are_invisible() {
        let lines = root_lines("<div>shown<script>var x = 1;</script><style>p{}</style></div>");
        assert_eq!(lines, vec!["shown"]);
    }

    #[test]
    fn deep_nesting_renders() {
        let depth = 10_000;
        let html = format!("{}deep{}", "<div>".repeat(depth), "</div>".repeat(depth));
        assert_eq!(root_lines(&html), vec!["deep"]);
    }

    #[test]
    fn nested_blocks_keep_line_order() {
        let lines = root_lines("<div>a<p>b</p>c<ul><li>d<b>e</b></li></ul>f</div>");
        assert_eq!(lines, vec!["a", "b", "c", "de", "f"]);
    }

    #[test]
    fn inline_joins_blocks() {
        let doc = Html::parse_fragment("<h4><span>Program</span><div>Criteria</div></h4>");
        assert_eq!(
            inline_text(DomNode::from_element(doc.root_element())),
            "Program Criteria"
        );
    }

    #[test]
    fn stripped_strings_keep_text_nodes_apart() {
        let doc = Html::parse_fragment("<p>Serve <b>students</b></p>\n<p>  </p><p>well</p>");
        let strings = stripped_strings(DomNode::from_element(doc.root_element()));
        assert_eq!(strings, vec!["Serve", "students", "well"]);
    }

    #[test]
    fn escape() {
        assert_eq!(escape_html("a < b && c > d"), "a &lt; b &amp;&amp; c &gt; d");
        assert_eq!(normalize_ws("  a \t b\n"), "a b");
    }
}
