//! Block classification
//!
//! Maps each direct child of the rendered surface to a [`BlockKind`],
//! extracting everything its renderer needs in one pass. Nodes matching
//! no kind become generic text; nothing is dropped except blank text.

use crate::interact::TransformState;
use crate::render::text::{normalize_whitespace, raw_html_text};
use crate::render::{read_transform, Element, Node};

/// Classes removed from the surface before export
pub const INTERACTIVE_CLASSES: [&str; 2] = ["copy-btn", "mermaid-controls"];

/// Bullet used for unordered list items
pub const BULLET: &str = "•";

/// One flattened list item
#[derive(Debug, Clone, PartialEq)]
pub struct ListItem {
    /// Nesting depth, 0 for top level
    pub depth: usize,
    /// Bullet or ordinal, e.g. `•` or `3.`
    pub marker: String,
    /// Item text without nested lists
    pub text: String,
}

/// Block kind with its extracted data
#[derive(Debug, Clone, PartialEq)]
pub enum BlockKind {
    Heading {
        level: u8,
        text: String,
    },
    Paragraph {
        text: String,
    },
    List {
        ordered: bool,
        items: Vec<ListItem>,
    },
    Code {
        language: Option<String>,
        /// Verbatim source lines
        text: String,
    },
    Blockquote {
        text: String,
    },
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Rule,
    Diagram {
        id: Option<String>,
        /// Rendered SVG, absent when the renderer produced none
        svg: Option<String>,
        /// Transform applied in the preview
        transform: TransformState,
        /// Text shown when no image can be produced
        placeholder: String,
    },
    Image {
        src: String,
        alt: String,
    },
    GenericText {
        text: String,
    },
}

impl BlockKind {
    /// Short kind name for logs and progress
    pub fn name(&self) -> &'static str {
        match self {
            BlockKind::Heading { .. } => "heading",
            BlockKind::Paragraph { .. } => "paragraph",
            BlockKind::List { .. } => "list",
            BlockKind::Code { .. } => "code",
            BlockKind::Blockquote { .. } => "blockquote",
            BlockKind::Table { .. } => "table",
            BlockKind::Rule => "rule",
            BlockKind::Diagram { .. } => "diagram",
            BlockKind::Image { .. } => "image",
            BlockKind::GenericText { .. } => "text",
        }
    }
}

/// A classified top-level node
#[derive(Debug, Clone, PartialEq)]
pub struct Block<'a> {
    /// Position in document order
    pub index: usize,
    pub kind: BlockKind,
    /// Source node, read-only during export
    pub node: &'a Node,
}

/// Copy of `root` without interactive controls
pub fn export_surface(root: &Element) -> Element {
    let mut surface = root.clone();
    for class in INTERACTIVE_CLASSES {
        surface.remove_by_class(class);
    }
    surface
}

/// Classify every non-blank direct child of `root`
pub fn classify_children(root: &Element) -> Vec<Block<'_>> {
    root.children
        .iter()
        .filter(|node| !node.is_blank())
        .enumerate()
        .map(|(index, node)| Block {
            index,
            kind: classify(node),
            node,
        })
        .collect()
}

/// Classify one node
pub fn classify(node: &Node) -> BlockKind {
    match node {
        Node::Text(text) => BlockKind::GenericText {
            text: normalize_whitespace(text),
        },
        Node::Raw(html) => BlockKind::GenericText {
            text: raw_html_text(html),
        },
        Node::Element(el) => classify_element(el),
    }
}

fn classify_element(el: &Element) -> BlockKind {
    match el.tag.as_str() {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => BlockKind::Heading {
            level: el.tag[1..].parse().unwrap_or(1),
            text: el.text_content(),
        },
        "p" => match sole_image(el) {
            Some(img) => image_kind(img),
            None => BlockKind::Paragraph {
                text: el.text_content(),
            },
        },
        "ul" | "ol" => {
            let mut items = Vec::new();
            flatten_list(el, 0, &mut items);
            BlockKind::List {
                ordered: el.tag == "ol",
                items,
            }
        }
        "pre" => {
            let code = el.child("code");
            BlockKind::Code {
                language: code.and_then(code_language),
                text: code.unwrap_or(el).raw_text(),
            }
        }
        "blockquote" => BlockKind::Blockquote {
            text: el.text_content(),
        },
        "table" => table_kind(el),
        "hr" => BlockKind::Rule,
        "img" => image_kind(el),
        "div" if el.has_class("mermaid-wrapper") => diagram_kind(el),
        _ => BlockKind::GenericText {
            text: el.text_content(),
        },
    }
}

/// The only meaningful child of a paragraph, when it is an image
fn sole_image(p: &Element) -> Option<&Element> {
    let mut meaningful = p
        .children
        .iter()
        .filter(|n| !n.is_blank())
        .filter(|n| !matches!(n, Node::Element(e) if e.tag == "br"));
    match (meaningful.next(), meaningful.next()) {
        (Some(Node::Element(img)), None) if img.tag == "img" => Some(img),
        _ => None,
    }
}

fn image_kind(img: &Element) -> BlockKind {
    BlockKind::Image {
        src: img.attr("src").unwrap_or_default().to_string(),
        alt: img.attr("alt").unwrap_or_default().to_string(),
    }
}

fn code_language(code: &Element) -> Option<String> {
    code.classes()
        .find_map(|c| c.strip_prefix("language-"))
        .map(str::to_string)
}

fn node_text(node: &Node) -> String {
    match node {
        Node::Element(el) => el.raw_text(),
        Node::Text(t) => t.clone(),
        Node::Raw(html) => raw_html_text(html),
    }
}

fn flatten_list(list: &Element, depth: usize, items: &mut Vec<ListItem>) {
    let ordered = list.tag == "ol";
    let start: u64 = list.attr("start").and_then(|s| s.parse().ok()).unwrap_or(1);

    for (i, li) in list.element_children().filter(|e| e.tag == "li").enumerate() {
        let text: String = li
            .children
            .iter()
            .filter(|n| !matches!(n, Node::Element(e) if e.tag == "ul" || e.tag == "ol"))
            .map(node_text)
            .collect::<Vec<_>>()
            .join(" ");
        let checkbox = li
            .element_children()
            .find(|e| e.tag == "input")
            .map(|e| if e.attr("checked").is_some() { "[x] " } else { "[ ] " })
            .unwrap_or_default();

        items.push(ListItem {
            depth,
            marker: if ordered {
                format!("{}.", start + i as u64)
            } else {
                BULLET.to_string()
            },
            text: format!("{}{}", checkbox, normalize_whitespace(&text)),
        });

        for nested in li
            .element_children()
            .filter(|e| e.tag == "ul" || e.tag == "ol")
        {
            flatten_list(nested, depth + 1, items);
        }
    }
}

fn row_cells(tr: &Element) -> Vec<String> {
    tr.element_children()
        .filter(|c| c.tag == "th" || c.tag == "td")
        .map(Element::text_content)
        .collect()
}

fn table_kind(table: &Element) -> BlockKind {
    let mut headers = Vec::new();
    let mut rows = Vec::new();

    for section in table.element_children() {
        match section.tag.as_str() {
            "thead" => {
                for tr in section.element_children().filter(|e| e.tag == "tr") {
                    if headers.is_empty() {
                        headers = row_cells(tr);
                    } else {
                        rows.push(row_cells(tr));
                    }
                }
            }
            "tbody" | "tfoot" => {
                rows.extend(
                    section
                        .element_children()
                        .filter(|e| e.tag == "tr")
                        .map(row_cells),
                );
            }
            "tr" => {
                let cells = row_cells(section);
                let all_th = section.element_children().all(|c| c.tag == "th");
                if headers.is_empty() && rows.is_empty() && all_th {
                    headers = cells;
                } else {
                    rows.push(cells);
                }
            }
            _ => {}
        }
    }

    BlockKind::Table { headers, rows }
}

fn diagram_kind(wrapper: &Element) -> BlockKind {
    let content = wrapper
        .find_all(&|el: &Element| el.has_class("mermaid-content"))
        .into_iter()
        .next();
    let diagram = wrapper
        .find_all(&|el: &Element| el.has_class("mermaid"))
        .into_iter()
        .next();

    let svg = diagram.and_then(|d| {
        d.children.iter().find_map(|n| match n {
            Node::Raw(html) if html.contains("<svg") => Some(html.clone()),
            _ => None,
        })
    });
    let error = diagram
        .and_then(|d| {
            d.find_all(&|el: &Element| el.has_class("mermaid-error"))
                .into_iter()
                .next()
        })
        .map(Element::text_content);

    BlockKind::Diagram {
        id: diagram.and_then(|d| d.id()).map(str::to_string),
        svg,
        transform: content.map(read_transform).unwrap_or_default(),
        placeholder: match error {
            Some(message) => format!("[{}]", message),
            None => "[Diagram could not be rendered]".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{CmarkParser, MarkdownParser};

    fn el(node: Element) -> Node {
        Node::Element(node)
    }

    fn kinds(md: &str) -> Vec<BlockKind> {
        let root = CmarkParser::new().parse(md).unwrap();
        classify_children(&root).into_iter().map(|b| b.kind).collect()
    }

    #[test]
    fn test_heading_and_paragraph() {
        assert_eq!(
            kinds("# Title\n\nHello"),
            vec![
                BlockKind::Heading {
                    level: 1,
                    text: "Title".into()
                },
                BlockKind::Paragraph {
                    text: "Hello".into()
                },
            ]
        );
    }

    #[test]
    fn test_all_heading_levels() {
        for level in 1..=6u8 {
            let md = format!("{} H", "#".repeat(level as usize));
            assert!(matches!(
                kinds(&md).first(),
                Some(BlockKind::Heading { level: l, .. }) if *l == level
            ));
        }
    }

    #[test]
    fn test_nested_list() {
        let list = kinds("1. one\n   - inner\n2. two\n");
        let BlockKind::List { ordered, items } = &list[0] else {
            panic!("expected list");
        };
        assert!(ordered);
        let flat: Vec<(usize, &str, &str)> = items
            .iter()
            .map(|i| (i.depth, i.marker.as_str(), i.text.as_str()))
            .collect();
        assert_eq!(
            flat,
            vec![(0, "1.", "one"), (1, BULLET, "inner"), (0, "2.", "two")]
        );
    }

    #[test]
    fn test_code_block() {
        let blocks = kinds("```python\nprint('x')\n    indented\n```");
        assert_eq!(
            blocks[0],
            BlockKind::Code {
                language: Some("python".into()),
                text: "print('x')\n    indented\n".into()
            }
        );
    }

    #[test]
    fn test_table() {
        let blocks = kinds("| A | B |\n|---|---|\n| 1 | 2 |\n");
        assert_eq!(
            blocks[0],
            BlockKind::Table {
                headers: vec!["A".into(), "B".into()],
                rows: vec![vec!["1".into(), "2".into()]],
            }
        );
    }

    #[test]
    fn test_rule_quote_image() {
        let blocks = kinds("> quoted *text*\n\n---\n\n![logo](logo.png)\n");
        assert_eq!(
            blocks,
            vec![
                BlockKind::Blockquote {
                    text: "quoted text".into()
                },
                BlockKind::Rule,
                BlockKind::Image {
                    src: "logo.png".into(),
                    alt: "logo".into()
                },
            ]
        );
    }

    #[test]
    fn test_unknown_becomes_generic_text() {
        let root = Element::new("div")
            .with_child(el(Element::new("section").with_text("  some   text ")))
            .with_child(Node::Raw("<span>a &amp; b</span>".into()))
            .with_child(Node::Text("\n\n".into()));
        let blocks = classify_children(&root);
        assert_eq!(blocks.len(), 2);
        assert_eq!(
            blocks[0].kind,
            BlockKind::GenericText {
                text: "some text".into()
            }
        );
        assert_eq!(
            blocks[1].kind,
            BlockKind::GenericText {
                text: "a & b".into()
            }
        );
        assert_eq!(blocks[1].index, 1);
    }

    #[test]
    fn test_diagram_wrapper() {
        let wrapper = Element::new("div").with_class("mermaid-wrapper").with_child(el(
            Element::new("div").with_class("mermaid-viewport").with_child(el(Element::new("div")
                .with_class("mermaid-content")
                .with_attr("data-scale", "1.5")
                .with_attr("data-tx", "10")
                .with_child(el(Element::new("div")
                    .with_class("mermaid")
                    .with_attr("id", "mermaid-0")
                    .with_child(Node::Raw("<svg></svg>".into())))))),
        ));

        let BlockKind::Diagram {
            id, svg, transform, ..
        } = classify(&el(wrapper))
        else {
            panic!("expected diagram");
        };
        assert_eq!(id.as_deref(), Some("mermaid-0"));
        assert_eq!(svg.as_deref(), Some("<svg></svg>"));
        assert_eq!(transform.scale, 1.5);
        assert_eq!(transform.translate_x, 10.0);
    }

    #[test]
    fn test_export_surface_strips_controls() {
        let root = Element::new("div")
            .with_child(el(Element::new("pre")
                .with_child(el(Element::new("code").with_text("x")))
                .with_child(el(Element::new("button").with_class("copy-btn").with_text("Copy")))))
            .with_child(el(Element::new("div")
                .with_class("mermaid-wrapper")
                .with_child(el(Element::new("div").with_class("mermaid-controls").with_text("+")))));

        let surface = export_surface(&root);
        assert!(surface.find_all(&|e: &Element| e.has_class("copy-btn")).is_empty());
        assert!(surface.find_all(&|e: &Element| e.has_class("mermaid-controls")).is_empty());
        // Original untouched
        assert_eq!(root.find_all(&|e: &Element| e.has_class("copy-btn")).len(), 1);

        let blocks = classify_children(&surface);
        assert_eq!(
            blocks[0].kind,
            BlockKind::Code {
                language: None,
                text: "x".into()
            }
        );
    }
}
