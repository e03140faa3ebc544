//! Markdown to node tree conversion
//!
//! [`CmarkParser`] drives pulldown-cmark and assembles its event stream
//! into an owned [`Element`] tree. Line breaks inside paragraphs become
//! hard breaks, GFM tables, strikethrough and task lists are enabled, and
//! raw HTML is kept verbatim as [`Node::Raw`].

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag};

use super::dom::{Element, Node};
use super::text::normalize_whitespace;
use super::types::{RenderError, Result};

/// Default upper bound for a single document
pub const DEFAULT_MAX_INPUT_BYTES: usize = 8 * 1024 * 1024;

/// Markdown parser interface
pub trait MarkdownParser: Send + Sync {
    /// Parse `markdown` into a container whose children are the blocks
    fn parse(&self, markdown: &str) -> Result<Element>;
}

/// pulldown-cmark backed parser
#[derive(Debug, Clone)]
pub struct CmarkParser {
    max_input_bytes: usize,
}

impl Default for CmarkParser {
    fn default() -> Self {
        Self {
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
        }
    }
}

impl CmarkParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject documents larger than `bytes`
    #[must_use]
    pub fn with_max_input(mut self, bytes: usize) -> Self {
        self.max_input_bytes = bytes;
        self
    }

    fn options() -> Options {
        Options::ENABLE_TABLES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_FOOTNOTES
    }
}

impl MarkdownParser for CmarkParser {
    fn parse(&self, markdown: &str) -> Result<Element> {
        if markdown.len() > self.max_input_bytes {
            return Err(RenderError::ParseFailed(format!(
                "input is {} bytes, limit is {}",
                markdown.len(),
                self.max_input_bytes
            )));
        }

        let mut builder = TreeBuilder::new();
        for event in Parser::new_ext(markdown, Self::options()) {
            builder.push_event(event);
        }
        Ok(builder.finish())
    }
}

// ============================================================
// Tree Builder
// ============================================================

/// Stack-based assembly of the event stream.
///
/// Every `Start` records the stack depth before pushing its elements;
/// the matching `End` pops back to that depth, attaching each popped
/// element to its parent.
struct TreeBuilder {
    stack: Vec<Element>,
    marks: Vec<usize>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            stack: vec![Element::new("div").with_class("markdown-body")],
            marks: Vec::new(),
        }
    }

    fn top(&mut self) -> &mut Element {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    fn append(&mut self, node: Node) {
        self.top().children.push(node);
    }

    fn in_table_head(&self) -> bool {
        self.stack.iter().any(|el| el.tag == "thead")
    }

    fn push_event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.open(tag),
            Event::End(_) => {
                if let Some(depth) = self.marks.pop() {
                    self.close_to(depth);
                }
            }
            Event::Text(text) => self.append(Node::Text(text.into_string())),
            Event::Code(code) => {
                self.append(Node::Element(Element::new("code").with_text(code.into_string())))
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                self.append(Node::Raw(html.into_string()))
            }
            Event::SoftBreak | Event::HardBreak => self.append(Node::Element(Element::new("br"))),
            Event::Rule => self.append(Node::Element(Element::new("hr"))),
            Event::TaskListMarker(checked) => {
                let mut input = Element::new("input")
                    .with_attr("type", "checkbox")
                    .with_attr("disabled", "");
                if checked {
                    input.set_attr("checked", "");
                }
                self.append(Node::Element(input));
            }
            Event::FootnoteReference(label) => {
                let label = label.into_string();
                self.append(Node::Element(
                    Element::new("sup")
                        .with_class("footnote-reference")
                        .with_text(format!("[{}]", label)),
                ));
            }
            _ => {}
        }
    }

    fn open(&mut self, tag: Tag<'_>) {
        // Body rows go in a tbody opened lazily under the table
        if matches!(tag, Tag::TableRow) && self.top().tag == "table" {
            self.stack.push(Element::new("tbody"));
        }

        self.marks.push(self.stack.len());

        match tag {
            Tag::Paragraph => self.stack.push(Element::new("p")),
            Tag::Heading { level, .. } => {
                self.stack.push(Element::new(format!("h{}", level as usize)))
            }
            Tag::BlockQuote(_) => self.stack.push(Element::new("blockquote")),
            Tag::CodeBlock(kind) => {
                let mut code = Element::new("code");
                if let CodeBlockKind::Fenced(info) = kind {
                    if let Some(lang) = info.split_whitespace().next() {
                        code.set_attr("class", format!("language-{}", lang));
                    }
                }
                self.stack.push(Element::new("pre"));
                self.stack.push(code);
            }
            Tag::HtmlBlock => {}
            Tag::List(Some(start)) => {
                let mut list = Element::new("ol");
                if start != 1 {
                    list.set_attr("start", start.to_string());
                }
                self.stack.push(list);
            }
            Tag::List(None) => self.stack.push(Element::new("ul")),
            Tag::Item => self.stack.push(Element::new("li")),
            Tag::FootnoteDefinition(label) => self.stack.push(
                Element::new("div")
                    .with_class("footnote-definition")
                    .with_attr("data-label", label.into_string()),
            ),
            Tag::Table(_) => self.stack.push(Element::new("table")),
            Tag::TableHead => {
                self.stack.push(Element::new("thead"));
                self.stack.push(Element::new("tr"));
            }
            Tag::TableRow => self.stack.push(Element::new("tr")),
            Tag::TableCell => {
                let cell = if self.in_table_head() { "th" } else { "td" };
                self.stack.push(Element::new(cell));
            }
            Tag::Emphasis => self.stack.push(Element::new("em")),
            Tag::Strong => self.stack.push(Element::new("strong")),
            Tag::Strikethrough => self.stack.push(Element::new("del")),
            Tag::Link {
                dest_url, title, ..
            } => {
                let mut link = Element::new("a").with_attr("href", dest_url.into_string());
                if !title.is_empty() {
                    link.set_attr("title", title.into_string());
                }
                self.stack.push(link);
            }
            Tag::Image {
                dest_url, title, ..
            } => {
                let mut img = Element::new("img").with_attr("src", dest_url.into_string());
                if !title.is_empty() {
                    img.set_attr("title", title.into_string());
                }
                self.stack.push(img);
            }
            _ => self.stack.push(Element::new("div")),
        }
    }

    fn close_to(&mut self, depth: usize) {
        while self.stack.len() > depth.max(1) {
            let Some(mut el) = self.stack.pop() else {
                break;
            };
            // Image description text becomes the alt attribute
            if el.tag == "img" {
                let alt = normalize_whitespace(&el.raw_text());
                el.children.clear();
                el.set_attr("alt", alt);
            }
            self.append(Node::Element(el));
        }
    }

    fn finish(mut self) -> Element {
        self.close_to(1);
        self.stack.swap_remove(0)
    }
}
