//! Rendered node tree
//!
//! A small owned HTML tree produced by the markdown parser. It is the
//! "rendered output surface": the interaction controller writes transforms
//! into it and the exporter walks its direct children.

use super::text::{decode_entities, escape_html, normalize_whitespace, strip_tags};

/// Elements serialized without a closing tag
const VOID_TAGS: [&str; 4] = ["br", "hr", "img", "input"];

/// Elements whose text is separated from neighbouring text
const BLOCK_TAGS: [&str; 20] = [
    "p", "div", "li", "ul", "ol", "tr", "td", "th", "pre", "blockquote", "h1", "h2", "h3", "h4",
    "h5", "h6", "table", "thead", "tbody", "br",
];

/// A node in the rendered tree
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// An element with attributes and children
    Element(Element),
    /// Character data (already decoded)
    Text(String),
    /// Raw HTML passed through verbatim (inline HTML, rendered SVG)
    Raw(String),
}

impl Node {
    /// Element view of this node, if it is one
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Mutable element view of this node, if it is one
    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    /// True for text or raw nodes that contain only whitespace
    pub fn is_blank(&self) -> bool {
        match self {
            Node::Element(_) => false,
            Node::Text(t) | Node::Raw(t) => t.trim().is_empty(),
        }
    }

    fn write_text(&self, out: &mut String) {
        match self {
            Node::Element(el) => el.write_text(out),
            Node::Text(t) => out.push_str(t),
            Node::Raw(html) => out.push_str(&decode_entities(&strip_tags(html))),
        }
    }

    fn write_html(&self, out: &mut String) {
        match self {
            Node::Element(el) => el.write_html(out),
            Node::Text(t) => out.push_str(&escape_html(t)),
            Node::Raw(html) => out.push_str(html),
        }
    }
}

/// An element node
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    /// Lowercase tag name
    pub tag: String,
    /// Attributes in insertion order
    pub attrs: Vec<(String, String)>,
    /// Child nodes
    pub children: Vec<Node>,
}

impl Element {
    /// Create an empty element
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder: set an attribute
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Builder: set the class attribute
    #[must_use]
    pub fn with_class(self, class: impl Into<String>) -> Self {
        self.with_attr("class", class)
    }

    /// Builder: append a child node
    #[must_use]
    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Builder: append a text child
    #[must_use]
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_child(Node::Text(text.into()))
    }

    /// Attribute value by name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set or replace an attribute
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name, value)),
        }
    }

    /// The `id` attribute
    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    /// Class names from the `class` attribute
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_whitespace()
    }

    /// Class membership test
    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    /// Element children, skipping text and raw nodes
    pub fn element_children(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// First direct child element with the given tag
    pub fn child(&self, tag: &str) -> Option<&Element> {
        self.element_children().find(|el| el.tag == tag)
    }

    /// Concatenated character data of the subtree, block boundaries
    /// separated by whitespace, not normalized
    pub fn raw_text(&self) -> String {
        let mut out = String::new();
        self.write_text(&mut out);
        out
    }

    /// Whitespace-normalized text of the subtree
    pub fn text_content(&self) -> String {
        normalize_whitespace(&self.raw_text())
    }

    fn write_text(&self, out: &mut String) {
        let block = BLOCK_TAGS.contains(&self.tag.as_str());
        if block {
            out.push(' ');
        }
        for child in &self.children {
            child.write_text(out);
        }
        if block {
            out.push(' ');
        }
    }

    /// Depth-first search for an element by id
    pub fn find_by_id(&self, id: &str) -> Option<&Element> {
        if self.id() == Some(id) {
            return Some(self);
        }
        self.element_children().find_map(|el| el.find_by_id(id))
    }

    /// Mutable depth-first search for an element by id
    pub fn find_by_id_mut(&mut self, id: &str) -> Option<&mut Element> {
        if self.id() == Some(id) {
            return Some(self);
        }
        self.children
            .iter_mut()
            .filter_map(Node::as_element_mut)
            .find_map(|el| el.find_by_id_mut(id))
    }

    /// All descendant elements (pre-order) matching a predicate
    pub fn find_all<'a, F>(&'a self, pred: &F) -> Vec<&'a Element>
    where
        F: Fn(&Element) -> bool,
    {
        let mut found = Vec::new();
        for el in self.element_children() {
            if pred(el) {
                found.push(el);
            }
            found.extend(el.find_all(pred));
        }
        found
    }

    /// Remove every descendant element carrying `class`
    pub fn remove_by_class(&mut self, class: &str) {
        self.children.retain(|node| match node {
            Node::Element(el) => !el.has_class(class),
            _ => true,
        });
        for el in self.children.iter_mut().filter_map(Node::as_element_mut) {
            el.remove_by_class(class);
        }
    }

    /// Serialize the subtree as HTML
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    /// Serialize only the children as HTML
    pub fn inner_html(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.write_html(&mut out);
        }
        out
    }

    fn write_html(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        for (name, value) in &self.attrs {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape_html(value));
            out.push('"');
        }

        if VOID_TAGS.contains(&self.tag.as_str()) {
            out.push_str(" />");
            return;
        }

        out.push('>');
        for child in &self.children {
            child.write_html(out);
        }
        out.push_str("</");
        out.push_str(&self.tag);
        out.push('>');
    }
}
