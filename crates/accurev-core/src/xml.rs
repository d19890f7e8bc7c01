//! Navigable view over the XML that `accurev -fx` commands print.
//!
//! Replies are parsed as a *fragment*: zero or more sibling elements at the
//! top level, optionally preceded by a declaration or comments. Only element
//! names, attributes and text are kept.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{AccuRevError, Result};

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    nodes: Vec<Node>,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

impl Document {
    /// Parse raw tool output. Anything that is not well-formed even as a
    /// fragment yields [`AccuRevError::MalformedReply`].
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(bytes);
        let mut buf = Vec::new();
        let mut open: Vec<Element> = Vec::new();
        let mut nodes: Vec<Node> = Vec::new();

        loop {
            let event = reader.read_event_into(&mut buf).map_err(|e| {
                AccuRevError::MalformedReply(format!(
                    "at byte {}: {e}",
                    reader.buffer_position()
                ))
            })?;

            match event {
                Event::Start(start) => open.push(Element::from_start(&start)?),
                Event::Empty(start) => {
                    let element = Element::from_start(&start)?;
                    attach(&mut open, &mut nodes, Node::Element(element));
                }
                Event::End(end) => {
                    let element = open.pop().ok_or_else(|| {
                        AccuRevError::MalformedReply(format!(
                            "unexpected closing tag </{}>",
                            String::from_utf8_lossy(end.name().as_ref())
                        ))
                    })?;
                    if end.name().as_ref() != element.name.as_bytes() {
                        return Err(AccuRevError::MalformedReply(format!(
                            "expected </{}>, found </{}>",
                            element.name,
                            String::from_utf8_lossy(end.name().as_ref())
                        )));
                    }
                    attach(&mut open, &mut nodes, Node::Element(element));
                }
                Event::Text(text) => {
                    let text = text.unescape()?.into_owned();
                    if open.is_empty() && text.trim().is_empty() {
                        // whitespace between top-level elements
                    } else {
                        attach(&mut open, &mut nodes, Node::Text(text));
                    }
                }
                Event::CData(data) => {
                    let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                    attach(&mut open, &mut nodes, Node::Text(text));
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if let Some(unclosed) = open.last() {
            return Err(AccuRevError::MalformedReply(format!(
                "unclosed element <{}>",
                unclosed.name
            )));
        }

        Ok(Self { nodes })
    }

    /// Top-level elements, in document order.
    pub fn roots(&self) -> impl Iterator<Item = &Element> {
        elements(&self.nodes)
    }

    /// Every element named `name` at any depth (`//name`), in document order.
    pub fn select_all(&self, name: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        for root in self.roots() {
            root.collect_named(name, true, &mut found);
        }
        found
    }

    /// First element named `name` at any depth.
    pub fn select_first(&self, name: &str) -> Option<&Element> {
        self.select_all(name).into_iter().next()
    }

    /// `//name[@attr='value']`
    pub fn select_where(&self, name: &str, attr: &str, value: &str) -> Vec<&Element> {
        self.select_all(name)
            .into_iter()
            .filter(|e| e.attr(attr) == Some(value))
            .collect()
    }
}

fn attach(open: &mut [Element], nodes: &mut Vec<Node>, node: Node) {
    match open.last_mut() {
        Some(parent) => parent.children.push(node),
        None => nodes.push(node),
    }
}

fn elements(nodes: &[Node]) -> impl Iterator<Item = &Element> {
    nodes.iter().filter_map(|n| match n {
        Node::Element(e) => Some(e),
        Node::Text(_) => None,
    })
}

// ---------------------------------------------------------------------------
// Element access
// ---------------------------------------------------------------------------

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| {
                AccuRevError::MalformedReply(format!("bad attribute on <{name}>: {e}"))
            })?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    /// Direct child elements.
    pub fn children(&self) -> impl Iterator<Item = &Element> {
        elements(&self.children)
    }

    /// Direct child elements named `name` (`./name`).
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children().filter(move |e| e.name == name)
    }

    /// First direct child of any name carrying `attr="value"` (`./*[@attr='value']`).
    pub fn child_where(&self, attr: &str, value: &str) -> Option<&Element> {
        self.children().find(|e| e.attr(attr) == Some(value))
    }

    /// Descendant elements named `name`, excluding `self`.
    pub fn descendants(&self, name: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        self.collect_named(name, false, &mut found);
        found
    }

    /// Concatenated text of this element and all its descendants.
    pub fn inner_text(&self) -> String {
        let mut text = String::new();
        self.push_text(&mut text);
        text
    }

    fn push_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(t) => out.push_str(t),
                Node::Element(e) => e.push_text(out),
            }
        }
    }

    fn collect_named<'a>(&'a self, name: &str, include_self: bool, out: &mut Vec<&'a Element>) {
        if include_self && self.name == name {
            out.push(self);
        }
        for child in self.children() {
            child.collect_named(name, true, out);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
