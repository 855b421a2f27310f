//! Parsing of backend-rendered chapter HTML into an owned render tree.
//!
//! A chapter fragment arrives as one UTF-8 HTML string per display pass and
//! is replaced wholesale on navigation, so the tree is rebuilt from scratch
//! every time; there is no incremental update against a previous fragment.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error raised when a chapter fragment cannot be turned into a render tree.
///
/// Parse failures are surfaced whole: the annotator never returns a
/// partially built tree with content silently dropped.
#[derive(Debug)]
pub enum FragmentError {
    Parse { position: u64, message: String },
}

impl fmt::Display for FragmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FragmentError::Parse { position, message } => {
                write!(f, "fragment parse error at byte {position}: {message}")
            }
        }
    }
}

impl std::error::Error for FragmentError {}

/// One node of the parsed render tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Element(Element),
    Text { text: String },
}

impl Node {
    /// Returns the contained element, if this node is one.
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text { .. } => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text { .. } => None,
        }
    }
}

/// An element node: tag name, attributes in document order, children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Sets an attribute, replacing an existing value in place so document
    /// order is preserved.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    /// Whitespace-separated tokens of the `class` attribute.
    pub fn class_list(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_whitespace()
    }

    pub fn has_class_token(&self, token: &str) -> bool {
        self.class_list().any(|t| t == token)
    }

    /// Concatenated text of this element's subtree.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }

    /// Depth-first search for the first descendant carrying a class token.
    pub fn find_by_class_token(&self, token: &str) -> Option<&Element> {
        for child in &self.children {
            if let Node::Element(element) = child {
                if element.has_class_token(token) {
                    return Some(element);
                }
                if let Some(found) = element.find_by_class_token(token) {
                    return Some(found);
                }
            }
        }
        None
    }
}

fn collect_text(children: &[Node], out: &mut String) {
    for child in children {
        match child {
            Node::Text { text } => out.push_str(text),
            Node::Element(element) => collect_text(&element.children, out),
        }
    }
}

/// A parsed chapter fragment: zero or more top-level nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub nodes: Vec<Node>,
}

impl Fragment {
    /// Parses a chapter fragment into an owned tree.
    ///
    /// The input is a fragment, not a document: multiple top-level nodes are
    /// fine and no doctype is expected. Malformed markup (mismatched or
    /// unclosed tags) is reported as [`FragmentError::Parse`].
    pub fn parse(html: &str) -> Result<Fragment, FragmentError> {
        let mut reader = Reader::from_str(html);
        let mut roots: Vec<Node> = Vec::new();
        let mut stack: Vec<Element> = Vec::new();

        loop {
            let position = reader.buffer_position();
            match reader.read_event() {
                Ok(Event::Start(start)) => {
                    let element = element_from_start(&reader, &start, position)?;
                    stack.push(element);
                }
                Ok(Event::Empty(start)) => {
                    let element = element_from_start(&reader, &start, position)?;
                    push_node(&mut stack, &mut roots, Node::Element(element));
                }
                Ok(Event::End(_)) => match stack.pop() {
                    Some(element) => push_node(&mut stack, &mut roots, Node::Element(element)),
                    None => {
                        return Err(FragmentError::Parse {
                            position,
                            message: "closing tag without a matching open tag".to_string(),
                        });
                    }
                },
                Ok(Event::Text(text)) => {
                    let decoded = text.decode().map_err(|err| FragmentError::Parse {
                        position,
                        message: err.to_string(),
                    })?;
                    if !decoded.is_empty() {
                        push_text(&mut stack, &mut roots, &decoded);
                    }
                }
                Ok(Event::CData(data)) => {
                    let decoded = reader
                        .decoder()
                        .decode(data.as_ref())
                        .map_err(|err| FragmentError::Parse {
                            position,
                            message: err.to_string(),
                        })?;
                    if !decoded.is_empty() {
                        push_text(&mut stack, &mut roots, &decoded);
                    }
                }
                Ok(Event::GeneralRef(entity)) => {
                    let name = entity.decode().map_err(|err| FragmentError::Parse {
                        position,
                        message: err.to_string(),
                    })?;
                    push_text(&mut stack, &mut roots, &resolve_entity(&name));
                }
                Ok(Event::Comment(_))
                | Ok(Event::Decl(_))
                | Ok(Event::PI(_))
                | Ok(Event::DocType(_)) => {}
                Ok(Event::Eof) => break,
                Err(err) => {
                    return Err(FragmentError::Parse {
                        position,
                        message: err.to_string(),
                    });
                }
            }
        }

        if let Some(unclosed) = stack.last() {
            return Err(FragmentError::Parse {
                position: reader.buffer_position(),
                message: format!("unclosed <{}> element", unclosed.tag),
            });
        }

        Ok(Fragment { nodes: roots })
    }

    /// Serializes the tree back to HTML with escaped text and attributes.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            write_node(node, &mut out);
        }
        out
    }
}

fn element_from_start(
    reader: &Reader<&[u8]>,
    start: &BytesStart<'_>,
    position: u64,
) -> Result<Element, FragmentError> {
    let tag = reader
        .decoder()
        .decode(start.name().as_ref())
        .map_err(|err| FragmentError::Parse {
            position,
            message: err.to_string(),
        })?
        .into_owned();
    let mut element = Element::new(tag);
    for attr in start.attributes() {
        let attr = attr.map_err(|err| FragmentError::Parse {
            position,
            message: err.to_string(),
        })?;
        let key = reader
            .decoder()
            .decode(attr.key.as_ref())
            .map_err(|err| FragmentError::Parse {
                position,
                message: err.to_string(),
            })?
            .into_owned();
        let raw = reader
            .decoder()
            .decode(attr.value.as_ref())
            .map_err(|err| FragmentError::Parse {
                position,
                message: err.to_string(),
            })?;
        let value = match quick_xml::escape::unescape(&raw) {
            Ok(unescaped) => unescaped.into_owned(),
            // Non-XML entities (e.g. &nbsp;) stay verbatim in attribute values.
            Err(_) => raw.into_owned(),
        };
        element.attrs.push((key, value));
    }
    Ok(element)
}

fn push_node(stack: &mut [Element], roots: &mut Vec<Node>, node: Node) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => roots.push(node),
    }
}

fn push_text(stack: &mut [Element], roots: &mut Vec<Node>, text: &str) {
    // Merge with a preceding text node so entity references don't split runs.
    let children = match stack.last_mut() {
        Some(parent) => &mut parent.children,
        None => roots,
    };
    if let Some(Node::Text { text: existing }) = children.last_mut() {
        existing.push_str(text);
        return;
    }
    children.push(Node::Text {
        text: text.to_string(),
    });
}

fn resolve_entity(name: &str) -> String {
    let wrapped = format!("&{name};");
    match quick_xml::escape::unescape(&wrapped) {
        Ok(resolved) => resolved.into_owned(),
        // Unknown general entities survive as literal text rather than
        // failing the whole fragment.
        Err(_) => wrapped,
    }
}

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Text { text } => out.push_str(&quick_xml::escape::escape(text.as_str())),
        Node::Element(element) => {
            out.push('<');
            out.push_str(&element.tag);
            for (key, value) in &element.attrs {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                out.push_str(&quick_xml::escape::escape(value.as_str()));
                out.push('"');
            }
            if VOID_TAGS.contains(&element.tag.as_str()) && element.children.is_empty() {
                out.push_str(" />");
                return;
            }
            out.push('>');
            for child in &element.children {
                write_node(child, out);
            }
            out.push_str("</");
            out.push_str(&element.tag);
            out.push('>');
        }
    }
}
