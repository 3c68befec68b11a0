//! Minimal XML element tree over quick-xml
//!
//! The schema tree format is small enough to hold in memory, so the reader
//! builds a plain `Element` tree from the event stream and the writer
//! serializes one back. Tag and attribute names are normalized through
//! `naming::tag_for` on read, which accepts legacy camelCase documents.

use crate::naming::tag_for;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use sffrw_core::{SffError, SffResult};
use std::io::Write;

/// XML element with attributes, children and text content
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    /// Tag name
    pub name: String,
    /// Attributes in document order
    pub attrs: Vec<(String, String)>,
    /// Child elements in document order
    pub children: Vec<Element>,
    /// Concatenated text content, unescaped
    pub text: String,
}

impl Element {
    /// Empty element
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Leaf element holding text
    pub fn leaf(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            ..Self::default()
        }
    }

    /// Add an attribute
    pub fn with_attr(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.attrs.push((name.into(), value.to_string()));
        self
    }

    /// Append a child
    pub fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Append a text leaf when `value` is present
    pub fn push_opt_leaf(&mut self, name: &str, value: Option<impl ToString>) {
        if let Some(value) = value {
            self.push(Element::leaf(name, value.to_string()));
        }
    }

    /// Attribute value by name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// First child with this tag
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Children with this tag
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }
}

/// Parse a document into its root element
pub fn parse(text: &str) -> SffResult<Element> {
    let mut reader = Reader::from_str(text);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let position = reader.buffer_position();
        let event = reader
            .read_event()
            .map_err(|e| SffError::Xml(format!("{} at byte {}", e, position)))?;
        match event {
            Event::Start(start) => stack.push(open(&start, position)?),
            Event::Empty(start) => {
                let element = open(&start, position)?;
                close(&mut stack, &mut root, element, position)?;
            }
            Event::End(_) => {
                let element = stack.pop().ok_or_else(|| {
                    SffError::Xml(format!("unbalanced end tag at byte {}", position))
                })?;
                close(&mut stack, &mut root, element, position)?;
            }
            Event::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    let unescaped = text
                        .unescape()
                        .map_err(|e| SffError::Xml(format!("{} at byte {}", e, position)))?;
                    top.text.push_str(&unescaped);
                }
            }
            Event::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(SffError::Xml(format!("unclosed element <{}>", open.name)));
    }
    root.ok_or_else(|| SffError::Xml("document has no root element".to_string()))
}

fn open(start: &BytesStart<'_>, position: usize) -> SffResult<Element> {
    let mut element = Element::new(tag_for(&String::from_utf8_lossy(start.name().as_ref())));
    for attr in start.attributes() {
        let attr = attr.map_err(|e| SffError::Xml(format!("{} at byte {}", e, position)))?;
        let value = attr
            .unescape_value()
            .map_err(|e| SffError::Xml(format!("{} at byte {}", e, position)))?;
        let key = tag_for(&String::from_utf8_lossy(attr.key.as_ref()));
        element.attrs.push((key, value.into_owned()));
    }
    Ok(element)
}

fn close(
    stack: &mut [Element],
    root: &mut Option<Element>,
    mut element: Element,
    position: usize,
) -> SffResult<()> {
    if !element.children.is_empty() && element.text.trim().is_empty() {
        element.text.clear();
    }
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(SffError::Xml(format!(
                "second root element <{}> at byte {}",
                element.name, position
            )))
        }
    }
    Ok(())
}

/// Serialize `root` as a complete document
pub fn write(root: &Element, writer: &mut dyn Write, indent: usize) -> SffResult<()> {
    let mut xml = if indent == 0 {
        Writer::new(writer)
    } else {
        Writer::new_with_indent(writer, b' ', indent)
    };
    xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_error)?;
    write_element(&mut xml, root)?;
    xml.into_inner().write_all(b"\n")?;
    Ok(())
}

fn write_element<W: Write>(xml: &mut Writer<W>, element: &Element) -> SffResult<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (name, value) in &element.attrs {
        start.push_attribute((name.as_str(), value.as_str()));
    }
    if element.children.is_empty() && element.text.is_empty() {
        return xml.write_event(Event::Empty(start)).map_err(xml_error);
    }
    xml.write_event(Event::Start(start)).map_err(xml_error)?;
    if !element.text.is_empty() {
        xml.write_event(Event::Text(BytesText::new(&element.text)))
            .map_err(xml_error)?;
    }
    for child in &element.children {
        write_element(xml, child)?;
    }
    xml.write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(xml_error)
}

fn xml_error(e: quick_xml::Error) -> SffError {
    SffError::Xml(e.to_string())
}
