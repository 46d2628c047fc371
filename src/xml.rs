//! Minimal owned element tree over quick-xml events.
//!
//! Adapters need grouped, repeatable access to a report's nodes (module
//! records are matched by name across the whole document and file records
//! are fanned out to worker threads), so the event stream is materialized
//! once into an immutable tree that is shared read-only afterwards.

use std::str;
use std::str::FromStr;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{CovtreeError, Result};

/// A single element: name, attributes and child elements. Text content is
/// not retained; the formats consumed here carry all data in attributes.
#[derive(Debug, Clone)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
}

impl Element {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value of an attribute, if present.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Value of a required attribute; a missing attribute is malformed input.
    pub fn require_attribute(&self, attribute: &str) -> Result<&str> {
        self.attribute(attribute)
            .ok_or_else(|| CovtreeError::MissingAttribute {
                element: self.name.clone(),
                attribute: attribute.to_string(),
            })
    }

    /// A required attribute parsed as an integer.
    pub fn require_int<T: FromStr>(&self, attribute: &str) -> Result<T> {
        let value = self.require_attribute(attribute)?;
        value.parse().map_err(|_| CovtreeError::InvalidInteger {
            element: self.name.clone(),
            attribute: attribute.to_string(),
            value: value.to_string(),
        })
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// Direct children with the given element name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |child| child.name == name)
    }

    fn collect_descendants<'a>(&'a self, name: &str, out: &mut Vec<&'a Element>) {
        for child in &self.children {
            if child.name == name {
                out.push(child);
            }
            child.collect_descendants(name, out);
        }
    }
}

/// A fully parsed report document.
#[derive(Debug, Clone)]
pub struct Document {
    root: Element,
}

impl Document {
    /// Build the element tree from raw XML bytes. Input without a root
    /// element is rejected as a missing document.
    pub fn parse(input: &[u8]) -> Result<Document> {
        let mut reader = Reader::from_reader(input);
        let mut buf = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Err(e) => {
                    return Err(CovtreeError::Xml {
                        source: e,
                        position: reader.buffer_position(),
                    })
                }
                Ok(Event::Eof) => break,
                Ok(Event::Start(ref e)) => stack.push(element_from_start(e)),
                Ok(Event::Empty(ref e)) => {
                    let element = element_from_start(e);
                    attach(element, &mut stack, &mut root);
                }
                Ok(Event::End(_)) => {
                    if let Some(element) = stack.pop() {
                        attach(element, &mut stack, &mut root);
                    }
                }
                Ok(_) => {}
            }
            buf.clear();
        }

        root.map(|root| Document { root })
            .ok_or(CovtreeError::MissingDocument)
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    /// All elements with the given name, root included, in document order.
    pub fn descendants(&self, name: &str) -> Vec<&Element> {
        let mut out = Vec::new();
        if self.root.name == name {
            out.push(&self.root);
        }
        self.root.collect_descendants(name, &mut out);
        out
    }
}

fn attach(element: Element, stack: &mut Vec<Element>, root: &mut Option<Element>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

/// Decode an element name and its attributes from a start tag. Attributes
/// that fail to decode are skipped; required-field checks happen at lookup.
fn element_from_start(e: &BytesStart) -> Element {
    let attributes = e
        .attributes()
        .filter_map(|a| {
            let attr = a.ok()?;
            let key = str::from_utf8(attr.key.local_name().into_inner())
                .ok()?
                .to_string();
            let value = attr.unescape_value().ok()?.to_string();
            Some((key, value))
        })
        .collect();

    Element {
        name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
        attributes,
        children: Vec::new(),
    }
}
