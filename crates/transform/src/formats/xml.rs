use bytes::Bytes;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::classify::PipelineKind;
use crate::error::ParseError;

/// A well-formed XML body with exactly one root element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    pub root: XmlElement,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

impl XmlElement {
    /// Direct text children, each trimmed, joined by a single space.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|child| match child {
                XmlNode::Text(text) => Some(text.trim()),
                XmlNode::Element(_) => None,
            })
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|child| match child {
            XmlNode::Element(el) => Some(el),
            XmlNode::Text(_) => None,
        })
    }
}

/// Elements nested deeper than this are rejected as malformed.
pub const MAX_DEPTH: usize = 128;

fn malformed(err: impl std::fmt::Display) -> ParseError {
    ParseError::malformed(PipelineKind::Xml, err)
}

/// Deserializes an XML body into an element tree. Whitespace-only text is
/// dropped; declarations, comments and processing instructions are ignored.
/// Nesting beyond [`MAX_DEPTH`] is malformed so the tree can be walked
/// recursively later.
pub fn parse_xml(body: &Bytes) -> Result<XmlDocument, ParseError> {
    let text = std::str::from_utf8(body).map_err(malformed)?;
    if text.trim().is_empty() {
        return Err(ParseError::Empty {
            format: PipelineKind::Xml,
        });
    }

    let mut reader = Reader::from_str(text);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(start) => {
                check_depth(&stack)?;
                stack.push(open_element(&start)?);
            }
            Event::Empty(start) => {
                check_depth(&stack)?;
                let element = open_element(&start)?;
                close_element(element, &mut stack, &mut root)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| malformed("closing tag without an open element"))?;
                close_element(element, &mut stack, &mut root)?;
            }
            Event::Text(raw) => {
                let value = raw.unescape().map_err(malformed)?;
                push_text(value.into_owned(), &mut stack)?;
            }
            Event::CData(raw) => {
                push_text(String::from_utf8_lossy(&raw).into_owned(), &mut stack)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(malformed(format!("element <{}> is never closed", open.name)));
    }

    root.map(|root| XmlDocument { root })
        .ok_or(ParseError::Empty {
            format: PipelineKind::Xml,
        })
}

fn check_depth(stack: &[XmlElement]) -> Result<(), ParseError> {
    if stack.len() >= MAX_DEPTH {
        return Err(malformed(format!(
            "elements nested deeper than {MAX_DEPTH} levels"
        )));
    }
    Ok(())
}

fn open_element(start: &BytesStart<'_>) -> Result<XmlElement, ParseError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(malformed)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(malformed)?.into_owned();
        attributes.push((key, value));
    }
    Ok(XmlElement {
        name,
        attributes,
        children: Vec::new(),
    })
}

fn close_element(
    element: XmlElement,
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
) -> Result<(), ParseError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(element)),
        None if root.is_some() => {
            return Err(malformed(format!(
                "second root element <{}>",
                element.name
            )))
        }
        None => *root = Some(element),
    }
    Ok(())
}

fn push_text(text: String, stack: &mut [XmlElement]) -> Result<(), ParseError> {
    if text.trim().is_empty() {
        return Ok(());
    }
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(XmlNode::Text(text));
            Ok(())
        }
        None => Err(malformed("text outside the root element")),
    }
}
