//! Owned XML element tree
//!
//! Schema documents are small, so they are read completely into memory with
//! `quick-xml` before any schema element is interpreted. Text content is kept
//! only for elements that carry it (descriptions); comments, processing
//! instructions and the declaration are dropped.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{ModelError, ModelResult};

/// An element with its attributes (in document order), child elements and text
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    pub text: String,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Attribute value, if present
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Attribute value when present and not blank
    pub fn non_empty_attr(&self, name: &str) -> Option<&str> {
        self.attr(name).filter(|v| !v.trim().is_empty())
    }

    /// Attribute value, or an empty string
    pub fn attr_or_empty(&self, name: &str) -> &str {
        self.attr(name).unwrap_or("")
    }

    /// True when the attribute is set to `true` (case-insensitive)
    pub fn bool_attr(&self, name: &str) -> bool {
        self.attr(name)
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    /// Like [`bool_attr`](Self::bool_attr) but with a default for a missing attribute
    pub fn bool_attr_or(&self, name: &str, default: bool) -> bool {
        match self.attr(name) {
            Some(v) => v.trim().eq_ignore_ascii_case("true"),
            None => default,
        }
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Text of this element and all its descendants, trimmed
    pub fn text_content(&self) -> String {
        let mut parts = Vec::new();
        self.collect_text(&mut parts);
        parts.join(" ").trim().to_string()
    }

    fn collect_text(&self, parts: &mut Vec<String>) {
        if !self.text.trim().is_empty() {
            parts.push(self.text.trim().to_string());
        }
        for child in &self.children {
            child.collect_text(parts);
        }
    }

    /// Fail with a syntax error on the first attribute outside `allowed`
    pub fn check_attributes(&self, allowed: &[&str], context: &str) -> ModelResult<()> {
        for (key, _) in &self.attributes {
            if !allowed.contains(&key.as_str()) {
                return Err(ModelError::syntax(format!(
                    "attribute '{}' not allowed for <{}> {}",
                    key, self.name, context
                )));
            }
        }
        Ok(())
    }
}

/// Parse a document and return its root element
pub fn parse_document(content: &str) -> ModelResult<XmlElement> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                stack.push(element_from(e)?);
            }
            Ok(Event::Empty(ref e)) => {
                let element = element_from(e)?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::End(_)) => {
                let element = stack.pop().ok_or_else(|| ModelError::Xml {
                    position: reader.buffer_position() as u64,
                    message: "unexpected closing tag".to_string(),
                })?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::Text(ref e)) => {
                let text = e.unescape().map_err(|err| ModelError::Xml {
                    position: reader.buffer_position() as u64,
                    message: err.to_string(),
                })?;
                if let Some(current) = stack.last_mut() {
                    if !current.text.is_empty() {
                        current.text.push(' ');
                    }
                    current.text.push_str(&text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ModelError::Xml {
                    position: reader.error_position() as u64,
                    message: e.to_string(),
                });
            }
        }
    }

    if !stack.is_empty() {
        return Err(ModelError::Xml {
            position: reader.buffer_position() as u64,
            message: format!("unclosed element <{}>", stack[stack.len() - 1].name),
        });
    }
    root.ok_or_else(|| ModelError::Xml {
        position: 0,
        message: "document has no root element".to_string(),
    })
}

fn element_from(start: &BytesStart<'_>) -> ModelResult<XmlElement> {
    let mut element = XmlElement::new(String::from_utf8_lossy(start.local_name().as_ref()));
    for attr in start.attributes() {
        let attr = attr.map_err(|e| ModelError::syntax(format!("malformed attribute: {}", e)))?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| ModelError::syntax(format!("malformed value of '{}': {}", key, e)))?;
        element.attributes.push((key, value.into_owned()));
    }
    Ok(element)
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> ModelResult<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(ModelError::syntax(format!(
                "document has more than one root element (found <{}>)",
                element.name
            )));
        }
    }
    Ok(())
}
