use indexmap::IndexMap;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::Error;

/// Minimal in-memory XML element, holding everything lattice graph libraries
/// use: attributes, child elements and text content.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct XmlElement {
    pub name: String,
    pub attributes: IndexMap<String, String>,
    pub children: Vec<XmlElement>,
    pub text: String,
}

impl XmlElement {
    pub fn new(name: &str) -> XmlElement {
        XmlElement {
            name: name.into(),
            attributes: IndexMap::new(),
            children: Vec::new(),
            text: String::new(),
        }
    }

    #[must_use]
    pub fn with_attribute(mut self, name: &str, value: impl ToString) -> XmlElement {
        self.attributes.insert(name.into(), value.to_string());
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> XmlElement {
        self.text = text.into();
        self
    }

    pub fn push(&mut self, child: XmlElement) {
        self.children.push(child);
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Get the first child element with the given tag `name`
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|child| child.name == name)
    }

    /// Iterate over all the child elements with the given tag `name`
    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// Get the first child with the given `tag` and a `name` attribute equal
    /// to `name`
    pub fn named_child(&self, tag: &str, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|child| child.name == tag && child.attribute("name") == Some(name))
    }

    /// Parse a full XML document, and return its root element
    pub fn parse(document: &str) -> Result<XmlElement, Error> {
        let mut reader = Reader::from_str(document);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root = None;
        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    stack.push(element_from_start(&start)?);
                }
                Event::Empty(start) => {
                    let element = element_from_start(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    // quick-xml already checks that end tags match start tags
                    let element = stack.pop().ok_or_else(|| Error::InvalidXml(
                        "unexpected closing tag".into()
                    ))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&text.unescape()?);
                    }
                }
                Event::CData(data) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(&data));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(element) = stack.last() {
            return Err(Error::InvalidXml(format!(
                "unclosed <{}> element at the end of the document", element.name
            )));
        }

        return root.ok_or_else(|| Error::InvalidXml("the document does not contain any element".into()));
    }

    /// Write this element and all its children as an indented XML document
    pub fn to_document(&self) -> Result<String, Error> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        self.write(&mut writer)?;

        let buffer = writer.into_inner();
        let mut document = String::from_utf8(buffer).map_err(|e| Error::InvalidXml(
            format!("generated XML is not valid UTF-8: {}", e)
        ))?;
        document.push('\n');
        return Ok(document);
    }

    fn write(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), Error> {
        let start = BytesStart::new(self.name.as_str()).with_attributes(
            self.attributes.iter().map(|(name, value)| (name.as_str(), value.as_str()))
        );

        if self.children.is_empty() && self.text.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        if !self.text.is_empty() {
            writer.write_event(Event::Text(BytesText::new(&self.text)))?;
        }
        for child in &self.children {
            child.write(writer)?;
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;

        Ok(())
    }
}

fn element_from_start(start: &BytesStart) -> Result<XmlElement, Error> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut element = XmlElement::new(&name);
    for attribute in start.attributes() {
        let attribute = attribute?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute.unescape_value()?.into_owned();
        element.attributes.insert(key, value);
    }
    return Ok(element);
}

/// Attach a finished `element` to its parent, or make it the document root
fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) -> Result<(), Error> {
    if let Some(parent) = stack.last_mut() {
        parent.push(element);
        return Ok(());
    }

    if root.is_some() {
        return Err(Error::InvalidXml(format!(
            "multiple root elements in the document, found a second <{}>", element.name
        )));
    }
    *root = Some(element);
    Ok(())
}
