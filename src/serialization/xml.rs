/*!

A minimal element tree over `quick-xml`, shared by the XMI and XCAS codecs. Documents are small enough to hold in
memory, and both codecs need random access to the root's attributes before they can interpret its children.

An element has a name, attributes in document order, child elements, and the concatenated text directly inside it.
Text beside child elements is ignored, so indentation does not matter.

*/

use std::io::Write;

use quick_xml::{
  events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
  Reader,
  Writer,
};

use crate::{
  abstractions::NatSet,
  api::{Cas, FsRef},
  serialization::serial_error::{SerialError, SerialResult},
};

/// The literal prefix that routes a stream to the XML codecs.
pub const XML_PROLOG: &[u8] = b"<?xml ";

pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const XSI_NIL      : &str = "xsi:nil";

/// Settings for the XML writers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct XmlOptions {
  /// Spaces per nesting level, or `None` to write everything on one line.
  pub indent: Option<usize>,
}

impl Default for XmlOptions {
  fn default() -> Self {
    XmlOptions { indent: Some(2) }
  }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct XmlElement {
  pub name      : String,
  pub attributes: Vec<(String, String)>,
  pub children  : Vec<XmlElement>,
  pub text      : Option<String>,
}

impl XmlElement {
  pub fn new(name: &str) -> XmlElement {
    XmlElement {
      name: name.to_string(),
      ..XmlElement::default()
    }
  }

  pub fn with_attribute(mut self, name: &str, value: &str) -> XmlElement {
    self.push_attribute(name, value);
    self
  }

  pub fn push_attribute(&mut self, name: &str, value: &str) {
    self.attributes.push((name.to_string(), value.to_string()));
  }

  pub fn attribute(&self, name: &str) -> Option<&str> {
    self.attributes
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
  }

  /// A leaf holding `text`, or marked nil if `text` is `None`.
  pub fn leaf(name: &str, text: Option<&str>) -> XmlElement {
    match text {
      Some(text) => XmlElement { text: Some(text.to_string()), ..XmlElement::new(name) },
      None       => XmlElement::new(name).with_attribute(XSI_NIL, "true"),
    }
  }

  /// The value of a leaf: `None` if it is marked nil, its text otherwise.
  pub fn value(&self) -> Option<String> {
    if self.attribute(XSI_NIL) == Some("true") {
      return None;
    }
    Some(self.text.clone().unwrap_or_default())
  }
}

pub fn is_xml(bytes: &[u8]) -> bool {
  bytes.starts_with(XML_PROLOG)
}

/// Parses a whole document and returns its root element.
pub fn parse(bytes: &[u8]) -> SerialResult<XmlElement> {
  let mut reader = Reader::from_reader(bytes);
  reader.trim_text(false);

  let mut buffer = Vec::new();
  let mut open: Vec<XmlElement> = Vec::new();
  let mut root: Option<XmlElement> = None;

  loop {
    match reader.read_event_into(&mut buffer)? {
      Event::Start(start) => open.push(element_from(&start)?),

      Event::Empty(start) => {
        let element = element_from(&start)?;
        close(element, &mut open, &mut root)?;
      }

      Event::End(_) => {
        let Some(element) = open.pop() else {
          return Err(SerialError::Xml("closing tag without an open element".to_string()));
        };
        close(element, &mut open, &mut root)?;
      }

      Event::Text(text) => {
        if let Some(current) = open.last_mut() {
          current.text.get_or_insert_with(String::new).push_str(&text.unescape()?);
        }
      }

      Event::CData(data) => {
        if let Some(current) = open.last_mut() {
          current.text.get_or_insert_with(String::new).push_str(&String::from_utf8_lossy(&data));
        }
      }

      Event::Eof => break,

      _ => {}
    }
    buffer.clear();
  }

  if !open.is_empty() {
    return Err(SerialError::Xml(format!("unclosed element <{}>", open[open.len() - 1].name)));
  }
  root.ok_or_else(|| SerialError::Xml("document has no root element".to_string()))
}

fn element_from(start: &BytesStart) -> SerialResult<XmlElement> {
  let mut element = XmlElement::new(&String::from_utf8_lossy(start.name().as_ref()));
  for attribute in start.attributes() {
    let attribute = attribute?;
    let key       = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
    let value     = attribute.unescape_value()?.into_owned();
    element.attributes.push((key, value));
  }
  Ok(element)
}

fn close(element: XmlElement, open: &mut [XmlElement], root: &mut Option<XmlElement>) -> SerialResult<()> {
  match open.last_mut() {
    Some(parent) => {
      parent.children.push(element);
      Ok(())
    }
    None if root.is_none() => {
      *root = Some(element);
      Ok(())
    }
    None => Err(SerialError::Xml("more than one root element".to_string())),
  }
}

/// Writes `root` as a document with an XML declaration.
pub fn write(out: &mut dyn Write, root: &XmlElement, options: &XmlOptions) -> SerialResult<()> {
  let mut writer = match options.indent {
    Some(indent) => Writer::new_with_indent(out, b' ', indent),
    None         => Writer::new(out),
  };
  writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
  write_element(&mut writer, root)?;
  writer.into_inner().write_all(b"\n")?;
  Ok(())
}

fn write_element<W: Write>(writer: &mut Writer<W>, element: &XmlElement) -> SerialResult<()> {
  let mut start = BytesStart::new(element.name.as_str());
  for (key, value) in element.attributes.iter() {
    start.push_attribute((key.as_str(), value.as_str()));
  }

  if element.children.is_empty() && element.text.is_none() {
    writer.write_event(Event::Empty(start))?;
    return Ok(());
  }

  writer.write_event(Event::Start(start))?;
  if let Some(text) = &element.text {
    // Written even when empty, so no indentation lands inside the element.
    writer.write_event(Event::Text(BytesText::new(text)))?;
  }
  for child in element.children.iter() {
    write_element(writer, child)?;
  }
  writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
  Ok(())
}

/// The records the XML codecs write, in the order they write them: each view's sofa, then each view's indexed
/// records, then everything reachable from those by reference, breadth first.
pub fn emission_order(cas: &Cas) -> Vec<FsRef> {
  let mut seen  = NatSet::new();
  let mut order = Vec::new();

  let roots = cas
      .views()
      .map(|view| cas.sofa(view))
      .chain(cas.views().flat_map(|view| cas.all_indexed_fs(view)));
  for fs in roots {
    if seen.insert(fs.idx()) {
      order.push(fs);
    }
  }

  let mut next = 0;
  while next < order.len() {
    let fs = order[next];
    next  += 1;
    let Some(record) = cas.heap().get(fs) else { continue };
    for target in record.references() {
      if seen.insert(target.idx()) {
        order.push(target);
      }
    }
  }
  order
}
