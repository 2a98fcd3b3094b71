/*!

XMI: the standoff XML interchange form.

The root is `xmi:XMI` with `xmi:version="2.0"`. Each type package gets an XML namespace, `http:///org/example.ecore`
for `org.example`, bound to a prefix derived from the package's last segment. Every record is one element named
`prefix:ShortName` with an `xmi:id`; identifier `0` is reserved for the `cas:NULL` element. Features are attributes:
primitives in canonical form, references as the target's identifier. Array elements are a space-separated `elements`
attribute, except for string arrays, whose elements are child elements so they may contain spaces. Each view is a
`cas:View` element naming its sofa and its indexed records.

*/

use std::{collections::BTreeMap, io::Write};

use crate::{
  api::{ArrayData, Cas, FsData, FsRef, Value},
  core::type_system::builtins::TYPE_NAME_SOFA,
  serialization::{
    assemble::{assemble, PendingCas, PendingData, PendingRecord, PendingView, Slot},
    serial_error::{SerialError, SerialResult},
    xml::{emission_order, write, XmlElement, XmlOptions, XSI_NAMESPACE, XSI_NIL},
  },
};

pub const XMI_NAMESPACE: &str = "http://www.omg.org/XMI";
pub const XMI_VERSION  : &str = "2.0";
const XMI_ID           : &str = "xmi:id";
const NAMESPACE_PREFIX : &str = "http:///";
const NAMESPACE_SUFFIX : &str = ".ecore";
/// Package of types whose names have no dot.
const NO_NAMESPACE     : &str = "uima.noNamespace";
const CAS_PACKAGE      : &str = "uima.cas";
const ELEMENTS         : &str = "elements";

fn xmi_id(fs: FsRef) -> String {
  (fs.0 as u64 + 1).to_string()
}

fn split_type_name(name: &str) -> (&str, &str) {
  name.rsplit_once('.').unwrap_or((NO_NAMESPACE, name))
}

fn namespace_uri(package: &str) -> String {
  format!("{}{}{}", NAMESPACE_PREFIX, package.replace('.', "/"), NAMESPACE_SUFFIX)
}

fn package_of_uri(uri: &str) -> Option<String> {
  let path = uri.strip_prefix(NAMESPACE_PREFIX)?.strip_suffix(NAMESPACE_SUFFIX)?;
  Some(path.replace('/', "."))
}

/// Prefixes for packages, unique within a document.
#[derive(Default)]
struct Namespaces {
  prefixes: BTreeMap<String, String>,
}

impl Namespaces {
  fn prefix(&mut self, package: &str) -> String {
    if let Some(prefix) = self.prefixes.get(package) {
      return prefix.clone();
    }
    let base = package.rsplit('.').next().unwrap_or(package).to_string();
    let mut prefix = base.clone();
    let mut suffix = 2;
    while prefix == "xmi" || prefix == "xsi" || self.prefixes.values().any(|taken| *taken == prefix) {
      prefix = format!("{}{}", base, suffix);
      suffix += 1;
    }
    self.prefixes.insert(package.to_string(), prefix.clone());
    prefix
  }

  fn element_name(&mut self, type_name: &str) -> String {
    let (package, short) = split_type_name(type_name);
    format!("{}:{}", self.prefix(package), short)
  }
}

// region Writing

pub fn serialize(cas: &Cas, out: &mut dyn Write, options: &XmlOptions) -> SerialResult<()> {
  let type_system    = cas.type_system();
  let mut namespaces = Namespaces::default();
  let cas_prefix     = namespaces.prefix(CAS_PACKAGE);
  let mut children   = vec![XmlElement::new(&format!("{}:NULL", cas_prefix)).with_attribute(XMI_ID, "0")];

  for fs in emission_order(cas) {
    let record   = cas.record(fs)?;
    let mut element = XmlElement::new(&namespaces.element_name(type_system.type_name(record.type_code)));
    element.push_attribute(XMI_ID, &xmi_id(fs));

    match &record.data {
      FsData::Features(slots) => {
        for (feature, slot) in type_system.features_of(record.type_code).iter().zip(slots.iter()) {
          let name = &type_system.feature(*feature).name;
          match slot {
            Value::Fs(Some(target)) => element.push_attribute(name, &xmi_id(*target)),
            Value::Fs(None) | Value::String(None) => {}
            primitive => {
              if let Some(text) = primitive.to_canonical_string() {
                element.push_attribute(name, &text);
              }
            }
          }
        }
      }

      FsData::Array(ArrayData::String(strings)) => {
        for string in strings {
          element.children.push(XmlElement::leaf(ELEMENTS, string.as_deref()));
        }
      }

      FsData::Array(ArrayData::Fs(targets)) => {
        if !targets.is_empty() {
          let ids: Vec<String> = targets.iter().map(|t| t.map_or_else(|| "0".to_string(), xmi_id)).collect();
          element.push_attribute(ELEMENTS, &ids.join(" "));
        }
      }

      FsData::Array(array) => {
        if !array.is_empty() {
          let mut texts = Vec::with_capacity(array.len());
          for index in 0..array.len() {
            texts.push(array.element_to_string(index)?.unwrap_or_default());
          }
          element.push_attribute(ELEMENTS, &texts.join(" "));
        }
      }
    }
    children.push(element);
  }

  for view in cas.views() {
    let mut element = XmlElement::new(&format!("{}:View", cas_prefix))
        .with_attribute("sofa", &xmi_id(cas.sofa(view)));
    let members = cas.all_indexed_fs(view);
    if !members.is_empty() {
      let ids: Vec<String> = members.into_iter().map(xmi_id).collect();
      element.push_attribute("members", &ids.join(" "));
    }
    children.push(element);
  }

  let mut root = XmlElement::new("xmi:XMI")
      .with_attribute("xmlns:xmi", XMI_NAMESPACE)
      .with_attribute("xmlns:xsi", XSI_NAMESPACE);
  for (package, prefix) in namespaces.prefixes.iter() {
    root.push_attribute(&format!("xmlns:{}", prefix), &namespace_uri(package));
  }
  root.push_attribute("xmi:version", XMI_VERSION);
  root.children = children;

  write(out, &root, options)
}

// endregion

// region Reading

pub fn is_xmi(root: &XmlElement) -> bool {
  root.name == "xmi:XMI" || root.attribute("xmi:version").is_some()
}

fn parse_id(text: &str) -> SerialResult<u64> {
  text.trim()
      .parse()
      .map_err(|_| SerialError::Corrupt(format!("\"{}\" is not an xmi:id", text)))
}

fn parse_ids(text: Option<&str>) -> SerialResult<Vec<u64>> {
  text.unwrap_or_default().split_whitespace().map(parse_id).collect()
}

/// Replaces the contents of `cas` with the XMI document `root`. Elements of unknown types fail unless `lenient`.
pub fn deserialize(root: &XmlElement, cas: &mut Cas, lenient: bool) -> SerialResult<()> {
  let mut packages: BTreeMap<&str, String> = BTreeMap::new();
  for (key, value) in root.attributes.iter() {
    if let Some(prefix) = key.strip_prefix("xmlns:") {
      if let Some(package) = package_of_uri(value) {
        packages.insert(prefix, package);
      }
    }
  }

  let type_system = cas.type_system().clone();
  let mut pending = PendingCas::default();

  for element in root.children.iter() {
    let Some((prefix, short)) = element.name.split_once(':') else {
      return Err(SerialError::Corrupt(format!("element <{}> has no namespace prefix", element.name)));
    };
    if prefix == "xmi" {
      continue;
    }
    let Some(package) = packages.get(prefix) else {
      return Err(SerialError::Corrupt(format!("undeclared namespace prefix \"{}\"", prefix)));
    };

    if package == CAS_PACKAGE {
      match short {
        "NULL" => continue,
        "View" => {
          let sofa = element
              .attribute("sofa")
              .ok_or_else(|| SerialError::Corrupt("cas:View without a sofa".to_string()))?;
          pending.views.push(PendingView {
            name   : String::new(),
            sofa   : parse_id(sofa)?,
            members: parse_ids(element.attribute("members"))?,
          });
          continue;
        }
        _ => {}
      }
    }

    let type_name = if package == NO_NAMESPACE { short.to_string() } else { format!("{}.{}", package, short) };
    let id = parse_id(
      element
          .attribute(XMI_ID)
          .ok_or_else(|| SerialError::Corrupt(format!("<{}> has no xmi:id", element.name)))?
    )?;

    let is_array = type_system
        .type_by_name(&type_name)
        .map_or(false, |code| type_system.array_kind(code).is_some());
    let data = if is_array {
      let mut elements: Vec<Slot> = element
          .attribute(ELEMENTS)
          .unwrap_or_default()
          .split_whitespace()
          .map(|text| Slot::Text(Some(text.to_string())))
          .collect();
      elements.extend(
        element.children.iter().filter(|child| child.name == ELEMENTS).map(|child| Slot::Text(child.value()))
      );
      PendingData::Elements(elements)
    } else {
      let mut features: Vec<(String, Slot)> = element
          .attributes
          .iter()
          .filter(|(key, _)| key != XMI_ID && key != XSI_NIL)
          .map(|(key, value)| (key.clone(), Slot::Text(Some(value.clone()))))
          .collect();
      features.extend(element.children.iter().map(|child| (child.name.clone(), Slot::Text(child.value()))));
      PendingData::Features(features)
    };

    pending.records.push(PendingRecord { id, type_name, data });
  }

  name_views(&mut pending)?;
  assemble(cas, pending, lenient)
}

/// Views in XMI name only their sofa; the view name is the sofa's `sofaID`.
fn name_views(pending: &mut PendingCas) -> SerialResult<()> {
  for view in pending.views.iter_mut() {
    let sofa_id = pending
        .records
        .iter()
        .find(|record| record.id == view.sofa && record.type_name == TYPE_NAME_SOFA)
        .and_then(|record| match &record.data {
          PendingData::Features(features) => features.iter().find(|(name, _)| name == "sofaID").map(|(_, slot)| slot),
          PendingData::Elements(_) => None,
        });
    match sofa_id {
      Some(Slot::Text(Some(name))) => view.name = name.clone(),
      _ => return Err(SerialError::Corrupt(format!("view sofa {} is not a sofa with an identifier", view.sofa))),
    }
  }
  Ok(())
}

// endregion

