/*!

XCAS: the older XML form, one element per record named by the record's full type name.

```xml
<CAS version="2">
  <uima.cas.Sofa _id="1" sofaNum="1" sofaID="_InitialView" sofaString="a b"/>
  <org.example.Token _id="2" _indexed="1" _ref_sofa="1" begin="0" end="1"/>
  <uima.cas.StringArray _id="3" size="2"><i>a</i><i _nil="true"/></uima.cas.StringArray>
</CAS>
```

Primitive features are attributes named by the feature's base name. References are `_ref_` attributes holding the
target's `_id`. `_indexed` lists the `sofaNum` of every view whose indexes hold the record. Views are recovered from the
sofa records, in `sofaNum` order.

*/

use std::io::Write;

use crate::{
  abstractions::HashMap,
  api::{ArrayData, Cas, FsData, FsRef, Value},
  core::type_system::builtins::{SOFA_ID, SOFA_NUM, TYPE_NAME_SOFA},
  serialization::{
    assemble::{assemble, PendingCas, PendingData, PendingRecord, PendingView, Slot},
    serial_error::{SerialError, SerialResult},
    xml::{emission_order, write, XmlElement, XmlOptions},
  },
};

pub const XCAS_ROOT   : &str = "CAS";
pub const XCAS_VERSION: &str = "2";
const ID              : &str = "_id";
const INDEXED         : &str = "_indexed";
const REF_PREFIX      : &str = "_ref_";
const NIL             : &str = "_nil";
const SIZE            : &str = "size";
const ELEMENT         : &str = "i";

fn xcas_id(fs: FsRef) -> String {
  (fs.0 as u64 + 1).to_string()
}

// region Writing

pub fn serialize(cas: &Cas, out: &mut dyn Write, options: &XmlOptions) -> SerialResult<()> {
  let type_system = cas.type_system();

  // The sofaNum of every view whose indexes hold each record.
  let mut indexed_in: HashMap<FsRef, Vec<String>> = HashMap::default();
  for view in cas.views() {
    let sofa_num = cas.feature_value(cas.sofa(view), SOFA_NUM)?.to_string();
    for fs in cas.all_indexed_fs(view) {
      indexed_in.entry(fs).or_default().push(sofa_num.clone());
    }
  }

  let mut root = XmlElement::new(XCAS_ROOT).with_attribute("version", XCAS_VERSION);
  for fs in emission_order(cas) {
    let record      = cas.record(fs)?;
    let mut element = XmlElement::new(type_system.type_name(record.type_code)).with_attribute(ID, &xcas_id(fs));
    if let Some(sofa_nums) = indexed_in.get(&fs) {
      element.push_attribute(INDEXED, &sofa_nums.join(" "));
    }

    match &record.data {
      FsData::Features(slots) => {
        for (feature, slot) in type_system.features_of(record.type_code).iter().zip(slots.iter()) {
          let name = &type_system.feature(*feature).name;
          match slot {
            Value::Fs(Some(target)) => element.push_attribute(&format!("{}{}", REF_PREFIX, name), &xcas_id(*target)),
            Value::Fs(None) | Value::String(None) => {}
            primitive => {
              if let Some(text) = primitive.to_canonical_string() {
                element.push_attribute(name, &text);
              }
            }
          }
        }
      }

      FsData::Array(array) => {
        element.push_attribute(SIZE, &array.len().to_string());
        for index in 0..array.len() {
          let item = match array {
            ArrayData::Fs(targets) => {
              let id = targets[index].map_or_else(|| "0".to_string(), xcas_id);
              XmlElement { text: Some(id), ..XmlElement::new(ELEMENT) }
            }
            _ => match array.element_to_string(index)? {
              Some(text) => XmlElement { text: Some(text), ..XmlElement::new(ELEMENT) },
              None       => XmlElement::new(ELEMENT).with_attribute(NIL, "true"),
            },
          };
          element.children.push(item);
        }
      }
    }
    root.children.push(element);
  }

  write(out, &root, options)
}

// endregion

// region Reading

pub fn is_xcas(root: &XmlElement) -> bool {
  root.name == XCAS_ROOT
}

fn parse_id(text: &str) -> SerialResult<u64> {
  text.trim()
      .parse()
      .map_err(|_| SerialError::Corrupt(format!("\"{}\" is not an XCAS identifier", text)))
}

fn element_slot(item: &XmlElement) -> Slot {
  if item.attribute(NIL) == Some("true") {
    Slot::Text(None)
  } else {
    Slot::Text(Some(item.text.clone().unwrap_or_default()))
  }
}

/// Replaces the contents of `cas` with the XCAS document `root`. Elements of unknown types fail unless `lenient`.
pub fn deserialize(root: &XmlElement, cas: &mut Cas, lenient: bool) -> SerialResult<()> {
  let type_system = cas.type_system().clone();
  let mut pending = PendingCas::default();
  // (sofaNum, stream id of the sofa, view name)
  let mut sofas: Vec<(i64, u64, String)> = Vec::new();
  // stream id to the sofaNums of the views indexing it, in document order
  let mut memberships: Vec<(u64, Vec<i64>)> = Vec::new();

  for element in root.children.iter() {
    let id = parse_id(
      element
          .attribute(ID)
          .ok_or_else(|| SerialError::Corrupt(format!("<{}> has no _id", element.name)))?
    )?;

    if let Some(indexed) = element.attribute(INDEXED) {
      let sofa_nums = indexed
          .split_whitespace()
          .map(|text| {
            text.parse::<i64>()
                .map_err(|_| SerialError::Corrupt(format!("\"{}\" is not a sofa number", text)))
          })
          .collect::<SerialResult<Vec<i64>>>()?;
      memberships.push((id, sofa_nums));
    }

    let is_array = type_system
        .type_by_name(&element.name)
        .map_or(false, |code| type_system.array_kind(code).is_some());
    let data = if is_array {
      let elements: Vec<Slot> = element.children.iter().filter(|item| item.name == ELEMENT).map(element_slot).collect();
      if let Some(size) = element.attribute(SIZE) {
        if size.trim().parse::<usize>().ok() != Some(elements.len()) {
          return Err(SerialError::Corrupt(format!("array {} declares size {} but has {} elements", id, size, elements.len())));
        }
      }
      PendingData::Elements(elements)
    } else {
      let features: Vec<(String, Slot)> = element
          .attributes
          .iter()
          .filter(|(key, _)| key != ID && key != INDEXED)
          .map(|(key, value)| match key.strip_prefix(REF_PREFIX) {
            Some(feature) => (feature.to_string(), Slot::Text(Some(value.clone()))),
            None          => (key.clone(), Slot::Text(Some(value.clone()))),
          })
          .collect();
      PendingData::Features(features)
    };

    if element.name == TYPE_NAME_SOFA {
      if let PendingData::Features(features) = &data {
        let text_of = |wanted: &str| {
          features.iter().find(|(name, _)| name == wanted).and_then(|(_, slot)| match slot {
            Slot::Text(text) => text.clone(),
            _ => None,
          })
        };
        let sofa_num_name = &type_system.feature(SOFA_NUM).name;
        let sofa_id_name  = &type_system.feature(SOFA_ID).name;
        let sofa_num = text_of(sofa_num_name)
            .and_then(|text| text.trim().parse::<i64>().ok())
            .ok_or_else(|| SerialError::Corrupt(format!("sofa {} has no sofaNum", id)))?;
        let name = text_of(sofa_id_name).ok_or_else(|| SerialError::Corrupt(format!("sofa {} has no sofaID", id)))?;
        sofas.push((sofa_num, id, name));
      }
    }

    pending.records.push(PendingRecord { id, type_name: element.name.clone(), data });
  }

  sofas.sort_by_key(|(sofa_num, _, _)| *sofa_num);
  for (sofa_num, sofa, name) in sofas {
    let members = memberships
        .iter()
        .filter(|(_, sofa_nums)| sofa_nums.contains(&sofa_num))
        .map(|(id, _)| *id)
        .collect();
    pending.views.push(PendingView { name, sofa, members });
  }

  assemble(cas, pending, lenient)
}

// endregion
