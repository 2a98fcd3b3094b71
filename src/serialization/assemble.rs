/*!

Decoded records that still refer to types and features by name and to each other by the identifiers of the stream they
came from. The XML codecs and compressed form 6 decode into a `PendingCas`; `assemble` resolves it against the
destination type system and replaces the contents of the store with the result.

Unknown types and features are errors unless decoding is lenient. In lenient mode a record of an unknown type is
dropped, references to it become null, and it is removed from view memberships.

*/

use crate::{
  abstractions::{HashMap, HashSet},
  api::{ArrayData, Cas, CasError, FsData, FsRecord, FsRef, Heap, Value},
  core::type_system::{
    builtins::{INITIAL_VIEW_NAME, SOFA, SOFA_ID, SOFA_NUM},
    ArrayKind,
    FeatureCode,
    TypeCode,
    TypeSystem,
    ValueKind,
  },
  debug,
  serialization::serial_error::{SerialError, SerialResult},
};

/// A slot or element value awaiting resolution.
#[derive(Clone, Debug, PartialEq)]
pub enum Slot {
  /// Text form, interpreted according to the destination range: a primitive in canonical form, or a stream
  /// identifier for references. Null and identifier `0` are null references.
  Text(Option<String>),
  /// A decoded primitive.
  Typed(Value),
  /// A reference by stream identifier.
  Ref(Option<u64>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum PendingData {
  Features(Vec<(String, Slot)>),
  Elements(Vec<Slot>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct PendingRecord {
  pub id       : u64,
  pub type_name: String,
  pub data     : PendingData,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PendingView {
  pub name   : String,
  pub sofa   : u64,
  pub members: Vec<u64>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PendingCas {
  pub records: Vec<PendingRecord>,
  pub views  : Vec<PendingView>,
}

struct Assembler<'a> {
  type_system: &'a TypeSystem,
  lenient    : bool,
  /// Stream identifier to destination handle, for every record kept.
  handles    : HashMap<u64, FsRef>,
  /// Stream identifiers of records dropped for their type.
  dropped    : HashMap<u64, String>,
}

/// Resolves `pending` against the type system of `cas` and replaces the contents of `cas` with it.
pub fn assemble(cas: &mut Cas, pending: PendingCas, lenient: bool) -> SerialResult<()> {
  let type_system = cas.type_system().clone();
  let mut assembler = Assembler {
    type_system: &type_system,
    lenient,
    handles    : HashMap::default(),
    dropped    : HashMap::default(),
  };

  // Pass 1: resolve types and hand out handles.
  let mut kept: Vec<(TypeCode, PendingData)> = Vec::with_capacity(pending.records.len());
  for record in pending.records {
    let Some(type_code) = assembler.resolve_type(&record)? else {
      continue;
    };
    if assembler.handles.insert(record.id, FsRef(kept.len() as u32)).is_some() {
      return Err(SerialError::Corrupt(format!("record identifier {} is used twice", record.id)));
    }
    kept.push((type_code, record.data));
  }

  // Pass 2: fill slots.
  let mut records = Vec::with_capacity(kept.len());
  for (type_code, data) in kept {
    records.push(assembler.build(type_code, data)?);
  }

  let views = assembler.views(pending.views, &mut records)?;
  check_references(&type_system, &records)?;
  check_views(&type_system, &records, &views)?;
  cas.restore(Heap::from_records(records), views)?;
  Ok(())
}

/// Checks every reference among `records` against the range of its feature, or the element type of its array. All
/// targets must be handles into `records`.
pub fn check_references(type_system: &TypeSystem, records: &[FsRecord]) -> SerialResult<()> {
  let incompatible = |slot: String, range: TypeCode, target: FsRef| {
    SerialError::Cas(CasError::IncompatibleReference {
      feature: slot,
      range  : type_system.type_name(range).to_string(),
      found  : type_system.type_name(records[target.idx()].type_code).to_string(),
    })
  };

  for record in records {
    match &record.data {
      FsData::Features(slots) => {
        for feature in type_system.features_of(record.type_code).iter() {
          let range = type_system.feature(*feature).range;
          let offset = type_system.feature(*feature).offset();
          if let Some(Value::Fs(Some(target))) = slots.get(offset) {
            if !type_system.accepts_reference(range, records[target.idx()].type_code) {
              return Err(incompatible(type_system.feature_full_name(*feature), range, *target));
            }
          }
        }
      }

      FsData::Array(array) => {
        let Some(ArrayKind::Fs { element }) = type_system.array_kind(record.type_code) else {
          continue;
        };
        if let Some(target) = array
            .references()
            .find(|target| !type_system.accepts_reference(element, records[target.idx()].type_code))
        {
          return Err(incompatible(type_system.type_name(record.type_code).to_string(), element, target));
        }
      }
    }
  }
  Ok(())
}

/// Checks decoded views: names are unique, and each sofa is a `uima.cas.Sofa` whose `sofaID` is its view's name.
pub fn check_views(type_system: &TypeSystem, records: &[FsRecord], views: &[(String, FsRef, Vec<FsRef>)])
    -> SerialResult<()>
{
  let sofa_id = type_system.feature(SOFA_ID).offset();
  let mut seen: HashSet<&str> = HashSet::default();
  for (name, sofa, _) in views {
    if !seen.insert(name.as_str()) {
      return Err(SerialError::Corrupt(format!("view \"{}\" occurs twice", name)));
    }
    let record = records
        .get(sofa.idx())
        .filter(|record| record.type_code == SOFA)
        .ok_or_else(|| SerialError::Corrupt(format!("view \"{}\" has no sofa record", name)))?;
    let found = record.slots().get(sofa_id).and_then(Value::as_str);
    if found != Some(name.as_str()) {
      return Err(SerialError::Corrupt(format!(
        "view \"{}\" has a sofa with sofaID {:?}",
        name,
        found
      )));
    }
  }
  Ok(())
}

impl<'a> Assembler<'a> {
  /// The destination type of `record`, or `None` if the record is dropped.
  fn resolve_type(&mut self, record: &PendingRecord) -> SerialResult<Option<TypeCode>> {
    let Some(type_code) = self.type_system.type_by_name(&record.type_name) else {
      if self.lenient {
        debug!(2, "dropping record {} of unknown type \"{}\"", record.id, record.type_name);
        self.dropped.insert(record.id, record.type_name.clone());
        return Ok(None);
      }
      return Err(SerialError::UnknownType { type_name: record.type_name.clone() });
    };

    let is_array = self.type_system.array_kind(type_code).is_some();
    let shaped_as_array = matches!(record.data, PendingData::Elements(_));
    if is_array != shaped_as_array {
      return Err(SerialError::Corrupt(format!(
        "record {} does not have the shape of type \"{}\"",
        record.id,
        record.type_name
      )));
    }
    let cas_type = self.type_system.ty(type_code);
    if cas_type.is_primitive() || cas_type.is_abstract() {
      return Err(SerialError::Corrupt(format!(
        "record {} has uninstantiable type \"{}\"",
        record.id,
        record.type_name
      )));
    }
    Ok(Some(type_code))
  }

  fn build(&self, type_code: TypeCode, data: PendingData) -> SerialResult<FsRecord> {
    let data = match (data, self.type_system.array_kind(type_code)) {
      (PendingData::Elements(elements), Some(kind)) => FsData::Array(self.build_array(kind, elements)?),

      (PendingData::Features(features), _) => {
        let codes = self.type_system.features_of(type_code);
        let mut slots: Vec<Value> = codes
            .iter()
            .map(|feature| Value::default_for(self.type_system.range_kind(*feature)))
            .collect();

        for (name, slot) in features {
          let Some(feature) = self.type_system.feature_by_base_name(type_code, &name) else {
            if self.lenient {
              debug!(3, "dropping unknown feature \"{}\" of \"{}\"", name, self.type_system.type_name(type_code));
              continue;
            }
            return Err(SerialError::UnknownFeature {
              feature_name: name,
              type_name   : self.type_system.type_name(type_code).to_string(),
            });
          };
          let offset = self.type_system.feature(feature).offset();
          slots[offset] = self.value(self.type_system.range_kind(feature), slot, feature)?;
        }
        FsData::Features(slots)
      }

      (PendingData::Elements(_), None) => unreachable!("shape checked when the type was resolved"),
    };

    Ok(FsRecord { type_code, data })
  }

  fn build_array(&self, kind: ArrayKind, elements: Vec<Slot>) -> SerialResult<ArrayData> {
    let mut array = ArrayData::new(kind, elements.len());
    let element_kind = match array.element_primitive() {
      Some(primitive) => ValueKind::Primitive(primitive),
      None            => ValueKind::Reference,
    };
    for (index, element) in elements.into_iter().enumerate() {
      let value = self.element_value(element_kind, element)?;
      array.set(index, value)?;
    }
    Ok(array)
  }

  /// Converts `slot` to a value of kind `kind` for `feature`.
  fn value(&self, kind: ValueKind, slot: Slot, feature: FeatureCode) -> SerialResult<Value> {
    let value = self.element_value(kind, slot)?;
    if let Value::String(Some(text)) = &value {
      let range = self.type_system.feature(feature).range;
      if !self.type_system.is_allowed_string(range, text) {
        return Err(SerialError::Cas(CasError::ValueNotAllowed {
          value  : text.clone(),
          feature: self.type_system.feature_full_name(feature),
          range  : self.type_system.type_name(range).to_string(),
        }));
      }
    }
    Ok(value)
  }

  fn element_value(&self, kind: ValueKind, slot: Slot) -> SerialResult<Value> {
    match (kind, slot) {
      (ValueKind::Reference, Slot::Ref(id)) => Ok(Value::Fs(self.reference(id)?)),

      (ValueKind::Reference, Slot::Text(text)) => {
        let id = match text.as_deref().map(str::trim) {
          None | Some("") => None,
          Some(text) => {
            let id: u64 = text
                .parse()
                .map_err(|_| SerialError::Corrupt(format!("\"{}\" is not a record identifier", text)))?;
            Some(id)
          }
        };
        Ok(Value::Fs(self.reference(id.filter(|id| *id != 0))?))
      }

      (ValueKind::Reference, Slot::Typed(value)) => {
        Err(SerialError::Corrupt(format!("primitive {} where a reference is expected", value)))
      }

      (ValueKind::Primitive(primitive), Slot::Text(text)) => Ok(Value::parse(primitive, text.as_deref())?),

      (ValueKind::Primitive(primitive), Slot::Typed(value)) => {
        if value.kind() == kind {
          Ok(value)
        } else {
          Ok(Value::parse(primitive, value.to_canonical_string().as_deref())?)
        }
      }

      (ValueKind::Primitive(_), Slot::Ref(_)) => {
        Err(SerialError::Corrupt("reference where a primitive is expected".to_string()))
      }
    }
  }

  /// The destination handle for stream identifier `id`. References to dropped records are null.
  fn reference(&self, id: Option<u64>) -> SerialResult<Option<FsRef>> {
    let Some(id) = id else { return Ok(None) };
    if let Some(fs) = self.handles.get(&id) {
      return Ok(Some(*fs));
    }
    if self.dropped.contains_key(&id) {
      return Ok(None);
    }
    Err(SerialError::Corrupt(format!("reference to undefined record {}", id)))
  }

  /// Resolves views, placing the initial view first. A missing initial view gets a fresh sofa.
  fn views(&self, pending: Vec<PendingView>, records: &mut Vec<FsRecord>)
      -> SerialResult<Vec<(String, FsRef, Vec<FsRef>)>>
  {
    let mut views = Vec::with_capacity(pending.len() + 1);
    for view in pending {
      let sofa = self
          .handles
          .get(&view.sofa)
          .copied()
          .filter(|sofa| records[sofa.idx()].type_code == SOFA)
          .ok_or_else(|| SerialError::Corrupt(format!("view \"{}\" has no sofa record", view.name)))?;

      let mut members = Vec::with_capacity(view.members.len());
      for id in view.members {
        match self.reference(Some(id))? {
          Some(fs) => members.push(fs),
          None     => continue,
        }
      }
      views.push((view.name, sofa, members));
    }

    match views.iter().position(|(name, _, _)| name == INITIAL_VIEW_NAME) {
      Some(0) => {}
      Some(position) => {
        let initial = views.remove(position);
        views.insert(0, initial);
      }
      None => {
        let sofa = self.initial_sofa(records);
        views.insert(0, (INITIAL_VIEW_NAME.to_string(), sofa, Vec::new()));
      }
    }
    Ok(views)
  }

  fn initial_sofa(&self, records: &mut Vec<FsRecord>) -> FsRef {
    let mut slots: Vec<Value> = self
        .type_system
        .features_of(SOFA)
        .iter()
        .map(|feature| Value::default_for(self.type_system.range_kind(*feature)))
        .collect();
    slots[self.type_system.feature(SOFA_NUM).offset()] = Value::Integer(1);
    slots[self.type_system.feature(SOFA_ID).offset()]  = Value::String(Some(INITIAL_VIEW_NAME.to_string()));

    records.push(FsRecord { type_code: SOFA, data: FsData::Features(slots) });
    FsRef(records.len() as u32 - 1)
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    api::ViewId,
    core::{description::TypeSystemDescription, schema::CasSchema, CasDefinition},
  };

  fn store() -> Cas {
    let mut ts = TypeSystemDescription::new();
    let token  = ts.add_type("org.example.Token", None, "uima.tcas.Annotation");
    token.add_feature("next", None, "org.example.Token");
    token.add_feature("score", None, "uima.cas.Double");
    Cas::new(CasSchema::new(CasDefinition::new(ts)).unwrap())
  }

  fn sofa(id: u64) -> PendingRecord {
    PendingRecord {
      id,
      type_name: "uima.cas.Sofa".to_string(),
      data     : PendingData::Features(vec![
        ("sofaNum".to_string(), Slot::Text(Some("1".to_string()))),
        ("sofaID".to_string(), Slot::Text(Some(INITIAL_VIEW_NAME.to_string()))),
        ("sofaString".to_string(), Slot::Text(Some("a b".to_string()))),
      ]),
    }
  }

  fn token(id: u64, type_name: &str, next: u64) -> PendingRecord {
    PendingRecord {
      id,
      type_name: type_name.to_string(),
      data     : PendingData::Features(vec![
        ("sofa".to_string(), Slot::Ref(Some(1))),
        ("begin".to_string(), Slot::Typed(Value::Integer(0))),
        ("end".to_string(), Slot::Text(Some("1".to_string()))),
        ("next".to_string(), Slot::Text(Some(next.to_string()))),
      ]),
    }
  }

  fn pending(second_type: &str) -> PendingCas {
    PendingCas {
      records: vec![sofa(1), token(10, "org.example.Token", 20), token(20, second_type, 10)],
      views  : vec![PendingView { name: INITIAL_VIEW_NAME.to_string(), sofa: 1, members: vec![10, 20] }],
    }
  }

  #[test]
  fn resolves_references_and_views() {
    let mut cas = store();
    assemble(&mut cas, pending("org.example.Token"), false).unwrap();

    assert_eq!(cas.document_text(ViewId::INITIAL), Some("a b"));
    let members = cas.all_indexed_fs(ViewId::INITIAL);
    assert_eq!(members.len(), 2);
    let next = cas.feature_of(members[0], "next").unwrap();
    assert_eq!(cas.get_ref(members[0], next).unwrap(), Some(members[1]));
    assert_eq!(cas.get_ref(members[1], next).unwrap(), Some(members[0]));
  }

  #[test]
  fn unknown_types_fail_unless_lenient() {
    let mut cas = store();
    assert!(matches!(
      assemble(&mut cas, pending("org.example.Missing"), false),
      Err(SerialError::UnknownType { ref type_name }) if type_name == "org.example.Missing"
    ));

    assemble(&mut cas, pending("org.example.Missing"), true).unwrap();
    let members = cas.all_indexed_fs(ViewId::INITIAL);
    assert_eq!(members.len(), 1);
    let next = cas.feature_of(members[0], "next").unwrap();
    assert_eq!(cas.get_ref(members[0], next).unwrap(), None);
  }

  #[test]
  fn missing_initial_view_is_supplied() {
    let mut cas = store();
    assemble(&mut cas, PendingCas::default(), false).unwrap();
    assert_eq!(cas.view_count(), 1);
    assert_eq!(cas.view_name(ViewId::INITIAL), INITIAL_VIEW_NAME);
  }

  #[test]
  fn references_must_fit_the_feature_range() {
    let mut cas = store();
    cas.set_document_text(ViewId::INITIAL, "keep").unwrap();
    let mut data = pending("org.example.Token");
    // `next` of the second token points at the sofa.
    data.records[2] = token(20, "org.example.Token", 1);

    assert!(matches!(
      assemble(&mut cas, data, false),
      Err(SerialError::Cas(CasError::IncompatibleReference { ref found, .. })) if found == "uima.cas.Sofa"
    ));
    assert_eq!(cas.document_text(ViewId::INITIAL), Some("keep"));
  }

  #[test]
  fn view_names_are_unique_and_match_their_sofas() {
    let mut cas = store();
    cas.set_document_text(ViewId::INITIAL, "keep").unwrap();

    let mut twice = pending("org.example.Token");
    let view      = twice.views[0].clone();
    twice.views.push(view);
    assert!(matches!(assemble(&mut cas, twice, false), Err(SerialError::Corrupt(_))));

    let mut renamed = pending("org.example.Token");
    renamed.views[0].name = "other".to_string();
    assert!(matches!(assemble(&mut cas, renamed, false), Err(SerialError::Corrupt(_))));

    assert_eq!(cas.view_count(), 1);
    assert_eq!(cas.document_text(ViewId::INITIAL), Some("keep"));
  }

  #[test]
  fn dangling_references_are_corrupt() {
    let mut cas  = store();
    let mut data = pending("org.example.Token");
    data.records.truncate(2);
    data.views[0].members = vec![10];
    assert!(matches!(assemble(&mut cas, data, false), Err(SerialError::Corrupt(_))));
  }
}
