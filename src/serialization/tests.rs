use std::io::Cursor;

use rand::{rngs::StdRng, Rng, SeedableRng};

use super::*;
use crate::{
  api::{FsData, FsRef, Value, ViewId},
  core::{
    type_system::FeatureCode,
    CasDefinition,
    CasSchema,
    FsIndexDescription,
    FsIndexKey,
    IndexKind,
    RcCasSchema,
    SortDirection,
    TypeSystemDescription,
  },
};

// region Fixtures

fn definition(with_extra: bool) -> CasDefinition {
  let mut ts = TypeSystemDescription::new();
  let token  = ts.add_type("org.example.Token", None, "uima.tcas.Annotation");
  token.add_feature("next", None, "org.example.Token");
  token.add_feature("score", None, "uima.cas.Double");
  token.add_feature("label", None, "uima.cas.String");
  ts.add_type("org.example.Holder", None, "uima.cas.TOP")
    .add_feature("items", None, "uima.cas.FSArray");
  if with_extra {
    ts.add_type("org.example.Extra", None, "uima.tcas.Annotation")
      .add_feature("note", None, "uima.cas.String");
  }

  let mut definition = CasDefinition::new(ts);
  definition.indexes.indexes.push(
    FsIndexDescription::new("TokenIndex", "org.example.Token", Some(IndexKind::Sorted))
        .with_key(FsIndexKey::feature("label", SortDirection::Standard))
  );
  definition
}

fn schema() -> RcCasSchema {
  CasSchema::new(definition(false)).unwrap()
}

struct Tokens<'a> {
  cas  : &'a mut Cas,
  next : FeatureCode,
  score: FeatureCode,
  label: FeatureCode,
}

impl<'a> Tokens<'a> {
  fn new(cas: &'a mut Cas) -> Tokens<'a> {
    let token = cas.type_by_name("org.example.Token").unwrap();
    let ts    = cas.type_system().clone();
    Tokens {
      next : ts.feature_by_base_name(token, "next").unwrap(),
      score: ts.feature_by_base_name(token, "score").unwrap(),
      label: ts.feature_by_base_name(token, "label").unwrap(),
      cas,
    }
  }

  fn token(&mut self, view: ViewId, begin: i32, end: i32, label: Option<&str>, score: f64) -> FsRef {
    let token = self.cas.type_by_name("org.example.Token").unwrap();
    let fs    = self.cas.create_annotation(view, token, begin, end).unwrap();
    self.cas.set_feature_value(fs, self.label, Value::String(label.map(str::to_string))).unwrap();
    self.cas.set_feature_value(fs, self.score, Value::Double(score)).unwrap();
    fs
  }

  fn link(&mut self, from: FsRef, to: Option<FsRef>) {
    self.cas.set_ref(from, self.next, to).unwrap();
  }
}

fn empty_store() -> Cas {
  Cas::new(schema())
}

fn primitive_store() -> Cas {
  let mut cas = Cas::new(schema());
  cas.set_document_text(ViewId::INITIAL, "a b <c> & d").unwrap();
  let mut tokens = Tokens::new(&mut cas);
  let token = tokens.token(ViewId::INITIAL, 0, 1, Some("x < \"y\""), 0.25);
  cas.add_fs_to_indexes(ViewId::INITIAL, token).unwrap();
  cas
}

fn cycle_store() -> Cas {
  let mut cas = Cas::new(schema());
  cas.set_document_text(ViewId::INITIAL, "a b").unwrap();
  let mut tokens = Tokens::new(&mut cas);
  let a = tokens.token(ViewId::INITIAL, 0, 1, Some("a"), -1.5);
  let b = tokens.token(ViewId::INITIAL, 2, 3, None, 1e-7);
  tokens.link(a, Some(b));
  tokens.link(b, Some(a));
  cas.add_fs_to_indexes(ViewId::INITIAL, a).unwrap();
  cas.add_fs_to_indexes(ViewId::INITIAL, b).unwrap();
  cas
}

fn array_store() -> Cas {
  let mut cas = Cas::new(schema());
  let arrays = vec![
    cas.create_boolean_array(vec![true, false, true]),
    cas.create_byte_array(vec![-128, 0, 127]),
    cas.create_short_array(vec![-5, 300, 7]),
    cas.create_integer_array(vec![i32::MIN, 0, 42, i32::MAX]),
    cas.create_long_array(vec![i64::MIN, -1, i64::MAX]),
    cas.create_float_array(vec![0.5, -3.25, 1e10]),
    cas.create_double_array(vec![std::f64::consts::PI, -0.0, 2.5e-300]),
    cas.create_string_array(vec![Some("with space".to_string()), None, Some(String::new()), Some("<&>".to_string())]),
    cas.create_integer_array(Vec::new()),
  ];
  let mut items: Vec<Option<FsRef>> = arrays.into_iter().map(Some).collect();
  items.push(None);
  let items = cas.create_fs_array(items).unwrap();

  let holder_type = cas.type_by_name("org.example.Holder").unwrap();
  let holder      = cas.create_fs(holder_type).unwrap();
  let feature     = cas.feature_of(holder, "items").unwrap();
  cas.set_ref(holder, feature, Some(items)).unwrap();
  cas.add_fs_to_indexes(ViewId::INITIAL, holder).unwrap();
  cas
}

fn two_view_store() -> Cas {
  let mut cas = Cas::new(schema());
  cas.set_document_text(ViewId::INITIAL, "first").unwrap();
  let second = cas.create_view("second").unwrap();
  cas.set_document_text(second, "second text").unwrap();
  let mut tokens = Tokens::new(&mut cas);
  let first_token  = tokens.token(ViewId::INITIAL, 0, 5, Some("first"), 1.0);
  let second_token = tokens.token(second, 0, 6, Some("second"), 2.0);
  tokens.link(second_token, Some(first_token));
  cas.add_fs_to_indexes(ViewId::INITIAL, first_token).unwrap();
  cas.add_fs_to_indexes(second, second_token).unwrap();
  cas
}

/// A random graph of tokens indexed in the initial view.
fn random_store(seed: u64) -> Cas {
  let mut rng = StdRng::seed_from_u64(seed);
  let mut cas = Cas::new(schema());
  cas.set_document_text(ViewId::INITIAL, "the quick brown fox jumps over the lazy dog").unwrap();

  let labels = [None, Some(""), Some("noun"), Some("verb phrase"), Some("a&b")];
  let count  = rng.gen_range(1..40);
  let mut created = Vec::with_capacity(count);
  {
    let mut tokens = Tokens::new(&mut cas);
    for _ in 0..count {
      let begin = rng.gen_range(0..40);
      let end   = begin + rng.gen_range(0..4);
      let label = labels[rng.gen_range(0..labels.len())];
      let score = rng.gen_range(-100.0..100.0);
      created.push(tokens.token(ViewId::INITIAL, begin, end, label, score));
    }
    for fs in created.iter() {
      let target = match rng.gen_bool(0.7) {
        true  => Some(created[rng.gen_range(0..created.len())]),
        false => None,
      };
      tokens.link(*fs, target);
    }
  }
  for fs in created.iter() {
    if rng.gen_bool(0.6) {
      cas.add_fs_to_indexes(ViewId::INITIAL, *fs).unwrap();
    }
  }
  cas
}

// endregion

// region Comparison

type Numbers = crate::abstractions::HashMap<FsRef, usize>;

fn render(value: &Value, numbers: &Numbers) -> String {
  match value {
    Value::Fs(Some(target)) => format!("#{}", numbers.get(target).copied().unwrap_or(usize::MAX)),
    Value::Fs(None)         => "null".to_string(),
    other                   => format!("{:?}", other.to_canonical_string()),
  }
}

/// Everything reachable from the views, numbered in emission order and rendered with names instead of codes.
fn dump(cas: &Cas) -> Vec<String> {
  let order = xml::emission_order(cas);
  let numbers: Numbers = order.iter().enumerate().map(|(n, fs)| (*fs, n)).collect();
  let ts = cas.type_system();

  let mut lines = Vec::new();
  for fs in order.iter() {
    let record = cas.record(*fs).unwrap();
    let mut line = format!("#{} {}", numbers[fs], ts.type_name(record.type_code));
    match &record.data {
      FsData::Features(slots) => {
        for (feature, slot) in ts.features_of(record.type_code).iter().zip(slots.iter()) {
          line.push_str(&format!(" {}={}", ts.feature(*feature).name, render(slot, &numbers)));
        }
      }
      FsData::Array(array) => {
        for index in 0..array.len() {
          line.push_str(&format!(" [{}]", render(&array.get(index).unwrap(), &numbers)));
        }
      }
    }
    lines.push(line);
  }

  for view in cas.views() {
    let members: Vec<String> = cas.all_indexed_fs(view).iter().map(|fs| format!("#{}", numbers[fs])).collect();
    lines.push(format!(
      "view {} sofa=#{} members={}",
      cas.view_name(view),
      numbers[&cas.sofa(view)],
      members.join(",")
    ));
  }
  lines
}

fn round_trip(source: &Cas, format: SerialFormat) -> Cas {
  let mut bytes = Vec::new();
  let embedded = save(source, &mut bytes, None, format).unwrap();
  assert_eq!(embedded, format.embeds_schema());

  let mut destination = Cas::new(schema());
  let detected = load(&mut Cursor::new(bytes), None, &mut destination, CasLoadMode::Default, None)
      .unwrap_or_else(|error| panic!("{}: {}", format, error));
  assert_eq!(detected, format);
  destination
}

// endregion

#[test]
fn every_format_round_trips_the_fixtures() {
  let fixtures: [(&str, fn() -> Cas); 5] = [
    ("empty", empty_store),
    ("primitive", primitive_store),
    ("cycle", cycle_store),
    ("arrays", array_store),
    ("two views", two_view_store),
  ];
  for (name, fixture) in fixtures {
    let source = fixture();
    for format in SerialFormat::ALL {
      let copy = round_trip(&source, format);
      assert_eq!(dump(&copy), dump(&source), "{} through {}", name, format);
    }
  }
}

#[test]
fn every_format_round_trips_random_graphs() {
  for seed in 0..8 {
    let source = random_store(seed);
    for format in SerialFormat::ALL {
      let copy = round_trip(&source, format);
      assert_eq!(dump(&copy), dump(&source), "seed {} through {}", seed, format);
    }
  }
}

#[test]
fn round_trips_keep_index_contents_and_document_annotations() {
  let source = cycle_store();
  for format in SerialFormat::ALL {
    let copy = round_trip(&source, format);
    assert_eq!(copy.index(ViewId::INITIAL, "TokenIndex").unwrap().len(), 2, "{}", format);
    assert_eq!(copy.document_text(ViewId::INITIAL), Some("a b"));

    let document = copy.existing_document_annotation(ViewId::INITIAL).unwrap();
    assert!(copy.is_indexed(ViewId::INITIAL, document));
  }
}

#[test]
fn embedded_schema_wins_over_a_different_external_one() {
  let source = cycle_store();
  let mut wrong_schema = Vec::new();
  Tsi::of(&Cas::new(CasSchema::built_in()), true).write_secondary(&mut wrong_schema).unwrap();

  for format in SerialFormat::ALL.into_iter().filter(SerialFormat::embeds_schema) {
    let mut bytes = Vec::new();
    save(&source, &mut bytes, None, format).unwrap();

    // Type-system-only embedding does not reinitialize, so the destination needs the types.
    let mut destination = match format {
      SerialFormat::CompressedFilteredTs => Cas::new(schema()),
      _ => Cas::new(CasSchema::built_in()),
    };
    load(
      &mut Cursor::new(bytes),
      Some(&mut Cursor::new(wrong_schema.clone())),
      &mut destination,
      CasLoadMode::Default,
      None,
    ).unwrap_or_else(|error| panic!("{}: {}", format, error));

    assert_eq!(dump(&destination), dump(&source), "{}", format);
  }
}

#[test]
fn secondary_schema_stream_reinitializes_on_request() {
  let source = primitive_store();
  for format in [SerialFormat::Xmi, SerialFormat::Binary, SerialFormat::Compressed, SerialFormat::CompressedFiltered] {
    let mut bytes      = Vec::new();
    let mut schema_out = Vec::new();
    let embedded = save(&source, &mut bytes, Some(&mut schema_out), format).unwrap();
    assert!(!embedded);
    assert!(schema_out.starts_with(SECONDARY_MAGIC));

    let mut destination = Cas::new(CasSchema::built_in());
    load(
      &mut Cursor::new(bytes),
      Some(&mut Cursor::new(schema_out)),
      &mut destination,
      CasLoadMode::Reinit,
      None,
    ).unwrap_or_else(|error| panic!("{}: {}", format, error));

    assert!(destination.type_system().type_by_name("org.example.Token").is_some());
    assert_eq!(dump(&destination), dump(&source), "{}", format);
  }
}

#[test]
fn schema_embedding_formats_ignore_the_secondary_output() {
  let source = primitive_store();
  let mut bytes      = Vec::new();
  let mut schema_out = Vec::new();
  assert!(save(&source, &mut bytes, Some(&mut schema_out), SerialFormat::BinaryTsi).unwrap());
  assert!(schema_out.is_empty());
}

#[test]
fn xml_without_reinit_needs_the_types() {
  let source = primitive_store();
  let mut bytes = Vec::new();
  save(&source, &mut bytes, None, SerialFormat::Xmi).unwrap();

  let mut destination = Cas::new(CasSchema::built_in());
  assert!(matches!(
    load(&mut Cursor::new(bytes), None, &mut destination, CasLoadMode::Default, None),
    Err(SerialError::UnknownType { ref type_name }) if type_name == "org.example.Token"
  ));
}

fn store_with_extra() -> Cas {
  let mut cas = Cas::new(CasSchema::new(definition(true)).unwrap());
  cas.set_document_text(ViewId::INITIAL, "one two").unwrap();
  let extra_type = cas.type_by_name("org.example.Extra").unwrap();
  let extra      = cas.create_annotation(ViewId::INITIAL, extra_type, 0, 3).unwrap();
  let note       = cas.feature_of(extra, "note").unwrap();
  cas.set_feature_value(extra, note, Value::String(Some("dropped".to_string()))).unwrap();

  let mut tokens = Tokens::new(&mut cas);
  let token = tokens.token(ViewId::INITIAL, 4, 7, Some("kept"), 3.0);
  cas.add_fs_to_indexes(ViewId::INITIAL, extra).unwrap();
  cas.add_fs_to_indexes(ViewId::INITIAL, token).unwrap();
  cas
}

#[test]
fn lenient_xml_drops_unknown_types() {
  let source = store_with_extra();
  for format in [SerialFormat::Xmi, SerialFormat::Xcas] {
    let mut bytes = Vec::new();
    save(&source, &mut bytes, None, format).unwrap();

    let mut strict = Cas::new(schema());
    assert!(matches!(
      load(&mut Cursor::new(bytes.clone()), None, &mut strict, CasLoadMode::Default, None),
      Err(SerialError::UnknownType { ref type_name }) if type_name == "org.example.Extra"
    ));

    let mut lenient = Cas::new(schema());
    load(&mut Cursor::new(bytes), None, &mut lenient, CasLoadMode::Lenient, None).unwrap();
    let members = lenient.all_indexed_fs(ViewId::INITIAL);
    // The document annotation and the token.
    assert_eq!(members.len(), 2, "{}", format);
    let token = lenient.index(ViewId::INITIAL, "TokenIndex").unwrap()[0];
    let label = lenient.feature_of(token, "label").unwrap();
    assert_eq!(lenient.feature_value_as_string(token, label).unwrap().as_deref(), Some("kept"));
  }
}

#[test]
fn filtered_form_decodes_with_a_passed_type_system() {
  let source = store_with_extra();
  let mut bytes = Vec::new();
  save(&source, &mut bytes, None, SerialFormat::CompressedFiltered).unwrap();
  let decoding = source.type_system().clone();

  // Without the source type system the payload cannot be read at all.
  let mut destination = Cas::new(schema());
  assert!(matches!(
    load(&mut Cursor::new(bytes.clone()), None, &mut destination, CasLoadMode::Default, None),
    Err(SerialError::UnknownType { .. })
  ));

  let mut destination = Cas::new(schema());
  assert!(matches!(
    load(&mut Cursor::new(bytes.clone()), None, &mut destination, CasLoadMode::Default, Some(&decoding)),
    Err(SerialError::UnknownType { ref type_name }) if type_name == "org.example.Extra"
  ));

  let mut destination = Cas::new(schema());
  let format = load(&mut Cursor::new(bytes), None, &mut destination, CasLoadMode::Lenient, Some(&decoding)).unwrap();
  assert_eq!(format, SerialFormat::CompressedFiltered);
  assert_eq!(destination.index(ViewId::INITIAL, "TokenIndex").unwrap().len(), 1);
  // The passed type system decodes only; the destination keeps its schema.
  assert!(destination.type_system().type_by_name("org.example.Extra").is_none());
}

#[test]
fn lenient_mode_suppresses_reinit_for_the_filtered_form() {
  let source = store_with_extra();
  let mut bytes = Vec::new();
  save(&source, &mut bytes, None, SerialFormat::CompressedFilteredTsi).unwrap();

  let mut destination = Cas::new(schema());
  load(&mut Cursor::new(bytes.clone()), None, &mut destination, CasLoadMode::Lenient, None).unwrap();
  assert!(destination.type_system().type_by_name("org.example.Extra").is_none());
  assert_eq!(destination.index(ViewId::INITIAL, "TokenIndex").unwrap().len(), 1);

  let mut destination = Cas::new(schema());
  load(&mut Cursor::new(bytes), None, &mut destination, CasLoadMode::Default, None).unwrap();
  assert!(destination.type_system().type_by_name("org.example.Extra").is_some());
  assert_eq!(dump(&destination), dump(&source));
}

#[test]
fn lenient_mode_drops_unknown_types_with_an_embedded_type_system() {
  let source = store_with_extra();
  let mut bytes = Vec::new();
  save(&source, &mut bytes, None, SerialFormat::CompressedFilteredTs).unwrap();

  let mut strict = Cas::new(schema());
  assert!(matches!(
    load(&mut Cursor::new(bytes.clone()), None, &mut strict, CasLoadMode::Default, None),
    Err(SerialError::UnknownType { ref type_name }) if type_name == "org.example.Extra"
  ));

  let mut lenient = Cas::new(schema());
  let format = load(&mut Cursor::new(bytes), None, &mut lenient, CasLoadMode::Lenient, None).unwrap();
  assert_eq!(format, SerialFormat::CompressedFilteredTs);
  assert!(lenient.type_system().type_by_name("org.example.Extra").is_none());
  assert_eq!(lenient.document_text(ViewId::INITIAL), Some("one two"));
  assert_eq!(lenient.index(ViewId::INITIAL, "TokenIndex").unwrap().len(), 1);
  // The document annotation and the token.
  assert_eq!(lenient.all_indexed_fs(ViewId::INITIAL).len(), 2);
}

#[test]
fn secondary_stream_is_read_only_when_consulted() {
  let source  = primitive_store();
  let garbage = b"not a schema stream".to_vec();

  for format in SerialFormat::ALL.into_iter().filter(SerialFormat::embeds_schema) {
    let mut bytes = Vec::new();
    save(&source, &mut bytes, None, format).unwrap();
    let mut destination = Cas::new(schema());
    load(&mut Cursor::new(bytes), Some(&mut Cursor::new(garbage.clone())), &mut destination, CasLoadMode::Default, None)
        .unwrap_or_else(|error| panic!("{}: {}", format, error));
    assert_eq!(dump(&destination), dump(&source), "{}", format);
  }

  // Without reinitialization these never look at the secondary stream either.
  for format in [SerialFormat::Xmi, SerialFormat::Xcas, SerialFormat::Serialized, SerialFormat::Binary] {
    let mut bytes = Vec::new();
    save(&source, &mut bytes, None, format).unwrap();
    let mut destination = Cas::new(schema());
    load(&mut Cursor::new(bytes), Some(&mut Cursor::new(garbage.clone())), &mut destination, CasLoadMode::Default, None)
        .unwrap_or_else(|error| panic!("{}: {}", format, error));
  }

  // Form 4 decodes with the secondary stream, so a bad one fails.
  let mut bytes = Vec::new();
  save(&source, &mut bytes, None, SerialFormat::Compressed).unwrap();
  let mut destination = Cas::new(schema());
  assert!(matches!(
    load(&mut Cursor::new(bytes), Some(&mut Cursor::new(garbage)), &mut destination, CasLoadMode::Default, None),
    Err(SerialError::Corrupt(_))
  ));
}

#[test]
fn failed_loads_leave_the_destination_untouched() {
  // Reinitializing succeeds but the payload has a type the new schema lacks.
  let source = store_with_extra();
  let mut bytes = Vec::new();
  save(&source, &mut bytes, None, SerialFormat::Xmi).unwrap();
  let mut narrow_schema = Vec::new();
  Tsi::of(&Cas::new(schema()), true).write_secondary(&mut narrow_schema).unwrap();

  let mut destination = Cas::new(CasSchema::built_in());
  destination.set_document_text(ViewId::INITIAL, "keep").unwrap();
  let before = dump(&destination);
  let id     = destination.id();
  assert!(load(
    &mut Cursor::new(bytes),
    Some(&mut Cursor::new(narrow_schema)),
    &mut destination,
    CasLoadMode::Reinit,
    None,
  ).is_err());
  assert!(destination.type_system().type_by_name("org.example.Token").is_none());
  assert_eq!(dump(&destination), before);
  assert_eq!(destination.document_text(ViewId::INITIAL), Some("keep"));

  // Truncated payloads behind an embedded schema.
  let source = cycle_store();
  for format in [SerialFormat::BinaryTsi, SerialFormat::CompressedTsi, SerialFormat::SerializedTsi] {
    let mut bytes = Vec::new();
    save(&source, &mut bytes, None, format).unwrap();
    let cut = bytes.len() - 2;
    assert!(load(&mut Cursor::new(bytes[..cut].to_vec()), None, &mut destination, CasLoadMode::Default, None).is_err());
    assert!(destination.type_system().type_by_name("org.example.Token").is_none(), "{}", format);
    assert_eq!(dump(&destination), before, "{}", format);
  }

  // A successful load keeps the identity of the store.
  let mut bytes = Vec::new();
  save(&source, &mut bytes, None, SerialFormat::BinaryTsi).unwrap();
  load(&mut Cursor::new(bytes), None, &mut destination, CasLoadMode::Default, None).unwrap();
  assert_eq!(destination.id(), id);
  assert_eq!(dump(&destination), dump(&source));
}

#[test]
fn unrecognized_streams_are_rejected() {
  let inputs: [&[u8]; 4] = [
    b"",
    b"plain text",
    &[0xAC, 0xED, 0x00, 0x05, 0x07],
    b"<?xml version=\"1.0\"?><document/>",
  ];
  for input in inputs {
    let mut destination = empty_store();
    assert!(
      matches!(
        load(&mut Cursor::new(input.to_vec()), None, &mut destination, CasLoadMode::Default, None),
        Err(SerialError::UnrecognizedFormat)
      ),
      "{:?}",
      input
    );
  }
}

#[test]
fn envelope_kinds_are_detected() {
  let source = primitive_store();
  for (format, kind) in [(SerialFormat::Serialized, binary::CAS_ONLY), (SerialFormat::SerializedTsi, binary::COMPLETE)] {
    let mut bytes = Vec::new();
    save(&source, &mut bytes, None, format).unwrap();
    assert_eq!(binary::envelope_kind(&bytes), Some(kind));
  }
}

#[test]
fn binary_rejects_a_different_type_system() {
  let source = primitive_store();
  let mut bytes = Vec::new();
  save(&source, &mut bytes, None, SerialFormat::Binary).unwrap();

  let mut destination = Cas::new(CasSchema::built_in());
  assert!(matches!(
    load(&mut Cursor::new(bytes), None, &mut destination, CasLoadMode::Default, None),
    Err(SerialError::Corrupt(_))
  ));
}

#[test]
fn truncated_streams_fail_without_panicking() {
  let source = cycle_store();
  for format in SerialFormat::ALL {
    let mut bytes = Vec::new();
    save(&source, &mut bytes, None, format).unwrap();
    for cut in [bytes.len() / 3, bytes.len() / 2, bytes.len() * 3 / 4] {
      let mut destination = empty_store();
      assert!(
        load(&mut Cursor::new(bytes[..cut].to_vec()), None, &mut destination, CasLoadMode::Default, None).is_err(),
        "{} cut at {}",
        format,
        cut
      );
    }
  }
}

#[test]
fn xml_writers_honor_indentation() {
  let source = primitive_store();
  let mut compact = Vec::new();
  save_xmi(&source, &mut compact, &XmlOptions { indent: None }).unwrap();
  // Declaration and root on separate lines only when indenting.
  assert_eq!(compact.iter().filter(|b| **b == b'\n').count(), 1);

  let mut indented = Vec::new();
  save_xcas(&source, &mut indented, &XmlOptions::default()).unwrap();
  assert!(indented.iter().filter(|b| **b == b'\n').count() > 3);
  assert!(indented.starts_with(XML_PROLOG));
}

#[test]
fn format_names() {
  let embedding: Vec<&str> = SerialFormat::ALL
      .into_iter()
      .filter(SerialFormat::embeds_schema)
      .map(|format| format.name())
      .collect();
  assert_eq!(
    embedding,
    vec!["SERIALIZED_TSI", "BINARY_TSI", "COMPRESSED_TSI", "COMPRESSED_FILTERED_TS", "COMPRESSED_FILTERED_TSI"]
  );
}
