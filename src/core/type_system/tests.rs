use crate::core::type_system::{
  builtins::*,
  ArrayKind,
  PrimitiveKind,
  SchemaError,
  TypeFlag,
  TypeKind,
  TypeSystem,
  ValueKind
};

#[test]
fn built_in_codes_are_fixed() {
  let ts = TypeSystem::built_in();

  assert_eq!(ts.len(), BUILT_IN_TYPE_COUNT);
  assert_eq!(ts.type_by_name(TYPE_NAME_TOP), Some(TOP));
  assert_eq!(ts.type_by_name(TYPE_NAME_STRING), Some(STRING));
  assert_eq!(ts.type_by_name(TYPE_NAME_SOFA), Some(SOFA));
  assert_eq!(ts.type_by_name(TYPE_NAME_DOCUMENT_ANNOTATION), Some(DOCUMENT_ANNOTATION));
  assert_eq!(ts.type_by_name("uima.cas.NonEmptyStringList").map(|t| ts.ty(t).supertype), Some(ts.type_by_name("uima.cas.StringList")));
  assert_eq!(ts.feature_by_name("uima.tcas.Annotation:begin"), Some(ANNOTATION_BEGIN));
  assert_eq!(ts.feature_by_name("uima.cas.Sofa:sofaID"), Some(SOFA_ID));
  assert_eq!(ts.feature_full_name(DOCUMENT_LANGUAGE), "uima.tcas.DocumentAnnotation:language");
}

#[test]
fn built_in_subsumption() {
  let ts = TypeSystem::built_in();

  assert!(ts.subsumes(TOP, DOCUMENT_ANNOTATION));
  assert!(ts.subsumes(ANNOTATION_BASE, ANNOTATION));
  assert!(ts.subsumes(ANNOTATION, ANNOTATION));
  assert!(ts.subsumes(ARRAY_BASE, INTEGER_ARRAY));
  assert!(!ts.subsumes(ANNOTATION, ANNOTATION_BASE));
  assert!(!ts.subsumes(SOFA, ANNOTATION));
}

#[test]
fn inherited_features_keep_their_offsets() {
  let mut builder = TypeSystem::builder();
  let token       = builder.add_type("org.example.Token", ANNOTATION).unwrap();
  let pos         = builder.add_feature(token, "pos", STRING, false).unwrap();
  let noun        = builder.add_type("org.example.Noun", token).unwrap();
  let number      = builder.add_feature(noun, "number", INTEGER, false).unwrap();
  // Added to the supertype after the subtype exists.
  let lemma       = builder.add_feature(token, "lemma", STRING, false).unwrap();
  let ts          = builder.commit();

  let token_features = ts.features_of(token);
  let noun_features  = ts.features_of(noun);
  assert_eq!(&noun_features[..token_features.len()], token_features);
  assert_eq!(*noun_features.last().unwrap(), number);

  for feature in [ANNOTATION_SOFA, ANNOTATION_BEGIN, ANNOTATION_END, pos, lemma] {
    let offset = ts.feature(feature).offset();
    assert_eq!(token_features[offset], feature);
    assert_eq!(noun_features[offset], feature);
  }
  assert_eq!(ts.feature_by_base_name(noun, "begin"), Some(ANNOTATION_BEGIN));
  assert!(ts.subsumes(token, noun));
}

#[test]
fn add_type_is_idempotent_for_same_supertype() {
  let mut builder = TypeSystem::builder();
  let a           = builder.add_type("org.example.A", TOP).unwrap();
  assert_eq!(builder.add_type("org.example.A", TOP).unwrap(), a);

  let result = builder.add_type("org.example.A", ANNOTATION);
  assert!(matches!(result, Err(SchemaError::DuplicateType { .. })));
}

#[test]
fn sealed_types_reject_subtypes_and_features() {
  let mut builder = TypeSystem::builder();

  assert!(matches!(
    builder.add_type("org.example.MyInt", INTEGER),
    Err(SchemaError::InheritanceFinal { .. })
  ));
  assert!(matches!(
    builder.add_type("org.example.MySofa", SOFA),
    Err(SchemaError::InheritanceFinal { .. })
  ));
  assert!(matches!(
    builder.add_feature(INTEGER_ARRAY, "extra", INTEGER, false),
    Err(SchemaError::FeatureFinal { .. })
  ));
  assert!(matches!(
    builder.add_type("org.example.Color", STRING),
    Err(SchemaError::MissingAllowedValues { .. })
  ));
}

#[test]
fn duplicate_feature_with_same_range_is_swallowed() {
  let mut builder = TypeSystem::builder();
  let parent      = builder.add_type("org.example.Parent", TOP).unwrap();
  let child       = builder.add_type("org.example.Child", parent).unwrap();
  let f           = builder.add_feature(parent, "f", STRING, false).unwrap();

  assert_eq!(builder.add_feature(child, "f", STRING, false).unwrap(), f);
  assert!(matches!(
    builder.add_feature(child, "f", INTEGER, false),
    Err(SchemaError::DuplicateFeature { .. })
  ));

  let ts = builder.commit();
  assert!(ts.ty(child).own_features().is_empty());
  assert_eq!(ts.feature(f).domain, parent);
}

#[test]
fn feature_on_supertype_conflicting_with_subtype_is_rejected() {
  let mut builder = TypeSystem::builder();
  let parent      = builder.add_type("org.example.Parent", TOP).unwrap();
  let child       = builder.add_type("org.example.Child", parent).unwrap();
  builder.add_feature(child, "f", STRING, false).unwrap();

  let result = builder.add_feature(parent, "f", STRING, false);
  assert!(matches!(result, Err(SchemaError::DuplicateFeature { type_name, .. }) if type_name == "org.example.Child"));
}

#[test]
fn string_subtypes_restrict_values() {
  let mut builder = TypeSystem::builder();
  let color       = builder.add_string_subtype("org.example.Color", &["red", "green"]).unwrap();
  assert_eq!(builder.add_string_subtype("org.example.Color", &["red", "green"]).unwrap(), color);
  assert_eq!(builder.add_string_subtype("org.example.Color", &["green", "red"]).unwrap(), color);
  assert!(builder.add_string_subtype("org.example.Color", &["red"]).is_err());
  assert!(builder.add_string_subtype("org.example.Color", &["blue"]).is_err());
  let ts = builder.commit();

  assert!(ts.subsumes(STRING, color));
  assert_eq!(ts.value_kind(color), ValueKind::Primitive(PrimitiveKind::String));
  assert!(ts.is_allowed_string(color, "red"));
  assert!(!ts.is_allowed_string(color, "blue"));
  assert!(ts.is_allowed_string(STRING, "blue"));
  assert_eq!(ts.array_type_for(color), STRING_ARRAY);
}

#[test]
fn typed_arrays_are_created_once() {
  let mut builder = TypeSystem::builder();
  let token       = builder.add_type("org.example.Token", ANNOTATION).unwrap();
  let tokens      = builder.array_type(token);
  assert_eq!(builder.array_type(token), tokens);
  assert_eq!(builder.array_type(INTEGER), INTEGER_ARRAY);
  assert_eq!(builder.array_type(TOP), FS_ARRAY);
  let ts = builder.commit();

  assert_eq!(ts.type_name(tokens), "org.example.Token[]");
  assert_eq!(ts.ty(tokens).kind, TypeKind::Array(ArrayKind::Fs { element: token }));
  assert!(ts.subsumes(FS_ARRAY, tokens));
  assert!(ts.subsumes(ARRAY_BASE, tokens));
  assert_eq!(ts.array_type_for(token), tokens);
  assert_eq!(ts.array_type_for(ANNOTATION), FS_ARRAY);
  assert!(ts.ty(ARRAY_BASE).flags.contains(TypeFlag::Abstract));
}

#[test]
fn description_lists_user_declarations() {
  let mut builder = TypeSystem::builder();
  let token       = builder.add_type("org.example.Token", ANNOTATION).unwrap();
  let tokens      = builder.array_type(token);
  let sentence    = builder.add_type("org.example.Sentence", ANNOTATION).unwrap();
  builder.add_feature(sentence, "tokens", tokens, true).unwrap();
  builder.add_feature(DOCUMENT_ANNOTATION, "author", STRING, false).unwrap();
  let ts = builder.commit();

  let description = ts.to_description();
  let names: Vec<&str> = description.types.iter().map(|t| t.name.as_str()).collect();
  assert_eq!(names, vec![TYPE_NAME_DOCUMENT_ANNOTATION, "org.example.Token", "org.example.Sentence"]);

  let tokens_feature = &description.type_named("org.example.Sentence").unwrap().features[0];
  assert_eq!(tokens_feature.range_type_name, TYPE_NAME_FS_ARRAY);
  assert_eq!(tokens_feature.element_type.as_deref(), Some("org.example.Token"));
  assert_eq!(tokens_feature.multiple_references_allowed, Some(true));

  let document = description.type_named(TYPE_NAME_DOCUMENT_ANNOTATION).unwrap();
  assert_eq!(document.supertype_name.as_deref(), Some(TYPE_NAME_ANNOTATION));
  assert_eq!(document.features.len(), 1);
}
