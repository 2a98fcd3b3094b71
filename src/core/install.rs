/*!

Installation turns merged descriptions into a committed schema: the types and features of a `TypeSystemDescription`
into a `TypeSystemBuilder`, priority lists into a `LinearTypeOrderBuilder`, and index descriptions into
`FsIndexDefinition`s.

Types are installed in passes. Each pass adds every pending declaration whose supertype already exists, so a
declaration may precede its supertype in the description. When a pass adds nothing, the remaining declarations have
undefined supertypes or form a cycle, which is fatal. Features are installed afterwards, type by type in the order the
types were created, so supertypes receive their features before their subtypes. A feature redeclared on a subtype with
the same range is thereby attributed to the supertype only.

*/

use crate::{
  abstractions::IString,
  core::{
    description::{
      location_of,
      FsIndexCollection,
      FsIndexKey,
      TypeDescription,
      TypePriorities,
      TypeSystemDescription
    },
    index::{FsIndexComparator, FsIndexDefinition, IndexKey, LinearTypeOrderBuilder},
    type_system::{
      builtins::STRING,
      SchemaError,
      TypeCode,
      TypeSystem,
      TypeSystemBuilder
    },
  },
};

/// Installs the types and features of `description` into `builder`.
pub fn install_type_system(builder: &mut TypeSystemBuilder, description: &TypeSystemDescription) -> Result<(), SchemaError> {
  let mut description = description.clone();
  description.inherit_source_locations();

  // Pass 1: types
  let mut pending: Vec<&TypeDescription> = description.types.iter().collect();
  let mut created: Vec<(&TypeDescription, TypeCode)> = Vec::with_capacity(pending.len());

  loop {
    let before = pending.len();
    let mut remaining = Vec::with_capacity(before);

    for declaration in pending {
      let Some(supertype_name) = declaration.supertype_name.as_deref() else {
        return Err(SchemaError::NoSupertype {
          type_name: declaration.name.clone(),
          location : declaration.location(),
        });
      };
      match builder.type_by_name(supertype_name) {
        Some(supertype) => {
          let code = install_type(builder, declaration, supertype)?;
          created.push((declaration, code));
        }
        None => remaining.push(declaration),
      }
    }

    pending = remaining;
    if pending.is_empty() || pending.len() == before {
      break;
    }
  }

  if !pending.is_empty() {
    return Err(undefined_supertype(&pending));
  }

  // Pass 2: features
  for (declaration, domain) in created {
    for feature in declaration.features.iter() {
      let location = location_of(&feature.source_url, &declaration.source_url);

      let Some(mut range) = builder.type_by_name(&feature.range_type_name) else {
        return Err(SchemaError::UndefinedRangeType {
          range_type_name: feature.range_type_name.clone(),
          feature_name   : feature.name.clone(),
          type_name      : declaration.name.clone(),
          location,
        });
      };

      if builder.ty(range).is_array() {
        if let Some(element_name) = feature.element_type.as_deref().filter(|e| !e.is_empty()) {
          let Some(element) = builder.type_by_name(element_name) else {
            return Err(SchemaError::UndefinedRangeType {
              range_type_name: element_name.to_string(),
              feature_name   : feature.name.clone(),
              type_name      : declaration.name.clone(),
              location,
            });
          };
          range = builder.array_type(element);
        }
      }

      let code = builder.add_feature(
        domain,
        &feature.name,
        range,
        feature.multiple_references_allowed.unwrap_or(false)
      )?;
      if feature.description.is_some() && builder.feature(code).domain == domain {
        builder.set_feature_description(code, feature.description.clone());
      }
    }
  }

  Ok(())
}

fn install_type(builder: &mut TypeSystemBuilder, declaration: &TypeDescription, supertype: TypeCode)
    -> Result<TypeCode, SchemaError>
{
  // A built-in type may be redeclared, for example to add features, but not moved.
  if let Some(existing) = builder.type_by_name(&declaration.name) {
    let existing_type = builder.ty(existing);
    if existing_type.is_built_in() && existing_type.supertype != Some(supertype) {
      return Err(SchemaError::RedefiningBuiltInType {
        builtin_supertype: existing_type.supertype.map(|s| builder.type_name(s).to_string()).unwrap_or_default(),
        type_name        : declaration.name.clone(),
        supertype        : builder.type_name(supertype).to_string(),
        location         : declaration.location(),
      });
    }
  }

  let code = if supertype == STRING {
    if declaration.allowed_values.is_empty() {
      return Err(SchemaError::MissingAllowedValues {
        type_name: declaration.name.clone(),
        location : declaration.location(),
      });
    }
    let values: Vec<&str> = declaration.allowed_values.iter().map(|v| v.string.as_str()).collect();
    builder.add_string_subtype(&declaration.name, &values).map_err(|e| with_location(e, declaration))?
  } else {
    if !declaration.allowed_values.is_empty() {
      return Err(SchemaError::AllowedValuesOnNonStringType {
        type_name: declaration.name.clone(),
        location : declaration.location(),
      });
    }
    builder.add_type(&declaration.name, supertype)?
  };

  if declaration.description.is_some() && !builder.ty(code).is_built_in() {
    builder.set_type_description(code, declaration.description.clone());
  }
  Ok(code)
}

/// The builder does not know where a declaration came from; fill in the location where the error kind carries one.
fn with_location(error: SchemaError, declaration: &TypeDescription) -> SchemaError {
  match error {
    SchemaError::AllowedValuesMismatch { type_name, .. } => {
      SchemaError::AllowedValuesMismatch { type_name, location: declaration.location() }
    }
    SchemaError::MissingAllowedValues { type_name, .. } => {
      SchemaError::MissingAllowedValues { type_name, location: declaration.location() }
    }
    other => other,
  }
}

/// Reports the declarations left after the type passes. A declaration whose supertype is not declared by any other
/// remaining declaration is blamed first, so that a type merely waiting on a broken supertype is not.
fn undefined_supertype(pending: &[&TypeDescription]) -> SchemaError {
  let culprit = pending
      .iter()
      .find(|declaration| {
        let supertype = declaration.supertype_name.as_deref().unwrap_or_default();
        !pending.iter().any(|other| other.name == supertype)
      })
      .or(pending.first())
      .copied();

  match culprit {
    Some(declaration) => SchemaError::UndefinedSupertype {
      supertype_name: declaration.supertype_name.clone().unwrap_or_default(),
      type_name     : declaration.name.clone(),
      location      : declaration.location(),
    },
    None => SchemaError::UndefinedSupertype {
      supertype_name: String::new(),
      type_name     : String::new(),
      location      : location_of(&None, &None),
    },
  }
}

/// Registers every priority list with `order_builder`. All names in a list are resolved before the list is added.
pub fn install_type_priorities(
  type_system  : &TypeSystem,
  order_builder: &mut LinearTypeOrderBuilder,
  priorities   : &TypePriorities,
) -> Result<(), SchemaError>
{
  for list in priorities.priority_lists.iter() {
    let location = location_of(&list.source_url, &priorities.source_url);
    let mut codes = Vec::with_capacity(list.types.len());
    for type_name in list.types.iter() {
      match type_system.type_by_name(type_name) {
        Some(code) => codes.push(code),
        None => {
          return Err(SchemaError::UndefinedTypeForPriorityList {
            type_name: type_name.clone(),
            location,
          });
        }
      }
    }
    order_builder
        .add(&codes)
        .map_err(|cause| SchemaError::InvalidTypePriorities { location, cause })?;
  }
  Ok(())
}

/// Resolves index descriptions against `type_system`.
pub fn install_indexes(type_system: &TypeSystem, collection: &FsIndexCollection) -> Result<Vec<FsIndexDefinition>, SchemaError> {
  let mut definitions: Vec<FsIndexDefinition> = Vec::with_capacity(collection.indexes.len());
  let mut locations  : Vec<String>            = Vec::with_capacity(collection.indexes.len());

  for index in collection.indexes.iter() {
    let location = location_of(&index.source_url, &collection.source_url);

    if let Some(first) = definitions.iter().position(|d| &*d.label == index.label.as_str()) {
      return Err(SchemaError::DuplicateIndexName {
        label          : index.label.clone(),
        first_location : locations[first].clone(),
        second_location: location,
      });
    }

    let Some(type_code) = type_system.type_by_name(&index.type_name) else {
      return Err(SchemaError::UndefinedTypeForIndex {
        type_name: index.type_name.clone(),
        label    : index.label.clone(),
        location,
      });
    };

    let mut comparator = FsIndexComparator::new(type_code);
    for key in index.keys.iter() {
      match key {

        FsIndexKey::Feature { name, direction } => {
          let Some(feature) = type_system.feature_by_base_name(type_code, name) else {
            return Err(SchemaError::IndexKeyFeatureNotFound {
              feature_name: name.clone(),
              label       : index.label.clone(),
              location,
            });
          };
          comparator.add_key(IndexKey::Feature {
            feature,
            offset   : type_system.feature(feature).offset(),
            direction: *direction,
          });
        }

        FsIndexKey::TypePriority => comparator.add_key(IndexKey::TypePriority),

      }
    }

    definitions.push(FsIndexDefinition {
      label: IString::from(index.label.as_str()),
      kind : index.kind.unwrap_or_default(),
      comparator,
    });
    locations.push(location);
  }

  Ok(definitions)
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::{
    description::{FsIndexDescription, IndexKind, SortDirection},
    type_system::builtins::{ANNOTATION, TOP},
  };

  fn install(description: &TypeSystemDescription) -> Result<crate::core::type_system::RcTypeSystem, SchemaError> {
    let mut builder = TypeSystem::builder();
    install_type_system(&mut builder, description)?;
    Ok(builder.commit())
  }

  #[test]
  fn subtypes_may_precede_supertypes() {
    let mut ts = TypeSystemDescription::new();
    ts.add_type("org.example.Noun", None, "org.example.Token")
      .add_feature("number", None, "uima.cas.Integer");
    ts.add_type("org.example.Token", None, "uima.tcas.Annotation")
      .add_feature("pos", None, "uima.cas.String");

    let installed = install(&ts).unwrap();
    let noun      = installed.type_by_name("org.example.Noun").unwrap();
    let token     = installed.type_by_name("org.example.Token").unwrap();
    assert_eq!(installed.supertype(noun), Some(token));
    assert!(installed.subsumes(ANNOTATION, noun));
    assert!(installed.feature_by_base_name(noun, "pos").is_some());
  }

  #[test]
  fn subtype_redeclaration_is_attributed_to_supertype() {
    let mut ts = TypeSystemDescription::new();
    // Subtype listed first, so only creation order puts the supertype's features first.
    ts.add_type("org.example.Child", None, "org.example.Parent")
      .add_feature("f", None, "uima.cas.String");
    ts.add_type("org.example.Parent", None, "uima.cas.TOP")
      .add_feature("f", None, "uima.cas.String");

    let installed = install(&ts).unwrap();
    let parent    = installed.type_by_name("org.example.Parent").unwrap();
    let child     = installed.type_by_name("org.example.Child").unwrap();
    let f         = installed.feature_by_base_name(child, "f").unwrap();

    assert_eq!(installed.feature(f).domain, parent);
    assert!(installed.ty(child).own_features().is_empty());
    assert_eq!(installed.features_of(child), installed.features_of(parent));
  }

  #[test]
  fn undefined_supertype_blames_the_root_cause() {
    let mut ts = TypeSystemDescription::with_source("broken.xml");
    ts.add_type("org.example.Waiting", None, "org.example.Broken");
    ts.add_type("org.example.Broken", None, "org.example.Missing");

    let result = install(&ts);
    assert!(matches!(
      result,
      Err(SchemaError::UndefinedSupertype { ref type_name, ref supertype_name, ref location })
        if type_name == "org.example.Broken" && supertype_name == "org.example.Missing" && location == "broken.xml"
    ));
  }

  #[test]
  fn cycles_are_reported() {
    let mut ts = TypeSystemDescription::new();
    ts.add_type("org.example.A", None, "org.example.B");
    ts.add_type("org.example.B", None, "org.example.A");
    assert!(matches!(install(&ts), Err(SchemaError::UndefinedSupertype { .. })));
  }

  #[test]
  fn declaration_errors() {
    let mut no_supertype = TypeSystemDescription::new();
    no_supertype.types.push(TypeDescription { name: "org.example.T".into(), ..TypeDescription::default() });
    assert!(matches!(install(&no_supertype), Err(SchemaError::NoSupertype { .. })));

    let mut moved = TypeSystemDescription::new();
    moved.add_type("uima.tcas.Annotation", None, "uima.cas.TOP");
    assert!(matches!(install(&moved), Err(SchemaError::RedefiningBuiltInType { .. })));

    let mut missing_values = TypeSystemDescription::with_source("colors.xml");
    missing_values.add_type("org.example.Color", None, "uima.cas.String");
    assert!(matches!(
      install(&missing_values),
      Err(SchemaError::MissingAllowedValues { ref location, .. }) if location == "colors.xml"
    ));

    let mut values_on_record = TypeSystemDescription::new();
    values_on_record.add_type("org.example.T", None, "uima.cas.TOP").add_allowed_value("x", None);
    assert!(matches!(install(&values_on_record), Err(SchemaError::AllowedValuesOnNonStringType { .. })));

    let mut bad_range = TypeSystemDescription::new();
    bad_range.add_type("org.example.T", None, "uima.cas.TOP").add_feature("f", None, "org.example.Nowhere");
    assert!(matches!(install(&bad_range), Err(SchemaError::UndefinedRangeType { .. })));
  }

  #[test]
  fn built_in_types_accept_new_features() {
    let mut ts = TypeSystemDescription::new();
    ts.add_type("uima.tcas.DocumentAnnotation", None, "uima.tcas.Annotation")
      .add_feature("author", None, "uima.cas.String");
    let installed = install(&ts).unwrap();
    let document  = installed.type_by_name("uima.tcas.DocumentAnnotation").unwrap();
    assert!(installed.feature_by_base_name(document, "author").is_some());
  }

  #[test]
  fn element_types_resolve_to_typed_arrays() {
    let mut ts = TypeSystemDescription::new();
    ts.add_type("org.example.Token", None, "uima.tcas.Annotation");
    let sentence = ts.add_type("org.example.Sentence", None, "uima.tcas.Annotation");
    sentence.add_feature("tokens", None, "uima.cas.FSArray").set_element_type("org.example.Token");
    sentence.add_feature("loose", None, "uima.cas.FSArray");
    sentence.add_feature("shared", None, "org.example.Token").set_multiple_references_allowed(true);

    let installed = install(&ts).unwrap();
    let sentence  = installed.type_by_name("org.example.Sentence").unwrap();
    let tokens    = installed.feature_by_base_name(sentence, "tokens").unwrap();
    let loose     = installed.feature_by_base_name(sentence, "loose").unwrap();
    let shared    = installed.feature_by_base_name(sentence, "shared").unwrap();

    assert_eq!(installed.type_name(installed.feature(tokens).range), "org.example.Token[]");
    assert_eq!(installed.type_name(installed.feature(loose).range), "uima.cas.FSArray");
    assert!(!installed.feature(loose).multiple_references_allowed);
    assert!(installed.feature(shared).multiple_references_allowed);
  }

  #[test]
  fn priorities_check_names_and_cycles() {
    let mut ts = TypeSystemDescription::new();
    ts.add_type("org.example.A", None, "uima.cas.TOP");
    ts.add_type("org.example.B", None, "uima.cas.TOP");
    let installed = install(&ts).unwrap();

    let mut unknown = TypePriorities { source_url: Some("prio.xml".into()), ..TypePriorities::default() };
    unknown.add_priority_list(&["org.example.A", "org.example.Missing"]);
    let mut order = LinearTypeOrderBuilder::new(installed.clone());
    assert!(matches!(
      install_type_priorities(&installed, &mut order, &unknown),
      Err(SchemaError::UndefinedTypeForPriorityList { ref type_name, ref location })
        if type_name == "org.example.Missing" && location == "prio.xml"
    ));
    assert!(order.is_empty());

    let mut cyclic = TypePriorities::default();
    cyclic.add_priority_list(&["org.example.A", "org.example.B"]);
    cyclic.add_priority_list(&["org.example.B", "org.example.A"]);
    let mut order = LinearTypeOrderBuilder::new(installed.clone());
    assert!(matches!(
      install_type_priorities(&installed, &mut order, &cyclic),
      Err(SchemaError::InvalidTypePriorities { .. })
    ));
  }

  #[test]
  fn indexes_resolve_types_and_keys() {
    let mut ts = TypeSystemDescription::new();
    ts.add_type("org.example.Token", None, "uima.tcas.Annotation");
    let installed = install(&ts).unwrap();
    let token     = installed.type_by_name("org.example.Token").unwrap();

    let collection = FsIndexCollection {
      indexes: vec![
        FsIndexDescription::new("Tokens", "org.example.Token", None)
            .with_key(FsIndexKey::feature("begin", SortDirection::Standard))
            .with_key(FsIndexKey::TypePriority),
        FsIndexDescription::new("Everything", "uima.cas.TOP", Some(IndexKind::Bag)),
      ],
      source_url: None,
    };
    let definitions = install_indexes(&installed, &collection).unwrap();
    assert_eq!(definitions.len(), 2);
    assert_eq!(definitions[0].kind, IndexKind::Sorted);
    assert_eq!(definitions[0].type_code(), token);
    assert_eq!(definitions[0].comparator.keys.len(), 2);
    assert_eq!(definitions[1].type_code(), TOP);

    let missing_feature = FsIndexCollection {
      indexes: vec![
        FsIndexDescription::new("Tokens", "org.example.Token", None)
            .with_key(FsIndexKey::feature("nope", SortDirection::Standard)),
      ],
      source_url: Some("idx.xml".into()),
    };
    assert!(matches!(
      install_indexes(&installed, &missing_feature),
      Err(SchemaError::IndexKeyFeatureNotFound { ref location, .. }) if location == "idx.xml"
    ));

    let missing_type = FsIndexCollection {
      indexes   : vec![FsIndexDescription::new("X", "org.example.Nope", None)],
      source_url: None,
    };
    assert!(matches!(install_indexes(&installed, &missing_type), Err(SchemaError::UndefinedTypeForIndex { .. })));

    let duplicate = FsIndexCollection {
      indexes: vec![
        FsIndexDescription::new("X", "org.example.Token", None),
        FsIndexDescription::new("X", "org.example.Token", Some(IndexKind::Bag)),
      ],
      source_url: None,
    };
    assert!(matches!(install_indexes(&installed, &duplicate), Err(SchemaError::DuplicateIndexName { .. })));
  }
}
