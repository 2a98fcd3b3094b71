/*!

Merging of independently authored type system descriptions into one.

Declarations from all inputs are flattened into a working list and merged into an output map in rounds. A declaration
is ready once its supertype is either in a built-in namespace or already in the output, which makes supertypes merge
before their subtypes. A type declared more than once is combined:

 - if the supertypes differ and one subsumes the other, the more specific one wins;
 - allowed values of a string subtype must agree as sets;
 - features are unioned, and a feature declared twice must agree on range, element type, and
   multiple-references-allowed.

Declarations that never become ready (an undefined supertype, or a cycle) are merged anyway after the fixed point, so a
partial type system can be merged further upstream; installing such a result fails. The output lists types sorted by
name, so merging is deterministic.

*/

use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;

use crate::{
  abstractions::join_quoted,
  core::{
    description::{
      location_of,
      CasDefinition,
      FeatureDescription,
      FsIndexCollection,
      FsIndexDescription,
      TypeDescription,
      TypePriorities,
      TypePriorityList,
      TypeSystemDescription
    },
    type_system::{
      builtins::{in_built_in_namespace, TYPE_NAME_TOP},
      RcTypeSystem,
      SchemaError,
      TypeSystem,
      FEATURE_SEPARATOR
    },
  },
  info,
  warning,
};

/// Maps each type whose definition was combined from several declarations to the source locations involved.
pub type MergedTypeReport = BTreeMap<String, BTreeSet<String>>;

/// The built-in hierarchy, consulted by subsumption once the walk leaves the merged map.
static BUILT_IN_TYPES: Lazy<RcTypeSystem> = Lazy::new(TypeSystem::built_in);

/// Merges type system descriptions. If `report` is given, it receives every type that was combined from more than one
/// declaration.
pub fn merge_type_systems(
  type_systems: &[TypeSystemDescription],
  mut report  : Option<&mut MergedTypeReport>,
) -> Result<TypeSystemDescription, SchemaError>
{
  let mut pending: Vec<TypeDescription> = Vec::new();
  for type_system in type_systems {
    let mut type_system = type_system.clone();
    type_system.inherit_source_locations();
    pending.extend(type_system.types);
  }

  let mut merged: BTreeMap<String, TypeDescription> = BTreeMap::new();

  loop {
    let before = pending.len();
    let mut remaining = Vec::with_capacity(before);
    for declaration in pending.into_iter() {
      if is_ready(&declaration, &merged) {
        add_to_merged(&mut merged, declaration, report.as_deref_mut())?;
      } else {
        remaining.push(declaration);
      }
    }
    pending = remaining;
    if pending.is_empty() || pending.len() == before {
      break;
    }
  }

  if !pending.is_empty() {
    warning!(
      1,
      "types with undefined supertypes or supertype cycles merged without resolution: {}",
      join_quoted(pending.iter().map(|t| &t.name))
    );
    for declaration in pending {
      add_to_merged(&mut merged, declaration, report.as_deref_mut())?;
    }
  }

  Ok(TypeSystemDescription {
    name      : None,
    types     : merged.into_values().collect(),
    source_url: None,
  })
}

fn is_ready(declaration: &TypeDescription, merged: &BTreeMap<String, TypeDescription>) -> bool {
  match &declaration.supertype_name {
    Some(supertype) => in_built_in_namespace(supertype) || merged.contains_key(supertype),
    None            => false,
  }
}

fn add_to_merged(
  merged     : &mut BTreeMap<String, TypeDescription>,
  declaration: TypeDescription,
  report     : Option<&mut MergedTypeReport>,
) -> Result<(), SchemaError>
{
  if !merged.contains_key(&declaration.name) {
    let mut new_type = TypeDescription {
      features: Vec::new(),
      ..declaration.clone()
    };
    merge_features(&mut new_type, &declaration.features)?;
    merged.insert(declaration.name.clone(), new_type);
    return Ok(());
  }

  let mut merge_event = false;

  // Supertypes
  let existing_supertype = merged[&declaration.name].supertype_name.clone();
  if existing_supertype != declaration.supertype_name {
    match (&existing_supertype, &declaration.supertype_name) {
      // A declaration without a supertype only contributes features.
      (_, None) => {}

      (None, Some(supertype)) => {
        set_supertype(merged, &declaration.name, supertype);
        merge_event = true;
      }

      (Some(existing), Some(supertype)) => {
        if subsumes(existing, supertype, merged) {
          set_supertype(merged, &declaration.name, supertype);
          merge_event = true;
        } else if subsumes(supertype, existing, merged) {
          merge_event = true;
        } else {
          return Err(SchemaError::IncompatibleSupertypes {
            type_name         : declaration.name.clone(),
            supertype         : supertype.clone(),
            existing_supertype: existing.clone(),
            location          : declaration.location(),
          });
        }
      }
    }
  }

  let Some(existing) = merged.get_mut(&declaration.name) else {
    return Ok(());
  };

  // Allowed values
  if !(existing.allowed_values.is_empty() && declaration.allowed_values.is_empty())
      && existing.allowed_value_set() != declaration.allowed_value_set()
  {
    return Err(SchemaError::AllowedValuesMismatch {
      type_name: declaration.name.clone(),
      location : declaration.location(),
    });
  }

  // Features
  let feature_count = existing.features.len();
  merge_features(existing, &declaration.features)?;
  if existing.features.len() != feature_count {
    merge_event = true;
  }

  if merge_event {
    info!(2, "type {} merged from several declarations", declaration.name);
    if let Some(report) = report {
      let sources = report.entry(declaration.name.clone()).or_insert_with(|| {
        let mut sources = BTreeSet::new();
        sources.insert(existing.location());
        sources
      });
      sources.insert(declaration.location());
    }
  }

  Ok(())
}

fn set_supertype(merged: &mut BTreeMap<String, TypeDescription>, type_name: &str, supertype: &str) {
  if let Some(existing) = merged.get_mut(type_name) {
    existing.supertype_name = Some(supertype.to_string());
  }
}

/// Whether `general` is `specific` or an ancestor of it, walking up the merged map and then the built-in hierarchy.
/// Unresolvable supertypes end the walk.
pub(crate) fn subsumes(general: &str, specific: &str, merged: &BTreeMap<String, TypeDescription>) -> bool {
  if general == TYPE_NAME_TOP {
    return true;
  }

  let mut current: Option<String> = Some(specific.to_string());
  // Bounded by the number of declarations plus built-ins, so a supertype cycle cannot loop forever.
  let mut steps = merged.len() + BUILT_IN_TYPES.len() + 1;
  while let Some(name) = current {
    if name == general {
      return true;
    }
    if steps == 0 {
      return false;
    }
    steps -= 1;
    current = match merged.get(&name) {
      Some(declaration) => declaration.supertype_name.clone(),
      None => BUILT_IN_TYPES
          .type_by_name(&name)
          .and_then(|code| BUILT_IN_TYPES.supertype(code))
          .map(|code| BUILT_IN_TYPES.type_name(code).to_string()),
    };
  }
  false
}

/// Merges `features` into the declaration `target`. New features are appended; redeclared features must agree.
pub(crate) fn merge_features(target: &mut TypeDescription, features: &[FeatureDescription]) -> Result<(), SchemaError> {
  for feature in features {
    let Some(existing) = target.features.iter().find(|f| f.name == feature.name) else {
      target.features.push(feature.clone());
      continue;
    };

    let full_name = format!("{}{}{}", target.name, FEATURE_SEPARATOR, existing.name);
    let location  = location_of(&target.source_url, &None);

    if existing.range_type_name != feature.range_type_name {
      return Err(SchemaError::IncompatibleRangeTypes {
        feature_name            : full_name,
        range_type_name         : feature.range_type_name.clone(),
        existing_range_type_name: existing.range_type_name.clone(),
        location,
      });
    }

    if !multi_refs_compatible(existing.multiple_references_allowed, feature.multiple_references_allowed) {
      return Err(SchemaError::IncompatibleMultiRefs { feature_name: full_name, location });
    }

    if !element_types_compatible(existing.element_type.as_deref(), feature.element_type.as_deref()) {
      return Err(SchemaError::IncompatibleElementTypes {
        feature_name         : full_name,
        element_type         : feature.element_type.clone().unwrap_or_default(),
        existing_element_type: existing.element_type.clone().unwrap_or_default(),
        location,
      });
    }
  }
  Ok(())
}

/// Equal, or one side unspecified while the other is `false`.
fn multi_refs_compatible(a: Option<bool>, b: Option<bool>) -> bool {
  match (a, b) {
    (None, None)                                => true,
    (Some(a), Some(b))                          => a == b,
    (None, Some(false)) | (Some(false), None)   => true,
    _                                           => false,
  }
}

/// Equal, or one side unspecified while the other is the top type.
fn element_types_compatible(a: Option<&str>, b: Option<&str>) -> bool {
  match (a, b) {
    (None, None)                           => true,
    (Some(a), Some(b))                     => a == b,
    (Some(only), None) | (None, Some(only)) => only == TYPE_NAME_TOP,
  }
}

/// Concatenates all priority lists in input order. Each list keeps its own location or inherits its container's.
pub fn merge_type_priorities(priorities: &[TypePriorities]) -> TypePriorities {
  let priority_lists = priorities
      .iter()
      .flat_map(|container| {
        container.priority_lists.iter().map(move |list| TypePriorityList {
          types     : list.types.clone(),
          source_url: list.source_url.clone().or_else(|| container.source_url.clone()),
        })
      })
      .collect();

  TypePriorities { priority_lists, source_url: None }
}

/// Unions index collections by label. Two different definitions under one label are an error.
pub fn merge_fs_indexes(collections: &[FsIndexCollection]) -> Result<FsIndexCollection, SchemaError> {
  let mut indexes: Vec<FsIndexDescription> = Vec::new();

  for collection in collections {
    for index in collection.indexes.iter() {
      let mut index = index.clone();
      if index.source_url.is_none() {
        index.source_url = collection.source_url.clone();
      }

      match indexes.iter().find(|existing| existing.label == index.label) {
        None => indexes.push(index),
        Some(existing) if existing.same_definition(&index) => {}
        Some(existing) => {
          return Err(SchemaError::DuplicateIndexName {
            label          : index.label.clone(),
            first_location : location_of(&existing.source_url, &None),
            second_location: location_of(&index.source_url, &None),
          });
        }
      }
    }
  }

  Ok(FsIndexCollection { indexes, source_url: None })
}

impl CasDefinition {
  /// Merges type systems, priorities, and indexes of several definitions.
  pub fn merge(definitions: &[CasDefinition], report: Option<&mut MergedTypeReport>) -> Result<CasDefinition, SchemaError> {
    let type_systems: Vec<TypeSystemDescription> = definitions.iter().map(|d| d.type_system.clone()).collect();
    let priorities  : Vec<TypePriorities>        = definitions.iter().map(|d| d.type_priorities.clone()).collect();
    let indexes     : Vec<FsIndexCollection>     = definitions.iter().map(|d| d.indexes.clone()).collect();

    Ok(CasDefinition {
      type_system    : merge_type_systems(&type_systems, report)?,
      type_priorities: merge_type_priorities(&priorities),
      indexes        : merge_fs_indexes(&indexes)?,
    })
  }
}
