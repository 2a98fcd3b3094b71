/*!

Descriptions are the plain-data input to merging and installation: type system descriptions, type priorities, and
index collections. They are produced by an external descriptor reader (or built in code) with imports already resolved.
A `CasDefinition` bundles one of each and is what gets embedded in serialized data as "TSI" information.

Every declaration may carry a source location for diagnostics. A declaration without its own location is reported
with its container's location, and failing that with `"<unknown>"`.

*/

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::core::type_system::UNKNOWN_LOCATION;

/// Resolves the location reported for a declaration: its own, else its container's.
pub(crate) fn location_of(own: &Option<String>, container: &Option<String>) -> String {
  own
      .as_ref()
      .or(container.as_ref())
      .cloned()
      .unwrap_or_else(|| UNKNOWN_LOCATION.to_string())
}

// Type systems

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeSystemDescription {
  pub name      : Option<String>,
  pub types     : Vec<TypeDescription>,
  pub source_url: Option<String>,
}

impl TypeSystemDescription {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_source(source_url: &str) -> Self {
    TypeSystemDescription {
      source_url: Some(source_url.to_string()),
      ..Self::default()
    }
  }

  /// Appends a new type declaration and returns it for further editing.
  pub fn add_type(&mut self, name: &str, description: Option<&str>, supertype_name: &str) -> &mut TypeDescription {
    self.types.push(TypeDescription {
      name          : name.to_string(),
      description   : description.map(str::to_string),
      supertype_name: Some(supertype_name.to_string()),
      ..TypeDescription::default()
    });
    let last = self.types.len() - 1;
    &mut self.types[last]
  }

  pub fn type_named(&self, name: &str) -> Option<&TypeDescription> {
    self.types.iter().find(|t| t.name == name)
  }

  /// Copies the container's source location onto every declaration that has none of its own.
  pub fn inherit_source_locations(&mut self) {
    let container = self.source_url.clone();
    for type_description in self.types.iter_mut() {
      if type_description.source_url.is_none() {
        type_description.source_url = container.clone();
      }
      let type_location = type_description.source_url.clone();
      for feature in type_description.features.iter_mut() {
        if feature.source_url.is_none() {
          feature.source_url = type_location.clone();
        }
      }
    }
  }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeDescription {
  pub name          : String,
  pub description   : Option<String>,
  pub supertype_name: Option<String>,
  pub features      : Vec<FeatureDescription>,
  pub allowed_values: Vec<AllowedValue>,
  pub source_url    : Option<String>,
}

impl TypeDescription {
  pub fn add_feature(&mut self, name: &str, description: Option<&str>, range_type_name: &str) -> &mut FeatureDescription {
    self.features.push(FeatureDescription {
      name           : name.to_string(),
      description    : description.map(str::to_string),
      range_type_name: range_type_name.to_string(),
      ..FeatureDescription::default()
    });
    let last = self.features.len() - 1;
    &mut self.features[last]
  }

  pub fn add_allowed_value(&mut self, value: &str, description: Option<&str>) -> &mut Self {
    self.allowed_values.push(AllowedValue {
      string     : value.to_string(),
      description: description.map(str::to_string),
    });
    self
  }

  pub fn set_source_url(&mut self, source_url: &str) -> &mut Self {
    self.source_url = Some(source_url.to_string());
    self
  }

  pub fn feature_named(&self, name: &str) -> Option<&FeatureDescription> {
    self.features.iter().find(|f| f.name == name)
  }

  /// The allowed values compared as a set.
  pub fn allowed_value_set(&self) -> BTreeSet<&str> {
    self.allowed_values.iter().map(|v| v.string.as_str()).collect()
  }

  pub fn location(&self) -> String {
    location_of(&self.source_url, &None)
  }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureDescription {
  pub name                       : String,
  pub description                : Option<String>,
  pub range_type_name            : String,
  /// For array ranges, the declared element type.
  pub element_type               : Option<String>,
  pub multiple_references_allowed: Option<bool>,
  pub source_url                 : Option<String>,
}

impl FeatureDescription {
  pub fn new(name: &str, range_type_name: &str) -> Self {
    FeatureDescription {
      name           : name.to_string(),
      range_type_name: range_type_name.to_string(),
      ..Self::default()
    }
  }

  pub fn set_element_type(&mut self, element_type: &str) -> &mut Self {
    self.element_type = Some(element_type.to_string());
    self
  }

  pub fn set_multiple_references_allowed(&mut self, allowed: bool) -> &mut Self {
    self.multiple_references_allowed = Some(allowed);
    self
  }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AllowedValue {
  pub string     : String,
  pub description: Option<String>,
}

// Type priorities

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypePriorities {
  pub priority_lists: Vec<TypePriorityList>,
  pub source_url    : Option<String>,
}

impl TypePriorities {
  pub fn add_priority_list(&mut self, types: &[&str]) -> &mut TypePriorityList {
    self.priority_lists.push(TypePriorityList {
      types     : types.iter().map(|t| t.to_string()).collect(),
      source_url: None,
    });
    let last = self.priority_lists.len() - 1;
    &mut self.priority_lists[last]
  }
}

/// Types listed earlier have higher priority than types listed later.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypePriorityList {
  pub types     : Vec<String>,
  pub source_url: Option<String>,
}

// Indexes

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexKind {
  #[default]
  Sorted,
  Set,
  Bag,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
  /// Ascending
  #[default]
  Standard,
  /// Descending
  Reverse,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FsIndexKey {
  Feature {
    name     : String,
    direction: SortDirection,
  },
  /// Orders by the global linear type priority order.
  TypePriority,
}

impl FsIndexKey {
  pub fn feature(name: &str, direction: SortDirection) -> FsIndexKey {
    FsIndexKey::Feature { name: name.to_string(), direction }
  }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FsIndexDescription {
  pub label     : String,
  pub type_name : String,
  /// Sorted when absent.
  pub kind      : Option<IndexKind>,
  pub keys      : Vec<FsIndexKey>,
  pub source_url: Option<String>,
}

impl FsIndexDescription {
  pub fn new(label: &str, type_name: &str, kind: Option<IndexKind>) -> Self {
    FsIndexDescription {
      label    : label.to_string(),
      type_name: type_name.to_string(),
      kind,
      ..Self::default()
    }
  }

  pub fn with_key(mut self, key: FsIndexKey) -> Self {
    self.keys.push(key);
    self
  }

  /// Equality ignoring the source location, which is what decides whether two declarations under one label agree.
  pub fn same_definition(&self, other: &FsIndexDescription) -> bool {
    self.label == other.label
        && self.type_name == other.type_name
        && self.kind.unwrap_or_default() == other.kind.unwrap_or_default()
        && self.keys == other.keys
  }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FsIndexCollection {
  pub indexes   : Vec<FsIndexDescription>,
  pub source_url: Option<String>,
}

// Bundle

/// A type system together with its priorities and index definitions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CasDefinition {
  pub type_system    : TypeSystemDescription,
  pub type_priorities: TypePriorities,
  pub indexes        : FsIndexCollection,
}

impl CasDefinition {
  pub fn new(type_system: TypeSystemDescription) -> Self {
    CasDefinition {
      type_system,
      ..Self::default()
    }
  }

  /// A copy without index definitions and priorities, the form embedded when only the type system is requested.
  pub fn type_system_only(&self) -> CasDefinition {
    CasDefinition::new(self.type_system.clone())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn locations_inherit_from_container() {
    let mut ts = TypeSystemDescription::with_source("file:/types.xml");
    let token  = ts.add_type("org.example.Token", None, "uima.tcas.Annotation");
    token.add_feature("pos", None, "uima.cas.String");
    ts.add_type("org.example.Sentence", None, "uima.tcas.Annotation")
      .set_source_url("file:/sentence.xml");

    ts.inherit_source_locations();

    assert_eq!(ts.types[0].location(), "file:/types.xml");
    assert_eq!(ts.types[0].features[0].source_url.as_deref(), Some("file:/types.xml"));
    assert_eq!(ts.types[1].location(), "file:/sentence.xml");
  }

  #[test]
  fn missing_location_is_unknown() {
    assert_eq!(location_of(&None, &None), UNKNOWN_LOCATION);
    assert_eq!(location_of(&None, &Some("a".to_string())), "a");
  }

  #[test]
  fn index_definitions_compare_without_location() {
    let mut a = FsIndexDescription::new("Tokens", "org.example.Token", None)
        .with_key(FsIndexKey::feature("begin", SortDirection::Standard));
    let b = FsIndexDescription::new("Tokens", "org.example.Token", Some(IndexKind::Sorted))
        .with_key(FsIndexKey::feature("begin", SortDirection::Standard));
    a.source_url = Some("x.xml".to_string());
    assert!(a.same_definition(&b));
  }
}
