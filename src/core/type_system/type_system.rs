/*!

The `TypeSystem` owns the type and feature tables. It is built through a `TypeSystemBuilder`, which starts out holding
the built-in types, accepts new types and features, and is consumed by `commit`. Commit fixes feature offsets and
computes the subtype closure, and the resulting `Arc<TypeSystem>` is immutable and shared read-only by every store
created from it.

## Feature Offsets

A record has one slot per feature of its type, inherited features first. Because a type's full feature list is its
supertype's full list followed by its own features, a feature has the same offset in its declaring type and in every
subtype. Offsets are only computed at commit, so features can be added to a supertype after its subtypes exist.

*/

use std::sync::Arc;

use crate::{
  abstractions::{HashMap, HashSet, IString, NatSet},
  core::{
    description::{
      AllowedValue,
      FeatureDescription,
      TypeDescription,
      TypeSystemDescription
    },
    type_system::{
      builtins::{self, primitive_array_type, FS_ARRAY, STRING, TOP},
      cas_type::{ArrayKind, CasType, PrimitiveKind, TypeCode, TypeFlag, TypeFlags, TypeKind, ValueKind},
      feature::{Feature, FeatureCode, FEATURE_SEPARATOR},
      schema_error::{SchemaError, UNKNOWN_LOCATION},
    }
  },
  debug,
};

pub type RcTypeSystem = Arc<TypeSystem>;

#[derive(Debug)]
pub struct TypeSystem {
  types     : Vec<CasType>,
  features  : Vec<Feature>,
  type_names: HashMap<IString, TypeCode>,
}

impl TypeSystem {
  /// A builder holding only the built-in types.
  pub fn builder() -> TypeSystemBuilder {
    TypeSystemBuilder::new()
  }

  /// A committed type system holding only the built-in types.
  pub fn built_in() -> RcTypeSystem {
    TypeSystemBuilder::new().commit()
  }

  fn empty() -> TypeSystem {
    TypeSystem {
      types     : Vec::new(),
      features  : Vec::new(),
      type_names: HashMap::default(),
    }
  }

  // region Table construction, used by the built-ins and the builder

  pub(crate) fn push_type(&mut self, name: &str, supertype: Option<TypeCode>, kind: TypeKind, flags: TypeFlags)
                          -> TypeCode
  {
    let code = TypeCode(self.types.len() as u32);
    let name = IString::from(name);
    self.types.push(CasType::new(name.clone(), code, supertype, kind, flags));
    if let Some(supertype) = supertype {
      self.types[supertype.idx()].subtypes.push(code);
    }
    self.type_names.insert(name, code);
    code
  }

  pub(crate) fn push_feature(&mut self, domain: TypeCode, name: &str, range: TypeCode, multiple_references_allowed: bool)
                             -> FeatureCode
  {
    let code = FeatureCode(self.features.len() as u32);
    self.features.push(Feature {
      name: IString::from(name),
      code,
      domain,
      range,
      multiple_references_allowed,
      description: None,
      offset     : 0,
    });
    self.types[domain.idx()].own_features.push(code);
    code
  }

  // endregion

  // region Queries

  #[inline(always)]
  pub fn len(&self) -> usize {
    self.types.len()
  }

  pub fn is_empty(&self) -> bool {
    self.types.is_empty()
  }

  pub fn feature_count(&self) -> usize {
    self.features.len()
  }

  pub fn type_by_name(&self, name: &str) -> Option<TypeCode> {
    self.type_names.get(&IString::from(name)).copied()
  }

  #[inline(always)]
  pub fn ty(&self, code: TypeCode) -> &CasType {
    &self.types[code.idx()]
  }

  pub fn type_name(&self, code: TypeCode) -> &str {
    &self.types[code.idx()].name
  }

  pub fn types(&self) -> impl Iterator<Item = &CasType> {
    self.types.iter()
  }

  #[inline(always)]
  pub fn feature(&self, code: FeatureCode) -> &Feature {
    &self.features[code.idx()]
  }

  pub fn features(&self) -> impl Iterator<Item = &Feature> {
    self.features.iter()
  }

  /// All features of `code`, inherited first. In slot order.
  pub fn features_of(&self, code: TypeCode) -> &[FeatureCode] {
    &self.types[code.idx()].features
  }

  /// The feature visible on `code` with short name `name`, whether declared there or inherited.
  pub fn feature_by_base_name(&self, code: TypeCode, name: &str) -> Option<FeatureCode> {
    let mut current = Some(code);
    while let Some(type_code) = current {
      let cas_type = &self.types[type_code.idx()];
      if let Some(found) = cas_type
          .own_features
          .iter()
          .find(|f| &*self.features[f.idx()].name == name)
      {
        return Some(*found);
      }
      current = cas_type.supertype;
    }
    None
  }

  /// Looks up a feature by its fully qualified name, `type:feature`.
  pub fn feature_by_name(&self, full_name: &str) -> Option<FeatureCode> {
    let (type_name, feature_name) = full_name.rsplit_once(FEATURE_SEPARATOR)?;
    self.feature_by_base_name(self.type_by_name(type_name)?, feature_name)
  }

  pub fn feature_full_name(&self, code: FeatureCode) -> String {
    let feature = &self.features[code.idx()];
    format!("{}{}{}", self.type_name(feature.domain), FEATURE_SEPARATOR, feature.name)
  }

  pub fn supertype(&self, code: TypeCode) -> Option<TypeCode> {
    self.types[code.idx()].supertype
  }

  /// Whether `general` is `specific` or one of its ancestors. Uses the closure computed at commit.
  #[inline(always)]
  pub fn subsumes(&self, general: TypeCode, specific: TypeCode) -> bool {
    self.types[general.idx()].leq_types.contains(specific.idx())
  }

  /// Whether a slot of range `range` may refer to a record of type `target`. Typed reference arrays also accept an
  /// untyped `uima.cas.FSArray`.
  pub fn accepts_reference(&self, range: TypeCode, target: TypeCode) -> bool {
    self.subsumes(range, target)
        || (matches!(self.array_kind(range), Some(ArrayKind::Fs { .. })) && target == FS_ARRAY)
  }

  /// The kind of value a slot whose range is `code` holds.
  pub fn value_kind(&self, code: TypeCode) -> ValueKind {
    self.types[code.idx()].kind.value_kind()
  }

  /// The kind of value held by feature `code`.
  pub fn range_kind(&self, code: FeatureCode) -> ValueKind {
    self.value_kind(self.features[code.idx()].range)
  }

  /// The array type for elements of type `element`: a built-in primitive array, `uima.cas.StringArray` for string
  /// subtypes, the typed array `<element>[]` if the type system has one, and `uima.cas.FSArray` otherwise.
  pub fn array_type_for(&self, element: TypeCode) -> TypeCode {
    match &self.types[element.idx()].kind {
      TypeKind::Primitive(kind)   => primitive_array_type(*kind),
      TypeKind::StringSubtype(..) => primitive_array_type(PrimitiveKind::String),
      _ if element == TOP         => FS_ARRAY,
      _ => {
        let name = typed_array_name(self.type_name(element));
        self.type_by_name(&name).unwrap_or(FS_ARRAY)
      }
    }
  }

  /// The array kind of `code`, if it is an array type.
  pub fn array_kind(&self, code: TypeCode) -> Option<ArrayKind> {
    match &self.types[code.idx()].kind {
      TypeKind::Array(kind) => Some(*kind),
      _ => None,
    }
  }

  /// Whether `value` is acceptable for a slot of range `range`. Only string subtypes restrict values.
  pub fn is_allowed_string(&self, range: TypeCode, value: &str) -> bool {
    match self.types[range.idx()].allowed_values() {
      Some(values) => values.iter().any(|v| &**v == value),
      None         => true,
    }
  }

  // endregion

  /// Describes the user-defined part of this type system: every type that is not built in, in code order, plus a
  /// declaration for each built-in type that received user features. Typed arrays created implicitly for element
  /// types are not listed; features with such ranges are described as `uima.cas.FSArray` with an element type.
  pub fn to_description(&self) -> TypeSystemDescription {
    let mut description = TypeSystemDescription::default();

    for cas_type in self.types.iter() {
      if cas_type.is_array() && !cas_type.is_built_in() {
        continue;
      }
      let user_features: Vec<FeatureDescription> = cas_type
          .own_features
          .iter()
          .filter(|f| f.idx() >= builtins::BUILT_IN_FEATURE_COUNT)
          .map(|f| self.describe_feature(*f))
          .collect();

      if cas_type.is_built_in() && user_features.is_empty() {
        continue;
      }

      let allowed_values = cas_type
          .allowed_values()
          .map(|values| {
            values.iter().map(|v| AllowedValue { string: v.to_string(), description: None }).collect()
          })
          .unwrap_or_default();

      description.types.push(TypeDescription {
        name          : cas_type.name.to_string(),
        description   : cas_type.description.clone(),
        supertype_name: cas_type.supertype.map(|s| self.type_name(s).to_string()),
        features      : user_features,
        allowed_values,
        source_url    : None,
      });
    }

    description
  }

  fn describe_feature(&self, code: FeatureCode) -> FeatureDescription {
    let feature = &self.features[code.idx()];
    let range   = &self.types[feature.range.idx()];
    let (range_type_name, element_type) = match range.kind {
      TypeKind::Array(ArrayKind::Fs { element }) if !range.is_built_in() => {
        (builtins::TYPE_NAME_FS_ARRAY.to_string(), Some(self.type_name(element).to_string()))
      }
      _ => (range.name.to_string(), None),
    };

    FeatureDescription {
      name                       : feature.name.to_string(),
      description                : feature.description.clone(),
      range_type_name,
      element_type,
      multiple_references_allowed: feature.multiple_references_allowed.then_some(true),
      source_url                 : None,
    }
  }

  /// Fixes the feature lists and offsets and computes the subtype closure.
  fn finish(&mut self) {
    // Supertypes have lower codes, so each supertype's full feature list is complete before its subtypes are visited.
    for index in 0..self.types.len() {
      let mut features = match self.types[index].supertype {
        Some(supertype) => self.types[supertype.idx()].features.clone(),
        None            => Vec::new(),
      };
      features.extend_from_slice(&self.types[index].own_features);
      for (offset, feature) in features.iter().enumerate() {
        if self.features[feature.idx()].domain.idx() == index {
          self.features[feature.idx()].offset = offset;
        }
      }
      self.types[index].features = features;
    }

    // The closure of the subtype relation, visiting subtypes before their supertypes.
    for index in (0..self.types.len()).rev() {
      let mut leq_types = NatSet::with_capacity(self.types.len());
      leq_types.insert(index);
      for subtype in self.types[index].subtypes.iter() {
        leq_types.union_in_place(&self.types[subtype.idx()].leq_types);
      }
      self.types[index].leq_types = leq_types;
    }
  }
}

/// Name of the typed reference array holding elements named `element_name`.
pub fn typed_array_name(element_name: &str) -> String {
  format!("{}[]", element_name)
}


/// Accumulates types and features until `commit`. Every builder starts with the built-in types.
pub struct TypeSystemBuilder {
  type_system: TypeSystem,
}

impl Default for TypeSystemBuilder {
  fn default() -> Self {
    Self::new()
  }
}

impl TypeSystemBuilder {
  pub fn new() -> TypeSystemBuilder {
    let mut type_system = TypeSystem::empty();
    builtins::populate(&mut type_system);
    TypeSystemBuilder { type_system }
  }

  pub fn type_by_name(&self, name: &str) -> Option<TypeCode> {
    self.type_system.type_by_name(name)
  }

  pub fn ty(&self, code: TypeCode) -> &CasType {
    self.type_system.ty(code)
  }

  pub fn type_name(&self, code: TypeCode) -> &str {
    self.type_system.type_name(code)
  }

  pub fn len(&self) -> usize {
    self.type_system.len()
  }

  pub fn is_empty(&self) -> bool {
    self.type_system.is_empty()
  }

  pub fn feature(&self, code: FeatureCode) -> &Feature {
    self.type_system.feature(code)
  }

  pub fn feature_by_base_name(&self, code: TypeCode, name: &str) -> Option<FeatureCode> {
    self.type_system.feature_by_base_name(code, name)
  }

  /// Adds a record type. If a type named `name` already exists with the same supertype, its code is returned.
  pub fn add_type(&mut self, name: &str, supertype: TypeCode) -> Result<TypeCode, SchemaError> {
    if let Some(existing) = self.type_by_name(name) {
      let existing_supertype = self.ty(existing).supertype;
      return if existing_supertype == Some(supertype) {
        Ok(existing)
      } else {
        Err(SchemaError::DuplicateType {
          type_name         : name.to_string(),
          existing_supertype: existing_supertype.map(|s| self.type_name(s).to_string()).unwrap_or_default(),
          supertype         : self.type_name(supertype).to_string(),
        })
      };
    }

    let parent = self.ty(supertype);
    if supertype == STRING {
      return Err(SchemaError::MissingAllowedValues {
        type_name: name.to_string(),
        location : UNKNOWN_LOCATION.to_string(),
      });
    }
    if parent.flags.contains(TypeFlag::InheritanceFinal) || parent.is_primitive() {
      return Err(SchemaError::InheritanceFinal {
        type_name     : name.to_string(),
        supertype_name: parent.name.to_string(),
      });
    }

    Ok(self.type_system.push_type(name, Some(supertype), TypeKind::Record, TypeFlags::empty()))
  }

  /// Adds a subtype of `uima.cas.String` restricted to `values`. An existing string subtype with the same name and the
  /// same set of values is returned.
  pub fn add_string_subtype(&mut self, name: &str, values: &[&str]) -> Result<TypeCode, SchemaError> {
    let values: Vec<IString> = values.iter().map(|v| IString::from(*v)).collect();

    if let Some(existing) = self.type_by_name(name) {
      let existing_type = self.ty(existing);
      return match existing_type.allowed_values() {
        Some(existing_values)
            if existing_values.iter().collect::<HashSet<_>>() == values.iter().collect::<HashSet<_>>() => Ok(existing),
        Some(_) => Err(SchemaError::AllowedValuesMismatch {
          type_name: name.to_string(),
          location : UNKNOWN_LOCATION.to_string(),
        }),
        None => Err(SchemaError::DuplicateType {
          type_name         : name.to_string(),
          existing_supertype: existing_type.supertype.map(|s| self.type_name(s).to_string()).unwrap_or_default(),
          supertype         : builtins::TYPE_NAME_STRING.to_string(),
        }),
      };
    }

    Ok(self.type_system.push_type(name, Some(STRING), TypeKind::StringSubtype(values), TypeFlag::FeatureFinal.into()))
  }

  /// The array type for elements of type `element`, creating the typed reference array `<element>[]` if needed.
  pub fn array_type(&mut self, element: TypeCode) -> TypeCode {
    let resolved = self.type_system.array_type_for(element);
    if resolved != FS_ARRAY || element == TOP {
      return resolved;
    }

    let name = typed_array_name(self.type_name(element));
    self.type_system.push_type(
      &name,
      Some(FS_ARRAY),
      TypeKind::Array(ArrayKind::Fs { element }),
      TypeFlag::InheritanceFinal | TypeFlag::FeatureFinal
    )
  }

  /// Adds feature `name` to `domain`. A feature with this name already visible on `domain` (own or inherited) is
  /// returned if its range is `range`; a different range is an error. A subtype of `domain` already declaring the name
  /// is also an error.
  pub fn add_feature(&mut self, domain: TypeCode, name: &str, range: TypeCode, multiple_references_allowed: bool)
                     -> Result<FeatureCode, SchemaError>
  {
    if let Some(existing) = self.feature_by_base_name(domain, name) {
      let existing_range = self.feature(existing).range;
      if existing_range == range {
        debug!(
          3,
          "feature {} redeclared on {} with the same range; keeping the declaration on {}",
          name,
          self.type_name(domain),
          self.type_name(self.feature(existing).domain)
        );
        return Ok(existing);
      }
      return Err(SchemaError::DuplicateFeature {
        type_name     : self.type_name(domain).to_string(),
        feature_name  : name.to_string(),
        range         : self.type_name(range).to_string(),
        existing_range: self.type_name(existing_range).to_string(),
      });
    }

    if self.ty(domain).flags.contains(TypeFlag::FeatureFinal) {
      return Err(SchemaError::FeatureFinal {
        type_name   : self.type_name(domain).to_string(),
        feature_name: name.to_string(),
      });
    }

    if let Some((subtype, existing)) = self.declared_below(domain, name) {
      return Err(SchemaError::DuplicateFeature {
        type_name     : self.type_name(subtype).to_string(),
        feature_name  : name.to_string(),
        range         : self.type_name(range).to_string(),
        existing_range: self.type_name(self.feature(existing).range).to_string(),
      });
    }

    Ok(self.type_system.push_feature(domain, name, range, multiple_references_allowed))
  }

  /// Sets the documentation string of a type.
  pub fn set_type_description(&mut self, code: TypeCode, description: Option<String>) {
    self.type_system.types[code.idx()].description = description;
  }

  pub fn set_feature_description(&mut self, code: FeatureCode, description: Option<String>) {
    self.type_system.features[code.idx()].description = description;
  }

  /// Finds a proper subtype of `domain` that declares a feature named `name`.
  fn declared_below(&self, domain: TypeCode, name: &str) -> Option<(TypeCode, FeatureCode)> {
    let mut stack: Vec<TypeCode> = self.ty(domain).subtypes.clone();
    while let Some(code) = stack.pop() {
      let cas_type = self.ty(code);
      if let Some(found) = cas_type
          .own_features
          .iter()
          .find(|f| &*self.feature(**f).name == name)
      {
        return Some((code, *found));
      }
      stack.extend_from_slice(&cas_type.subtypes);
    }
    None
  }

  /// Freezes the type system.
  pub fn commit(self) -> RcTypeSystem {
    let mut type_system = self.type_system;
    type_system.finish();
    Arc::new(type_system)
  }
}
