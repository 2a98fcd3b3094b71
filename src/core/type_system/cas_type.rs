/*!

A `CasType` is a named type in a type system. Types form a single-inheritance tree rooted at `uima.cas.TOP`. Each
type has a `TypeKind` that decides what its instances look like: records with one slot per feature, primitive values
(which never exist as records), string subtypes (enumerated strings), or arrays.

## Subsumption

Types are created after their supertypes, so a supertype always has a smaller `TypeCode` than its subtypes. At commit
the transitive closure of the subtype relation is computed for every type by visiting codes in decreasing order and
unioning each type's `leq_types` into its supertype's. The result is a `NatSet` per type so that `subsumes` is a single
bit test.

*/

use std::fmt::{Display, Formatter};

use enumflags2::{bitflags, make_bitflags, BitFlags};
use serde::{Deserialize, Serialize};

use crate::abstractions::{IString, NatSet};
use crate::core::type_system::FeatureCode;

/// A handle to a type within its type system.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct TypeCode(pub u32);

impl TypeCode {
  #[inline(always)]
  pub fn idx(self) -> usize {
    self.0 as usize
  }
}

impl Display for TypeCode {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// The primitive value kinds. A feature whose range is a primitive type (or a string subtype) holds a value of one
/// of these kinds directly in its slot.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum PrimitiveKind {
  Boolean,
  Byte,
  Short,
  Integer,
  Long,
  Float,
  Double,
  String,
}

impl PrimitiveKind {
  pub const ALL: [PrimitiveKind; 8] = [
    PrimitiveKind::Boolean,
    PrimitiveKind::Byte,
    PrimitiveKind::Short,
    PrimitiveKind::Integer,
    PrimitiveKind::Long,
    PrimitiveKind::Float,
    PrimitiveKind::Double,
    PrimitiveKind::String,
  ];
}

/// The element kind of an array type. `Fs` arrays hold references; `element` is the declared element type, which is
/// `uima.cas.TOP` for the untyped `uima.cas.FSArray`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum ArrayKind {
  Boolean,
  Byte,
  Short,
  Integer,
  Long,
  Float,
  Double,
  String,
  Fs { element: TypeCode },
}

impl ArrayKind {
  pub fn for_primitive(kind: PrimitiveKind) -> ArrayKind {
    match kind {
      PrimitiveKind::Boolean => ArrayKind::Boolean,
      PrimitiveKind::Byte    => ArrayKind::Byte,
      PrimitiveKind::Short   => ArrayKind::Short,
      PrimitiveKind::Integer => ArrayKind::Integer,
      PrimitiveKind::Long    => ArrayKind::Long,
      PrimitiveKind::Float   => ArrayKind::Float,
      PrimitiveKind::Double  => ArrayKind::Double,
      PrimitiveKind::String  => ArrayKind::String,
    }
  }

  /// The primitive kind of the elements, or `None` for reference arrays.
  pub fn element_primitive(&self) -> Option<PrimitiveKind> {
    match self {
      ArrayKind::Boolean => Some(PrimitiveKind::Boolean),
      ArrayKind::Byte    => Some(PrimitiveKind::Byte),
      ArrayKind::Short   => Some(PrimitiveKind::Short),
      ArrayKind::Integer => Some(PrimitiveKind::Integer),
      ArrayKind::Long    => Some(PrimitiveKind::Long),
      ArrayKind::Float   => Some(PrimitiveKind::Float),
      ArrayKind::Double  => Some(PrimitiveKind::Double),
      ArrayKind::String  => Some(PrimitiveKind::String),
      ArrayKind::Fs{..}  => None,
    }
  }
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub enum TypeKind {
  /// Instances are records with one slot per feature. This includes the abstract roots `TOP` and `ArrayBase`.
  Record,
  Primitive(PrimitiveKind),
  /// A subtype of `uima.cas.String` whose values are restricted to an ordered list.
  StringSubtype(Vec<IString>),
  Array(ArrayKind),
}

impl TypeKind {
  /// The kind of value a slot whose range is this type holds.
  pub fn value_kind(&self) -> ValueKind {
    match self {
      TypeKind::Primitive(kind)   => ValueKind::Primitive(*kind),
      TypeKind::StringSubtype(..) => ValueKind::Primitive(PrimitiveKind::String),
      TypeKind::Record
      | TypeKind::Array(..)       => ValueKind::Reference,
    }
  }

  pub fn is_array(&self) -> bool {
    matches!(self, TypeKind::Array(..))
  }
}

/// What a feature slot holds, as determined by the feature's range.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ValueKind {
  Primitive(PrimitiveKind),
  Reference,
}

#[bitflags]
#[repr(u8)]
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum TypeFlag {
  /// Pre-populated in every type system
  BuiltIn,
  /// No user type may have this type as its supertype
  InheritanceFinal,
  /// No features may be added to this type
  FeatureFinal,
  /// Cannot be instantiated directly
  Abstract,
}

impl TypeFlag {
  #![allow(non_upper_case_globals)]

  /// Flags of the primitive types other than `String`, and of the array types
  pub const Sealed: TypeFlags = make_bitflags!(
    TypeFlag::{
      BuiltIn | InheritanceFinal | FeatureFinal
    }
  );
}

pub type TypeFlags = BitFlags<TypeFlag, u8>;

#[derive(Clone, Debug)]
pub struct CasType {
  pub name       : IString,
  pub code       : TypeCode,
  pub supertype  : Option<TypeCode>,
  pub kind       : TypeKind,
  pub flags      : TypeFlags,
  pub description: Option<String>,

  /// Features declared on this type itself, in declaration order.
  pub(crate) own_features: Vec<FeatureCode>,
  /// Inherited features followed by own features. Filled in at commit.
  pub(crate) features    : Vec<FeatureCode>,
  /// Direct subtypes.
  pub(crate) subtypes    : Vec<TypeCode>,
  /// Codes of all types this type subsumes, itself included. Filled in at commit.
  pub(crate) leq_types   : NatSet,
}

impl CasType {
  pub(crate) fn new(name: IString, code: TypeCode, supertype: Option<TypeCode>, kind: TypeKind, flags: TypeFlags)
                    -> CasType
  {
    CasType {
      name,
      code,
      supertype,
      kind,
      flags,
      description : None,
      own_features: vec![],
      features    : vec![],
      subtypes    : vec![],
      leq_types   : NatSet::new(),
    }
  }

  #[inline(always)]
  pub fn is_built_in(&self) -> bool {
    self.flags.contains(TypeFlag::BuiltIn)
  }

  pub fn is_abstract(&self) -> bool {
    self.flags.contains(TypeFlag::Abstract)
  }

  pub fn is_array(&self) -> bool {
    self.kind.is_array()
  }

  pub fn is_primitive(&self) -> bool {
    matches!(self.kind, TypeKind::Primitive(_) | TypeKind::StringSubtype(_))
  }

  /// The allowed values if this is a string subtype.
  pub fn allowed_values(&self) -> Option<&[IString]> {
    match &self.kind {
      TypeKind::StringSubtype(values) => Some(values.as_slice()),
      _ => None,
    }
  }

  /// All features, inherited first.
  pub fn features(&self) -> &[FeatureCode] {
    &self.features
  }

  pub fn own_features(&self) -> &[FeatureCode] {
    &self.own_features
  }

  pub fn subtypes(&self) -> &[TypeCode] {
    &self.subtypes
  }

  /// The short name, the part after the last `.`.
  pub fn short_name(&self) -> &str {
    match self.name.rfind('.') {
      Some(position) => &self.name[position + 1..],
      None           => &self.name,
    }
  }

  /// The namespace, the part before the last `.`, or the empty string.
  pub fn namespace(&self) -> &str {
    match self.name.rfind('.') {
      Some(position) => &self.name[..position],
      None           => "",
    }
  }
}

impl Display for CasType {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.name)
  }
}
