use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::abstractions::IString;
use crate::core::type_system::TypeCode;

/// Separates the type name from the feature name in a fully qualified feature name, `uima.tcas.Annotation:begin`.
pub const FEATURE_SEPARATOR: char = ':';

/// A handle to a feature within its type system.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct FeatureCode(pub u32);

impl FeatureCode {
  #[inline(always)]
  pub fn idx(self) -> usize {
    self.0 as usize
  }
}

#[derive(Clone, Debug)]
pub struct Feature {
  /// The short name, unique among the features visible on `domain`.
  pub name                       : IString,
  pub code                       : FeatureCode,
  /// The type that declares the feature.
  pub domain                     : TypeCode,
  pub range                      : TypeCode,
  pub multiple_references_allowed: bool,
  pub description                : Option<String>,
  /// Slot index in records of `domain` and of every subtype of `domain`. Fixed at commit.
  pub(crate) offset              : usize,
}

impl Feature {
  #[inline(always)]
  pub fn offset(&self) -> usize {
    self.offset
  }
}

impl Display for Feature {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.name)
  }
}
