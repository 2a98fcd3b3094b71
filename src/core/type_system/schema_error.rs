/*!

Errors raised while merging, installing, or committing a type system and its index and priority definitions. Every
variant carries the names involved and, for errors that originate in a description, the source location of the
offending declaration (`"<unknown>"` when the description has none).

*/

use thiserror::Error;

use crate::core::index::TypeOrderError;

/// Source location reported when a declaration does not carry one.
pub const UNKNOWN_LOCATION: &str = "<unknown>";

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SchemaError {
  #[error("type \"{type_name}\" does not declare a supertype (declared in {location})")]
  NoSupertype {
    type_name: String,
    location : String,
  },

  #[error("built-in type \"{type_name}\" has supertype \"{builtin_supertype}\" and cannot be redeclared with supertype \"{supertype}\" (declared in {location})")]
  RedefiningBuiltInType {
    builtin_supertype: String,
    type_name        : String,
    supertype        : String,
    location         : String,
  },

  #[error("type \"{type_name}\" already exists with supertype \"{existing_supertype}\"; it cannot be added again with supertype \"{supertype}\"")]
  DuplicateType {
    type_name         : String,
    existing_supertype: String,
    supertype         : String,
  },

  #[error("string subtype \"{type_name}\" declares no allowed values (declared in {location})")]
  MissingAllowedValues {
    type_name: String,
    location : String,
  },

  #[error("type \"{type_name}\" declares allowed values but is not a subtype of uima.cas.String (declared in {location})")]
  AllowedValuesOnNonStringType {
    type_name: String,
    location : String,
  },

  #[error("undefined supertype \"{supertype_name}\" of type \"{type_name}\" (declared in {location})")]
  UndefinedSupertype {
    supertype_name: String,
    type_name     : String,
    location      : String,
  },

  #[error("undefined range type \"{range_type_name}\" of feature \"{feature_name}\" on type \"{type_name}\" (declared in {location})")]
  UndefinedRangeType {
    range_type_name: String,
    feature_name   : String,
    type_name      : String,
    location       : String,
  },

  #[error("type \"{type_name}\" is declared with incompatible supertypes \"{supertype}\" and \"{existing_supertype}\" (declared in {location})")]
  IncompatibleSupertypes {
    type_name         : String,
    supertype         : String,
    existing_supertype: String,
    location          : String,
  },

  #[error("string subtype \"{type_name}\" is declared with different sets of allowed values (declared in {location})")]
  AllowedValuesMismatch {
    type_name: String,
    location : String,
  },

  #[error("feature \"{feature_name}\" is declared with incompatible range types \"{range_type_name}\" and \"{existing_range_type_name}\" (declared in {location})")]
  IncompatibleRangeTypes {
    feature_name           : String,
    range_type_name        : String,
    existing_range_type_name: String,
    location               : String,
  },

  #[error("feature \"{feature_name}\" is declared with incompatible multiple-references-allowed settings (declared in {location})")]
  IncompatibleMultiRefs {
    feature_name: String,
    location    : String,
  },

  #[error("feature \"{feature_name}\" is declared with incompatible element types \"{element_type}\" and \"{existing_element_type}\" (declared in {location})")]
  IncompatibleElementTypes {
    feature_name         : String,
    element_type         : String,
    existing_element_type: String,
    location             : String,
  },

  #[error("feature \"{feature_name}\" on type \"{type_name}\" already exists with range \"{existing_range}\"; it cannot be added with range \"{range}\"")]
  DuplicateFeature {
    type_name     : String,
    feature_name  : String,
    range         : String,
    existing_range: String,
  },

  #[error("type \"{supertype_name}\" cannot be inherited from (requested by \"{type_name}\")")]
  InheritanceFinal {
    type_name     : String,
    supertype_name: String,
  },

  #[error("no features can be added to type \"{type_name}\" (requested feature \"{feature_name}\")")]
  FeatureFinal {
    type_name   : String,
    feature_name: String,
  },

  #[error("undefined type \"{type_name}\" referenced by a type priority list (declared in {location})")]
  UndefinedTypeForPriorityList {
    type_name: String,
    location : String,
  },

  #[error("invalid type priorities (declared in {location})")]
  InvalidTypePriorities {
    location: String,
    #[source]
    cause   : TypeOrderError,
  },

  #[error("undefined type \"{type_name}\" for index \"{label}\" (declared in {location})")]
  UndefinedTypeForIndex {
    type_name: String,
    label    : String,
    location : String,
  },

  #[error("key feature \"{feature_name}\" of index \"{label}\" does not exist on the index type (declared in {location})")]
  IndexKeyFeatureNotFound {
    feature_name: String,
    label       : String,
    location    : String,
  },

  #[error("index \"{label}\" is defined differently in {first_location} and {second_location}")]
  DuplicateIndexName {
    label          : String,
    first_location : String,
    second_location: String,
  },
}
