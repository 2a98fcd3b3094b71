use thiserror::Error;

use crate::core::type_system::SchemaError;

/// Misuse of a store: unknown names, values of the wrong kind, out of range access.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CasError {
  #[error("no view named \"{0}\"")]
  UnknownView(String),

  #[error("a view named \"{0}\" already exists")]
  DuplicateView(String),

  #[error("invalid view handle {0}")]
  InvalidView(u32),

  #[error("no type named \"{0}\"")]
  UnknownType(String),

  #[error("type \"{type_name}\" cannot be instantiated with this operation")]
  NotCreatable {
    type_name: String,
  },

  #[error("type \"{type_name}\" is not an array type")]
  NotAnArray {
    type_name: String,
  },

  #[error("invalid record handle {0}")]
  InvalidHandle(u32),

  #[error("feature \"{feature}\" is not defined on type \"{type_name}\"")]
  FeatureNotOnType {
    feature  : String,
    type_name: String,
  },

  #[error("a value of kind {found} cannot be stored in feature \"{feature}\" with range \"{range}\"")]
  WrongValueKind {
    feature: String,
    range  : String,
    found  : String,
  },

  #[error("a record of type \"{found}\" cannot be stored in feature \"{feature}\" with range \"{range}\"")]
  IncompatibleReference {
    feature: String,
    range  : String,
    found  : String,
  },

  #[error("value \"{value}\" is not allowed for feature \"{feature}\" with range \"{range}\"")]
  ValueNotAllowed {
    value  : String,
    feature: String,
    range  : String,
  },

  #[error("array element of kind {found} cannot be stored in an array of {expected} elements")]
  WrongElementKind {
    expected: String,
    found   : String,
  },

  #[error("index {index} is out of bounds for an array of length {length}")]
  ArrayIndexOutOfBounds {
    index : usize,
    length: usize,
  },

  #[error("cannot parse \"{value}\" as {kind}")]
  ParseValue {
    value: String,
    kind : String,
  },

  #[error("no index labeled \"{0}\"")]
  UnknownIndex(String),

  #[error("the sofa of view \"{0}\" already has data")]
  SofaDataAlreadySet(String),

  #[error(transparent)]
  Schema(#[from] SchemaError),
}
