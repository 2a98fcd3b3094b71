use std::io;

use thiserror::Error;

use crate::{api::CasError, core::type_system::SchemaError};

/// Failures while saving or loading a store. I/O failures are kept apart from format and schema failures.
#[derive(Debug, Error)]
pub enum SerialError {
  #[error(transparent)]
  Io(#[from] io::Error),

  #[error("unrecognized serialized CAS format")]
  UnrecognizedFormat,

  #[error("unknown type \"{type_name}\" in serialized data")]
  UnknownType {
    type_name: String,
  },

  #[error("unknown feature \"{feature_name}\" of type \"{type_name}\" in serialized data")]
  UnknownFeature {
    feature_name: String,
    type_name   : String,
  },

  #[error("corrupt serialized data: {0}")]
  Corrupt(String),

  #[error("malformed XML: {0}")]
  Xml(String),

  #[error("cannot encode: {0}")]
  Encode(String),

  #[error(transparent)]
  Schema(#[from] SchemaError),

  #[error(transparent)]
  Cas(#[from] CasError),
}

impl From<quick_xml::Error> for SerialError {
  fn from(error: quick_xml::Error) -> Self {
    match error {
      quick_xml::Error::Io(io_error) => SerialError::Io(io::Error::new(io_error.kind(), io_error.to_string())),
      other                          => SerialError::Xml(other.to_string()),
    }
  }
}

impl From<quick_xml::events::attributes::AttrError> for SerialError {
  fn from(error: quick_xml::events::attributes::AttrError) -> Self {
    SerialError::Xml(error.to_string())
  }
}

impl From<bincode::error::EncodeError> for SerialError {
  fn from(error: bincode::error::EncodeError) -> Self {
    SerialError::Encode(error.to_string())
  }
}

impl From<bincode::error::DecodeError> for SerialError {
  fn from(error: bincode::error::DecodeError) -> Self {
    SerialError::Corrupt(error.to_string())
  }
}

pub type SerialResult<T> = Result<T, SerialError>;
