/*!

Slot values and array contents. A `Value` is what a single feature slot holds; `ArrayData` is the body of an array
record. Both are closed enums over the primitive kinds plus references, so every consumer dispatches with a `match`.

Primitive values have a canonical string form, which is what `CasCopier` copies through and what the XML codecs write.
Strings and references are nullable.

*/

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use paste::paste;
use serde::{Deserialize, Serialize};

use crate::{
  api::{cas_error::CasError, heap::FsRef},
  core::type_system::{ArrayKind, PrimitiveKind, ValueKind},
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
  Boolean(bool),
  Byte(i8),
  Short(i16),
  Integer(i32),
  Long(i64),
  Float(f32),
  Double(f64),
  String(Option<String>),
  Fs(Option<FsRef>),
}

impl Value {
  /// The initial value of a slot of the given kind: zero, false, or null.
  pub fn default_for(kind: ValueKind) -> Value {
    match kind {
      ValueKind::Primitive(PrimitiveKind::Boolean) => Value::Boolean(false),
      ValueKind::Primitive(PrimitiveKind::Byte)    => Value::Byte(0),
      ValueKind::Primitive(PrimitiveKind::Short)   => Value::Short(0),
      ValueKind::Primitive(PrimitiveKind::Integer) => Value::Integer(0),
      ValueKind::Primitive(PrimitiveKind::Long)    => Value::Long(0),
      ValueKind::Primitive(PrimitiveKind::Float)   => Value::Float(0.0),
      ValueKind::Primitive(PrimitiveKind::Double)  => Value::Double(0.0),
      ValueKind::Primitive(PrimitiveKind::String)  => Value::String(None),
      ValueKind::Reference                         => Value::Fs(None),
    }
  }

  pub fn kind(&self) -> ValueKind {
    match self {
      Value::Boolean(_) => ValueKind::Primitive(PrimitiveKind::Boolean),
      Value::Byte(_)    => ValueKind::Primitive(PrimitiveKind::Byte),
      Value::Short(_)   => ValueKind::Primitive(PrimitiveKind::Short),
      Value::Integer(_) => ValueKind::Primitive(PrimitiveKind::Integer),
      Value::Long(_)    => ValueKind::Primitive(PrimitiveKind::Long),
      Value::Float(_)   => ValueKind::Primitive(PrimitiveKind::Float),
      Value::Double(_)  => ValueKind::Primitive(PrimitiveKind::Double),
      Value::String(_)  => ValueKind::Primitive(PrimitiveKind::String),
      Value::Fs(_)      => ValueKind::Reference,
    }
  }

  pub fn as_fs(&self) -> Option<FsRef> {
    match self {
      Value::Fs(fs) => *fs,
      _ => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::String(s) => s.as_deref(),
      _ => None,
    }
  }

  pub fn as_i64(&self) -> Option<i64> {
    match self {
      Value::Byte(v)    => Some(*v as i64),
      Value::Short(v)   => Some(*v as i64),
      Value::Integer(v) => Some(*v as i64),
      Value::Long(v)    => Some(*v),
      _ => None,
    }
  }

  /// The canonical string form of a primitive value. `None` for null strings and for references.
  pub fn to_canonical_string(&self) -> Option<String> {
    match self {
      Value::Boolean(v) => Some(v.to_string()),
      Value::Byte(v)    => Some(v.to_string()),
      Value::Short(v)   => Some(v.to_string()),
      Value::Integer(v) => Some(v.to_string()),
      Value::Long(v)    => Some(v.to_string()),
      Value::Float(v)   => Some(v.to_string()),
      Value::Double(v)  => Some(v.to_string()),
      Value::String(v)  => v.clone(),
      Value::Fs(_)      => None,
    }
  }

  /// Parses the canonical string form of a primitive of kind `kind`. `None` parses as a null string or as zero.
  pub fn parse(kind: PrimitiveKind, text: Option<&str>) -> Result<Value, CasError> {
    let Some(text) = text else {
      return Ok(Value::default_for(ValueKind::Primitive(kind)));
    };
    let parse_error = || CasError::ParseValue {
      value: text.to_string(),
      kind : format!("{:?}", kind),
    };
    let trimmed = text.trim();

    Ok(match kind {
      PrimitiveKind::Boolean => match trimmed {
        "true" | "1"  => Value::Boolean(true),
        "false" | "0" => Value::Boolean(false),
        _             => return Err(parse_error()),
      },
      PrimitiveKind::Byte    => Value::Byte(trimmed.parse().map_err(|_| parse_error())?),
      PrimitiveKind::Short   => Value::Short(trimmed.parse().map_err(|_| parse_error())?),
      PrimitiveKind::Integer => Value::Integer(trimmed.parse().map_err(|_| parse_error())?),
      PrimitiveKind::Long    => Value::Long(trimmed.parse().map_err(|_| parse_error())?),
      PrimitiveKind::Float   => Value::Float(trimmed.parse().map_err(|_| parse_error())?),
      PrimitiveKind::Double  => Value::Double(trimmed.parse().map_err(|_| parse_error())?),
      PrimitiveKind::String  => Value::String(Some(text.to_string())),
    })
  }

  /// Orders two values of the same kind for index keys. Null sorts first. Values of different kinds compare equal.
  pub fn compare_key(&self, other: &Value) -> Ordering {
    match (self, other) {
      (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
      (Value::Byte(a), Value::Byte(b))       => a.cmp(b),
      (Value::Short(a), Value::Short(b))     => a.cmp(b),
      (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
      (Value::Long(a), Value::Long(b))       => a.cmp(b),
      (Value::Float(a), Value::Float(b))     => a.total_cmp(b),
      (Value::Double(a), Value::Double(b))   => a.total_cmp(b),
      (Value::String(a), Value::String(b))   => a.cmp(b),
      (Value::Fs(a), Value::Fs(b))           => a.cmp(b),
      _ => Ordering::Equal,
    }
  }
}

impl Display for Value {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Value::Fs(Some(fs)) => write!(f, "{}", fs),
      Value::Fs(None)     => write!(f, "null"),
      other               => write!(f, "{}", other.to_canonical_string().unwrap_or_else(|| "null".to_string())),
    }
  }
}

/// The body of an array record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ArrayData {
  Boolean(Vec<bool>),
  Byte(Vec<i8>),
  Short(Vec<i16>),
  Integer(Vec<i32>),
  Long(Vec<i64>),
  Float(Vec<f32>),
  Double(Vec<f64>),
  String(Vec<Option<String>>),
  Fs(Vec<Option<FsRef>>),
}

impl ArrayData {
  /// A zero-filled array of `length` elements for an array type of kind `kind`.
  pub fn new(kind: ArrayKind, length: usize) -> ArrayData {
    match kind {
      ArrayKind::Boolean  => ArrayData::Boolean(vec![false; length]),
      ArrayKind::Byte     => ArrayData::Byte(vec![0; length]),
      ArrayKind::Short    => ArrayData::Short(vec![0; length]),
      ArrayKind::Integer  => ArrayData::Integer(vec![0; length]),
      ArrayKind::Long     => ArrayData::Long(vec![0; length]),
      ArrayKind::Float    => ArrayData::Float(vec![0.0; length]),
      ArrayKind::Double   => ArrayData::Double(vec![0.0; length]),
      ArrayKind::String   => ArrayData::String(vec![None; length]),
      ArrayKind::Fs { .. } => ArrayData::Fs(vec![None; length]),
    }
  }

  pub fn len(&self) -> usize {
    match self {
      ArrayData::Boolean(v) => v.len(),
      ArrayData::Byte(v)    => v.len(),
      ArrayData::Short(v)   => v.len(),
      ArrayData::Integer(v) => v.len(),
      ArrayData::Long(v)    => v.len(),
      ArrayData::Float(v)   => v.len(),
      ArrayData::Double(v)  => v.len(),
      ArrayData::String(v)  => v.len(),
      ArrayData::Fs(v)      => v.len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// The primitive element kind, `None` for reference arrays.
  pub fn element_primitive(&self) -> Option<PrimitiveKind> {
    match self {
      ArrayData::Boolean(_) => Some(PrimitiveKind::Boolean),
      ArrayData::Byte(_)    => Some(PrimitiveKind::Byte),
      ArrayData::Short(_)   => Some(PrimitiveKind::Short),
      ArrayData::Integer(_) => Some(PrimitiveKind::Integer),
      ArrayData::Long(_)    => Some(PrimitiveKind::Long),
      ArrayData::Float(_)   => Some(PrimitiveKind::Float),
      ArrayData::Double(_)  => Some(PrimitiveKind::Double),
      ArrayData::String(_)  => Some(PrimitiveKind::String),
      ArrayData::Fs(_)      => None,
    }
  }

  fn check_index(&self, index: usize) -> Result<(), CasError> {
    if index < self.len() {
      Ok(())
    } else {
      Err(CasError::ArrayIndexOutOfBounds { index, length: self.len() })
    }
  }

  /// Element `index` as a `Value`.
  pub fn get(&self, index: usize) -> Result<Value, CasError> {
    self.check_index(index)?;
    Ok(match self {
      ArrayData::Boolean(v) => Value::Boolean(v[index]),
      ArrayData::Byte(v)    => Value::Byte(v[index]),
      ArrayData::Short(v)   => Value::Short(v[index]),
      ArrayData::Integer(v) => Value::Integer(v[index]),
      ArrayData::Long(v)    => Value::Long(v[index]),
      ArrayData::Float(v)   => Value::Float(v[index]),
      ArrayData::Double(v)  => Value::Double(v[index]),
      ArrayData::String(v)  => Value::String(v[index].clone()),
      ArrayData::Fs(v)      => Value::Fs(v[index]),
    })
  }

  /// Stores `value` at `index`. The value must match the element kind.
  pub fn set(&mut self, index: usize, value: Value) -> Result<(), CasError> {
    self.check_index(index)?;
    match (self, value) {
      (ArrayData::Boolean(v), Value::Boolean(x)) => v[index] = x,
      (ArrayData::Byte(v), Value::Byte(x))       => v[index] = x,
      (ArrayData::Short(v), Value::Short(x))     => v[index] = x,
      (ArrayData::Integer(v), Value::Integer(x)) => v[index] = x,
      (ArrayData::Long(v), Value::Long(x))       => v[index] = x,
      (ArrayData::Float(v), Value::Float(x))     => v[index] = x,
      (ArrayData::Double(v), Value::Double(x))   => v[index] = x,
      (ArrayData::String(v), Value::String(x))   => v[index] = x,
      (ArrayData::Fs(v), Value::Fs(x))           => v[index] = x,
      (array, value) => {
        return Err(CasError::WrongElementKind {
          expected: format!("{:?}", array.element_primitive()),
          found   : format!("{:?}", value.kind()),
        })
      }
    }
    Ok(())
  }

  /// Element `index` in canonical string form. `None` for null strings and for reference arrays.
  pub fn element_to_string(&self, index: usize) -> Result<Option<String>, CasError> {
    Ok(self.get(index)?.to_canonical_string())
  }

  /// Parses `text` into element `index` of a primitive array.
  pub fn set_from_string(&mut self, index: usize, text: Option<&str>) -> Result<(), CasError> {
    match self.element_primitive() {
      Some(kind) => self.set(index, Value::parse(kind, text)?),
      None => Err(CasError::WrongElementKind {
        expected: "a reference".to_string(),
        found   : "a string".to_string(),
      }),
    }
  }

  /// The references held by a reference array, otherwise nothing.
  pub fn references(&self) -> impl Iterator<Item = FsRef> + '_ {
    let slice: &[Option<FsRef>] = match self {
      ArrayData::Fs(v) => v,
      _ => &[],
    };
    slice.iter().flatten().copied()
  }
}

// Typed views of array bodies: `as_integers`, `as_integers_mut`, and so on.
macro_rules! typed_array_access {
  ($($variant:ident => $plural:ident : $element:ty),* $(,)?) => {
    paste! {
      impl ArrayData {
        $(
          pub fn [<as_ $plural>](&self) -> Option<&[$element]> {
            match self {
              ArrayData::$variant(v) => Some(v.as_slice()),
              _ => None,
            }
          }

          pub fn [<as_ $plural _mut>](&mut self) -> Option<&mut [$element]> {
            match self {
              ArrayData::$variant(v) => Some(v.as_mut_slice()),
              _ => None,
            }
          }
        )*
      }
    }
  };
}

typed_array_access!(
  Boolean => booleans: bool,
  Byte    => bytes   : i8,
  Short   => shorts  : i16,
  Integer => integers: i32,
  Long    => longs   : i64,
  Float   => floats  : f32,
  Double  => doubles : f64,
  String  => strings : Option<String>,
  Fs      => fs_refs : Option<FsRef>,
);
