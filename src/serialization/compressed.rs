/*!

Compressed binary forms 4 and 6.

Both forms share one payload: a string table followed by the records in heap order and then the views. Type names and
string values are indexes into the string table. Integral values are zig-zag varints; references are stored relative
to the record that holds them, and integral arrays are delta coded element to element. Floating point values are
fixed-width little-endian.

The payload lists slot values in the feature order of the type system that wrote it, so it can only be decoded with
that type system or an identical one: the *decoding* type system. Records are then mapped by type and feature name
into the destination, which may differ. Form 4 always decodes strictly; form 6 may decode leniently.

| Value                    | Encoding                                   |
|:-------------------------|:-------------------------------------------|
| boolean, byte            | one byte                                   |
| short, integer, long     | zig-zag varint                             |
| float, double            | 4 or 8 bytes little-endian                 |
| string                   | varint, `0` for null, else table index + 1 |
| reference                | varint, `0` for null, else zig-zag(delta) + 1 |

*/

use std::io::Write;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::{
  abstractions::HashMap,
  api::{ArrayData, Cas, FsData, FsRef, Value},
  core::type_system::{ArrayKind, PrimitiveKind, TypeSystem, ValueKind},
  serialization::{
    assemble::{assemble, PendingCas, PendingData, PendingRecord, PendingView, Slot},
    header::Header,
    serial_error::{SerialError, SerialResult},
    tsi::Tsi,
    SerialFormat,
  },
};

#[cfg(feature = "trace_codec")]
use crate::trace;

// region Varints

fn write_varint(out: &mut Vec<u8>, mut value: u64) {
  while value >= 0x80 {
    out.push((value as u8) | 0x80);
    value >>= 7;
  }
  out.push(value as u8);
}

fn read_varint(input: &mut &[u8]) -> SerialResult<u64> {
  let mut value = 0u64;
  let mut shift = 0u32;
  loop {
    let byte = input.read_u8()?;
    if shift >= 64 {
      return Err(SerialError::Corrupt("varint longer than 64 bits".to_string()));
    }
    value |= ((byte & 0x7F) as u64) << shift;
    if byte & 0x80 == 0 {
      return Ok(value);
    }
    shift += 7;
  }
}

#[inline(always)]
fn zigzag(value: i64) -> u64 {
  ((value << 1) ^ (value >> 63)) as u64
}

#[inline(always)]
fn unzigzag(value: u64) -> i64 {
  ((value >> 1) as i64) ^ -((value & 1) as i64)
}

fn read_length(input: &mut &[u8]) -> SerialResult<usize> {
  let length = read_varint(input)? as usize;
  // Every counted item takes at least one byte.
  if length > input.len() {
    return Err(SerialError::Corrupt(format!("count {} exceeds the remaining {} bytes", length, input.len())));
  }
  Ok(length)
}

// endregion

// region Encoding

struct Encoder<'a> {
  type_system: &'a TypeSystem,
  strings    : Vec<String>,
  positions  : HashMap<String, u64>,
  body       : Vec<u8>,
}

impl<'a> Encoder<'a> {
  fn new(type_system: &'a TypeSystem) -> Encoder<'a> {
    Encoder {
      type_system,
      strings  : Vec::new(),
      positions: HashMap::default(),
      body     : Vec::new(),
    }
  }

  fn string(&mut self, text: Option<&str>) {
    let Some(text) = text else {
      write_varint(&mut self.body, 0);
      return;
    };
    let position = match self.positions.get(text) {
      Some(position) => *position,
      None => {
        let position = self.strings.len() as u64;
        self.strings.push(text.to_string());
        self.positions.insert(text.to_string(), position);
        position
      }
    };
    write_varint(&mut self.body, position + 1);
  }

  fn reference(&mut self, holder: FsRef, target: Option<FsRef>) {
    match target {
      None         => write_varint(&mut self.body, 0),
      Some(target) => write_varint(&mut self.body, zigzag(target.0 as i64 - holder.0 as i64) + 1),
    }
  }

  fn value(&mut self, holder: FsRef, value: &Value) -> SerialResult<()> {
    match value {
      Value::Boolean(v) => self.body.push(*v as u8),
      Value::Byte(v)    => self.body.push(*v as u8),
      Value::Short(v)   => write_varint(&mut self.body, zigzag(*v as i64)),
      Value::Integer(v) => write_varint(&mut self.body, zigzag(*v as i64)),
      Value::Long(v)    => write_varint(&mut self.body, zigzag(*v)),
      Value::Float(v)   => self.body.write_f32::<LittleEndian>(*v)?,
      Value::Double(v)  => self.body.write_f64::<LittleEndian>(*v)?,
      Value::String(v)  => self.string(v.as_deref()),
      Value::Fs(v)      => self.reference(holder, *v),
    }
    Ok(())
  }

  fn array(&mut self, holder: FsRef, array: &ArrayData) -> SerialResult<()> {
    write_varint(&mut self.body, array.len() as u64);
    match array {
      ArrayData::Boolean(v) => self.body.extend(v.iter().map(|b| *b as u8)),
      ArrayData::Byte(v)    => self.body.extend(v.iter().map(|b| *b as u8)),
      ArrayData::Short(v)   => self.deltas(v.iter().map(|x| *x as i64)),
      ArrayData::Integer(v) => self.deltas(v.iter().map(|x| *x as i64)),
      ArrayData::Long(v)    => self.deltas(v.iter().copied()),
      ArrayData::Float(v)   => {
        for x in v {
          self.body.write_f32::<LittleEndian>(*x)?;
        }
      }
      ArrayData::Double(v)  => {
        for x in v {
          self.body.write_f64::<LittleEndian>(*x)?;
        }
      }
      ArrayData::String(v)  => {
        for s in v {
          self.string(s.as_deref());
        }
      }
      ArrayData::Fs(v)      => {
        for target in v {
          self.reference(holder, *target);
        }
      }
    }
    Ok(())
  }

  fn deltas(&mut self, values: impl Iterator<Item = i64>) {
    let mut previous = 0i64;
    for value in values {
      write_varint(&mut self.body, zigzag(value.wrapping_sub(previous)));
      previous = value;
    }
  }

  fn record(&mut self, fs: FsRef, cas: &Cas) -> SerialResult<()> {
    let record = cas.record(fs)?;
    let type_name = self.type_system.type_name(record.type_code);
    self.string(Some(type_name));
    match &record.data {
      FsData::Features(slots) => {
        for slot in slots {
          self.value(fs, slot)?;
        }
      }
      FsData::Array(array) => self.array(fs, array)?,
    }
    Ok(())
  }

  fn views(&mut self, cas: &Cas) {
    write_varint(&mut self.body, cas.view_count() as u64);
    for view in cas.views() {
      self.string(Some(cas.view_name(view)));
      write_varint(&mut self.body, cas.sofa(view).0 as u64);

      let members = cas.all_indexed_fs(view);
      write_varint(&mut self.body, members.len() as u64);
      self.deltas(members.iter().map(|fs| fs.0 as i64));
    }
  }

  /// The string table followed by the body.
  fn finish(self) -> Vec<u8> {
    let mut table = Vec::new();
    write_varint(&mut table, self.strings.len() as u64);
    for string in self.strings.iter() {
      write_varint(&mut table, string.len() as u64);
      table.extend_from_slice(string.as_bytes());
    }
    table.extend(self.body);
    table
  }
}

/// Writes `cas` in compressed form 4 or 6, as `format` says.
pub fn serialize(cas: &Cas, out: &mut dyn Write, format: SerialFormat) -> SerialResult<()> {
  let Some(header) = Header::for_format(format) else {
    unreachable!("{} is not a binary format", format.name())
  };
  header.write(out)?;
  if header.is_type_system_included() {
    Tsi::of(cas, header.is_indexes_included()).write_block(out)?;
  }

  let type_system = cas.type_system();
  let mut encoder = Encoder::new(type_system);
  write_varint(&mut encoder.body, cas.heap().len() as u64);
  for (fs, _) in cas.heap().iter() {
    encoder.record(fs, cas)?;
  }
  encoder.views(cas);

  let payload = encoder.finish();
  #[cfg(feature = "trace_codec")]
  trace!(4, "compressed payload: {} records in {} bytes", cas.heap().len(), payload.len());
  out.write_all(&payload)?;
  Ok(())
}

// endregion

// region Decoding

struct Decoder<'a, 'b> {
  type_system: &'a TypeSystem,
  strings    : Vec<String>,
  input      : &'b [u8],
}

impl<'a, 'b> Decoder<'a, 'b> {
  fn new(type_system: &'a TypeSystem, mut input: &'b [u8]) -> SerialResult<Decoder<'a, 'b>> {
    let count = read_length(&mut input)?;
    let mut strings = Vec::with_capacity(count);
    for _ in 0..count {
      let length = read_length(&mut input)?;
      let (bytes, rest) = input.split_at(length);
      let string = std::str::from_utf8(bytes)
          .map_err(|error| SerialError::Corrupt(format!("string table entry is not UTF-8: {}", error)))?;
      strings.push(string.to_string());
      input = rest;
    }
    Ok(Decoder { type_system, strings, input })
  }

  fn string(&mut self) -> SerialResult<Option<String>> {
    match read_varint(&mut self.input)? {
      0 => Ok(None),
      n => self
          .strings
          .get(n as usize - 1)
          .cloned()
          .map(Some)
          .ok_or_else(|| SerialError::Corrupt(format!("string index {} outside the table", n - 1))),
    }
  }

  fn reference(&mut self, holder: u64) -> SerialResult<Option<u64>> {
    match read_varint(&mut self.input)? {
      0 => Ok(None),
      n => {
        let target = holder as i64 + unzigzag(n - 1);
        if target < 0 {
          return Err(SerialError::Corrupt(format!("reference before the first record from {}", holder)));
        }
        Ok(Some(target as u64))
      }
    }
  }

  fn primitive(&mut self, kind: PrimitiveKind) -> SerialResult<Value> {
    let value = match kind {
      PrimitiveKind::Boolean => Value::Boolean(self.input.read_u8()? != 0),
      PrimitiveKind::Byte    => Value::Byte(self.input.read_i8()?),
      PrimitiveKind::Short   => Value::Short(unzigzag(read_varint(&mut self.input)?) as i16),
      PrimitiveKind::Integer => Value::Integer(unzigzag(read_varint(&mut self.input)?) as i32),
      PrimitiveKind::Long    => Value::Long(unzigzag(read_varint(&mut self.input)?)),
      PrimitiveKind::Float   => Value::Float(self.input.read_f32::<LittleEndian>()?),
      PrimitiveKind::Double  => Value::Double(self.input.read_f64::<LittleEndian>()?),
      PrimitiveKind::String  => Value::String(self.string()?),
    };
    Ok(value)
  }

  fn deltas(&mut self, count: usize) -> SerialResult<Vec<i64>> {
    let mut previous = 0i64;
    let mut values   = Vec::with_capacity(count);
    for _ in 0..count {
      previous = previous.wrapping_add(unzigzag(read_varint(&mut self.input)?));
      values.push(previous);
    }
    Ok(values)
  }

  fn elements(&mut self, holder: u64, kind: ArrayKind) -> SerialResult<Vec<Slot>> {
    let length = read_length(&mut self.input)?;
    let typed = |values: Vec<Value>| -> Vec<Slot> { values.into_iter().map(Slot::Typed).collect() };

    let elements = match kind {
      ArrayKind::Short   => typed(self.deltas(length)?.into_iter().map(|v| Value::Short(v as i16)).collect()),
      ArrayKind::Integer => typed(self.deltas(length)?.into_iter().map(|v| Value::Integer(v as i32)).collect()),
      ArrayKind::Long    => typed(self.deltas(length)?.into_iter().map(Value::Long).collect()),
      ArrayKind::Fs { .. } => {
        let mut elements = Vec::with_capacity(length);
        for _ in 0..length {
          elements.push(Slot::Ref(self.reference(holder)?));
        }
        elements
      }
      other => {
        let Some(primitive) = ArrayData::new(other, 0).element_primitive() else {
          unreachable!("reference arrays are handled above")
        };
        let mut elements = Vec::with_capacity(length);
        for _ in 0..length {
          elements.push(Slot::Typed(self.primitive(primitive)?));
        }
        elements
      }
    };
    Ok(elements)
  }

  fn record(&mut self, id: u64) -> SerialResult<PendingRecord> {
    let type_name = self
        .string()?
        .ok_or_else(|| SerialError::Corrupt(format!("record {} has no type", id)))?;
    let Some(type_code) = self.type_system.type_by_name(&type_name) else {
      return Err(SerialError::UnknownType { type_name });
    };

    let data = match self.type_system.array_kind(type_code) {
      Some(kind) => PendingData::Elements(self.elements(id, kind)?),
      None => {
        let type_system = self.type_system;
        let mut features = Vec::with_capacity(type_system.features_of(type_code).len());
        for feature in type_system.features_of(type_code) {
          let slot = match type_system.range_kind(*feature) {
            ValueKind::Reference         => Slot::Ref(self.reference(id)?),
            ValueKind::Primitive(kind)   => Slot::Typed(self.primitive(kind)?),
          };
          features.push((type_system.feature(*feature).name.to_string(), slot));
        }
        PendingData::Features(features)
      }
    };

    Ok(PendingRecord { id, type_name, data })
  }

  fn views(&mut self) -> SerialResult<Vec<PendingView>> {
    let count = read_length(&mut self.input)?;
    let mut views = Vec::with_capacity(count);
    for _ in 0..count {
      let name = self
          .string()?
          .ok_or_else(|| SerialError::Corrupt("view without a name".to_string()))?;
      let sofa    = read_varint(&mut self.input)?;
      let length  = read_length(&mut self.input)?;
      let members = self.deltas(length)?.into_iter().map(|m| m as u64).collect();
      views.push(PendingView { name, sofa, members });
    }
    Ok(views)
  }
}

/// Decodes `payload` with `decoding` and replaces the contents of `cas` with the result, mapping types and features
/// into the type system of `cas` by name.
pub fn deserialize(payload: &[u8], decoding: &TypeSystem, cas: &mut Cas, lenient: bool) -> SerialResult<()> {
  let mut decoder = Decoder::new(decoding, payload)?;

  let count = read_length(&mut decoder.input)?;
  let mut records = Vec::with_capacity(count);
  for id in 0..count as u64 {
    records.push(decoder.record(id)?);
  }
  let views = decoder.views()?;
  #[cfg(feature = "trace_codec")]
  trace!(4, "compressed payload: {} records, {} views, {} bytes left", records.len(), views.len(), decoder.input.len());

  assemble(cas, PendingCas { records, views }, lenient)
}

// endregion


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn zigzag_varints() {
    for value in [0i64, 1, -1, 63, -64, 300, -300, i64::MAX, i64::MIN] {
      let mut bytes = Vec::new();
      write_varint(&mut bytes, zigzag(value));
      let mut input = bytes.as_slice();
      assert_eq!(unzigzag(read_varint(&mut input).unwrap()), value);
      assert!(input.is_empty());
    }

    let mut small = Vec::new();
    write_varint(&mut small, zigzag(-3));
    assert_eq!(small, vec![5]);
  }

  #[test]
  fn overlong_varints_are_corrupt() {
    let bytes = [0xFFu8; 11];
    assert!(matches!(read_varint(&mut bytes.as_slice()), Err(SerialError::Corrupt(_))));
  }

  #[test]
  fn counts_are_bounded_by_the_input() {
    let mut bytes = Vec::new();
    write_varint(&mut bytes, 1000);
    assert!(read_length(&mut bytes.as_slice()).is_err());
  }
}
