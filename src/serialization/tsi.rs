/*!

TSI blocks: a store's type system, optionally with its priorities and index definitions, as one self-describing unit.

A block is a little-endian length, a CRC32 of the payload, and the `bincode` payload itself. Blocks are embedded after
the binary header by the schema-carrying formats and written behind the magic `CTSI` to a separate schema stream by
the others.

*/

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

use crate::{
  api::Cas,
  core::{
    description::CasDefinition,
    install::install_type_system,
    schema::{CasSchema, RcCasSchema},
    type_system::{RcTypeSystem, TypeSystem},
  },
  serialization::serial_error::{SerialError, SerialResult},
};

pub const SECONDARY_MAGIC: &[u8; 4] = b"CTSI";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tsi {
  pub definition      : CasDefinition,
  /// Whether `definition` carries the priorities and indexes of the store it was taken from.
  pub includes_indexes: bool,
}

impl Tsi {
  /// The TSI of `cas`. The type system is described from the committed type system, so it covers types added by any
  /// route, not only those of the schema's source definition.
  pub fn of(cas: &Cas, includes_indexes: bool) -> Tsi {
    let schema = cas.schema();
    let mut definition = CasDefinition::new(schema.type_system().to_description());
    if includes_indexes {
      definition.type_priorities = schema.definition().type_priorities.clone();
      definition.indexes         = schema.definition().indexes.clone();
    }
    Tsi { definition, includes_indexes }
  }

  /// A schema installed from this TSI. Without indexes it has only the built-in annotation index.
  pub fn install(&self) -> SerialResult<RcCasSchema> {
    let definition = if self.includes_indexes {
      self.definition.clone()
    } else {
      self.definition.type_system_only()
    };
    Ok(CasSchema::new(definition)?)
  }

  /// Only the type system, for decoding.
  pub fn install_type_system(&self) -> SerialResult<RcTypeSystem> {
    let mut builder = TypeSystem::builder();
    install_type_system(&mut builder, &self.definition.type_system)?;
    Ok(builder.commit())
  }

  pub fn write_block<W: Write + ?Sized>(&self, out: &mut W) -> SerialResult<()> {
    let payload = bincode::serde::encode_to_vec(self, bincode::config::standard())?;
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&payload);

    out.write_u32::<LittleEndian>(payload.len() as u32)?;
    out.write_u32::<LittleEndian>(hasher.finalize())?;
    out.write_all(&payload)?;
    Ok(())
  }

  /// Reads a block from the front of `input`, advancing past it.
  pub fn read_block(input: &mut &[u8]) -> SerialResult<Tsi> {
    let length   = input.read_u32::<LittleEndian>()? as usize;
    let checksum = input.read_u32::<LittleEndian>()?;
    if input.len() < length {
      return Err(SerialError::Corrupt(format!(
        "type system block of {} bytes truncated to {}",
        length,
        input.len()
      )));
    }
    let (payload, rest) = input.split_at(length);
    *input = rest;

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(payload);
    if hasher.finalize() != checksum {
      return Err(SerialError::Corrupt("type system block checksum mismatch".to_string()));
    }

    let (tsi, _): (Tsi, _) = bincode::serde::decode_from_slice(payload, bincode::config::standard())?;
    Ok(tsi)
  }

  /// Writes this TSI as a stand-alone schema stream.
  pub fn write_secondary(&self, out: &mut dyn Write) -> SerialResult<()> {
    out.write_all(SECONDARY_MAGIC)?;
    self.write_block(out)?;
    out.flush()?;
    Ok(())
  }

  /// Reads a stand-alone schema stream to its end.
  pub fn read_secondary(input: &mut dyn Read) -> SerialResult<Tsi> {
    let mut bytes = Vec::new();
    input.read_to_end(&mut bytes)?;

    let Some(mut rest) = bytes.strip_prefix(SECONDARY_MAGIC.as_slice()) else {
      return Err(SerialError::Corrupt("schema stream does not start with a type system block".to_string()));
    };
    Tsi::read_block(&mut rest)
  }
}
