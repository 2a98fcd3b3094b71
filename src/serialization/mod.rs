/*!

Saving and loading stores.

`save` writes a store in one of the `SerialFormat`s. `load` detects the format of a stream from its first bytes and
replaces the contents of a store with what it decodes. Detection goes in this order:

| Leading bytes     | Family                                                           |
|:------------------|:-----------------------------------------------------------------|
| `<?xml `          | XML: XCAS if the root is `CAS`, XMI if it carries `xmi:version`  |
| `UIMA`            | binary: the header word names plain, form 4, or form 6           |
| `AC ED 00 05`     | legacy envelope: the kind byte names CAS-only or complete        |

Anything else is `SerialError::UnrecognizedFormat`.

## Schema reconciliation

A schema travels either embedded in the primary stream (the `_TS`/`_TSI` formats) or in a secondary stream of its
own. The rules `load` follows:

 - An embedded TSI with index definitions is authoritative. It reinitializes the destination and any secondary
   stream is ignored. Form 6 in `Lenient` mode never reinitializes.
 - Form 6 with an embedded type system only decodes with that type system. The secondary stream is consulted only to
   reinitialize the destination, and only in `Reinit` mode.
 - Without an embedded schema, a secondary stream supplies the decoding type system of the compressed forms, and
   reinitializes the destination in `Reinit` mode.
 - A type system passed directly to `load` is used to decode form 6 and nothing else.
 - `Lenient` drops records of unknown types and values of unknown features in the XML formats and form 6. Everything
   else decodes strictly.
 - A secondary stream is read only when one of the rules above consults it, so the formats that embed a schema
   never read it.

Decoding goes into a fresh store that replaces the destination only on success. A failed load leaves the destination
with its previous schema and contents.

*/

mod assemble;
mod binary;
mod compressed;
mod header;
mod serial_error;
mod tsi;
mod xcas;
mod xmi;
mod xml;

#[cfg(test)]
mod tests;

use std::{
  fmt::{Display, Formatter},
  io::{Read, Write},
};

use crate::{
  api::Cas,
  core::{type_system::RcTypeSystem, RcCasSchema},
  debug,
  info,
};

pub use binary::{ENVELOPE_MAGIC, ViewImage};
pub use header::{Header, HeaderFlag, HeaderFlags, BINARY_MAGIC};
pub use serial_error::{SerialError, SerialResult};
pub use tsi::{Tsi, SECONDARY_MAGIC};
pub use xml::{XmlOptions, XML_PROLOG};

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum SerialFormat {
  Xmi,
  Xcas,
  /// The legacy envelope holding only the store.
  Serialized,
  /// The legacy envelope holding the store and its TSI.
  SerializedTsi,
  Binary,
  BinaryTsi,
  /// Compressed form 4.
  Compressed,
  CompressedTsi,
  /// Compressed form 6, decoded by name against a decoding type system.
  CompressedFiltered,
  /// Form 6 with the type system, but not the index definitions, embedded.
  CompressedFilteredTs,
  CompressedFilteredTsi,
}

impl SerialFormat {
  pub const ALL: [SerialFormat; 11] = [
    SerialFormat::Xmi,
    SerialFormat::Xcas,
    SerialFormat::Serialized,
    SerialFormat::SerializedTsi,
    SerialFormat::Binary,
    SerialFormat::BinaryTsi,
    SerialFormat::Compressed,
    SerialFormat::CompressedTsi,
    SerialFormat::CompressedFiltered,
    SerialFormat::CompressedFilteredTs,
    SerialFormat::CompressedFilteredTsi,
  ];

  pub fn name(&self) -> &'static str {
    match self {
      SerialFormat::Xmi                   => "XMI",
      SerialFormat::Xcas                  => "XCAS",
      SerialFormat::Serialized            => "SERIALIZED",
      SerialFormat::SerializedTsi         => "SERIALIZED_TSI",
      SerialFormat::Binary                => "BINARY",
      SerialFormat::BinaryTsi             => "BINARY_TSI",
      SerialFormat::Compressed            => "COMPRESSED",
      SerialFormat::CompressedTsi         => "COMPRESSED_TSI",
      SerialFormat::CompressedFiltered    => "COMPRESSED_FILTERED",
      SerialFormat::CompressedFilteredTs  => "COMPRESSED_FILTERED_TS",
      SerialFormat::CompressedFilteredTsi => "COMPRESSED_FILTERED_TSI",
    }
  }

  /// Whether the primary stream of this format carries the schema itself.
  pub fn embeds_schema(&self) -> bool {
    let name = self.name();
    name.ends_with("_TS") || name.ends_with("_TSI")
  }

  pub fn is_xml(&self) -> bool {
    matches!(self, SerialFormat::Xmi | SerialFormat::Xcas)
  }
}

impl Display for SerialFormat {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.name())
  }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub enum CasLoadMode {
  #[default]
  Default,
  /// Skip unknown types and features instead of failing.
  Lenient,
  /// Replace the destination's schema with the one carried by the data.
  Reinit,
}

/// Writes `cas` to `out` in `format`. If the format does not embed the schema and `tsi_out` is given, the schema and
/// index definitions are written there. Returns whether the schema went into the primary stream.
pub fn save(cas: &Cas, out: &mut dyn Write, tsi_out: Option<&mut dyn Write>, format: SerialFormat)
    -> SerialResult<bool>
{
  debug!(3, "saving store {} as {}", cas.id(), format);
  match format {
    SerialFormat::Xmi           => xmi::serialize(cas, out, &XmlOptions::default())?,
    SerialFormat::Xcas          => xcas::serialize(cas, out, &XmlOptions::default())?,
    SerialFormat::Serialized    => binary::serialize_envelope(cas, out, false)?,
    SerialFormat::SerializedTsi => binary::serialize_envelope(cas, out, true)?,
    SerialFormat::Binary | SerialFormat::BinaryTsi => binary::serialize(cas, out, format)?,
    SerialFormat::Compressed
    | SerialFormat::CompressedTsi
    | SerialFormat::CompressedFiltered
    | SerialFormat::CompressedFilteredTs
    | SerialFormat::CompressedFilteredTsi => compressed::serialize(cas, out, format)?,
  }
  out.flush()?;

  let type_system_written = format.embeds_schema();
  if !type_system_written {
    if let Some(tsi_out) = tsi_out {
      Tsi::of(cas, true).write_secondary(tsi_out)?;
    }
  }
  Ok(type_system_written)
}

/// Writes `cas` as XMI with explicit writer settings.
pub fn save_xmi(cas: &Cas, out: &mut dyn Write, options: &XmlOptions) -> SerialResult<()> {
  xmi::serialize(cas, out, options)
}

/// Writes `cas` as XCAS with explicit writer settings.
pub fn save_xcas(cas: &Cas, out: &mut dyn Write, options: &XmlOptions) -> SerialResult<()> {
  xcas::serialize(cas, out, options)
}

/// Replaces the contents of `cas` with the store read from `input` and returns the format detected. `tsi_in` is an
/// optional secondary schema stream, read only by formats that consult it; `type_system` optionally decodes form 6.
/// On failure `cas` is left as it was.
pub fn load(
  input      : &mut dyn Read,
  tsi_in     : Option<&mut dyn Read>,
  cas        : &mut Cas,
  mode       : CasLoadMode,
  type_system: Option<&RcTypeSystem>,
) -> SerialResult<SerialFormat>
{
  let mut bytes = Vec::new();
  input.read_to_end(&mut bytes)?;

  if xml::is_xml(&bytes) {
    return load_xml(&bytes, tsi_in, cas, mode);
  }

  let mut payload = bytes.as_slice();
  if let Some(header) = Header::read(&mut payload)? {
    let format = header.format()?;
    debug!(2, "detected {} for store {}", format, cas.id());
    let embedded = match header.is_type_system_included() {
      true  => Some(Tsi::read_block(&mut payload)?),
      false => None,
    };
    load_binary(format, payload, embedded, tsi_in, cas, mode, type_system)?;
    return Ok(format);
  }

  match binary::envelope_kind(&bytes) {
    Some(binary::CAS_ONLY) => {
      debug!(2, "detected {} for store {}", SerialFormat::Serialized, cas.id());
      let schema = match mode {
        CasLoadMode::Reinit => reinit_schema(cas, read_secondary(tsi_in)?.as_ref())?,
        _                   => cas.schema().clone(),
      };
      let payload = &bytes[ENVELOPE_MAGIC.len() + 1..];
      decode_into(cas, schema, |staged| binary::deserialize(payload, staged))?;
      Ok(SerialFormat::Serialized)
    }

    Some(binary::COMPLETE) => {
      debug!(2, "detected {} for store {}", SerialFormat::SerializedTsi, cas.id());
      let mut payload = &bytes[ENVELOPE_MAGIC.len() + 1..];
      let embedded = Tsi::read_block(&mut payload)?;
      let schema   = reinit_schema(cas, Some(&embedded))?;
      decode_into(cas, schema, |staged| binary::deserialize(payload, staged))?;
      Ok(SerialFormat::SerializedTsi)
    }

    _ => Err(SerialError::UnrecognizedFormat),
  }
}

fn load_xml(bytes: &[u8], tsi_in: Option<&mut dyn Read>, cas: &mut Cas, mode: CasLoadMode) -> SerialResult<SerialFormat> {
  let root = xml::parse(bytes)?;
  let format = if xcas::is_xcas(&root) {
    SerialFormat::Xcas
  } else if xmi::is_xmi(&root) {
    SerialFormat::Xmi
  } else {
    return Err(SerialError::UnrecognizedFormat);
  };
  debug!(2, "detected {} for store {}", format, cas.id());

  let schema = match mode {
    CasLoadMode::Reinit => reinit_schema(cas, read_secondary(tsi_in)?.as_ref())?,
    _                   => cas.schema().clone(),
  };
  let lenient = mode == CasLoadMode::Lenient;
  decode_into(cas, schema, |staged| match format {
    SerialFormat::Xcas => xcas::deserialize(&root, staged, lenient),
    _                  => xmi::deserialize(&root, staged, lenient),
  })?;
  Ok(format)
}

fn load_binary(
  format     : SerialFormat,
  payload    : &[u8],
  embedded   : Option<Tsi>,
  tsi_in     : Option<&mut dyn Read>,
  cas        : &mut Cas,
  mode       : CasLoadMode,
  type_system: Option<&RcTypeSystem>,
) -> SerialResult<()>
{
  let lenient = mode == CasLoadMode::Lenient;
  match format {
    SerialFormat::Binary => {
      let schema = match mode {
        CasLoadMode::Reinit => reinit_schema(cas, read_secondary(tsi_in)?.as_ref())?,
        _                   => cas.schema().clone(),
      };
      decode_into(cas, schema, |staged| binary::deserialize(payload, staged))
    }

    SerialFormat::BinaryTsi => {
      let schema = reinit_schema(cas, embedded.as_ref())?;
      decode_into(cas, schema, |staged| binary::deserialize(payload, staged))
    }

    SerialFormat::Compressed => {
      let external = read_secondary(tsi_in)?;
      let schema = match mode {
        CasLoadMode::Reinit => reinit_schema(cas, external.as_ref())?,
        _                   => cas.schema().clone(),
      };
      let decoding = match &external {
        Some(tsi) => tsi.install_type_system()?,
        None      => schema.type_system().clone(),
      };
      decode_into(cas, schema, |staged| compressed::deserialize(payload, &decoding, staged, false))
    }

    SerialFormat::CompressedTsi => {
      let schema   = reinit_schema(cas, embedded.as_ref())?;
      let decoding = schema.type_system().clone();
      decode_into(cas, schema, |staged| compressed::deserialize(payload, &decoding, staged, false))
    }

    SerialFormat::CompressedFiltered => {
      let external = match (type_system, mode) {
        (Some(_), CasLoadMode::Default | CasLoadMode::Lenient) => None,
        _                                                      => read_secondary(tsi_in)?,
      };
      let decoding = match (type_system, &external) {
        (Some(type_system), _) => type_system.clone(),
        (None, Some(tsi))      => tsi.install_type_system()?,
        (None, None)           => cas.type_system().clone(),
      };
      let schema = match mode {
        CasLoadMode::Reinit => reinit_schema(cas, external.as_ref())?,
        _                   => cas.schema().clone(),
      };
      decode_into(cas, schema, |staged| compressed::deserialize(payload, &decoding, staged, lenient))
    }

    SerialFormat::CompressedFilteredTs => {
      let decoding = embedded_type_system(embedded.as_ref())?;
      let schema = match mode {
        CasLoadMode::Reinit => reinit_schema(cas, read_secondary(tsi_in)?.as_ref())?,
        _                   => cas.schema().clone(),
      };
      decode_into(cas, schema, |staged| compressed::deserialize(payload, &decoding, staged, lenient))
    }

    SerialFormat::CompressedFilteredTsi => {
      let decoding = embedded_type_system(embedded.as_ref())?;
      let schema = if lenient {
        debug!(2, "lenient load of {} keeps the schema of store {}", format, cas.id());
        cas.schema().clone()
      } else {
        reinit_schema(cas, embedded.as_ref())?
      };
      decode_into(cas, schema, |staged| compressed::deserialize(payload, &decoding, staged, lenient))
    }

    _ => unreachable!("{} is not a binary format", format),
  }
}

fn embedded_type_system(embedded: Option<&Tsi>) -> SerialResult<RcTypeSystem> {
  match embedded {
    Some(tsi) => tsi.install_type_system(),
    None      => Err(SerialError::Corrupt("header declares an embedded type system that is missing".to_string())),
  }
}

fn read_secondary(tsi_in: Option<&mut dyn Read>) -> SerialResult<Option<Tsi>> {
  match tsi_in {
    Some(tsi_in) => Ok(Some(Tsi::read_secondary(tsi_in)?)),
    None         => Ok(None),
  }
}

/// The schema installed from `tsi`. Without a TSI the store keeps its schema.
fn reinit_schema(cas: &Cas, tsi: Option<&Tsi>) -> SerialResult<RcCasSchema> {
  let Some(tsi) = tsi else {
    debug!(3, "no schema to reinitialize store {} with", cas.id());
    return Ok(cas.schema().clone());
  };
  let schema = tsi.install()?;
  info!(2, "reinitializing store {} from a serialized schema", cas.id());
  Ok(schema)
}

/// Decodes into an empty store over `schema` that takes the place of `cas` only once `decode` succeeds.
fn decode_into<F>(cas: &mut Cas, schema: RcCasSchema, decode: F) -> SerialResult<()>
  where F: FnOnce(&mut Cas) -> SerialResult<()>
{
  let mut staged = cas.successor(schema);
  decode(&mut staged)?;
  *cas = staged;
  Ok(())
}
