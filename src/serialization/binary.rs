/*!

The plain binary dump and the legacy object envelope.

Plain binary writes the heap verbatim, type codes included, so it can only be read back into a store whose type system
is the one it was written from. Reading checks every record against the destination type system before anything is
replaced.

The envelope wraps the same dump behind the Java-stream-like magic `AC ED 00 05` and a kind byte. Kind `CAS_ONLY`
carries just the dump; kind `COMPLETE` carries a TSI block first.

*/

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::{
  api::{ArrayData, Cas, FsData, FsRecord, FsRef, Heap, Value},
  core::type_system::{ArrayKind, TypeSystem},
  serialization::{
    assemble::{check_references, check_views},
    header::Header,
    serial_error::{SerialError, SerialResult},
    tsi::Tsi,
    SerialFormat,
  },
};

#[cfg(feature = "trace_codec")]
use crate::trace;

pub const ENVELOPE_MAGIC: [u8; 4] = [0xAC, 0xED, 0x00, 0x05];

/// Envelope kinds.
pub const CAS_ONLY: u8 = 0x01;
pub const COMPLETE: u8 = 0x02;

/// One view as stored by the binary codecs: its name, its sofa, and its indexed records in order of first addition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewImage {
  pub name   : String,
  pub sofa   : FsRef,
  pub members: Vec<FsRef>,
}

impl ViewImage {
  pub fn all(cas: &Cas) -> Vec<ViewImage> {
    cas.views()
       .map(|view| ViewImage {
         name   : cas.view_name(view).to_string(),
         sofa   : cas.sofa(view),
         members: cas.all_indexed_fs(view),
       })
       .collect()
  }

  pub fn into_parts(self) -> (String, FsRef, Vec<FsRef>) {
    (self.name, self.sofa, self.members)
  }
}

#[derive(Debug, Serialize, Deserialize)]
struct HeapImage {
  records: Vec<FsRecord>,
  views  : Vec<ViewImage>,
}

// region Plain binary

pub fn serialize(cas: &Cas, out: &mut dyn Write, format: SerialFormat) -> SerialResult<()> {
  let Some(header) = Header::for_format(format) else {
    unreachable!("{} is not a binary format", format.name())
  };
  header.write(out)?;
  if header.is_type_system_included() {
    Tsi::of(cas, header.is_indexes_included()).write_block(out)?;
  }
  write_image(cas, out)
}

fn write_image(cas: &Cas, out: &mut dyn Write) -> SerialResult<()> {
  let image = HeapImage {
    records: cas.heap().records().to_vec(),
    views  : ViewImage::all(cas),
  };
  let bytes = bincode::serde::encode_to_vec(&image, bincode::config::standard())?;
  #[cfg(feature = "trace_codec")]
  trace!(4, "binary image: {} records in {} bytes", image.records.len(), bytes.len());
  out.write_all(&bytes)?;
  Ok(())
}

/// Replaces the contents of `cas` with the dump in `payload`.
pub fn deserialize(payload: &[u8], cas: &mut Cas) -> SerialResult<()> {
  let (image, _): (HeapImage, _) = bincode::serde::decode_from_slice(payload, bincode::config::standard())?;
  #[cfg(feature = "trace_codec")]
  trace!(4, "binary image: {} records from {} bytes", image.records.len(), payload.len());

  let type_system = cas.type_system().clone();
  for (position, record) in image.records.iter().enumerate() {
    check_record(&type_system, record, image.records.len())
        .map_err(|reason| SerialError::Corrupt(format!("record @{}: {}", position, reason)))?;
  }
  for view in image.views.iter() {
    for fs in std::iter::once(&view.sofa).chain(view.members.iter()) {
      if fs.idx() >= image.records.len() {
        return Err(SerialError::Corrupt(format!("view \"{}\" names missing record {}", view.name, fs)));
      }
    }
  }

  check_references(&type_system, &image.records)?;
  let views: Vec<_> = image.views.into_iter().map(ViewImage::into_parts).collect();
  check_views(&type_system, &image.records, &views)?;
  cas.restore(Heap::from_records(image.records), views)?;
  Ok(())
}

/// Checks that `record` fits the destination type system: a known type, the right shape, and slot values of the
/// feature range kinds.
fn check_record(type_system: &TypeSystem, record: &FsRecord, record_count: usize) -> Result<(), String> {
  if record.type_code.idx() >= type_system.len() {
    return Err(format!("unknown type code {}", record.type_code));
  }
  let in_range = |fs: &FsRef| fs.idx() < record_count;

  match (&record.data, type_system.array_kind(record.type_code)) {
    (FsData::Features(slots), None) => {
      let features = type_system.features_of(record.type_code);
      if slots.len() != features.len() {
        return Err(format!("{} slots for {} features", slots.len(), features.len()));
      }
      for (slot, feature) in slots.iter().zip(features.iter()) {
        let expected = type_system.range_kind(*feature);
        if slot.kind() != expected {
          return Err(format!("slot of kind {:?} for a feature of kind {:?}", slot.kind(), expected));
        }
        if let Value::Fs(Some(target)) = slot {
          if !in_range(target) {
            return Err(format!("reference to missing record {}", target));
          }
        }
      }
      Ok(())
    }

    (FsData::Array(array), Some(kind)) => {
      if ArrayData::new(kind, 0).element_primitive() != array.element_primitive() {
        return Err(format!("array body does not match array kind {:?}", kind));
      }
      if let ArrayKind::Fs { .. } = kind {
        if let Some(target) = array.references().find(|target| !in_range(target)) {
          return Err(format!("reference to missing record {}", target));
        }
      }
      Ok(())
    }

    _ => Err(format!("record shape does not match type \"{}\"", type_system.type_name(record.type_code))),
  }
}

// endregion

// region Envelope

pub fn serialize_envelope(cas: &Cas, out: &mut dyn Write, with_type_system: bool) -> SerialResult<()> {
  out.write_all(&ENVELOPE_MAGIC)?;
  if with_type_system {
    out.write_all(&[COMPLETE])?;
    Tsi::of(cas, true).write_block(out)?;
  } else {
    out.write_all(&[CAS_ONLY])?;
  }
  write_image(cas, out)
}

/// The kind byte of an envelope, if `bytes` starts with one.
pub fn envelope_kind(bytes: &[u8]) -> Option<u8> {
  match bytes.strip_prefix(ENVELOPE_MAGIC.as_slice()) {
    Some([kind, ..]) => Some(*kind),
    _ => None,
  }
}

// endregion
