/*!

The fixed header of the binary family: the magic `UIMA` followed by a little-endian version word. The low byte of the
version word is the sequence version, which tells plain binary from compressed data. The bits above it are
`HeaderFlag`s naming the compressed form and whether a TSI block follows the header.

*/

use std::io::Write;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use enumflags2::{bitflags, BitFlags};

use crate::serialization::{
  serial_error::{SerialError, SerialResult},
  SerialFormat,
};

pub const BINARY_MAGIC: &[u8; 4] = b"UIMA";
pub const HEADER_LENGTH: usize = 8;

/// Sequence version of the plain binary dump.
pub const SEQUENCE_PLAIN: u8 = 1;
/// Sequence version of both compressed forms.
pub const SEQUENCE_COMPRESSED: u8 = 2;

const SEQUENCE_MASK: u32 = 0xFF;

#[bitflags]
#[repr(u32)]
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum HeaderFlag {
  Form4              = 1 << 8,
  Form6              = 1 << 9,
  /// A TSI block follows the header.
  TypeSystemIncluded = 1 << 10,
  /// The TSI block carries priorities and index definitions as well.
  IndexesIncluded    = 1 << 11,
}

pub type HeaderFlags = BitFlags<HeaderFlag, u32>;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Header {
  pub sequence_version: u8,
  pub flags           : HeaderFlags,
}

impl Header {
  /// The header written for `format`, or `None` for formats outside the binary family.
  pub fn for_format(format: SerialFormat) -> Option<Header> {
    let (sequence_version, flags): (u8, HeaderFlags) = match format {
      SerialFormat::Binary                => (SEQUENCE_PLAIN, HeaderFlags::empty()),
      SerialFormat::BinaryTsi             => (SEQUENCE_PLAIN, HeaderFlag::TypeSystemIncluded | HeaderFlag::IndexesIncluded),
      SerialFormat::Compressed            => (SEQUENCE_COMPRESSED, HeaderFlag::Form4.into()),
      SerialFormat::CompressedTsi         => (
        SEQUENCE_COMPRESSED,
        HeaderFlag::Form4 | HeaderFlag::TypeSystemIncluded | HeaderFlag::IndexesIncluded
      ),
      SerialFormat::CompressedFiltered    => (SEQUENCE_COMPRESSED, HeaderFlag::Form6.into()),
      SerialFormat::CompressedFilteredTs  => (SEQUENCE_COMPRESSED, HeaderFlag::Form6 | HeaderFlag::TypeSystemIncluded),
      SerialFormat::CompressedFilteredTsi => (
        SEQUENCE_COMPRESSED,
        HeaderFlag::Form6 | HeaderFlag::TypeSystemIncluded | HeaderFlag::IndexesIncluded
      ),
      _ => return None,
    };
    Some(Header { sequence_version, flags })
  }

  #[inline(always)]
  pub fn is_form4(&self) -> bool {
    self.flags.contains(HeaderFlag::Form4)
  }

  #[inline(always)]
  pub fn is_form6(&self) -> bool {
    self.flags.contains(HeaderFlag::Form6)
  }

  #[inline(always)]
  pub fn is_type_system_included(&self) -> bool {
    self.flags.contains(HeaderFlag::TypeSystemIncluded)
  }

  #[inline(always)]
  pub fn is_indexes_included(&self) -> bool {
    self.flags.contains(HeaderFlag::IndexesIncluded)
  }

  /// The format this header declares.
  pub fn format(&self) -> SerialResult<SerialFormat> {
    let format = match (self.sequence_version, self.is_form4(), self.is_form6()) {
      (SEQUENCE_PLAIN, false, false) => {
        if self.is_type_system_included() { SerialFormat::BinaryTsi } else { SerialFormat::Binary }
      }
      (SEQUENCE_COMPRESSED, true, false) => {
        if self.is_type_system_included() { SerialFormat::CompressedTsi } else { SerialFormat::Compressed }
      }
      (SEQUENCE_COMPRESSED, false, true) => {
        match (self.is_type_system_included(), self.is_indexes_included()) {
          (false, _)    => SerialFormat::CompressedFiltered,
          (true, false) => SerialFormat::CompressedFilteredTs,
          (true, true)  => SerialFormat::CompressedFilteredTsi,
        }
      }
      _ => {
        return Err(SerialError::Corrupt(format!(
          "binary header declares sequence version {} with flags {:?}",
          self.sequence_version,
          self.flags
        )))
      }
    };
    Ok(format)
  }

  pub fn write<W: Write + ?Sized>(&self, out: &mut W) -> SerialResult<()> {
    out.write_all(BINARY_MAGIC)?;
    out.write_u32::<LittleEndian>(self.flags.bits() | self.sequence_version as u32)?;
    Ok(())
  }

  /// Reads a header from the front of `input`, advancing past it. `None` if `input` does not start with the magic.
  pub fn read(input: &mut &[u8]) -> SerialResult<Option<Header>> {
    if !input.starts_with(BINARY_MAGIC) {
      return Ok(None);
    }
    *input = &input[BINARY_MAGIC.len()..];

    let word  = input.read_u32::<LittleEndian>()?;
    let flags = HeaderFlags::from_bits(word & !SEQUENCE_MASK)
        .map_err(|_| SerialError::Corrupt(format!("unknown flags in binary header word {:#010x}", word)))?;

    Ok(Some(Header {
      sequence_version: (word & SEQUENCE_MASK) as u8,
      flags,
    }))
  }
}
