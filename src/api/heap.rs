/*!

The record heap is an arena of feature structures addressed by `FsRef` handles. A handle is the record's position in
the arena, so identity is handle equality and a map keyed by handle is an identity map. Records are never freed one at
a time; the whole arena is cleared when the owning store is reset.

*/

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{
  api::value::{ArrayData, Value},
  core::type_system::TypeCode,
};

/// A handle to a record in a store's heap. Only meaningful relative to the store that issued it.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct FsRef(pub u32);

impl FsRef {
  #[inline(always)]
  pub fn idx(self) -> usize {
    self.0 as usize
  }
}

impl Display for FsRef {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "@{}", self.0)
  }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum FsData {
  /// One slot per feature of the record's type, in offset order.
  Features(Vec<Value>),
  Array(ArrayData),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FsRecord {
  pub type_code: TypeCode,
  pub data     : FsData,
}

impl FsRecord {
  pub fn slots(&self) -> &[Value] {
    match &self.data {
      FsData::Features(slots) => slots,
      FsData::Array(_)        => &[],
    }
  }

  pub fn array(&self) -> Option<&ArrayData> {
    match &self.data {
      FsData::Array(array) => Some(array),
      FsData::Features(_)  => None,
    }
  }

  /// Every non-null reference held by this record, in slot or element order.
  pub fn references(&self) -> Vec<FsRef> {
    match &self.data {
      FsData::Features(slots) => slots.iter().filter_map(Value::as_fs).collect(),
      FsData::Array(array)    => array.references().collect(),
    }
  }
}

#[derive(Clone, Debug, Default)]
pub struct Heap {
  records: Vec<FsRecord>,
}

impl Heap {
  pub fn new() -> Heap {
    Heap::default()
  }

  pub(crate) fn from_records(records: Vec<FsRecord>) -> Heap {
    Heap { records }
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  pub fn push(&mut self, record: FsRecord) -> FsRef {
    let fs = FsRef(self.records.len() as u32);
    self.records.push(record);
    fs
  }

  pub fn contains(&self, fs: FsRef) -> bool {
    fs.idx() < self.records.len()
  }

  pub fn get(&self, fs: FsRef) -> Option<&FsRecord> {
    self.records.get(fs.idx())
  }

  pub fn get_mut(&mut self, fs: FsRef) -> Option<&mut FsRecord> {
    self.records.get_mut(fs.idx())
  }

  pub fn clear(&mut self) {
    self.records.clear();
  }

  pub fn records(&self) -> &[FsRecord] {
    &self.records
  }

  pub fn iter(&self) -> impl Iterator<Item = (FsRef, &FsRecord)> {
    self.records.iter().enumerate().map(|(i, record)| (FsRef(i as u32), record))
  }
}
