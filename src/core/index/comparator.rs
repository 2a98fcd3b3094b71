use std::cmp::Ordering;

use crate::{
  abstractions::IString,
  api::{FsData, FsRef, Heap},
  core::{
    description::{IndexKind, SortDirection},
    index::LinearTypeOrder,
    type_system::{FeatureCode, TypeCode},
  },
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IndexKey {
  Feature {
    feature  : FeatureCode,
    /// Slot offset of `feature`, cached from the type system.
    offset   : usize,
    direction: SortDirection,
  },
  TypePriority,
}

/// Orders records of one type (and its subtypes) by a list of keys, the first key being most significant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FsIndexComparator {
  pub type_code: TypeCode,
  pub keys     : Vec<IndexKey>,
}

impl FsIndexComparator {
  pub fn new(type_code: TypeCode) -> Self {
    FsIndexComparator { type_code, keys: Vec::new() }
  }

  pub fn add_key(&mut self, key: IndexKey) {
    self.keys.push(key);
  }

  pub fn compare(&self, heap: &Heap, order: &LinearTypeOrder, a: FsRef, b: FsRef) -> Ordering {
    let (Some(record_a), Some(record_b)) = (heap.get(a), heap.get(b)) else {
      return Ordering::Equal;
    };

    for key in self.keys.iter() {
      let ordering = match key {

        IndexKey::Feature { offset, direction, .. } => {
          let ordering = match (&record_a.data, &record_b.data) {
            (FsData::Features(slots_a), FsData::Features(slots_b)) => {
              match (slots_a.get(*offset), slots_b.get(*offset)) {
                (Some(value_a), Some(value_b)) => value_a.compare_key(value_b),
                _ => Ordering::Equal,
              }
            }
            _ => Ordering::Equal,
          };
          match direction {
            SortDirection::Standard => ordering,
            SortDirection::Reverse  => ordering.reverse(),
          }
        }

        IndexKey::TypePriority => order.compare(record_a.type_code, record_b.type_code),

      };
      if ordering != Ordering::Equal {
        return ordering;
      }
    }

    Ordering::Equal
  }
}

/// A named index over one type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FsIndexDefinition {
  pub label     : IString,
  pub kind      : IndexKind,
  pub comparator: FsIndexComparator,
}

impl FsIndexDefinition {
  pub fn type_code(&self) -> TypeCode {
    self.comparator.type_code
  }
}
