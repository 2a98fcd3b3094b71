/*!

An `IndexRepository` holds the index contents of one view. Index definitions are shared through the `CasSchema`; the
repository only stores, for each definition (by position), the handles of its members:

 - sorted indexes keep members in comparator order, records with equal keys in insertion order;
 - set indexes keep one member per distinct key, also in comparator order;
 - bag indexes keep members in insertion order.

A record is added to every index whose type subsumes the record's type. Every added record is also kept in an implicit
default bag, so a record is reachable from the repository even when no index covers its type.

*/

use crate::{
  abstractions::NatSet,
  api::{FsRef, Heap},
  core::{
    description::IndexKind,
    schema::CasSchema,
  },
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IndexRepository {
  contents   : Vec<Vec<FsRef>>,
  default_bag: Vec<FsRef>,
}

impl IndexRepository {
  pub fn new(index_count: usize) -> IndexRepository {
    IndexRepository {
      contents   : vec![Vec::new(); index_count],
      default_bag: Vec::new(),
    }
  }

  /// Adds `fs` to every applicable index.
  pub fn add(&mut self, schema: &CasSchema, heap: &Heap, fs: FsRef) {
    let Some(record) = heap.get(fs) else { return; };
    let type_system  = schema.type_system();
    let order        = schema.type_order();

    for (position, definition) in schema.index_definitions().iter().enumerate() {
      if !type_system.subsumes(definition.type_code(), record.type_code) {
        continue;
      }
      let members    = &mut self.contents[position];
      let comparator = &definition.comparator;

      match definition.kind {

        IndexKind::Sorted => {
          // Upper bound, so equal keys stay in insertion order.
          let at = members.partition_point(|m| comparator.compare(heap, order, *m, fs).is_le());
          members.insert(at, fs);
        }

        IndexKind::Set => {
          let at = members.partition_point(|m| comparator.compare(heap, order, *m, fs).is_lt());
          let duplicate = members
              .get(at)
              .map_or(false, |m| comparator.compare(heap, order, *m, fs).is_eq());
          if !duplicate {
            members.insert(at, fs);
          }
        }

        IndexKind::Bag => members.push(fs),

      }
    }

    self.default_bag.push(fs);
  }

  /// Removes one occurrence of `fs` (by identity) from every index. Returns whether it was present.
  pub fn remove(&mut self, fs: FsRef) -> bool {
    for members in self.contents.iter_mut() {
      if let Some(at) = members.iter().position(|m| *m == fs) {
        members.remove(at);
      }
    }
    match self.default_bag.iter().position(|m| *m == fs) {
      Some(at) => {
        self.default_bag.remove(at);
        true
      }
      None => false,
    }
  }

  pub fn clear(&mut self) {
    for members in self.contents.iter_mut() {
      members.clear();
    }
    self.default_bag.clear();
  }

  /// Members of the index at `position` in the schema's index definitions.
  pub fn members(&self, position: usize) -> &[FsRef] {
    self.contents.get(position).map(Vec::as_slice).unwrap_or(&[])
  }

  /// Members of the index labeled `label`, or `None` if the schema defines no such index.
  pub fn labeled(&self, schema: &CasSchema, label: &str) -> Option<&[FsRef]> {
    schema.index_position(label).map(|position| self.members(position))
  }

  pub fn contains(&self, fs: FsRef) -> bool {
    self.default_bag.contains(&fs)
  }

  /// Every indexed record once, in order of first addition.
  pub fn all_indexed(&self) -> Vec<FsRef> {
    let mut seen = NatSet::new();
    self.default_bag
        .iter()
        .copied()
        .filter(|fs| seen.insert(fs.idx()))
        .collect()
  }

  pub fn is_empty(&self) -> bool {
    self.default_bag.is_empty()
  }
}
