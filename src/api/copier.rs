/*!

A `CasCopier` copies feature structures from source stores into one destination store. The copier remembers every
record it has copied, keyed by source store and source handle, so reusing one copier across several calls copies each
source record at most once and keeps references shared.

Copying a record works from a worklist. A destination record is allocated and registered before its slots are filled,
so a reference back to a record in progress resolves to the registered copy and cycles terminate. Two records are not
allocated but mapped: a sofa maps to the sofa of the like-named destination view, and a view's document annotation maps
to the destination view's own document annotation, onto which the source's feature values are copied.

Types and features are looked up by name in the destination unless both stores share the same type system. A missing
type or feature is an error. Primitive slots are copied through their canonical string form.

*/

use std::sync::Arc;

use thiserror::Error;

use crate::{
  abstractions::{HashMap, NatSet},
  api::{
    cas::Cas,
    cas_error::CasError,
    heap::{FsData, FsRef},
    value::{ArrayData, Value},
    view::ViewId,
  },
  core::type_system::{FeatureCode, TypeCode},
  trace,
};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CopyError {
  #[error("type \"{type_name}\" does not exist in the destination type system")]
  TypeNotFound {
    type_name: String,
  },

  #[error("feature \"{feature_name}\" of type \"{type_name}\" does not exist in the destination type system")]
  FeatureNotFound {
    feature_name: String,
    type_name   : String,
  },

  #[error(transparent)]
  Cas(#[from] CasError),
}

pub struct CasCopier<'a> {
  destination: &'a mut Cas,
  /// (source store id, source record) to destination record
  copies     : HashMap<(u64, FsRef), FsRef>,
}

impl<'a> CasCopier<'a> {
  pub fn new(destination: &'a mut Cas) -> CasCopier<'a> {
    CasCopier {
      destination,
      copies: HashMap::default(),
    }
  }

  pub fn destination(&self) -> &Cas {
    self.destination
  }

  /// Copies every view of `source` into the like-named view of the destination.
  pub fn copy_cas(&mut self, source: &Cas, copy_sofa: bool) -> Result<(), CopyError> {
    for view in source.views() {
      self.copy_view(source, view, copy_sofa)?;
    }
    Ok(())
  }

  /// Copies the records indexed in `view` of `source` into the like-named destination view, creating that view if
  /// needed. With `copy_sofa`, the sofa payload and MIME type are copied first.
  pub fn copy_view(&mut self, source: &Cas, view: ViewId, copy_sofa: bool) -> Result<ViewId, CopyError> {
    let target = self.destination.view_or_create(source.view_name(view));

    if copy_sofa {
      self.copy_sofa_data(source, view, target)?;
    }

    // Distinct from the copy map: a record reachable from several source index entries is indexed once per call.
    let mut indexed = NatSet::new();
    for fs in source.all_indexed_fs(view) {
      let copy = self.copy_fs(source, fs)?;
      if self.destination.existing_document_annotation(target) == Some(copy) {
        continue;
      }
      if indexed.insert(copy.idx()) {
        self.destination.add_fs_to_indexes(target, copy)?;
      }
    }

    Ok(target)
  }

  fn copy_sofa_data(&mut self, source: &Cas, view: ViewId, target: ViewId) -> Result<(), CopyError> {
    let mime_type = source.sofa_mime_type(view);
    if let Some(text) = source.document_text(view) {
      self.destination.set_sofa_data_string(target, text, mime_type)?;
    } else if let Some(uri) = source.sofa_data_uri(view) {
      self.destination.set_sofa_data_uri(target, uri, mime_type)?;
    } else if let Some(array) = source.sofa_data_array(view) {
      let copy = self.copy_fs(source, array)?;
      self.destination.set_sofa_data_array(target, copy, mime_type)?;
    }
    Ok(())
  }

  /// Whether `fs` of `source` has been copied by this copier.
  pub fn already_copied(&self, source: &Cas, fs: FsRef) -> bool {
    self.copies.contains_key(&(source.id(), fs))
  }

  /// Copies `fs` of `source` and everything it references. Returns the destination record.
  pub fn copy_fs(&mut self, source: &Cas, fs: FsRef) -> Result<FsRef, CopyError> {
    let mut pending: Vec<(FsRef, FsRef)> = Vec::new();
    let copy = self.allocate(source, fs, &mut pending)?;
    while let Some((from, to)) = pending.pop() {
      self.fill(source, from, to, &mut pending)?;
    }
    Ok(copy)
  }

  /// Finds or allocates the destination record for `fs`. Newly allocated records are queued to be filled.
  fn allocate(&mut self, source: &Cas, fs: FsRef, pending: &mut Vec<(FsRef, FsRef)>) -> Result<FsRef, CopyError> {
    let key = (source.id(), fs);
    if let Some(copy) = self.copies.get(&key) {
      return Ok(*copy);
    }

    if let Some(view) = source.sofa_view(fs) {
      let target = self.destination.view_or_create(source.view_name(view));
      let sofa   = self.destination.sofa(target);
      self.copies.insert(key, sofa);
      return Ok(sofa);
    }

    if let Some(view) = source.document_annotation_view(fs) {
      let target   = self.destination.view_or_create(source.view_name(view));
      let document = self.destination.document_annotation(target)?;
      self.copies.insert(key, document);
      pending.push((fs, document));
      return Ok(document);
    }

    let record    = source.record(fs)?;
    let type_code = self.destination_type(source, record.type_code)?;
    let copy = match &record.data {
      FsData::Array(array) => self.destination.create_array(type_code, array.len())?,
      FsData::Features(_)  => self.destination.create_fs(type_code)?,
    };
    trace!(3, "copying {} as {}", fs, copy);
    self.copies.insert(key, copy);
    pending.push((fs, copy));
    Ok(copy)
  }

  /// Copies the slots or elements of `from` into the already allocated `to`.
  fn fill(&mut self, source: &Cas, from: FsRef, to: FsRef, pending: &mut Vec<(FsRef, FsRef)>) -> Result<(), CopyError> {
    // A document annotation is already indexed; its keys may change.
    let Some(view) = self.destination.document_annotation_view(to) else {
      return self.fill_slots(source, from, to, pending);
    };
    let was_indexed = self.destination.remove_fs_from_indexes(view, to);
    self.fill_slots(source, from, to, pending)?;
    if was_indexed {
      self.destination.add_fs_to_indexes(view, to)?;
    }
    Ok(())
  }

  fn fill_slots(&mut self, source: &Cas, from: FsRef, to: FsRef, pending: &mut Vec<(FsRef, FsRef)>)
      -> Result<(), CopyError>
  {
    let record = source.record(from)?;

    match &record.data {

      FsData::Array(ArrayData::Fs(elements)) => {
        for (index, element) in elements.iter().enumerate() {
          if let Some(element) = element {
            let copy = self.allocate(source, *element, pending)?;
            self.destination.set_array_element(to, index, Value::Fs(Some(copy)))?;
          }
        }
      }

      FsData::Array(array) => {
        let target = self.destination.array_mut(to)?;
        if std::mem::discriminant(target) != std::mem::discriminant(array) {
          return Err(CopyError::Cas(CasError::WrongElementKind {
            expected: format!("{:?}", target.element_primitive()),
            found   : format!("{:?}", array.element_primitive()),
          }));
        }
        *target = array.clone();
      }

      FsData::Features(slots) => {
        let source_ts   = source.type_system();
        let destination = self.destination.type_of(to)?;
        for (feature, value) in source_ts.features_of(record.type_code).iter().zip(slots.iter()) {
          let target_feature = self.destination_feature(source, *feature, destination)?;
          match value {
            Value::Fs(None) => {}
            Value::Fs(Some(target)) => {
              let copy = self.allocate(source, *target, pending)?;
              self.destination.set_ref(to, target_feature, Some(copy))?;
            }
            primitive => {
              let text = primitive.to_canonical_string();
              self.destination.set_feature_value_from_string(to, target_feature, text.as_deref())?;
            }
          }
        }
      }

    }

    Ok(())
  }

  fn same_type_system(&self, source: &Cas) -> bool {
    Arc::ptr_eq(source.type_system(), self.destination.type_system())
  }

  fn destination_type(&self, source: &Cas, type_code: TypeCode) -> Result<TypeCode, CopyError> {
    if self.same_type_system(source) {
      return Ok(type_code);
    }
    let name = source.type_system().type_name(type_code);
    self.destination
        .type_system()
        .type_by_name(name)
        .ok_or_else(|| CopyError::TypeNotFound { type_name: name.to_string() })
  }

  fn destination_feature(&self, source: &Cas, feature: FeatureCode, destination_type: TypeCode)
      -> Result<FeatureCode, CopyError>
  {
    if self.same_type_system(source) {
      return Ok(feature);
    }
    let base_name = &source.type_system().feature(feature).name;
    self.destination
        .type_system()
        .feature_by_base_name(destination_type, base_name)
        .ok_or_else(|| CopyError::FeatureNotFound {
          feature_name: base_name.to_string(),
          type_name   : self.destination.type_system().type_name(destination_type).to_string(),
        })
  }
}

/// Copies every view of `source` into `destination` with a fresh copier.
pub fn copy_cas(source: &Cas, destination: &mut Cas, copy_sofa: bool) -> Result<(), CopyError> {
  CasCopier::new(destination).copy_cas(source, copy_sofa)
}
