/*!

The `Cas` is the feature structure store: a heap of typed records over a shared, immutable `CasSchema`, and one or
more named views, each with a sofa record, an optional document annotation, and its own index contents.

Records are created through the store and addressed by `FsRef`. Slots are checked on write: the feature must be
defined on the record's type, the value must be of the feature's range kind, references must point to a record whose
type the range subsumes, and strings stored in a string-subtype slot must be among its allowed values.

The sofa of a view holds at most one of three payloads: document text, a URI, or an array record. Setting the document
text also creates the view's document annotation, if necessary, and stretches it over the text.

*/

use std::sync::atomic::{AtomicU64, Ordering};

use paste::paste;

use crate::{
  abstractions::{HashMap, IString},
  api::{
    cas_error::CasError,
    heap::{FsData, FsRecord, FsRef, Heap},
    value::{ArrayData, Value},
    view::{View, ViewId},
  },
  core::{
    schema::RcCasSchema,
    type_system::{
      builtins::{
        primitive_array_type,
        ANNOTATION,
        ANNOTATION_BASE,
        ANNOTATION_BEGIN,
        ANNOTATION_END,
        ANNOTATION_SOFA,
        DOCUMENT_ANNOTATION,
        DOCUMENT_LANGUAGE,
        FS_ARRAY,
        INITIAL_VIEW_NAME,
        SOFA,
        SOFA_ARRAY,
        SOFA_ID,
        SOFA_MIME,
        SOFA_NUM,
        SOFA_STRING,
        SOFA_URI
      },
      ArrayKind,
      FeatureCode,
      PrimitiveKind,
      RcTypeSystem,
      TypeCode,
      ValueKind
    },
  },
  debug,
};

static NEXT_CAS_ID: AtomicU64 = AtomicU64::new(1);

/// MIME type recorded for a sofa whose text is set without one.
pub const DEFAULT_TEXT_MIME_TYPE: &str = "text";

pub struct Cas {
  id        : u64,
  schema    : RcCasSchema,
  heap      : Heap,
  views     : Vec<View>,
  view_names: HashMap<IString, ViewId>,
}

impl Cas {
  pub fn new(schema: RcCasSchema) -> Cas {
    let mut cas = Cas {
      id        : NEXT_CAS_ID.fetch_add(1, Ordering::Relaxed),
      schema,
      heap      : Heap::new(),
      views     : Vec::new(),
      view_names: HashMap::default(),
    };
    cas.add_view(INITIAL_VIEW_NAME);
    cas
  }

  /// A process-unique identifier of this store.
  pub fn id(&self) -> u64 {
    self.id
  }

  pub fn schema(&self) -> &RcCasSchema {
    &self.schema
  }

  pub fn type_system(&self) -> &RcTypeSystem {
    self.schema.type_system()
  }

  pub fn heap(&self) -> &Heap {
    &self.heap
  }

  /// Removes all records and index contents and recreates the initial view. The schema is kept.
  pub fn reset(&mut self) {
    self.heap.clear();
    self.views.clear();
    self.view_names.clear();
    self.add_view(INITIAL_VIEW_NAME);
  }

  /// Replaces the schema and resets.
  pub fn reinit(&mut self, schema: RcCasSchema) {
    debug!(2, "reinitializing store {} with a new schema", self.id);
    self.schema = schema;
    self.reset();
  }

  /// An empty store over `schema` carrying this store's identity, to be moved into its place.
  pub(crate) fn successor(&self, schema: RcCasSchema) -> Cas {
    let mut cas = Cas {
      id        : self.id,
      schema,
      heap      : Heap::new(),
      views     : Vec::new(),
      view_names: HashMap::default(),
    };
    cas.add_view(INITIAL_VIEW_NAME);
    cas
  }

  // region Views

  pub fn initial_view(&self) -> ViewId {
    ViewId::INITIAL
  }

  /// Finds the view named `name`.
  pub fn view(&self, name: &str) -> Option<ViewId> {
    self.view_names.get(&IString::from(name)).copied()
  }

  pub fn create_view(&mut self, name: &str) -> Result<ViewId, CasError> {
    if self.view(name).is_some() {
      return Err(CasError::DuplicateView(name.to_string()));
    }
    Ok(self.add_view(name))
  }

  pub fn view_or_create(&mut self, name: &str) -> ViewId {
    match self.view(name) {
      Some(view) => view,
      None       => self.add_view(name),
    }
  }

  /// All views in creation order.
  pub fn views(&self) -> impl Iterator<Item = ViewId> {
    (0..self.views.len() as u32).map(ViewId)
  }

  pub fn view_count(&self) -> usize {
    self.views.len()
  }

  /// Panics if `view` was not issued by this store. Operations that return a `Result` report such a view as
  /// `CasError::InvalidView` instead; the accessors that do not return one panic.
  pub fn view_name(&self, view: ViewId) -> &str {
    &self.views[view.idx()].name
  }

  /// The sofa record of `view`. Panics if `view` was not issued by this store.
  pub fn sofa(&self, view: ViewId) -> FsRef {
    self.views[view.idx()].sofa
  }

  /// The view whose sofa is `fs`.
  pub fn sofa_view(&self, fs: FsRef) -> Option<ViewId> {
    self.views.iter().position(|view| view.sofa == fs).map(|i| ViewId(i as u32))
  }

  fn check_view(&self, view: ViewId) -> Result<(), CasError> {
    match view.idx() < self.views.len() {
      true  => Ok(()),
      false => Err(CasError::InvalidView(view.0)),
    }
  }

  fn add_view(&mut self, name: &str) -> ViewId {
    let view     = ViewId(self.views.len() as u32);
    let sofa_num = self.views.len() as i32 + 1;
    let sofa     = self.new_record(SOFA);
    self.put(sofa, SOFA_NUM, Value::Integer(sofa_num));
    self.put(sofa, SOFA_ID, Value::String(Some(name.to_string())));

    let name = IString::from(name);
    self.views.push(View::new(name.clone(), sofa, self.schema.index_definitions().len()));
    self.view_names.insert(name, view);
    view
  }

  // endregion

  // region Sofa payload

  fn sofa_has_data(&self, view: ViewId) -> bool {
    let sofa = self.sofa(view);
    [SOFA_STRING, SOFA_URI, SOFA_ARRAY]
        .into_iter()
        .any(|feature| !matches!(self.peek(sofa, feature), Value::String(None) | Value::Fs(None)))
  }

  fn check_sofa_free(&self, view: ViewId) -> Result<(), CasError> {
    self.check_view(view)?;
    if self.sofa_has_data(view) {
      return Err(CasError::SofaDataAlreadySet(self.view_name(view).to_string()));
    }
    Ok(())
  }

  /// Sets the document text of `view` and stretches the document annotation over it.
  pub fn set_document_text(&mut self, view: ViewId, text: &str) -> Result<(), CasError> {
    self.set_sofa_data_string(view, text, None)
  }

  pub fn set_sofa_data_string(&mut self, view: ViewId, text: &str, mime_type: Option<&str>) -> Result<(), CasError> {
    self.check_sofa_free(view)?;
    let sofa = self.sofa(view);
    self.put(sofa, SOFA_STRING, Value::String(Some(text.to_string())));
    self.put(sofa, SOFA_MIME, Value::String(Some(mime_type.unwrap_or(DEFAULT_TEXT_MIME_TYPE).to_string())));

    let document = self.document_annotation(view)?;
    self.remove_fs_from_indexes(view, document);
    self.put(document, ANNOTATION_END, Value::Integer(text.chars().count() as i32));
    self.add_fs_to_indexes(view, document)?;
    Ok(())
  }

  pub fn set_sofa_data_uri(&mut self, view: ViewId, uri: &str, mime_type: Option<&str>) -> Result<(), CasError> {
    self.check_sofa_free(view)?;
    let sofa = self.sofa(view);
    self.put(sofa, SOFA_URI, Value::String(Some(uri.to_string())));
    self.put(sofa, SOFA_MIME, Value::String(mime_type.map(str::to_string)));
    Ok(())
  }

  /// Uses the array record `array` as the payload of `view`.
  pub fn set_sofa_data_array(&mut self, view: ViewId, array: FsRef, mime_type: Option<&str>) -> Result<(), CasError> {
    self.check_sofa_free(view)?;
    self.array(array)?;
    let sofa = self.sofa(view);
    self.put(sofa, SOFA_ARRAY, Value::Fs(Some(array)));
    self.put(sofa, SOFA_MIME, Value::String(mime_type.map(str::to_string)));
    Ok(())
  }

  /// Panics if `view` was not issued by this store, as do the other sofa accessors.
  pub fn document_text(&self, view: ViewId) -> Option<&str> {
    self.peek_str(self.sofa(view), SOFA_STRING)
  }

  pub fn sofa_data_uri(&self, view: ViewId) -> Option<&str> {
    self.peek_str(self.sofa(view), SOFA_URI)
  }

  pub fn sofa_data_array(&self, view: ViewId) -> Option<FsRef> {
    self.peek(self.sofa(view), SOFA_ARRAY).as_fs()
  }

  pub fn sofa_mime_type(&self, view: ViewId) -> Option<&str> {
    self.peek_str(self.sofa(view), SOFA_MIME)
  }

  // endregion

  // region Document annotation

  /// The document annotation of `view`, created and indexed on first use.
  pub fn document_annotation(&mut self, view: ViewId) -> Result<FsRef, CasError> {
    self.check_view(view)?;
    if let Some(document) = self.views[view.idx()].document_annotation {
      return Ok(document);
    }

    let length   = self.document_text(view).map_or(0, |text| text.chars().count() as i32);
    let document = self.create_annotation(view, DOCUMENT_ANNOTATION, 0, length)?;
    self.views[view.idx()].document_annotation = Some(document);
    self.add_fs_to_indexes(view, document)?;
    Ok(document)
  }

  /// The document annotation of `view` if it has been created. Panics if `view` was not issued by this store.
  pub fn existing_document_annotation(&self, view: ViewId) -> Option<FsRef> {
    self.views[view.idx()].document_annotation
  }

  pub fn is_document_annotation(&self, fs: FsRef) -> bool {
    self.document_annotation_view(fs).is_some()
  }

  /// The view whose document annotation is `fs`.
  pub fn document_annotation_view(&self, fs: FsRef) -> Option<ViewId> {
    self.views
        .iter()
        .position(|view| view.document_annotation == Some(fs))
        .map(|i| ViewId(i as u32))
  }

  pub fn document_language(&self, view: ViewId) -> Option<&str> {
    self.existing_document_annotation(view)
        .and_then(|document| self.peek_str(document, DOCUMENT_LANGUAGE))
  }

  pub fn set_document_language(&mut self, view: ViewId, language: &str) -> Result<(), CasError> {
    let document = self.document_annotation(view)?;
    self.set_feature_value(document, DOCUMENT_LANGUAGE, Value::String(Some(language.to_string())))
  }

  // endregion

  // region Records

  /// A record of type `type_code` with every slot at its default. No checks.
  fn new_record(&mut self, type_code: TypeCode) -> FsRef {
    let type_system = self.schema.type_system();
    let slots = type_system
        .features_of(type_code)
        .iter()
        .map(|feature| Value::default_for(type_system.range_kind(*feature)))
        .collect();
    self.heap.push(FsRecord { type_code, data: FsData::Features(slots) })
  }

  pub fn type_by_name(&self, name: &str) -> Result<TypeCode, CasError> {
    self.type_system()
        .type_by_name(name)
        .ok_or_else(|| CasError::UnknownType(name.to_string()))
  }

  /// Creates a record of type `type_code`. Primitive, abstract, array, and sofa types cannot be created this way.
  pub fn create_fs(&mut self, type_code: TypeCode) -> Result<FsRef, CasError> {
    let type_system = self.schema.type_system();
    if type_code.idx() >= type_system.len() {
      return Err(CasError::UnknownType(type_code.to_string()));
    }
    let cas_type = type_system.ty(type_code);
    if cas_type.is_primitive() || cas_type.is_abstract() || cas_type.is_array() || type_code == SOFA {
      return Err(CasError::NotCreatable { type_name: cas_type.name.to_string() });
    }
    Ok(self.new_record(type_code))
  }

  /// Creates a record of type `type_code`, attached to the sofa of `view` if the type is an annotation type.
  pub fn create_fs_in(&mut self, view: ViewId, type_code: TypeCode) -> Result<FsRef, CasError> {
    self.check_view(view)?;
    let fs = self.create_fs(type_code)?;
    if self.type_system().subsumes(ANNOTATION_BASE, type_code) {
      let sofa = self.sofa(view);
      self.put(fs, ANNOTATION_SOFA, Value::Fs(Some(sofa)));
    }
    Ok(fs)
  }

  /// Creates an annotation over `begin..end` of the sofa of `view`. The annotation is not indexed.
  pub fn create_annotation(&mut self, view: ViewId, type_code: TypeCode, begin: i32, end: i32) -> Result<FsRef, CasError> {
    if !self.type_system().subsumes(ANNOTATION, type_code) {
      return Err(CasError::NotCreatable { type_name: self.type_system().type_name(type_code).to_string() });
    }
    let fs = self.create_fs_in(view, type_code)?;
    self.put(fs, ANNOTATION_BEGIN, Value::Integer(begin));
    self.put(fs, ANNOTATION_END, Value::Integer(end));
    Ok(fs)
  }

  /// Creates a zero-filled array of `length` elements of array type `type_code`.
  pub fn create_array(&mut self, type_code: TypeCode, length: usize) -> Result<FsRef, CasError> {
    let type_system = self.schema.type_system();
    if type_code.idx() >= type_system.len() {
      return Err(CasError::UnknownType(type_code.to_string()));
    }
    let Some(kind) = type_system.array_kind(type_code) else {
      return Err(CasError::NotAnArray { type_name: type_system.type_name(type_code).to_string() });
    };
    Ok(self.heap.push(FsRecord { type_code, data: FsData::Array(ArrayData::new(kind, length)) }))
  }

  /// Creates a `uima.cas.FSArray` holding `elements`.
  pub fn create_fs_array(&mut self, elements: Vec<Option<FsRef>>) -> Result<FsRef, CasError> {
    for element in elements.iter().flatten() {
      self.record(*element)?;
    }
    Ok(self.heap.push(FsRecord { type_code: FS_ARRAY, data: FsData::Array(ArrayData::Fs(elements)) }))
  }

  pub fn record(&self, fs: FsRef) -> Result<&FsRecord, CasError> {
    self.heap.get(fs).ok_or(CasError::InvalidHandle(fs.0))
  }

  pub fn type_of(&self, fs: FsRef) -> Result<TypeCode, CasError> {
    Ok(self.record(fs)?.type_code)
  }

  pub fn array(&self, fs: FsRef) -> Result<&ArrayData, CasError> {
    let record = self.record(fs)?;
    record.array().ok_or_else(|| CasError::NotAnArray {
      type_name: self.type_system().type_name(record.type_code).to_string(),
    })
  }

  pub fn array_mut(&mut self, fs: FsRef) -> Result<&mut ArrayData, CasError> {
    let type_system = self.schema.type_system();
    let record      = self.heap.get_mut(fs).ok_or(CasError::InvalidHandle(fs.0))?;
    match &mut record.data {
      FsData::Array(array) => Ok(array),
      FsData::Features(_)  => Err(CasError::NotAnArray {
        type_name: type_system.type_name(record.type_code).to_string(),
      }),
    }
  }

  /// Stores `value` at `index` of array `fs`. References must point to records of this store.
  /// Stores `value` at `index`. Elements of a typed reference array must have the array's element type.
  pub fn set_array_element(&mut self, fs: FsRef, index: usize, value: Value) -> Result<(), CasError> {
    if let Value::Fs(Some(target)) = value {
      let target_type = self.type_of(target)?;
      let array_type  = self.type_of(fs)?;
      let type_system = self.type_system();
      if let Some(ArrayKind::Fs { element }) = type_system.array_kind(array_type) {
        if !type_system.accepts_reference(element, target_type) {
          return Err(CasError::IncompatibleReference {
            feature: type_system.type_name(array_type).to_string(),
            range  : type_system.type_name(element).to_string(),
            found  : type_system.type_name(target_type).to_string(),
          });
        }
      }
    }
    self.array_mut(fs)?.set(index, value)
  }

  // endregion

  // region Slots

  /// The feature named `base_name` on the type of `fs`.
  pub fn feature_of(&self, fs: FsRef, base_name: &str) -> Result<FeatureCode, CasError> {
    let type_code = self.type_of(fs)?;
    self.type_system()
        .feature_by_base_name(type_code, base_name)
        .ok_or_else(|| CasError::FeatureNotOnType {
          feature  : base_name.to_string(),
          type_name: self.type_system().type_name(type_code).to_string(),
        })
  }

  /// The slot offset of `feature` in `fs`, checking that the feature is defined on the record's type.
  fn slot(&self, fs: FsRef, feature: FeatureCode) -> Result<usize, CasError> {
    let record      = self.record(fs)?;
    let type_system = self.type_system();
    let defined     = feature.idx() < type_system.feature_count()
        && matches!(record.data, FsData::Features(_))
        && type_system.subsumes(type_system.feature(feature).domain, record.type_code);
    if !defined {
      return Err(CasError::FeatureNotOnType {
        feature  : if feature.idx() < type_system.feature_count() {
          type_system.feature_full_name(feature)
        } else {
          format!("{:?}", feature)
        },
        type_name: type_system.type_name(record.type_code).to_string(),
      });
    }
    Ok(type_system.feature(feature).offset())
  }

  pub fn feature_value(&self, fs: FsRef, feature: FeatureCode) -> Result<Value, CasError> {
    let offset = self.slot(fs, feature)?;
    Ok(self.record(fs)?.slots()[offset].clone())
  }

  pub fn set_feature_value(&mut self, fs: FsRef, feature: FeatureCode, value: Value) -> Result<(), CasError> {
    let offset      = self.slot(fs, feature)?;
    let type_system = self.type_system();
    let range       = type_system.feature(feature).range;
    let range_kind  = type_system.value_kind(range);

    if value.kind() != range_kind {
      return Err(CasError::WrongValueKind {
        feature: type_system.feature_full_name(feature),
        range  : type_system.type_name(range).to_string(),
        found  : format!("{:?}", value.kind()),
      });
    }

    match &value {
      Value::Fs(Some(target)) => {
        let target_type = self.type_of(*target)?;
        if !type_system.accepts_reference(range, target_type) {
          return Err(CasError::IncompatibleReference {
            feature: type_system.feature_full_name(feature),
            range  : type_system.type_name(range).to_string(),
            found  : type_system.type_name(target_type).to_string(),
          });
        }
      }
      Value::String(Some(text)) if !type_system.is_allowed_string(range, text) => {
        return Err(CasError::ValueNotAllowed {
          value  : text.clone(),
          feature: type_system.feature_full_name(feature),
          range  : type_system.type_name(range).to_string(),
        });
      }
      _ => {}
    }

    self.put_at(fs, offset, value);
    Ok(())
  }

  /// The canonical string form of a primitive slot. References are an error.
  pub fn feature_value_as_string(&self, fs: FsRef, feature: FeatureCode) -> Result<Option<String>, CasError> {
    let value = self.feature_value(fs, feature)?;
    if let Value::Fs(_) = value {
      return Err(CasError::WrongValueKind {
        feature: self.type_system().feature_full_name(feature),
        range  : self.type_system().type_name(self.type_system().feature(feature).range).to_string(),
        found  : "String".to_string(),
      });
    }
    Ok(value.to_canonical_string())
  }

  /// Parses `text` according to the range of `feature` and stores it.
  pub fn set_feature_value_from_string(&mut self, fs: FsRef, feature: FeatureCode, text: Option<&str>) -> Result<(), CasError> {
    self.slot(fs, feature)?;
    let type_system = self.type_system();
    let kind = match type_system.range_kind(feature) {
      ValueKind::Primitive(kind) => kind,
      ValueKind::Reference => {
        return Err(CasError::WrongValueKind {
          feature: type_system.feature_full_name(feature),
          range  : type_system.type_name(type_system.feature(feature).range).to_string(),
          found  : "String".to_string(),
        });
      }
    };
    let value = Value::parse(kind, text)?;
    self.set_feature_value(fs, feature, value)
  }

  pub fn get_ref(&self, fs: FsRef, feature: FeatureCode) -> Result<Option<FsRef>, CasError> {
    match self.feature_value(fs, feature)? {
      Value::Fs(target) => Ok(target),
      other => Err(CasError::WrongValueKind {
        feature: self.type_system().feature_full_name(feature),
        range  : self.type_system().type_name(self.type_system().feature(feature).range).to_string(),
        found  : format!("{:?}", other.kind()),
      }),
    }
  }

  pub fn set_ref(&mut self, fs: FsRef, feature: FeatureCode, target: Option<FsRef>) -> Result<(), CasError> {
    self.set_feature_value(fs, feature, Value::Fs(target))
  }

  /// Writes a slot without checks. `feature` must be defined on the record's type.
  fn put(&mut self, fs: FsRef, feature: FeatureCode, value: Value) {
    let offset = self.schema.type_system().feature(feature).offset();
    self.put_at(fs, offset, value);
  }

  fn put_at(&mut self, fs: FsRef, offset: usize, value: Value) {
    if let Some(FsRecord { data: FsData::Features(slots), .. }) = self.heap.get_mut(fs) {
      if let Some(slot) = slots.get_mut(offset) {
        *slot = value;
      }
    }
  }

  /// Reads a slot without checks, yielding a null reference for a missing slot.
  fn peek(&self, fs: FsRef, feature: FeatureCode) -> Value {
    let offset = self.schema.type_system().feature(feature).offset();
    self.heap
        .get(fs)
        .and_then(|record| record.slots().get(offset))
        .cloned()
        .unwrap_or(Value::Fs(None))
  }

  fn peek_str(&self, fs: FsRef, feature: FeatureCode) -> Option<&str> {
    let offset = self.schema.type_system().feature(feature).offset();
    self.heap.get(fs).and_then(|record| record.slots().get(offset)).and_then(Value::as_str)
  }

  // endregion

  // region Indexes

  /// Adds `fs` to the indexes of `view`.
  pub fn add_fs_to_indexes(&mut self, view: ViewId, fs: FsRef) -> Result<(), CasError> {
    self.check_view(view)?;
    self.record(fs)?;
    let view = &mut self.views[view.idx()];
    view.indexes.add(&self.schema, &self.heap, fs);
    Ok(())
  }

  /// Removes `fs` from the indexes of `view`. Returns whether it was indexed there. Panics if `view` was not issued by
  /// this store.
  pub fn remove_fs_from_indexes(&mut self, view: ViewId, fs: FsRef) -> bool {
    self.views[view.idx()].indexes.remove(fs)
  }

  /// The members of the index labeled `label` in `view`, in index order.
  pub fn index(&self, view: ViewId, label: &str) -> Result<&[FsRef], CasError> {
    self.check_view(view)?;
    self.views[view.idx()]
        .indexes
        .labeled(&self.schema, label)
        .ok_or_else(|| CasError::UnknownIndex(label.to_string()))
  }

  /// Every record indexed in `view`, once each, in order of first addition. Panics if `view` was not issued by this
  /// store.
  pub fn all_indexed_fs(&self, view: ViewId) -> Vec<FsRef> {
    self.views[view.idx()].indexes.all_indexed()
  }

  pub fn is_indexed(&self, view: ViewId, fs: FsRef) -> bool {
    self.views[view.idx()].indexes.contains(fs)
  }

  // endregion

  // region Restore

  /// Replaces all records and views with decoded ones. Views are given as (name, sofa, indexed members); the first
  /// must be the initial view. A document annotation among a view's members on that view's sofa becomes the view's
  /// document annotation. Fails on a repeated view name or a member that is not a record, leaving `self` unchanged.
  pub(crate) fn restore(&mut self, heap: Heap, views: Vec<(String, FsRef, Vec<FsRef>)>) -> Result<(), CasError> {
    let mut staged = Cas {
      id        : self.id,
      schema    : self.schema.clone(),
      heap,
      views     : Vec::new(),
      view_names: HashMap::default(),
    };

    let index_count = staged.schema.index_definitions().len();
    for (name, sofa, members) in views {
      if staged.view(&name).is_some() {
        return Err(CasError::DuplicateView(name));
      }
      let name = IString::from(name.as_str());
      let id   = ViewId(staged.views.len() as u32);
      staged.views.push(View::new(name.clone(), sofa, index_count));
      staged.view_names.insert(name, id);

      for fs in members {
        if staged.views[id.idx()].document_annotation.is_none()
            && staged.type_of(fs)? == DOCUMENT_ANNOTATION
            && staged.peek(fs, ANNOTATION_SOFA).as_fs() == Some(sofa)
        {
          staged.views[id.idx()].document_annotation = Some(fs);
        }
        staged.add_fs_to_indexes(id, fs)?;
      }
    }

    if staged.views.is_empty() {
      staged.add_view(INITIAL_VIEW_NAME);
    }
    *self = staged;
    Ok(())
  }

  // endregion
}

// Typed constructors for primitive arrays: `create_integer_array`, `create_string_array`, and so on.
macro_rules! primitive_array_constructors {
  ($($name:ident : $element:ty => $variant:ident),* $(,)?) => {
    paste! {
      impl Cas {
        $(
          pub fn [<create_ $name _array>](&mut self, values: Vec<$element>) -> FsRef {
            self.heap.push(FsRecord {
              type_code: primitive_array_type(PrimitiveKind::$variant),
              data     : FsData::Array(ArrayData::$variant(values)),
            })
          }
        )*
      }
    }
  };
}

primitive_array_constructors!(
  boolean: bool           => Boolean,
  byte   : i8             => Byte,
  short  : i16            => Short,
  integer: i32            => Integer,
  long   : i64            => Long,
  float  : f32            => Float,
  double : f64            => Double,
  string : Option<String> => String,
);

impl std::fmt::Debug for Cas {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Cas")
     .field("id", &self.id)
     .field("records", &self.heap.len())
     .field("views", &self.views.iter().map(|v| v.name.to_string()).collect::<Vec<_>>())
     .finish()
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::{
    description::{CasDefinition, TypeSystemDescription},
    schema::CasSchema,
    type_system::builtins::{ANNOTATION_INDEX_LABEL, ARRAY_BASE, INTEGER_ARRAY, STRING_ARRAY, TOP},
  };

  fn schema() -> RcCasSchema {
    let mut ts = TypeSystemDescription::new();
    let token  = ts.add_type("org.example.Token", None, "uima.tcas.Annotation");
    token.add_feature("pos", None, "org.example.Pos");
    token.add_feature("next", None, "org.example.Token");
    token.add_feature("score", None, "uima.cas.Double");
    ts.add_type("org.example.Pos", None, "uima.cas.String")
      .add_allowed_value("NN", None)
      .add_allowed_value("VB", None);
    ts.add_type("org.example.Other", None, "uima.cas.TOP");
    CasSchema::new(CasDefinition::new(ts)).unwrap()
  }

  #[test]
  fn new_store_has_initial_view_and_sofa() {
    let cas = Cas::new(schema());
    assert_eq!(cas.view_count(), 1);
    assert_eq!(cas.view(INITIAL_VIEW_NAME), Some(ViewId::INITIAL));
    let sofa = cas.sofa(ViewId::INITIAL);
    assert_eq!(cas.type_of(sofa).unwrap(), SOFA);
    assert_eq!(cas.sofa_view(sofa), Some(ViewId::INITIAL));
    assert!(cas.all_indexed_fs(ViewId::INITIAL).is_empty());
  }

  #[test]
  fn ids_are_unique() {
    let schema = schema();
    assert_ne!(Cas::new(schema.clone()).id(), Cas::new(schema).id());
  }

  #[test]
  fn views_are_found_not_thrown() {
    let mut cas = Cas::new(schema());
    assert!(cas.view("other").is_none());
    let other = cas.view_or_create("other");
    assert_eq!(cas.view_or_create("other"), other);
    assert_eq!(cas.view_name(other), "other");
    assert!(matches!(cas.create_view("other"), Err(CasError::DuplicateView(_))));
    assert_ne!(cas.sofa(other), cas.sofa(ViewId::INITIAL));
  }

  #[test]
  fn slot_writes_are_checked() {
    let mut cas = Cas::new(schema());
    let token_type = cas.type_by_name("org.example.Token").unwrap();
    let other_type = cas.type_by_name("org.example.Other").unwrap();
    let token      = cas.create_annotation(ViewId::INITIAL, token_type, 0, 3).unwrap();
    let other      = cas.create_fs(other_type).unwrap();

    let pos   = cas.feature_of(token, "pos").unwrap();
    let next  = cas.feature_of(token, "next").unwrap();
    let score = cas.feature_of(token, "score").unwrap();

    cas.set_feature_value_from_string(token, pos, Some("NN")).unwrap();
    assert_eq!(cas.feature_value_as_string(token, pos).unwrap().as_deref(), Some("NN"));
    assert!(matches!(
      cas.set_feature_value_from_string(token, pos, Some("JJ")),
      Err(CasError::ValueNotAllowed { .. })
    ));

    assert!(matches!(
      cas.set_feature_value(token, score, Value::Integer(1)),
      Err(CasError::WrongValueKind { .. })
    ));
    cas.set_feature_value_from_string(token, score, Some("0.5")).unwrap();
    assert_eq!(cas.feature_value(token, score).unwrap(), Value::Double(0.5));

    assert!(matches!(cas.set_ref(token, next, Some(other)), Err(CasError::IncompatibleReference { .. })));
    cas.set_ref(token, next, Some(token)).unwrap();
    assert_eq!(cas.get_ref(token, next).unwrap(), Some(token));

    assert!(matches!(cas.feature_value(other, pos), Err(CasError::FeatureNotOnType { .. })));
    assert!(matches!(cas.feature_of(other, "pos"), Err(CasError::FeatureNotOnType { .. })));
  }

  #[test]
  fn uncreatable_types() {
    let mut cas = Cas::new(schema());
    for type_code in [SOFA, ARRAY_BASE, INTEGER_ARRAY, crate::core::type_system::builtins::INTEGER] {
      assert!(matches!(cas.create_fs(type_code), Err(CasError::NotCreatable { .. })));
    }
    assert!(matches!(cas.create_array(TOP, 2), Err(CasError::NotAnArray { .. })));
    assert!(matches!(cas.create_array(ARRAY_BASE, 2), Err(CasError::NotAnArray { .. })));
    let other_type = cas.type_by_name("org.example.Other").unwrap();
    assert!(matches!(cas.create_annotation(ViewId::INITIAL, other_type, 0, 0), Err(CasError::NotCreatable { .. })));
  }

  #[test]
  fn arrays() {
    let mut cas = Cas::new(schema());
    let numbers = cas.create_integer_array(vec![3, 1, 2]);
    assert_eq!(cas.type_of(numbers).unwrap(), INTEGER_ARRAY);
    assert_eq!(cas.array(numbers).unwrap().as_integers(), Some(&[3, 1, 2][..]));

    let words = cas.create_array(STRING_ARRAY, 2).unwrap();
    cas.array_mut(words).unwrap().set_from_string(1, Some("b")).unwrap();
    assert_eq!(cas.array(words).unwrap().get(1).unwrap(), Value::String(Some("b".to_string())));
    assert!(matches!(
      cas.set_array_element(words, 2, Value::String(None)),
      Err(CasError::ArrayIndexOutOfBounds { index: 2, length: 2 })
    ));
    assert!(matches!(
      cas.set_array_element(words, 0, Value::Integer(1)),
      Err(CasError::WrongElementKind { .. })
    ));

    let refs = cas.create_fs_array(vec![Some(numbers), None]).unwrap();
    assert_eq!(cas.heap().get(refs).unwrap().references(), vec![numbers]);
  }

  #[test]
  fn typed_reference_arrays_check_their_elements() {
    let mut ts = TypeSystemDescription::new();
    ts.add_type("org.example.Token", None, "uima.tcas.Annotation");
    ts.add_type("org.example.Other", None, "uima.cas.TOP");
    ts.add_type("org.example.Sentence", None, "uima.tcas.Annotation")
      .add_feature("tokens", None, "uima.cas.FSArray")
      .set_element_type("org.example.Token");
    let mut cas = Cas::new(CasSchema::new(CasDefinition::new(ts)).unwrap());

    let token_type    = cas.type_by_name("org.example.Token").unwrap();
    let other_type    = cas.type_by_name("org.example.Other").unwrap();
    let sentence_type = cas.type_by_name("org.example.Sentence").unwrap();
    let tokens_type   = cas.type_by_name("org.example.Token[]").unwrap();
    let token    = cas.create_annotation(ViewId::INITIAL, token_type, 0, 1).unwrap();
    let other    = cas.create_fs(other_type).unwrap();
    let sentence = cas.create_annotation(ViewId::INITIAL, sentence_type, 0, 1).unwrap();

    let tokens = cas.create_array(tokens_type, 2).unwrap();
    cas.set_array_element(tokens, 0, Value::Fs(Some(token))).unwrap();
    assert!(matches!(
      cas.set_array_element(tokens, 1, Value::Fs(Some(other))),
      Err(CasError::IncompatibleReference { .. })
    ));
    assert_eq!(cas.array(tokens).unwrap().get(1).unwrap(), Value::Fs(None));

    let feature = cas.feature_of(sentence, "tokens").unwrap();
    cas.set_ref(sentence, feature, Some(tokens)).unwrap();
    let untyped = cas.create_fs_array(vec![Some(other)]).unwrap();
    cas.set_ref(sentence, feature, Some(untyped)).unwrap();
    assert!(matches!(cas.set_ref(sentence, feature, Some(other)), Err(CasError::IncompatibleReference { .. })));
  }

  #[test]
  fn foreign_view_handles_are_errors() {
    let mut cas    = Cas::new(schema());
    let mut other  = Cas::new(schema());
    let foreign    = other.view_or_create("second");
    let token_type = cas.type_by_name("org.example.Token").unwrap();
    let records    = cas.heap().len();

    assert!(matches!(cas.set_document_text(foreign, "x"), Err(CasError::InvalidView(1))));
    assert!(matches!(cas.document_annotation(foreign), Err(CasError::InvalidView(1))));
    assert!(matches!(cas.create_annotation(foreign, token_type, 0, 1), Err(CasError::InvalidView(1))));
    assert!(matches!(cas.index(foreign, ANNOTATION_INDEX_LABEL), Err(CasError::InvalidView(1))));
    let token = cas.create_annotation(ViewId::INITIAL, token_type, 0, 1).unwrap();
    assert!(matches!(cas.add_fs_to_indexes(foreign, token), Err(CasError::InvalidView(1))));
    assert_eq!(cas.heap().len(), records + 1);
  }

  #[test]
  fn document_annotation_is_a_singleton() {
    let mut cas = Cas::new(schema());
    cas.set_document_text(ViewId::INITIAL, "hello world").unwrap();
    let document = cas.document_annotation(ViewId::INITIAL).unwrap();
    assert_eq!(cas.document_annotation(ViewId::INITIAL).unwrap(), document);
    assert!(cas.is_document_annotation(document));

    let end = cas.feature_of(document, "end").unwrap();
    assert_eq!(cas.feature_value(document, end).unwrap(), Value::Integer(11));
    assert_eq!(cas.index(ViewId::INITIAL, ANNOTATION_INDEX_LABEL).unwrap(), &[document]);
    assert_eq!(cas.document_text(ViewId::INITIAL), Some("hello world"));
    assert_eq!(cas.sofa_mime_type(ViewId::INITIAL), Some(DEFAULT_TEXT_MIME_TYPE));

    cas.set_document_language(ViewId::INITIAL, "en").unwrap();
    assert_eq!(cas.document_language(ViewId::INITIAL), Some("en"));
  }

  #[test]
  fn sofa_payloads_are_exclusive() {
    let mut cas = Cas::new(schema());
    cas.set_sofa_data_uri(ViewId::INITIAL, "file:/doc.txt", Some("text/plain")).unwrap();
    assert!(matches!(cas.set_document_text(ViewId::INITIAL, "x"), Err(CasError::SofaDataAlreadySet(_))));
    assert_eq!(cas.sofa_data_uri(ViewId::INITIAL), Some("file:/doc.txt"));

    let audio = cas.view_or_create("audio");
    let bytes = cas.create_byte_array(vec![1, 2, 3]);
    cas.set_sofa_data_array(audio, bytes, Some("audio/raw")).unwrap();
    assert_eq!(cas.sofa_data_array(audio), Some(bytes));
    assert!(cas.document_text(audio).is_none());
  }

  #[test]
  fn annotation_index_orders_by_begin_then_longer_first() {
    let mut cas    = Cas::new(schema());
    let token_type = cas.type_by_name("org.example.Token").unwrap();
    let view       = ViewId::INITIAL;
    let b          = cas.create_annotation(view, token_type, 5, 7).unwrap();
    let a_short    = cas.create_annotation(view, token_type, 0, 2).unwrap();
    let a_long     = cas.create_annotation(view, token_type, 0, 4).unwrap();
    for fs in [b, a_short, a_long] {
      cas.add_fs_to_indexes(view, fs).unwrap();
    }
    assert_eq!(cas.index(view, ANNOTATION_INDEX_LABEL).unwrap(), &[a_long, a_short, b]);
    assert_eq!(cas.all_indexed_fs(view), vec![b, a_short, a_long]);

    assert!(cas.remove_fs_from_indexes(view, a_short));
    assert!(!cas.is_indexed(view, a_short));
    assert!(matches!(cas.index(view, "Nope"), Err(CasError::UnknownIndex(_))));
  }

  #[test]
  fn reset_keeps_schema() {
    let schema  = schema();
    let mut cas = Cas::new(schema.clone());
    cas.view_or_create("other");
    cas.set_document_text(ViewId::INITIAL, "text").unwrap();
    cas.reset();

    assert_eq!(cas.view_count(), 1);
    assert!(cas.document_text(ViewId::INITIAL).is_none());
    assert!(cas.existing_document_annotation(ViewId::INITIAL).is_none());
    assert_eq!(cas.heap().len(), 1);
    assert!(std::sync::Arc::ptr_eq(cas.schema(), &schema));
  }
}
