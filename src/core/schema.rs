/*!

A `CasSchema` is everything a store needs besides its records: the committed type system, the linear type order, and
the index definitions, together with the `CasDefinition` they were installed from. A schema is immutable and shared by
reference among all stores created from it.

*/

use std::sync::Arc;

use crate::{
  abstractions::{HashMap, IString},
  api::Cas,
  core::{
    description::{CasDefinition, FsIndexCollection, FsIndexDescription, FsIndexKey, IndexKind, SortDirection},
    index::{FsIndexDefinition, LinearTypeOrder, LinearTypeOrderBuilder},
    install::{install_indexes, install_type_priorities, install_type_system},
    type_system::{
      builtins::{ANNOTATION_INDEX_LABEL, TYPE_NAME_ANNOTATION},
      RcTypeSystem,
      SchemaError,
      TypeSystem
    },
  },
  debug,
};

pub type RcCasSchema = Arc<CasSchema>;

#[derive(Debug)]
pub struct CasSchema {
  type_system : RcTypeSystem,
  type_order  : LinearTypeOrder,
  indexes     : Vec<FsIndexDefinition>,
  index_labels: HashMap<IString, usize>,
  definition  : CasDefinition,
}

impl CasSchema {
  /// Installs `definition` into a fresh type system.
  pub fn new(definition: CasDefinition) -> Result<RcCasSchema, SchemaError> {
    let mut builder = TypeSystem::builder();
    install_type_system(&mut builder, &definition.type_system)?;
    let type_system = builder.commit();
    CasSchema::with_type_system(type_system, definition)
  }

  /// Builds a schema over an already committed type system. The type system must contain every type the priorities
  /// and indexes of `definition` name.
  pub fn with_type_system(type_system: RcTypeSystem, definition: CasDefinition) -> Result<RcCasSchema, SchemaError> {
    let mut order_builder = LinearTypeOrderBuilder::new(type_system.clone());
    install_type_priorities(&type_system, &mut order_builder, &definition.type_priorities)?;
    let type_order = order_builder.order();

    let mut indexes = install_indexes(&type_system, &definition.indexes)?;
    if !indexes.iter().any(|index| &*index.label == ANNOTATION_INDEX_LABEL) {
      let annotation_index = install_indexes(&type_system, &annotation_index_collection())?;
      indexes.extend(annotation_index);
    }

    let index_labels = indexes
        .iter()
        .enumerate()
        .map(|(position, index)| (index.label.clone(), position))
        .collect();

    debug!(
      2,
      "installed schema with {} types and {} indexes",
      type_system.len(),
      indexes.len()
    );

    Ok(Arc::new(CasSchema {
      type_system,
      type_order,
      indexes,
      index_labels,
      definition,
    }))
  }

  /// Merges `definitions` and installs the result.
  pub fn from_definitions(definitions: &[CasDefinition]) -> Result<RcCasSchema, SchemaError> {
    let merged = CasDefinition::merge(definitions, None)?;
    CasSchema::new(merged)
  }

  /// A schema with only the built-in types and the annotation index.
  pub fn built_in() -> RcCasSchema {
    let definition = CasDefinition::default();
    match CasSchema::with_type_system(TypeSystem::built_in(), definition) {
      Ok(schema) => schema,
      // The built-in annotation index only names built-in types.
      Err(error) => unreachable!("built-in schema failed to install: {}", error),
    }
  }

  pub fn type_system(&self) -> &RcTypeSystem {
    &self.type_system
  }

  pub fn type_order(&self) -> &LinearTypeOrder {
    &self.type_order
  }

  pub fn index_definitions(&self) -> &[FsIndexDefinition] {
    &self.indexes
  }

  pub fn index_position(&self, label: &str) -> Option<usize> {
    self.index_labels.get(&IString::from(label)).copied()
  }

  /// Index labels in definition order.
  pub fn labels(&self) -> impl Iterator<Item = &str> {
    self.indexes.iter().map(|index| &*index.label)
  }

  /// The definition this schema was installed from.
  pub fn definition(&self) -> &CasDefinition {
    &self.definition
  }
}

/// The index every store has over annotations: by begin ascending, end descending, then type priority.
fn annotation_index_collection() -> FsIndexCollection {
  FsIndexCollection {
    indexes: vec![
      FsIndexDescription::new(ANNOTATION_INDEX_LABEL, TYPE_NAME_ANNOTATION, Some(IndexKind::Sorted))
          .with_key(FsIndexKey::feature("begin", SortDirection::Standard))
          .with_key(FsIndexKey::feature("end", SortDirection::Reverse))
          .with_key(FsIndexKey::TypePriority),
    ],
    source_url: None,
  }
}

/// Merges `definitions`, installs the result, and creates a store over it. Types whose supertype is never defined
/// are an error here, even though merging alone tolerates them.
pub fn create_cas(definitions: &[CasDefinition]) -> Result<Cas, SchemaError> {
  let schema = CasSchema::from_definitions(definitions)?;
  Ok(Cas::new(schema))
}
