use std::fmt::{Display, Formatter};

use crate::{
  abstractions::IString,
  api::FsRef,
  core::index::IndexRepository,
};

/// A handle to a view of a store. `ViewId(0)` is always the initial view. A handle is only meaningful for the store
/// that issued it.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct ViewId(pub u32);

impl ViewId {
  pub const INITIAL: ViewId = ViewId(0);

  #[inline(always)]
  pub fn idx(self) -> usize {
    self.0 as usize
  }
}

impl Display for ViewId {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "view#{}", self.0)
  }
}

/// A named subject of analysis: its sofa record, its document annotation once created, and its index contents.
#[derive(Clone, Debug)]
pub(crate) struct View {
  pub name               : IString,
  pub sofa               : FsRef,
  pub document_annotation: Option<FsRef>,
  pub indexes            : IndexRepository,
}

impl View {
  pub fn new(name: IString, sofa: FsRef, index_count: usize) -> View {
    View {
      name,
      sofa,
      document_annotation: None,
      indexes            : IndexRepository::new(index_count),
    }
  }
}
