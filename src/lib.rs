/*!

A typed, multiply indexed store of feature structures.

 - `core`: type system descriptions, merging, installation, index definitions, and the committed `CasSchema`.
 - `api`: the store (`Cas`), copying between stores, and a pool of stores sharing one schema.
 - `serialization`: the XML and binary codecs, and format detection on load.

*/

pub mod abstractions;
pub mod api;
pub mod core;
pub mod serialization;

// Used by the logging macros.
#[doc(hidden)]
pub use tracing;

// We re-export abstractions that are meant to be used publicly.
pub use abstractions::{
  log,
  IString
};
