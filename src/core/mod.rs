/*!

The schema side of the library. Descriptions of types, priorities, and indexes come in; they are merged, installed into
a type system, and committed into an immutable `CasSchema` that any number of stores share.

| Stage        | Input                        | Output                           |
|:-------------|:-----------------------------|:---------------------------------|
| merge        | several `CasDefinition`s     | one `CasDefinition`              |
| install      | `CasDefinition`              | `TypeSystem`, order, index defs  |
| commit       | builders                     | `Arc<CasSchema>`                 |

Nothing in this module holds records. Records, views, and index contents live in `crate::api`.

*/

pub mod description;
pub mod index;
pub mod install;
pub mod merge;
pub mod schema;
pub mod schema_cache;
pub mod type_system;

// Reexports to flatten some of the smaller modules
pub use description::{
  AllowedValue,
  CasDefinition,
  FeatureDescription,
  FsIndexCollection,
  FsIndexDescription,
  FsIndexKey,
  IndexKind,
  SortDirection,
  TypeDescription,
  TypePriorities,
  TypePriorityList,
  TypeSystemDescription
};
pub use merge::{merge_fs_indexes, merge_type_priorities, merge_type_systems, MergedTypeReport};
pub use schema::{create_cas, CasSchema, RcCasSchema};
pub use schema_cache::SchemaCache;
