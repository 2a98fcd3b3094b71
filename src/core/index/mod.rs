/*!

Indexes and type priorities. The `LinearTypeOrderBuilder` turns priority lists into a `LinearTypeOrder`;
`FsIndexComparator`s order records by feature keys and the type order; each view's `IndexRepository` keeps the members
of every index defined by the schema.

*/

mod comparator;
mod repository;
mod type_order;

pub use comparator::{FsIndexComparator, FsIndexDefinition, IndexKey};
pub use repository::IndexRepository;
pub use type_order::{LinearTypeOrder, LinearTypeOrderBuilder, TypeOrderError};
