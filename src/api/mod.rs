/*!

The store side of the library: records, views, and index contents over a shared `CasSchema`, plus copying between
stores and pooling them.

*/

pub mod cas;
pub mod cas_error;
pub mod copier;
pub mod heap;
pub mod pool;
pub mod value;
pub mod view;

// Reexports to flatten some of the smaller modules
pub use cas::{Cas, DEFAULT_TEXT_MIME_TYPE};
pub use cas_error::CasError;
pub use copier::{copy_cas, CasCopier, CopyError};
pub use heap::{FsData, FsRecord, FsRef, Heap};
pub use pool::CasPool;
pub use value::{ArrayData, Value};
pub use view::ViewId;
