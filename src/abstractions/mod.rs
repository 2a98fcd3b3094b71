/*!

Types/type aliases that abstract over the implementing backing type.

A motivating example is the interned string type `IString` used for every type and feature name. A number of external
crates could provide this functionality. This module redirects to whatever chosen implementation we want, so the rest
of the crate never names the backing crate directly.

*/

mod nat_set;
mod string_join;

// Logging
pub mod log;

// A set of natural numbers, used for record handle and type code sets
pub use nat_set::NatSet;

// Interned string.
pub use string_cache::DefaultAtom as IString;

// Join sequences with a separator
pub use string_join::{join_iter, join_string, join_quoted};

// Hash maps keyed by interned names or handles. Indirection so we can swap the hasher.
pub type HashMap<K, V> = std::collections::HashMap<K, V>;
pub type HashSet<K>    = std::collections::HashSet<K>;
