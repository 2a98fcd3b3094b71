/*!

The type model: types, features, the built-in types every type system starts with, and the builder through which a
type system is populated before it is committed.

A `TypeCode` or `FeatureCode` is only meaningful relative to the type system that issued it. Stores created from the
same committed type system share codes; across different type systems, types and features are matched by name.

*/

mod cas_type;
mod feature;
mod schema_error;
#[allow(clippy::module_inception)]
mod type_system;
pub mod builtins;

#[cfg(test)]
mod tests;

pub use cas_type::{
  ArrayKind,
  CasType,
  PrimitiveKind,
  TypeCode,
  TypeFlag,
  TypeFlags,
  TypeKind,
  ValueKind
};
pub use feature::{Feature, FeatureCode, FEATURE_SEPARATOR};
pub use schema_error::{SchemaError, UNKNOWN_LOCATION};
pub use type_system::{typed_array_name, RcTypeSystem, TypeSystem, TypeSystemBuilder};
