/*!

The built-in types and features every type system starts with. They are created in a fixed order, so their codes are
the constants defined here.

| Code  | Type                                   | Flags                                    |
|:------|:---------------------------------------|:-----------------------------------------|
| 0     | `uima.cas.TOP`                         |                                          |
| 1-8   | the eight primitives                   | sealed, except `String` which can be subtyped |
| 9     | `uima.cas.ArrayBase`                   | abstract, feature final                  |
| 10-18 | `FSArray` and the primitive arrays     | sealed                                   |
| 19    | `uima.cas.Sofa`                        | sealed                                   |
| 20-22 | `AnnotationBase`, `Annotation`, `DocumentAnnotation` |                            |
| 23-35 | the list families                      | `ListBase` is abstract                   |

*/

use crate::core::type_system::{
  ArrayKind,
  FeatureCode,
  PrimitiveKind,
  TypeCode,
  TypeFlag,
  TypeFlags,
  TypeKind,
  TypeSystem
};

// Names

pub const TYPE_NAME_TOP                : &str = "uima.cas.TOP";
pub const TYPE_NAME_INTEGER            : &str = "uima.cas.Integer";
pub const TYPE_NAME_FLOAT              : &str = "uima.cas.Float";
pub const TYPE_NAME_STRING             : &str = "uima.cas.String";
pub const TYPE_NAME_BOOLEAN            : &str = "uima.cas.Boolean";
pub const TYPE_NAME_BYTE               : &str = "uima.cas.Byte";
pub const TYPE_NAME_SHORT              : &str = "uima.cas.Short";
pub const TYPE_NAME_LONG               : &str = "uima.cas.Long";
pub const TYPE_NAME_DOUBLE             : &str = "uima.cas.Double";
pub const TYPE_NAME_ARRAY_BASE         : &str = "uima.cas.ArrayBase";
pub const TYPE_NAME_FS_ARRAY           : &str = "uima.cas.FSArray";
pub const TYPE_NAME_INTEGER_ARRAY      : &str = "uima.cas.IntegerArray";
pub const TYPE_NAME_FLOAT_ARRAY        : &str = "uima.cas.FloatArray";
pub const TYPE_NAME_STRING_ARRAY       : &str = "uima.cas.StringArray";
pub const TYPE_NAME_BOOLEAN_ARRAY      : &str = "uima.cas.BooleanArray";
pub const TYPE_NAME_BYTE_ARRAY         : &str = "uima.cas.ByteArray";
pub const TYPE_NAME_SHORT_ARRAY        : &str = "uima.cas.ShortArray";
pub const TYPE_NAME_LONG_ARRAY         : &str = "uima.cas.LongArray";
pub const TYPE_NAME_DOUBLE_ARRAY       : &str = "uima.cas.DoubleArray";
pub const TYPE_NAME_SOFA               : &str = "uima.cas.Sofa";
pub const TYPE_NAME_ANNOTATION_BASE    : &str = "uima.cas.AnnotationBase";
pub const TYPE_NAME_ANNOTATION         : &str = "uima.tcas.Annotation";
pub const TYPE_NAME_DOCUMENT_ANNOTATION: &str = "uima.tcas.DocumentAnnotation";
pub const TYPE_NAME_LIST_BASE          : &str = "uima.cas.ListBase";

/// Namespaces whose types are always considered defined when merging.
pub const BUILT_IN_NAMESPACES: [&str; 2] = ["uima.cas", "uima.tcas"];

/// Name of the view every CAS starts with.
pub const INITIAL_VIEW_NAME: &str = "_InitialView";

/// Label of the built-in annotation index.
pub const ANNOTATION_INDEX_LABEL: &str = "AnnotationIndex";

// Codes

pub const TOP                : TypeCode = TypeCode(0);
pub const INTEGER            : TypeCode = TypeCode(1);
pub const FLOAT              : TypeCode = TypeCode(2);
pub const STRING             : TypeCode = TypeCode(3);
pub const BOOLEAN            : TypeCode = TypeCode(4);
pub const BYTE               : TypeCode = TypeCode(5);
pub const SHORT              : TypeCode = TypeCode(6);
pub const LONG               : TypeCode = TypeCode(7);
pub const DOUBLE             : TypeCode = TypeCode(8);
pub const ARRAY_BASE         : TypeCode = TypeCode(9);
pub const FS_ARRAY           : TypeCode = TypeCode(10);
pub const INTEGER_ARRAY      : TypeCode = TypeCode(11);
pub const FLOAT_ARRAY        : TypeCode = TypeCode(12);
pub const STRING_ARRAY       : TypeCode = TypeCode(13);
pub const BOOLEAN_ARRAY      : TypeCode = TypeCode(14);
pub const BYTE_ARRAY         : TypeCode = TypeCode(15);
pub const SHORT_ARRAY        : TypeCode = TypeCode(16);
pub const LONG_ARRAY         : TypeCode = TypeCode(17);
pub const DOUBLE_ARRAY       : TypeCode = TypeCode(18);
pub const SOFA               : TypeCode = TypeCode(19);
pub const ANNOTATION_BASE    : TypeCode = TypeCode(20);
pub const ANNOTATION         : TypeCode = TypeCode(21);
pub const DOCUMENT_ANNOTATION: TypeCode = TypeCode(22);
pub const LIST_BASE          : TypeCode = TypeCode(23);

pub const BUILT_IN_TYPE_COUNT: usize = 36;

pub const SOFA_NUM           : FeatureCode = FeatureCode(0);
pub const SOFA_ID            : FeatureCode = FeatureCode(1);
pub const SOFA_MIME          : FeatureCode = FeatureCode(2);
pub const SOFA_ARRAY         : FeatureCode = FeatureCode(3);
pub const SOFA_STRING        : FeatureCode = FeatureCode(4);
pub const SOFA_URI           : FeatureCode = FeatureCode(5);
pub const ANNOTATION_SOFA    : FeatureCode = FeatureCode(6);
pub const ANNOTATION_BEGIN   : FeatureCode = FeatureCode(7);
pub const ANNOTATION_END     : FeatureCode = FeatureCode(8);
pub const DOCUMENT_LANGUAGE  : FeatureCode = FeatureCode(9);

pub const BUILT_IN_FEATURE_COUNT: usize = 18;

/// Creates the built-in types and features in `type_system`, which must be empty.
pub(crate) fn populate(type_system: &mut TypeSystem) {
  let sealed        = TypeFlag::Sealed;
  let built_in      = TypeFlags::from(TypeFlag::BuiltIn);
  let feature_final = built_in | TypeFlag::FeatureFinal;

  let top = type_system.push_type(TYPE_NAME_TOP, None, TypeKind::Record, built_in);
  debug_assert_eq!(top, TOP);

  for (name, kind) in [
    (TYPE_NAME_INTEGER, PrimitiveKind::Integer),
    (TYPE_NAME_FLOAT,   PrimitiveKind::Float),
    (TYPE_NAME_STRING,  PrimitiveKind::String),
    (TYPE_NAME_BOOLEAN, PrimitiveKind::Boolean),
    (TYPE_NAME_BYTE,    PrimitiveKind::Byte),
    (TYPE_NAME_SHORT,   PrimitiveKind::Short),
    (TYPE_NAME_LONG,    PrimitiveKind::Long),
    (TYPE_NAME_DOUBLE,  PrimitiveKind::Double),
  ] {
    let flags = if kind == PrimitiveKind::String { feature_final } else { sealed };
    type_system.push_type(name, Some(TOP), TypeKind::Primitive(kind), flags);
  }

  let array_base = type_system.push_type(
    TYPE_NAME_ARRAY_BASE,
    Some(TOP),
    TypeKind::Record,
    feature_final | TypeFlag::Abstract
  );
  debug_assert_eq!(array_base, ARRAY_BASE);

  for (name, kind) in [
    (TYPE_NAME_FS_ARRAY,      ArrayKind::Fs { element: TOP }),
    (TYPE_NAME_INTEGER_ARRAY, ArrayKind::Integer),
    (TYPE_NAME_FLOAT_ARRAY,   ArrayKind::Float),
    (TYPE_NAME_STRING_ARRAY,  ArrayKind::String),
    (TYPE_NAME_BOOLEAN_ARRAY, ArrayKind::Boolean),
    (TYPE_NAME_BYTE_ARRAY,    ArrayKind::Byte),
    (TYPE_NAME_SHORT_ARRAY,   ArrayKind::Short),
    (TYPE_NAME_LONG_ARRAY,    ArrayKind::Long),
    (TYPE_NAME_DOUBLE_ARRAY,  ArrayKind::Double),
  ] {
    type_system.push_type(name, Some(ARRAY_BASE), TypeKind::Array(kind), sealed);
  }

  let sofa = type_system.push_type(TYPE_NAME_SOFA, Some(TOP), TypeKind::Record, sealed);
  debug_assert_eq!(sofa, SOFA);
  type_system.push_feature(SOFA, "sofaNum",    INTEGER, false);
  type_system.push_feature(SOFA, "sofaID",     STRING,  false);
  type_system.push_feature(SOFA, "mimeType",   STRING,  false);
  type_system.push_feature(SOFA, "sofaArray",  TOP,     false);
  type_system.push_feature(SOFA, "sofaString", STRING,  false);
  type_system.push_feature(SOFA, "sofaURI",    STRING,  false);

  type_system.push_type(TYPE_NAME_ANNOTATION_BASE, Some(TOP), TypeKind::Record, built_in);
  type_system.push_feature(ANNOTATION_BASE, "sofa", SOFA, false);

  type_system.push_type(TYPE_NAME_ANNOTATION, Some(ANNOTATION_BASE), TypeKind::Record, built_in);
  type_system.push_feature(ANNOTATION, "begin", INTEGER, false);
  type_system.push_feature(ANNOTATION, "end",   INTEGER, false);

  type_system.push_type(TYPE_NAME_DOCUMENT_ANNOTATION, Some(ANNOTATION), TypeKind::Record, built_in);
  let language = type_system.push_feature(DOCUMENT_ANNOTATION, "language", STRING, false);
  debug_assert_eq!(language, DOCUMENT_LANGUAGE);

  let list_base = type_system.push_type(
    TYPE_NAME_LIST_BASE,
    Some(TOP),
    TypeKind::Record,
    built_in | TypeFlag::Abstract
  );
  debug_assert_eq!(list_base, LIST_BASE);

  // Each list family: the list type, its empty and non-empty subtypes, and `head`/`tail` on the non-empty one.
  for (family, head_range) in [("FS", TOP), ("Integer", INTEGER), ("Float", FLOAT), ("String", STRING)] {
    let list      = type_system.push_type(&format!("uima.cas.{}List", family), Some(LIST_BASE), TypeKind::Record, built_in);
    type_system.push_type(&format!("uima.cas.Empty{}List", family), Some(list), TypeKind::Record, built_in);
    let non_empty = type_system.push_type(&format!("uima.cas.NonEmpty{}List", family), Some(list), TypeKind::Record, built_in);
    type_system.push_feature(non_empty, "head", head_range, false);
    type_system.push_feature(non_empty, "tail", list, false);
  }

  debug_assert_eq!(type_system.len(), BUILT_IN_TYPE_COUNT);
  debug_assert_eq!(type_system.feature_count(), BUILT_IN_FEATURE_COUNT);
}

/// Whether `name` lies in one of the built-in namespaces, `uima.cas` or `uima.tcas`.
pub fn in_built_in_namespace(name: &str) -> bool {
  name
      .rsplit_once('.')
      .map_or(false, |(namespace, _)| BUILT_IN_NAMESPACES.contains(&namespace))
}

/// The built-in array type holding elements of primitive kind `kind`.
pub fn primitive_array_type(kind: PrimitiveKind) -> TypeCode {
  match kind {
    PrimitiveKind::Boolean => BOOLEAN_ARRAY,
    PrimitiveKind::Byte    => BYTE_ARRAY,
    PrimitiveKind::Short   => SHORT_ARRAY,
    PrimitiveKind::Integer => INTEGER_ARRAY,
    PrimitiveKind::Long    => LONG_ARRAY,
    PrimitiveKind::Float   => FLOAT_ARRAY,
    PrimitiveKind::Double  => DOUBLE_ARRAY,
    PrimitiveKind::String  => STRING_ARRAY,
  }
}
