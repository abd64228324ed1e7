//! Schema model for the wiregen compiler.
//!
//! The compiler front end populates a [`Registry`] with enumeration/flag-set
//! and record definitions; code-generation back ends consume the registry
//! read-only through the emission contract in [`emit`].
//!
//! ```
//! use std::rc::Rc;
//! use wiregen_schema::*;
//!
//! let mut registry = Registry::new();
//! let point = registry.declare_record("Point", None).unwrap();
//! registry.seal_record(point, vec![
//!     Rc::new(Field::named(FieldType::Int(IntType::from_keyword("Int16").unwrap()), "x", 1)),
//!     Rc::new(Field::named(FieldType::Int(IntType::from_keyword("Int16").unwrap()), "y", 2)),
//! ]);
//! assert_eq!(registry.record(point).wire_size(), WireSize::Fixed(4));
//! ```

pub mod defs;
pub mod emit;
pub mod registry;
pub mod types;

pub use defs::{EnumDef, EnumKind, EnumValue, FlagBit, NestedDef, RecordDef};
pub use emit::{collect_helpers, Backend, Fragment};
pub use registry::{DuplicateName, EnumId, RecordId, Registry};
pub use types::{
    resolve_wire_size, ArrayPolicy, Conditional, Field, FieldList, FieldType, IntType, IntWidth,
    Union, UnionArm, UnionCase, WireSize,
};
