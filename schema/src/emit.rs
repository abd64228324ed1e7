//! The seam between the compiled schema model and a target-language back end.
//!
//! Field types answer the four per-element emission questions as data-only
//! [`Fragment`] descriptors; turning a descriptor into target-language source
//! is entirely the back end's business. A back end additionally registers one
//! runtime helper per field-type kind that needs one (integers, enums/flags,
//! records, serializers) through the [`Backend`] trait.

use std::rc::Rc;

use crate::registry::{EnumId, RecordId, Registry};
use crate::types::{Conditional, Field, FieldType, IntType, IntWidth, Union};

/// Data-only description of the wire operation that applies to one element.
/// Multi-byte integers are big-endian throughout.
#[derive(Debug, Clone)]
pub enum Fragment {
    /// Big-endian two's-complement integer of the given width.
    Int { width: IntWidth, signed: bool },
    /// A single-byte ASCII character.
    Ascii,
    /// An integer of the definition's underlying width, mapped through the
    /// definition's named values or bit positions.
    Enum {
        def: EnumId,
        width: IntWidth,
        signed: bool,
        flags: bool,
    },
    /// Delegate to the referenced record's own routines.
    Record { def: RecordId },
    /// An unsigned length prefix followed by an opaque externally serialized
    /// payload of that many bytes.
    Opaque { prefix: IntWidth },
    /// Evaluate the condition, then run one branch's fields in order. The
    /// branches' field lists are carried so the back end can recurse.
    Conditional(Rc<Conditional>),
    /// Evaluate the discriminant, then run the matching arm's fields in order.
    Union(Rc<Union>),
}

impl FieldType {
    /// Descriptor for serializing one element.
    pub fn serialize_op(&self, registry: &Registry) -> Fragment {
        match self {
            FieldType::Int(ty) => Fragment::Int {
                width: ty.width,
                signed: ty.signed,
            },
            FieldType::Ascii => Fragment::Ascii,
            FieldType::Enum(id) => enum_fragment(registry, *id),
            FieldType::Record(id) => Fragment::Record { def: *id },
            FieldType::Serializer { prefix } => Fragment::Opaque { prefix: *prefix },
            FieldType::Conditional(cond) => Fragment::Conditional(Rc::clone(cond)),
            FieldType::Union(union) => Fragment::Union(Rc::clone(union)),
        }
    }

    /// Descriptor for deserializing one element of known position.
    pub fn deserialize_op(&self, registry: &Registry) -> Fragment {
        match self {
            FieldType::Int(ty) => Fragment::Int {
                width: ty.width,
                signed: ty.signed,
            },
            FieldType::Ascii => Fragment::Ascii,
            FieldType::Enum(id) => enum_fragment(registry, *id),
            FieldType::Record(id) => Fragment::Record { def: *id },
            FieldType::Serializer { prefix } => Fragment::Opaque { prefix: *prefix },
            FieldType::Conditional(cond) => Fragment::Conditional(Rc::clone(cond)),
            FieldType::Union(union) => Fragment::Union(Rc::clone(union)),
        }
    }

    /// Descriptor for deserializing a whole array of elements in one block
    /// read, or `None` when the element stride is not statically fixed and the
    /// back end must loop element by element instead.
    pub fn bulk_deserialize_op(&self, registry: &Registry) -> Option<Fragment> {
        match self {
            FieldType::Int(ty) => Some(Fragment::Int {
                width: ty.width,
                signed: ty.signed,
            }),
            FieldType::Ascii => Some(Fragment::Ascii),
            FieldType::Enum(id) => Some(enum_fragment(registry, *id)),
            FieldType::Record(id) => {
                if registry.record(*id).wire_size().is_fixed() {
                    Some(Fragment::Record { def: *id })
                } else {
                    None
                }
            }
            FieldType::Serializer { .. } => None,
            FieldType::Conditional(_) => None,
            FieldType::Union(_) => None,
        }
    }

    /// Descriptor for rendering one element as debug text.
    pub fn display_op(&self, registry: &Registry) -> Fragment {
        match self {
            FieldType::Int(ty) => Fragment::Int {
                width: ty.width,
                signed: ty.signed,
            },
            FieldType::Ascii => Fragment::Ascii,
            FieldType::Enum(id) => enum_fragment(registry, *id),
            FieldType::Record(id) => Fragment::Record { def: *id },
            FieldType::Serializer { prefix } => Fragment::Opaque { prefix: *prefix },
            FieldType::Conditional(cond) => Fragment::Conditional(Rc::clone(cond)),
            FieldType::Union(union) => Fragment::Union(Rc::clone(union)),
        }
    }
}

fn enum_fragment(registry: &Registry, id: EnumId) -> Fragment {
    let def = registry.enum_def(id);
    Fragment::Enum {
        def: id,
        width: def.underlying.width,
        signed: def.underlying.signed,
        flags: def.is_flags(),
    }
}

/// A code-generation back end. Supplies one instance-serializer construction
/// hook per field-type kind that registers a runtime helper; the schema model
/// remains the single source of wire-layout facts.
pub trait Backend {
    type Helper;

    fn integer_helper(&mut self, ty: IntType) -> Self::Helper;
    fn enum_helper(&mut self, registry: &Registry, def: EnumId) -> Self::Helper;
    fn record_helper(&mut self, registry: &Registry, def: RecordId) -> Self::Helper;
    fn serializer_helper(&mut self, prefix: IntWidth) -> Self::Helper;
}

/// Walk `fields` depth-first in declaration order, descending into conditional
/// branches and union arms, and construct a helper for every field whose kind
/// registers one. The traversal order is deterministic, so a back end can line
/// helpers up with its own walk of the same field list.
pub fn collect_helpers<B: Backend>(
    registry: &Registry,
    fields: &[Rc<Field>],
    backend: &mut B,
    out: &mut Vec<B::Helper>,
) {
    for field in fields {
        match &field.ty {
            FieldType::Int(ty) => out.push(backend.integer_helper(*ty)),
            // ASCII text reads byte-for-byte and needs no registered helper.
            FieldType::Ascii => {}
            FieldType::Enum(id) => out.push(backend.enum_helper(registry, *id)),
            FieldType::Record(id) => out.push(backend.record_helper(registry, *id)),
            FieldType::Serializer { prefix } => out.push(backend.serializer_helper(*prefix)),
            FieldType::Conditional(cond) => {
                collect_helpers(registry, cond.then_fields.fields(), backend, out);
                if let Some(else_fields) = &cond.else_fields {
                    collect_helpers(registry, else_fields.fields(), backend, out);
                }
            }
            FieldType::Union(union) => {
                for arm in &union.arms {
                    collect_helpers(registry, arm.fields.fields(), backend, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::EnumKind;
    use crate::types::{FieldList, WireSize};

    struct NameBackend;

    impl Backend for NameBackend {
        type Helper = String;

        fn integer_helper(&mut self, ty: IntType) -> String {
            format!("int:{}", ty.keyword())
        }

        fn enum_helper(&mut self, registry: &Registry, def: EnumId) -> String {
            format!("enum:{}", registry.enum_def(def).qualified_name())
        }

        fn record_helper(&mut self, registry: &Registry, def: RecordId) -> String {
            format!("record:{}", registry.record(def).qualified_name())
        }

        fn serializer_helper(&mut self, prefix: IntWidth) -> String {
            format!("serializer:{}", prefix.bytes())
        }
    }

    fn int(word: &str) -> FieldType {
        FieldType::Int(IntType::from_keyword(word).unwrap())
    }

    #[test]
    fn test_fragments_carry_wire_facts() {
        let mut registry = Registry::new();
        let color = registry
            .register_enum(
                "Color",
                None,
                IntType::from_keyword("UInt16").unwrap(),
                EnumKind::Values(Vec::new()),
            )
            .unwrap();

        match FieldType::Enum(color).serialize_op(&registry) {
            Fragment::Enum {
                width,
                signed,
                flags,
                ..
            } => {
                assert_eq!(width.bytes(), 2);
                assert!(!signed);
                assert!(!flags);
            }
            other => panic!("unexpected fragment {:?}", other),
        }

        match int("Int24").deserialize_op(&registry) {
            Fragment::Int { width, signed } => {
                assert_eq!(width.bytes(), 3);
                assert!(signed);
            }
            other => panic!("unexpected fragment {:?}", other),
        }
    }

    #[test]
    fn test_bulk_read_only_for_fixed_strides() {
        let mut registry = Registry::new();
        let fixed = registry.declare_record("Fixed", None).unwrap();
        registry.seal_record(fixed, vec![Rc::new(Field::named(int("UInt32"), "v", 1))]);
        assert_eq!(registry.record(fixed).wire_size(), WireSize::Fixed(4));

        let open = registry.declare_record("Dyn", None).unwrap();
        registry.seal_record(
            open,
            vec![Rc::new(Field::named(
                FieldType::Serializer { prefix: IntWidth::W2 },
                "blob",
                1,
            ))],
        );

        assert!(FieldType::Record(fixed).bulk_deserialize_op(&registry).is_some());
        assert!(FieldType::Record(open).bulk_deserialize_op(&registry).is_none());
        assert!(int("Byte").bulk_deserialize_op(&registry).is_some());
        assert!(FieldType::Serializer { prefix: IntWidth::W1 }
            .bulk_deserialize_op(&registry)
            .is_none());
    }

    #[test]
    fn test_collect_helpers_descends_into_branches() {
        let registry = Registry::new();
        let then_fields = FieldList::seal(
            vec![Rc::new(Field::named(int("Byte"), "a", 2))],
            &registry,
        );
        let else_fields = FieldList::seal(
            vec![Rc::new(Field::named(int("UInt16"), "b", 4))],
            &registry,
        );
        let cond = Rc::new(Conditional {
            condition: "HasPayload".to_string(),
            then_fields,
            else_fields: Some(else_fields),
        });

        let fields = vec![
            Rc::new(Field::named(int("UInt32"), "header", 1)),
            Rc::new(Field::anonymous(FieldType::Conditional(cond), 2)),
        ];

        let mut backend = NameBackend;
        let mut helpers = Vec::new();
        collect_helpers(&registry, &fields, &mut backend, &mut helpers);
        assert_eq!(helpers, vec!["int:UInt32", "int:Byte", "int:UInt16"]);
    }
}
