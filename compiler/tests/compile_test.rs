#![cfg(test)]

use std::rc::Rc;

use wiregen_compiler::{compile_schema, compile_sources, CompileError};
use wiregen_schema::{
    ArrayPolicy, EnumKind, FieldType, IntWidth, Registry, UnionCase, WireSize,
};

#[test]
fn test_compile_enum_and_record() {
    let input = r#"
enum Byte Color {
Red 0
Green 1
Blue 2
}
Pixel {
Color color
Byte intensity
}
"#;

    let registry = compile_sources([input]).expect("compile failed");

    let (color_id, color) = registry.enums().next().expect("enum missing");
    assert_eq!(color.name(), "Color");
    assert_eq!(color.qualified_name(), "color");
    assert_eq!(color.underlying.width.bytes(), 1);
    assert!(!color.is_flags());
    match &color.kind {
        EnumKind::Values(values) => {
            assert_eq!(values.len(), 3);
            assert_eq!(values[0].name, "Red");
            assert_eq!(values[0].value, "0");
            assert_eq!(values[1].name, "Green");
            assert_eq!(values[2].name, "Blue");
            assert_eq!(values[2].value, "2");
        }
        other => panic!("expected values, got {:?}", other),
    }

    let (_, pixel) = registry.records().next().expect("record missing");
    assert_eq!(pixel.name(), "Pixel");
    assert_eq!(pixel.wire_size(), WireSize::Fixed(2));
    let fields = pixel.fields();
    assert_eq!(fields.len(), 2);
    assert_eq!(fields[0].name.as_deref(), Some("color"));
    match fields[0].ty {
        FieldType::Enum(id) => assert_eq!(id, color_id),
        ref other => panic!("expected enum reference, got {:?}", other),
    }
    assert_eq!(fields[1].name.as_deref(), Some("intensity"));
    match fields[1].ty {
        FieldType::Int(ty) => {
            assert!(!ty.signed);
            assert_eq!(ty.width.bytes(), 1);
        }
        ref other => panic!("expected integer, got {:?}", other),
    }
}

#[test]
fn test_fixed_size_is_hand_computed_sum() {
    let registry = compile_sources([r#"
Header {
Byte version
UInt24 length
UInt16[4] tags
ascii[8] label
}
"#])
    .expect("compile failed");

    let (_, header) = registry.records().next().unwrap();
    assert_eq!(header.wire_size(), WireSize::Fixed(1 + 3 + 8 + 8));
}

#[test]
fn test_prefixed_array_anywhere_makes_record_unbounded() {
    let registry = compile_sources([r#"
A {
Byte[UInt16] payload
Byte after
}
B {
Byte before
Byte[UInt16] payload
}
C {
Byte[] rest
}
"#])
    .expect("compile failed");

    for (_, record) in registry.records() {
        assert_eq!(record.wire_size(), WireSize::Unbounded, "{}", record.name());
    }
}

#[test]
fn test_array_suffix_forms() {
    let registry = compile_sources([r#"
Shapes {
Byte[3] fixed
Byte[UInt32] prefixed
Byte[] external
}
"#])
    .expect("compile failed");

    let (_, shapes) = registry.records().next().unwrap();
    let fields = shapes.fields();
    assert_eq!(fields[0].array, Some(ArrayPolicy::Fixed(3)));
    assert_eq!(fields[1].array, Some(ArrayPolicy::Prefixed(IntWidth::W4)));
    assert_eq!(fields[2].array, Some(ArrayPolicy::External));
}

#[test]
fn test_flags_directive() {
    let registry = compile_sources([r#"
flags UInt32 Permissions {
0 Read
1 Write
4 Admin
}
"#])
    .expect("compile failed");

    let (_, perms) = registry.enums().next().unwrap();
    assert!(perms.is_flags());
    assert_eq!(perms.underlying.width.bytes(), 4);
    match &perms.kind {
        EnumKind::Flags(bits) => {
            assert_eq!(bits.len(), 3);
            assert_eq!(bits[0].bit, 0);
            assert_eq!(bits[0].name, "Read");
            assert_eq!(bits[2].bit, 4);
            assert_eq!(bits[2].name, "Admin");
        }
        other => panic!("expected flags, got {:?}", other),
    }
}

#[test]
fn test_nested_enum_shadows_global() {
    let registry = compile_sources([r#"
enum Byte Kind {
Global 0
}
Message {
enum Byte Kind {
Local 0
}
Kind kind
}
"#])
    .expect("compile failed");

    let (message_id, message) = registry.records().next().unwrap();
    let local = registry.resolve_enum(Some(message_id), "Kind").unwrap();
    assert_eq!(registry.enum_def(local).qualified_name(), "message.kind");

    // The field picked up the local definition.
    match message.fields()[0].ty {
        FieldType::Enum(id) => assert_eq!(id, local),
        ref other => panic!("expected enum reference, got {:?}", other),
    }

    // From outside, the bare name is the global; only the dotted name reaches
    // the nested definition.
    let global = registry.resolve_enum(None, "Kind").unwrap();
    assert_eq!(registry.enum_def(global).qualified_name(), "kind");
    assert_ne!(global, local);
    assert_eq!(registry.resolve_enum(None, "message.kind"), Some(local));
}

#[test]
fn test_object_field_declares_nested_record() {
    let registry = compile_sources([r#"
Envelope {
object Body {
UInt16 length
}
Byte terminator
}
"#])
    .expect("compile failed");

    let (envelope_id, _) = registry.records().next().unwrap();
    let body = registry.resolve_record(Some(envelope_id), "Body").unwrap();
    assert_eq!(registry.record(body).qualified_name(), "envelope.body");
    assert_eq!(registry.record(body).wire_size(), WireSize::Fixed(2));

    let envelope = registry.record(envelope_id);
    assert_eq!(envelope.wire_size(), WireSize::Fixed(3));
    assert_eq!(envelope.fields()[0].name.as_deref(), Some("Body"));
    match envelope.fields()[0].ty {
        FieldType::Record(id) => assert_eq!(id, body),
        ref other => panic!("expected record reference, got {:?}", other),
    }
}

#[test]
fn test_record_inclusion_shares_field_objects() {
    let registry = compile_sources([r#"
Base {
UInt16 id
Byte flags
}
Extended {
Base
UInt32 extra
}
"#])
    .expect("compile failed");

    let mut records = registry.records();
    let (_, base) = records.next().unwrap();
    let (_, extended) = records.next().unwrap();

    assert_eq!(extended.fields().len(), 3);
    assert!(Rc::ptr_eq(&extended.fields()[0], &base.fields()[0]));
    assert!(Rc::ptr_eq(&extended.fields()[1], &base.fields()[1]));
    assert_eq!(extended.wire_size(), WireSize::Fixed(2 + 1 + 4));
}

#[test]
fn test_record_reference_field() {
    let registry = compile_sources([r#"
Point {
Int16 x
Int16 y
}
Line {
Point a
Point b
Point[4] corners
}
"#])
    .expect("compile failed");

    let (_, line) = registry.records().nth(1).unwrap();
    assert_eq!(line.wire_size(), WireSize::Fixed(4 + 4 + 16));
    assert_eq!(line.fields()[2].array, Some(ArrayPolicy::Fixed(4)));
}

#[test]
fn test_serializer_field() {
    let registry = compile_sources([r#"
Wrapper {
serializer UInt16 blob
Byte tail
}
"#])
    .expect("compile failed");

    let (_, wrapper) = registry.records().next().unwrap();
    assert_eq!(wrapper.wire_size(), WireSize::Unbounded);
    match wrapper.fields()[0].ty {
        FieldType::Serializer { prefix } => assert_eq!(prefix, IntWidth::W2),
        ref other => panic!("expected serializer, got {:?}", other),
    }
}

#[test]
fn test_conditional_branches_have_own_sizes() {
    let registry = compile_sources([r#"
Packet {
Byte kind
if HasBody {
UInt32 body
Byte[UInt16] extra
}
else {
Byte pad
}
}
"#])
    .expect("compile failed");

    let (_, packet) = registry.records().next().unwrap();
    assert_eq!(packet.wire_size(), WireSize::Unbounded);

    let cond = match &packet.fields()[1].ty {
        FieldType::Conditional(cond) => cond,
        other => panic!("expected conditional, got {:?}", other),
    };
    assert_eq!(cond.condition, "HasBody");
    assert!(packet.fields()[1].name.is_none());
    assert_eq!(cond.then_fields.wire_size(), WireSize::Unbounded);
    assert_eq!(cond.then_fields.fields().len(), 2);
    let else_fields = cond.else_fields.as_ref().unwrap();
    assert_eq!(else_fields.wire_size(), WireSize::Fixed(1));
}

#[test]
fn test_conditional_without_else() {
    let registry = compile_sources([r#"
Packet {
Byte kind
if HasBody {
UInt32 body
}
Byte tail
}
"#])
    .expect("compile failed");

    let (_, packet) = registry.records().next().unwrap();
    assert_eq!(packet.fields().len(), 3);

    let cond = match &packet.fields()[1].ty {
        FieldType::Conditional(cond) => cond,
        other => panic!("expected conditional, got {:?}", other),
    };
    assert_eq!(cond.condition, "HasBody");
    assert_eq!(cond.then_fields.wire_size(), WireSize::Fixed(4));
    assert!(cond.else_fields.is_none());

    // The field after the true branch belongs to the record, not the branch.
    assert_eq!(packet.fields()[2].name.as_deref(), Some("tail"));
}

#[test]
fn test_switch_arms_in_declaration_order() {
    let registry = compile_sources([r#"
Frame {
Byte opcode
switch opcode {
case 1 {
UInt16 ping
}
case 2 {
UInt32 pong
}
default {
Byte[UInt16] raw
}
}
}
"#])
    .expect("compile failed");

    let (_, frame) = registry.records().next().unwrap();
    assert_eq!(frame.wire_size(), WireSize::Unbounded);

    let union = match &frame.fields()[1].ty {
        FieldType::Union(union) => union,
        other => panic!("expected union, got {:?}", other),
    };
    assert_eq!(union.discriminant, "opcode");
    assert_eq!(union.arms.len(), 3);
    assert_eq!(union.arms[0].case, UnionCase::Value("1".to_string()));
    assert_eq!(union.arms[0].fields.wire_size(), WireSize::Fixed(2));
    assert_eq!(union.arms[1].case, UnionCase::Value("2".to_string()));
    assert_eq!(union.arms[2].case, UnionCase::Default);
    assert_eq!(union.arms[2].fields.wire_size(), WireSize::Unbounded);
}

#[test]
fn test_later_sources_see_earlier_definitions() {
    let registry = compile_sources([
        "enum Byte Color {\nRed 0\n}\n",
        "Pixel {\nColor color\n}\n",
    ])
    .expect("compile failed");

    let (_, pixel) = registry.records().next().unwrap();
    assert_eq!(pixel.wire_size(), WireSize::Fixed(1));
}

#[test]
fn test_duplicate_definition_is_schema_error() {
    let err = compile_sources(["A {\nByte x\n}\na {\nByte y\n}\n"]).unwrap_err();
    assert!(matches!(err, CompileError::Schema { line: 4, .. }), "{:?}", err);
}

#[test]
fn test_unknown_type_is_schema_error() {
    let err = compile_sources(["A {\nMystery x\n}\n"]).unwrap_err();
    assert!(matches!(err, CompileError::Schema { line: 2, .. }), "{:?}", err);
}

#[test]
fn test_wrong_field_count_is_schema_error() {
    let err = compile_sources(["A {\nByte x y\n}\n"]).unwrap_err();
    assert!(matches!(err, CompileError::Schema { line: 2, .. }), "{:?}", err);
}

#[test]
fn test_non_numeric_bit_index_is_schema_error() {
    let err = compile_sources(["flags Byte F {\nRead 0\n}\n"]).unwrap_err();
    assert!(matches!(err, CompileError::Schema { line: 2, .. }), "{:?}", err);
}

#[test]
fn test_numeral_where_prefix_keyword_required() {
    let err = compile_sources(["A {\nserializer 2 blob\n}\n"]).unwrap_err();
    assert!(matches!(err, CompileError::Schema { line: 2, .. }), "{:?}", err);
}

#[test]
fn test_huge_fixed_counts_do_not_overflow_the_size() {
    let registry = compile_sources([r#"
A {
UInt64[4611686018427387903] a
UInt64[4611686018427387903] b
}
"#])
    .expect("compile failed");

    // The byte total does not fit in usize; the record degrades to unbounded
    // instead of freezing a wrapped size.
    let (_, a) = registry.records().next().unwrap();
    assert_eq!(a.wire_size(), WireSize::Unbounded);
}

#[test]
fn test_array_suffix_on_definition_directive_rejected() {
    let err = compile_sources(["A {\nenum[4] Byte X {\nOn 0\n}\n}\n"]).unwrap_err();
    assert!(matches!(err, CompileError::Schema { line: 2, .. }), "{:?}", err);

    let err = compile_sources(["A {\nflags[2] Byte F {\n0 On\n}\n}\n"]).unwrap_err();
    assert!(matches!(err, CompileError::Schema { line: 2, .. }), "{:?}", err);
}

#[test]
fn test_signed_width_cannot_prefix_an_array() {
    let err = compile_sources(["A {\nByte[Int16] xs\n}\n"]).unwrap_err();
    assert!(matches!(err, CompileError::Schema { line: 2, .. }), "{:?}", err);
}

#[test]
fn test_malformed_array_suffix() {
    let err = compile_sources(["A {\nByte[foo] xs\n}\n"]).unwrap_err();
    assert!(matches!(err, CompileError::Schema { line: 2, .. }), "{:?}", err);
}

#[test]
fn test_enum_underlying_must_be_integer_kind() {
    let err = compile_sources(["enum ascii Color {\nRed 0\n}\n"]).unwrap_err();
    assert!(matches!(err, CompileError::Schema { line: 1, .. }), "{:?}", err);
}

#[test]
fn test_self_reference_is_rejected() {
    let err = compile_sources(["A {\nA inner\n}\n"]).unwrap_err();
    assert!(matches!(err, CompileError::Schema { line: 2, .. }), "{:?}", err);
}

#[test]
fn test_unbalanced_close_is_lexical_error() {
    let err = compile_sources(["A {\nByte x\n}\n}\n"]).unwrap_err();
    assert!(matches!(err, CompileError::Lex { line: 4, .. }), "{:?}", err);
}

#[test]
fn test_comments_and_blank_lines_ignored() {
    let mut registry = Registry::new();
    compile_schema(
        "# colors\n\nenum Byte Color {\n# primary\nRed 0\n}\n\nPixel {\n# the pixel\nColor color\n}\n",
        &mut registry,
    )
    .expect("compile failed");
    let (_, pixel) = registry.records().next().unwrap();
    assert_eq!(pixel.wire_size(), WireSize::Fixed(1));
}
