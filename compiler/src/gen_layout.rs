//! Reference back end: renders a human-readable wire-layout report from a
//! compiled registry, driving the emission contract end to end. Byte offsets
//! are printed while the position is statically known and become `.` after
//! the first unbounded field.

use std::rc::Rc;

use wiregen_schema::{
    collect_helpers, ArrayPolicy, Backend, EnumId, Field, FieldType, Fragment, IntType, IntWidth,
    RecordId, Registry, UnionCase, WireSize,
};

/// Back end that registers plain-text helper names.
struct TextBackend;

impl Backend for TextBackend {
    type Helper = String;

    fn integer_helper(&mut self, ty: IntType) -> String {
        format!("{} reader/writer", ty.keyword())
    }

    fn enum_helper(&mut self, registry: &Registry, def: EnumId) -> String {
        let d = registry.enum_def(def);
        format!(
            "{} {} over {}",
            if d.is_flags() { "flag set" } else { "enum" },
            d.qualified_name(),
            d.underlying.keyword()
        )
    }

    fn record_helper(&mut self, registry: &Registry, def: RecordId) -> String {
        format!("record {}", registry.record(def).qualified_name())
    }

    fn serializer_helper(&mut self, prefix: IntWidth) -> String {
        format!("opaque serializer, {}-byte length prefix", prefix.bytes())
    }
}

/// Render the wire layout of every record in the registry, in declaration
/// order.
pub fn layout_report(registry: &Registry) -> String {
    let mut out = String::new();
    for (_, record) in registry.records() {
        out.push_str(&format!(
            "record {} ({})\n",
            record.qualified_name(),
            size_text(record.wire_size())
        ));
        write_fields(&mut out, registry, record.fields(), 1, &mut Some(0));

        let mut backend = TextBackend;
        let mut helpers = Vec::new();
        collect_helpers(registry, record.fields(), &mut backend, &mut helpers);
        if !helpers.is_empty() {
            out.push_str("  helpers:\n");
            for helper in helpers {
                out.push_str(&format!("    - {}\n", helper));
            }
        }
        out.push('\n');
    }
    out
}

fn write_fields(
    out: &mut String,
    registry: &Registry,
    fields: &[Rc<Field>],
    indent: usize,
    offset: &mut Option<usize>,
) {
    let pad = "  ".repeat(indent);
    for field in fields {
        let position = match offset {
            Some(n) => format!("{:>4}", n),
            None => "   .".to_string(),
        };
        let name = field.name.as_deref().unwrap_or("(anonymous)");
        let suffix = field.array.map(array_text).unwrap_or_default();
        let desc = fragment_text(&field.ty.display_op(registry), registry);
        out.push_str(&format!("{}{}  {}{}: {}\n", pad, position, name, suffix, desc));

        let count = match field.array {
            None => Some(1),
            Some(ArrayPolicy::Fixed(n)) => Some(n),
            Some(ArrayPolicy::Prefixed(_)) | Some(ArrayPolicy::External) => None,
        };
        *offset = match (offset.take(), count, field.ty.element_size(registry)) {
            (Some(base), Some(count), WireSize::Fixed(bytes)) => count
                .checked_mul(bytes)
                .and_then(|step| base.checked_add(step)),
            _ => None,
        };

        match &field.ty {
            FieldType::Conditional(cond) => {
                out.push_str(&format!(
                    "{}      when true ({}):\n",
                    pad,
                    size_text(cond.then_fields.wire_size())
                ));
                write_fields(out, registry, cond.then_fields.fields(), indent + 4, &mut Some(0));
                if let Some(else_fields) = &cond.else_fields {
                    out.push_str(&format!(
                        "{}      when false ({}):\n",
                        pad,
                        size_text(else_fields.wire_size())
                    ));
                    write_fields(out, registry, else_fields.fields(), indent + 4, &mut Some(0));
                }
            }
            FieldType::Union(union) => {
                for arm in &union.arms {
                    let label = match &arm.case {
                        UnionCase::Value(value) => format!("case {}", value),
                        UnionCase::Default => "default".to_string(),
                    };
                    out.push_str(&format!(
                        "{}      {} ({}):\n",
                        pad,
                        label,
                        size_text(arm.fields.wire_size())
                    ));
                    write_fields(out, registry, arm.fields.fields(), indent + 4, &mut Some(0));
                }
            }
            _ => {}
        }
    }
}

fn fragment_text(fragment: &Fragment, registry: &Registry) -> String {
    match fragment {
        Fragment::Int { width, signed } => format!(
            "{}-byte {} big-endian integer",
            width.bytes(),
            if *signed { "signed" } else { "unsigned" }
        ),
        Fragment::Ascii => "ascii character".to_string(),
        Fragment::Enum {
            def, width, flags, ..
        } => format!(
            "{} {} ({}-byte value)",
            if *flags { "flag set" } else { "enum" },
            registry.enum_def(*def).qualified_name(),
            width.bytes()
        ),
        Fragment::Record { def } => format!("record {}", registry.record(*def).qualified_name()),
        Fragment::Opaque { prefix } => format!(
            "opaque value behind a {}-byte length prefix",
            prefix.bytes()
        ),
        Fragment::Conditional(cond) => format!("conditional on {}", cond.condition),
        Fragment::Union(union) => format!("union on {}", union.discriminant),
    }
}

fn array_text(policy: ArrayPolicy) -> String {
    match policy {
        ArrayPolicy::Fixed(count) => format!("[{}]", count),
        ArrayPolicy::Prefixed(width) => format!(
            "[{}]",
            IntType {
                signed: false,
                width
            }
            .keyword()
        ),
        ArrayPolicy::External => "[]".to_string(),
    }
}

fn size_text(size: WireSize) -> String {
    match size {
        WireSize::Fixed(bytes) => format!("{} bytes", bytes),
        WireSize::Unbounded => "unbounded".to_string(),
    }
}
