//! Machine-readable summary of a compiled registry: declaration-ordered
//! definitions, resolved field lists, and frozen wire sizes. This is the
//! consumer contract a back end sees, rendered as JSON for tooling.

use serde::Serialize;

use wiregen_schema::{ArrayPolicy, EnumKind, FieldType, IntType, Registry, WireSize};

#[derive(Debug, Serialize)]
pub struct SchemaSummary {
    pub enums: Vec<EnumSummary>,
    pub records: Vec<RecordSummary>,
}

#[derive(Debug, Serialize)]
pub struct EnumSummary {
    pub name: String,
    pub qualified_name: String,
    pub flags: bool,
    pub underlying: String,
    pub entries: Vec<EntrySummary>,
}

/// For ordinary enumerations `value` is the literal text; for flag sets it is
/// the bit index.
#[derive(Debug, Serialize)]
pub struct EntrySummary {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct RecordSummary {
    pub name: String,
    pub qualified_name: String,
    /// Fixed wire size in bytes, or `null` when unbounded.
    pub wire_size: Option<usize>,
    pub fields: Vec<FieldSummary>,
}

#[derive(Debug, Serialize)]
pub struct FieldSummary {
    pub name: Option<String>,
    pub kind: String,
    pub array: Option<String>,
}

pub fn describe(registry: &Registry) -> SchemaSummary {
    let enums = registry
        .enums()
        .map(|(_, def)| EnumSummary {
            name: def.name().to_string(),
            qualified_name: def.qualified_name().to_string(),
            flags: def.is_flags(),
            underlying: def.underlying.keyword().to_string(),
            entries: match &def.kind {
                EnumKind::Values(values) => values
                    .iter()
                    .map(|v| EntrySummary {
                        name: v.name.clone(),
                        value: v.value.clone(),
                    })
                    .collect(),
                EnumKind::Flags(bits) => bits
                    .iter()
                    .map(|b| EntrySummary {
                        name: b.name.clone(),
                        value: b.bit.to_string(),
                    })
                    .collect(),
            },
        })
        .collect();

    let records = registry
        .records()
        .map(|(_, def)| RecordSummary {
            name: def.name().to_string(),
            qualified_name: def.qualified_name().to_string(),
            wire_size: match def.wire_size() {
                WireSize::Fixed(bytes) => Some(bytes),
                WireSize::Unbounded => None,
            },
            fields: def
                .fields()
                .iter()
                .map(|f| FieldSummary {
                    name: f.name.clone(),
                    kind: kind_label(&f.ty, registry),
                    array: f.array.map(array_label),
                })
                .collect(),
        })
        .collect();

    SchemaSummary { enums, records }
}

/// Pretty-printed JSON form of [`describe`].
pub fn to_json(registry: &Registry) -> String {
    serde_json::to_string_pretty(&describe(registry)).unwrap()
}

fn kind_label(ty: &FieldType, registry: &Registry) -> String {
    match ty {
        FieldType::Int(int) => int.keyword().to_string(),
        FieldType::Ascii => "ascii".to_string(),
        FieldType::Enum(id) => format!("enum {}", registry.enum_def(*id).qualified_name()),
        FieldType::Record(id) => format!("record {}", registry.record(*id).qualified_name()),
        FieldType::Serializer { prefix } => format!("serializer/{}", prefix.bytes()),
        FieldType::Conditional(cond) => format!("if {}", cond.condition),
        FieldType::Union(union) => format!("switch {}", union.discriminant),
    }
}

fn array_label(policy: ArrayPolicy) -> String {
    match policy {
        ArrayPolicy::Fixed(count) => format!("fixed {}", count),
        ArrayPolicy::Prefixed(width) => format!(
            "prefixed {}",
            IntType {
                signed: false,
                width
            }
            .keyword()
        ),
        ArrayPolicy::External => "external".to_string(),
    }
}
