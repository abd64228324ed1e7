use std::rc::Rc;

use crate::registry::{EnumId, RecordId, Registry};

/// Wire width of an integer value, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    W1,
    W2,
    W3,
    W4,
    W8,
}

impl IntWidth {
    pub fn bytes(self) -> usize {
        match self {
            IntWidth::W1 => 1,
            IntWidth::W2 => 2,
            IntWidth::W3 => 3,
            IntWidth::W4 => 4,
            IntWidth::W8 => 8,
        }
    }

    pub fn from_bytes(bytes: usize) -> Option<IntWidth> {
        match bytes {
            1 => Some(IntWidth::W1),
            2 => Some(IntWidth::W2),
            3 => Some(IntWidth::W3),
            4 => Some(IntWidth::W4),
            8 => Some(IntWidth::W8),
            _ => None,
        }
    }
}

/// One of the ten integer primitive kinds: signed or unsigned, 1/2/3/4/8 bytes,
/// big-endian on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntType {
    pub signed: bool,
    pub width: IntWidth,
}

impl IntType {
    /// Look up an integer kind by its schema keyword, case-insensitively.
    pub fn from_keyword(word: &str) -> Option<IntType> {
        let (signed, width) = match word.to_ascii_lowercase().as_str() {
            "byte" => (false, IntWidth::W1),
            "sbyte" => (true, IntWidth::W1),
            "uint16" => (false, IntWidth::W2),
            "int16" => (true, IntWidth::W2),
            "uint24" => (false, IntWidth::W3),
            "int24" => (true, IntWidth::W3),
            "uint32" => (false, IntWidth::W4),
            "int32" => (true, IntWidth::W4),
            "uint64" => (false, IntWidth::W8),
            "int64" => (true, IntWidth::W8),
            _ => return None,
        };
        Some(IntType { signed, width })
    }

    /// The canonical schema keyword for this integer kind.
    pub fn keyword(self) -> &'static str {
        match (self.signed, self.width) {
            (false, IntWidth::W1) => "Byte",
            (true, IntWidth::W1) => "SByte",
            (false, IntWidth::W2) => "UInt16",
            (true, IntWidth::W2) => "Int16",
            (false, IntWidth::W3) => "UInt24",
            (true, IntWidth::W3) => "Int24",
            (false, IntWidth::W4) => "UInt32",
            (true, IntWidth::W4) => "Int32",
            (false, IntWidth::W8) => "UInt64",
            (true, IntWidth::W8) => "Int64",
        }
    }
}

/// How the element count of an arrayed field is carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayPolicy {
    /// A compile-time-fixed element count; no count bytes on the wire.
    Fixed(usize),
    /// An unsigned length prefix of the given width precedes the elements.
    Prefixed(IntWidth),
    /// No count bytes on the wire; the count comes from surrounding protocol context.
    External,
}

/// A statically known byte count, or `Unbounded` when the size depends on the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireSize {
    Fixed(usize),
    Unbounded,
}

impl WireSize {
    pub fn is_fixed(self) -> bool {
        matches!(self, WireSize::Fixed(_))
    }
}

/// The closed set of field-type kinds.
#[derive(Debug, Clone)]
pub enum FieldType {
    Int(IntType),
    Ascii,
    Enum(EnumId),
    Record(RecordId),
    /// Opaque externally serialized value behind an unsigned length prefix.
    Serializer { prefix: IntWidth },
    Conditional(Rc<Conditional>),
    Union(Rc<Union>),
}

impl FieldType {
    /// The fixed wire size of one element of this type, or `Unbounded` when it
    /// cannot be known statically.
    ///
    /// Panics if the type references a record whose field list has not been
    /// sealed yet; the compiler never lets such a reference form.
    pub fn element_size(&self, registry: &Registry) -> WireSize {
        match self {
            FieldType::Int(ty) => WireSize::Fixed(ty.width.bytes()),
            FieldType::Ascii => WireSize::Fixed(1),
            FieldType::Enum(id) => WireSize::Fixed(registry.enum_def(*id).underlying.width.bytes()),
            FieldType::Record(id) => registry.record(*id).wire_size(),
            FieldType::Serializer { .. } => WireSize::Unbounded,
            FieldType::Conditional(_) => WireSize::Unbounded,
            FieldType::Union(_) => WireSize::Unbounded,
        }
    }
}

/// A single record field: a type plus an optional name. Conditional and union
/// control fields are anonymous.
#[derive(Debug)]
pub struct Field {
    pub ty: FieldType,
    pub name: Option<String>,
    pub array: Option<ArrayPolicy>,
    /// 1-based source line the field was declared on.
    pub line: usize,
}

impl Field {
    pub fn named(ty: FieldType, name: impl Into<String>, line: usize) -> Field {
        Field {
            ty,
            name: Some(name.into()),
            array: None,
            line,
        }
    }

    pub fn anonymous(ty: FieldType, line: usize) -> Field {
        Field {
            ty,
            name: None,
            array: None,
            line,
        }
    }

    pub fn with_array(mut self, policy: ArrayPolicy) -> Field {
        self.array = Some(policy);
        self
    }
}

/// An ordered field list whose wire size was computed when the list was closed.
#[derive(Debug)]
pub struct FieldList {
    fields: Vec<Rc<Field>>,
    size: WireSize,
}

impl FieldList {
    /// Close a field list and compute its wire size in the same step.
    pub fn seal(fields: Vec<Rc<Field>>, registry: &Registry) -> FieldList {
        let size = resolve_wire_size(&fields, registry);
        FieldList { fields, size }
    }

    pub fn fields(&self) -> &[Rc<Field>] {
        &self.fields
    }

    pub fn wire_size(&self) -> WireSize {
        self.size
    }
}

/// Anonymous `if`/`else` control field: a condition, a true branch, and an
/// optional false branch. Each branch carries its own wire size.
#[derive(Debug)]
pub struct Conditional {
    pub condition: String,
    pub then_fields: FieldList,
    pub else_fields: Option<FieldList>,
}

/// Anonymous `switch` control field: a discriminant and its ordered alternatives.
#[derive(Debug)]
pub struct Union {
    pub discriminant: String,
    pub arms: Vec<UnionArm>,
}

#[derive(Debug)]
pub struct UnionArm {
    pub case: UnionCase,
    pub fields: FieldList,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnionCase {
    Value(String),
    Default,
}

/// Single-pass wire-size aggregation over a closed field list.
///
/// Walks the fields in declaration order summing `element size * element count`.
/// The total becomes `Unbounded` the first time a field is an array without a
/// compile-time-fixed count, or its element type is itself unbounded; remaining
/// fields are not evaluated. A total that does not fit in `usize` is likewise
/// reported as `Unbounded`.
pub fn resolve_wire_size(fields: &[Rc<Field>], registry: &Registry) -> WireSize {
    let mut total = 0usize;
    for field in fields {
        let count = match field.array {
            None => 1,
            Some(ArrayPolicy::Fixed(n)) => n,
            Some(ArrayPolicy::Prefixed(_)) | Some(ArrayPolicy::External) => {
                return WireSize::Unbounded
            }
        };
        let step = match field.ty.element_size(registry) {
            WireSize::Fixed(bytes) => bytes.checked_mul(count),
            WireSize::Unbounded => return WireSize::Unbounded,
        };
        total = match step.and_then(|step| total.checked_add(step)) {
            Some(total) => total,
            None => return WireSize::Unbounded,
        };
    }
    WireSize::Fixed(total)
}
