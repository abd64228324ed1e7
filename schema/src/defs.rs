use std::rc::Rc;

use crate::registry::RecordId;
use crate::types::{Field, FieldList, IntType, WireSize};

/// One named value of an ordinary enumeration. The literal is kept as source
/// text; only flag bit indices are required to be numeric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub name: String,
    pub value: String,
}

/// One named bit position of a flag set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagBit {
    pub bit: u8,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumKind {
    /// Ordinary enumeration: named literal values, in declaration order.
    Values(Vec<EnumValue>),
    /// Flag set: named bit positions, in declaration order.
    Flags(Vec<FlagBit>),
}

/// An enumeration or flag-set definition. Immutable once constructed.
#[derive(Debug)]
pub struct EnumDef {
    name: String,
    fqn: String,
    scope: Option<RecordId>,
    pub underlying: IntType,
    pub kind: EnumKind,
}

impl EnumDef {
    pub(crate) fn new(
        name: String,
        fqn: String,
        scope: Option<RecordId>,
        underlying: IntType,
        kind: EnumKind,
    ) -> EnumDef {
        EnumDef {
            name,
            fqn,
            scope,
            underlying,
            kind,
        }
    }

    /// The short name as declared.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The fully-qualified dotted lowercase name.
    pub fn qualified_name(&self) -> &str {
        &self.fqn
    }

    /// The record this definition is nested in, if any.
    pub fn scope(&self) -> Option<RecordId> {
        self.scope
    }

    pub fn is_flags(&self) -> bool {
        matches!(self.kind, EnumKind::Flags(_))
    }
}

/// A definition nested directly inside a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NestedDef {
    Enum(crate::registry::EnumId),
    Record(RecordId),
}

/// A record definition.
///
/// A record is declared open, accumulates nothing itself while the parser
/// gathers its fields, and is then sealed exactly once with the complete field
/// list; sealing computes the frozen wire size. Reading the fields or the size
/// of an unsealed record, or sealing twice, is a programming error and panics.
#[derive(Debug)]
pub struct RecordDef {
    name: String,
    fqn: String,
    scope: Option<RecordId>,
    nested: Vec<NestedDef>,
    body: Option<FieldList>,
}

impl RecordDef {
    pub(crate) fn new(name: String, fqn: String, scope: Option<RecordId>) -> RecordDef {
        RecordDef {
            name,
            fqn,
            scope,
            nested: Vec::new(),
            body: None,
        }
    }

    /// The short name as declared.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The fully-qualified dotted lowercase name.
    pub fn qualified_name(&self) -> &str {
        &self.fqn
    }

    /// The record this definition is nested in, if any.
    pub fn scope(&self) -> Option<RecordId> {
        self.scope
    }

    /// Definitions declared directly inside this record, in declaration order.
    pub fn nested(&self) -> &[NestedDef] {
        &self.nested
    }

    pub fn is_sealed(&self) -> bool {
        self.body.is_some()
    }

    /// The resolved field list, in declaration order.
    pub fn fields(&self) -> &[Rc<Field>] {
        self.body
            .as_ref()
            .unwrap_or_else(|| panic!("record {} read before it was sealed", self.fqn))
            .fields()
    }

    /// The frozen wire size.
    pub fn wire_size(&self) -> WireSize {
        self.body
            .as_ref()
            .unwrap_or_else(|| panic!("wire size of record {} read before it was sealed", self.fqn))
            .wire_size()
    }

    pub(crate) fn add_nested(&mut self, def: NestedDef) {
        self.nested.push(def);
    }

    pub(crate) fn seal(&mut self, body: FieldList) {
        assert!(self.body.is_none(), "record {} sealed twice", self.fqn);
        self.body = Some(body);
    }
}
