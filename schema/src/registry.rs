use std::collections::HashMap;
use std::rc::Rc;

use thiserror::Error;

use crate::defs::{EnumDef, EnumKind, NestedDef, RecordDef};
use crate::types::{Field, FieldList, IntType};

/// Handle to an enumeration or flag-set definition in a [`Registry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnumId(usize);

/// Handle to a record definition in a [`Registry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId(usize);

/// A fully-qualified name collided with one already registered in the same
/// namespace.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("the name \"{fqn}\" is already defined")]
pub struct DuplicateName {
    pub fqn: String,
}

/// The global table of named definitions.
///
/// Enumerations/flag sets and records live in two independent namespaces, each
/// keyed by the fully-qualified dotted lowercase name. Definitions are stored
/// in declaration order. The registry is mutable only while a compilation is
/// populating it and is treated as read-only afterwards.
#[derive(Debug, Default)]
pub struct Registry {
    enums: Vec<EnumDef>,
    records: Vec<RecordDef>,
    enum_index: HashMap<String, EnumId>,
    record_index: HashMap<String, RecordId>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    /// Register an enumeration or flag-set definition, optionally nested in
    /// `scope`. Fails when the fully-qualified name is already taken in the
    /// enum namespace.
    pub fn register_enum(
        &mut self,
        name: &str,
        scope: Option<RecordId>,
        underlying: IntType,
        kind: EnumKind,
    ) -> Result<EnumId, DuplicateName> {
        let fqn = self.qualify(scope, name);
        if self.enum_index.contains_key(&fqn) {
            return Err(DuplicateName { fqn });
        }
        let id = EnumId(self.enums.len());
        self.enum_index.insert(fqn.clone(), id);
        self.enums
            .push(EnumDef::new(name.to_string(), fqn, scope, underlying, kind));
        if let Some(parent) = scope {
            self.records[parent.0].add_nested(NestedDef::Enum(id));
        }
        Ok(id)
    }

    /// Declare a record, optionally nested in `scope`. The record starts
    /// unsealed; it must be sealed with [`Registry::seal_record`] once its
    /// field list is complete. Fails when the fully-qualified name is already
    /// taken in the record namespace.
    pub fn declare_record(
        &mut self,
        name: &str,
        scope: Option<RecordId>,
    ) -> Result<RecordId, DuplicateName> {
        let fqn = self.qualify(scope, name);
        if self.record_index.contains_key(&fqn) {
            return Err(DuplicateName { fqn });
        }
        let id = RecordId(self.records.len());
        self.record_index.insert(fqn.clone(), id);
        self.records
            .push(RecordDef::new(name.to_string(), fqn, scope));
        if let Some(parent) = scope {
            self.records[parent.0].add_nested(NestedDef::Record(id));
        }
        Ok(id)
    }

    /// Close a record's field list and freeze its wire size in one step.
    /// Panics if the record was already sealed.
    pub fn seal_record(&mut self, id: RecordId, fields: Vec<Rc<Field>>) {
        let body = FieldList::seal(fields, self);
        self.records[id.0].seal(body);
    }

    pub fn enum_def(&self, id: EnumId) -> &EnumDef {
        &self.enums[id.0]
    }

    pub fn record(&self, id: RecordId) -> &RecordDef {
        &self.records[id.0]
    }

    /// All enumeration/flag-set definitions, in declaration order.
    pub fn enums(&self) -> impl Iterator<Item = (EnumId, &EnumDef)> {
        self.enums.iter().enumerate().map(|(i, d)| (EnumId(i), d))
    }

    /// All record definitions, in declaration order.
    pub fn records(&self) -> impl Iterator<Item = (RecordId, &RecordDef)> {
        self.records
            .iter()
            .enumerate()
            .map(|(i, d)| (RecordId(i), d))
    }

    /// Resolve an enum/flag-set reference from inside `scope`: definitions
    /// nested in the enclosing record shadow same-named globals.
    pub fn resolve_enum(&self, scope: Option<RecordId>, short: &str) -> Option<EnumId> {
        self.resolve(&self.enum_index, scope, short)
    }

    /// Resolve a record reference from inside `scope`, local-then-global.
    pub fn resolve_record(&self, scope: Option<RecordId>, short: &str) -> Option<RecordId> {
        self.resolve(&self.record_index, scope, short)
    }

    fn resolve<T: Copy>(
        &self,
        index: &HashMap<String, T>,
        scope: Option<RecordId>,
        short: &str,
    ) -> Option<T> {
        let short = short.to_ascii_lowercase();
        if let Some(rec) = scope {
            let scoped = format!("{}.{}", self.records[rec.0].qualified_name(), short);
            if let Some(&id) = index.get(&scoped) {
                return Some(id);
            }
        }
        index.get(&short).copied()
    }

    fn qualify(&self, scope: Option<RecordId>, name: &str) -> String {
        let short = name.to_ascii_lowercase();
        match scope {
            Some(rec) => format!("{}.{}", self.records[rec.0].qualified_name(), short),
            None => short,
        }
    }
}
