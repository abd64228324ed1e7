//! Recursive-descent schema parser.
//!
//! Consumes a [`LineTree`] top-down, recursing on block boundaries, and
//! populates a [`Registry`]. Each production consumes exactly the lines of its
//! own construct and leaves the cursor at the first unconsumed sibling. The
//! first error aborts the whole parse.

use std::rc::Rc;

use lazy_static::lazy_static;
use regex::Regex;

use wiregen_schema::{
    ArrayPolicy, Conditional, EnumKind, EnumValue, Field, FieldList, FieldType, FlagBit, IntType,
    RecordId, Registry, Union, UnionArm, UnionCase,
};

use crate::error::CompileError;
use crate::lines::{Line, LineTree};
use crate::utils::{quote, schema_error};

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
    static ref NUMERAL: Regex = Regex::new(r"^\d+$").unwrap();
    static ref ARRAY_SUFFIX: Regex = Regex::new(r"^([^\[\]]+)\[([^\[\]]*)\]$").unwrap();
}

/// Parse a whole line tree into `registry`.
pub fn parse_into(tree: &LineTree, registry: &mut Registry) -> Result<(), CompileError> {
    let mut parser = Parser {
        tree,
        registry,
        pos: 0,
    };
    parser.run()
}

struct Parser<'a> {
    tree: &'a LineTree,
    registry: &'a mut Registry,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn run(&mut self) -> Result<(), CompileError> {
        let tree = self.tree;
        while self.pos < tree.len() {
            let line = &tree.lines()[self.pos];
            if line.comment {
                self.pos += 1;
                continue;
            }
            match line.ident.to_ascii_lowercase().as_str() {
                "enum" => self.parse_enum_directive(self.pos, None, false)?,
                "flags" => self.parse_enum_directive(self.pos, None, true)?,
                _ => self.parse_record_decl(self.pos)?,
            }
        }
        Ok(())
    }

    /// `enum <int kind> <Name> {` or `flags <int kind> <Name> {`, followed by
    /// one value line per entry.
    fn parse_enum_directive(
        &mut self,
        idx: usize,
        scope: Option<RecordId>,
        is_flags: bool,
    ) -> Result<(), CompileError> {
        let tree = self.tree;
        let line = &tree.lines()[idx];
        if line.fields.len() != 2 {
            return Err(schema_error(
                &format!(
                    "expected an underlying type and a name, found {} fields",
                    line.fields.len()
                ),
                line.number,
                &line.raw,
            ));
        }
        let underlying = IntType::from_keyword(&line.fields[0]).ok_or_else(|| {
            schema_error(
                &format!(
                    "underlying type {} is not an integer kind",
                    quote(&line.fields[0])
                ),
                line.number,
                &line.raw,
            )
        })?;
        let name = &line.fields[1];
        if !IDENTIFIER.is_match(name) {
            return Err(schema_error(
                &format!("invalid definition name {}", quote(name)),
                line.number,
                &line.raw,
            ));
        }

        self.pos = idx + 1;
        let mut values = Vec::new();
        let mut bits = Vec::new();
        while let Some(value_line) = tree.get(self.pos) {
            if value_line.parent != Some(idx) {
                break;
            }
            self.pos += 1;
            if value_line.comment {
                continue;
            }
            if value_line.fields.len() != 1 {
                return Err(schema_error(
                    "expected exactly one field on a value line",
                    value_line.number,
                    &value_line.raw,
                ));
            }
            if is_flags {
                // Flag sets put the bit index first and the name second.
                let bit = value_line.ident.parse::<u8>().map_err(|_| {
                    schema_error(
                        &format!("bit index {} is not numeric", quote(&value_line.ident)),
                        value_line.number,
                        &value_line.raw,
                    )
                })?;
                bits.push(FlagBit {
                    bit,
                    name: value_line.fields[0].clone(),
                });
            } else {
                values.push(EnumValue {
                    name: value_line.ident.clone(),
                    value: value_line.fields[0].clone(),
                });
            }
        }

        let kind = if is_flags {
            EnumKind::Flags(bits)
        } else {
            EnumKind::Values(values)
        };
        self.registry
            .register_enum(name, scope, underlying, kind)
            .map_err(|e| schema_error(&e.to_string(), line.number, &line.raw))?;
        Ok(())
    }

    /// Top-level `Name {` record block.
    fn parse_record_decl(&mut self, idx: usize) -> Result<(), CompileError> {
        let tree = self.tree;
        let line = &tree.lines()[idx];
        if !line.opens_block || !line.fields.is_empty() {
            return Err(schema_error(
                &format!("unknown directive {}", quote(&line.ident)),
                line.number,
                &line.raw,
            ));
        }
        if !IDENTIFIER.is_match(&line.ident) {
            return Err(schema_error(
                &format!("invalid record name {}", quote(&line.ident)),
                line.number,
                &line.raw,
            ));
        }
        let id = self
            .registry
            .declare_record(&line.ident, None)
            .map_err(|e| schema_error(&e.to_string(), line.number, &line.raw))?;
        self.pos = idx + 1;
        self.parse_record_body(id, idx)
    }

    /// Field lines of the record block opened at `rec_idx`. Seals the record
    /// when the block ends, freezing its wire size.
    fn parse_record_body(&mut self, rec: RecordId, rec_idx: usize) -> Result<(), CompileError> {
        let tree = self.tree;
        let mut fields: Vec<Rc<Field>> = Vec::new();
        while let Some(line) = tree.get(self.pos) {
            if line.parent != Some(rec_idx) {
                break;
            }
            if line.comment {
                self.pos += 1;
                continue;
            }
            self.parse_field_line(rec, self.pos, &mut fields)?;
        }
        self.registry.seal_record(rec, fields);
        Ok(())
    }

    /// Field lines of a conditional branch or union arm block opened at
    /// `parent_idx`. The branch gets its own sealed field list and wire size.
    fn parse_branch(&mut self, rec: RecordId, parent_idx: usize) -> Result<FieldList, CompileError> {
        let tree = self.tree;
        let mut fields: Vec<Rc<Field>> = Vec::new();
        while let Some(line) = tree.get(self.pos) {
            if line.parent != Some(parent_idx) {
                break;
            }
            if line.comment {
                self.pos += 1;
                continue;
            }
            self.parse_field_line(rec, self.pos, &mut fields)?;
        }
        Ok(FieldList::seal(fields, self.registry))
    }

    fn parse_field_line(
        &mut self,
        rec: RecordId,
        idx: usize,
        out: &mut Vec<Rc<Field>>,
    ) -> Result<(), CompileError> {
        let tree = self.tree;
        let line = &tree.lines()[idx];
        let (base, array) = split_array_suffix(line)?;

        match base.to_ascii_lowercase().as_str() {
            // Scoped type definitions; these add no field of their own.
            "enum" | "flags" if array.is_some() => Err(schema_error(
                "a type definition cannot take an array suffix",
                line.number,
                &line.raw,
            )),
            "enum" => self.parse_enum_directive(idx, Some(rec), false),
            "flags" => self.parse_enum_directive(idx, Some(rec), true),

            "object" => {
                expect_field_count(line, 1)?;
                expect_block(line, true)?;
                let name = line.fields[0].clone();
                if !IDENTIFIER.is_match(&name) {
                    return Err(schema_error(
                        &format!("invalid record name {}", quote(&name)),
                        line.number,
                        &line.raw,
                    ));
                }
                let nested = self
                    .registry
                    .declare_record(&name, Some(rec))
                    .map_err(|e| schema_error(&e.to_string(), line.number, &line.raw))?;
                self.pos = idx + 1;
                self.parse_record_body(nested, idx)?;
                out.push(finish(
                    Field::named(FieldType::Record(nested), name, line.number),
                    array,
                ));
                Ok(())
            }

            "serializer" => {
                expect_block(line, false)?;
                expect_field_count(line, 2)?;
                let width_word = &line.fields[0];
                if NUMERAL.is_match(width_word) {
                    return Err(schema_error(
                        "a length-prefix keyword is required, not a numeral",
                        line.number,
                        &line.raw,
                    ));
                }
                let prefix = match IntType::from_keyword(width_word) {
                    Some(ty) if !ty.signed => ty.width,
                    _ => {
                        return Err(schema_error(
                            &format!(
                                "{} is not an unsigned length-prefix width",
                                quote(width_word)
                            ),
                            line.number,
                            &line.raw,
                        ))
                    }
                };
                out.push(finish(
                    Field::named(
                        FieldType::Serializer { prefix },
                        line.fields[1].clone(),
                        line.number,
                    ),
                    array,
                ));
                self.pos = idx + 1;
                Ok(())
            }

            "if" => {
                expect_field_count(line, 1)?;
                expect_block(line, true)?;
                let condition = line.fields[0].clone();
                self.pos = idx + 1;
                let then_fields = self.parse_branch(rec, idx)?;

                // An `else` immediately following the true branch, at the same
                // nesting level, attaches to this conditional.
                while let Some(next) = tree.get(self.pos) {
                    if next.comment && next.parent == line.parent {
                        self.pos += 1;
                        continue;
                    }
                    break;
                }
                let mut else_fields = None;
                if let Some(next) = tree.get(self.pos) {
                    if next.parent == line.parent
                        && !next.comment
                        && next.ident.eq_ignore_ascii_case("else")
                    {
                        if !next.fields.is_empty() {
                            return Err(schema_error(
                                "else takes no fields",
                                next.number,
                                &next.raw,
                            ));
                        }
                        expect_block(next, true)?;
                        let else_idx = self.pos;
                        self.pos += 1;
                        else_fields = Some(self.parse_branch(rec, else_idx)?);
                    }
                }
                out.push(finish(
                    Field::anonymous(
                        FieldType::Conditional(Rc::new(Conditional {
                            condition,
                            then_fields,
                            else_fields,
                        })),
                        line.number,
                    ),
                    array,
                ));
                Ok(())
            }

            "else" => Err(schema_error(
                "else without a preceding if",
                line.number,
                &line.raw,
            )),

            "switch" => {
                expect_field_count(line, 1)?;
                expect_block(line, true)?;
                let discriminant = line.fields[0].clone();
                self.pos = idx + 1;
                let mut arms = Vec::new();
                while let Some(child) = tree.get(self.pos) {
                    if child.parent != Some(idx) {
                        break;
                    }
                    if child.comment {
                        self.pos += 1;
                        continue;
                    }
                    let case = match child.ident.to_ascii_lowercase().as_str() {
                        "case" => {
                            expect_field_count(child, 1)?;
                            UnionCase::Value(child.fields[0].clone())
                        }
                        "default" => {
                            expect_field_count(child, 0)?;
                            UnionCase::Default
                        }
                        _ => {
                            return Err(schema_error(
                                &format!("expected case or default, found {}", quote(&child.ident)),
                                child.number,
                                &child.raw,
                            ))
                        }
                    };
                    expect_block(child, true)?;
                    let child_idx = self.pos;
                    self.pos += 1;
                    let arm_fields = self.parse_branch(rec, child_idx)?;
                    arms.push(UnionArm {
                        case,
                        fields: arm_fields,
                    });
                }
                out.push(finish(
                    Field::anonymous(
                        FieldType::Union(Rc::new(Union {
                            discriminant,
                            arms,
                        })),
                        line.number,
                    ),
                    array,
                ));
                Ok(())
            }

            "case" | "default" => Err(schema_error(
                &format!("{} outside a switch block", quote(&base)),
                line.number,
                &line.raw,
            )),

            "ascii" => {
                expect_block(line, false)?;
                expect_field_count(line, 1)?;
                out.push(finish(
                    Field::named(FieldType::Ascii, line.fields[0].clone(), line.number),
                    array,
                ));
                self.pos = idx + 1;
                Ok(())
            }

            _ => {
                if let Some(int) = IntType::from_keyword(&base) {
                    expect_block(line, false)?;
                    expect_field_count(line, 1)?;
                    out.push(finish(
                        Field::named(FieldType::Int(int), line.fields[0].clone(), line.number),
                        array,
                    ));
                    self.pos = idx + 1;
                    Ok(())
                } else if let Some(enum_id) = self.registry.resolve_enum(Some(rec), &base) {
                    expect_block(line, false)?;
                    expect_field_count(line, 1)?;
                    out.push(finish(
                        Field::named(
                            FieldType::Enum(enum_id),
                            line.fields[0].clone(),
                            line.number,
                        ),
                        array,
                    ));
                    self.pos = idx + 1;
                    Ok(())
                } else if let Some(record_id) = self.registry.resolve_record(Some(rec), &base) {
                    expect_block(line, false)?;
                    if !self.registry.record(record_id).is_sealed() {
                        return Err(schema_error(
                            &format!(
                                "record {} is referenced before its definition is complete",
                                quote(&base)
                            ),
                            line.number,
                            &line.raw,
                        ));
                    }
                    match line.fields.len() {
                        0 => {
                            // Composition by inclusion: the referenced record's
                            // field objects are shared, not copied.
                            if array.is_some() {
                                return Err(schema_error(
                                    "an inlined record cannot take an array suffix",
                                    line.number,
                                    &line.raw,
                                ));
                            }
                            let included: Vec<Rc<Field>> = self
                                .registry
                                .record(record_id)
                                .fields()
                                .iter()
                                .map(Rc::clone)
                                .collect();
                            out.extend(included);
                            self.pos = idx + 1;
                            Ok(())
                        }
                        1 => {
                            out.push(finish(
                                Field::named(
                                    FieldType::Record(record_id),
                                    line.fields[0].clone(),
                                    line.number,
                                ),
                                array,
                            ));
                            self.pos = idx + 1;
                            Ok(())
                        }
                        n => Err(schema_error(
                            &format!("a record reference takes 0 or 1 fields, found {}", n),
                            line.number,
                            &line.raw,
                        )),
                    }
                } else {
                    Err(schema_error(
                        &format!("unknown type {}", quote(&base)),
                        line.number,
                        &line.raw,
                    ))
                }
            }
        }
    }
}

fn finish(field: Field, array: Option<ArrayPolicy>) -> Rc<Field> {
    Rc::new(match array {
        Some(policy) => field.with_array(policy),
        None => field,
    })
}

fn expect_field_count(line: &Line, count: usize) -> Result<(), CompileError> {
    if line.fields.len() != count {
        return Err(schema_error(
            &format!(
                "expected {} field(s) after {}, found {}",
                count,
                quote(&line.ident),
                line.fields.len()
            ),
            line.number,
            &line.raw,
        ));
    }
    Ok(())
}

fn expect_block(line: &Line, wanted: bool) -> Result<(), CompileError> {
    if line.opens_block == wanted {
        Ok(())
    } else if wanted {
        Err(schema_error(
            &format!("{} must open a block", quote(&line.ident)),
            line.number,
            &line.raw,
        ))
    } else {
        Err(schema_error(
            &format!("{} does not take a block", quote(&line.ident)),
            line.number,
            &line.raw,
        ))
    }
}

/// Split an optional `[...]` array-size suffix off a field-line identifier.
fn split_array_suffix(line: &Line) -> Result<(String, Option<ArrayPolicy>), CompileError> {
    let ident = &line.ident;
    if let Some(caps) = ARRAY_SUFFIX.captures(ident) {
        let base = caps[1].to_string();
        let inner = &caps[2];
        let policy = if inner.is_empty() {
            ArrayPolicy::External
        } else if NUMERAL.is_match(inner) {
            let count = inner.parse::<usize>().map_err(|_| {
                schema_error(
                    &format!("invalid array size {}", quote(inner)),
                    line.number,
                    &line.raw,
                )
            })?;
            ArrayPolicy::Fixed(count)
        } else {
            match IntType::from_keyword(inner) {
                Some(ty) if !ty.signed => ArrayPolicy::Prefixed(ty.width),
                Some(_) => {
                    return Err(schema_error(
                        &format!("{} cannot prefix an array length", quote(inner)),
                        line.number,
                        &line.raw,
                    ))
                }
                None => {
                    return Err(schema_error(
                        &format!("invalid array size {}", quote(inner)),
                        line.number,
                        &line.raw,
                    ))
                }
            }
        };
        Ok((base, Some(policy)))
    } else if ident.contains('[') || ident.contains(']') {
        Err(schema_error(
            "malformed array suffix",
            line.number,
            &line.raw,
        ))
    } else {
        Ok((ident.clone(), None))
    }
}
