//! wiregen-compiler
//!
//! This crate implements:
//!  1) A hierarchical line reader for the wire-format schema language,
//!  2) A recursive-descent schema parser that populates a `Registry`,
//!  3) Compile entry points (`compile_schema`, `compile_sources`),
//!  4) A JSON describe surface and a reference wire-layout back end,
//!  5) Error types (`CompileError`).

pub mod compiler;
pub mod describe;
pub mod error;
pub mod gen_layout;
pub mod lines;
pub mod parser;
pub mod utils;

pub use compiler::{compile_schema, compile_sources};
pub use error::CompileError;
