use wiregen_schema::Registry;

use crate::error::CompileError;
use crate::lines::LineTree;
use crate::parser;

/// Compile one textual schema source into `registry`.
/// Returns `Err(CompileError)` on the first lexical or schema error.
pub fn compile_schema(text: &str, registry: &mut Registry) -> Result<(), CompileError> {
    let tree = LineTree::parse(text)?;
    parser::parse_into(&tree, registry)
}

/// Compile a sequence of schema sources, strictly in order, into one fresh
/// registry. Later sources may reference definitions from earlier ones.
pub fn compile_sources<'a, I>(sources: I) -> Result<Registry, CompileError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut registry = Registry::new();
    for text in sources {
        compile_schema(text, &mut registry)?;
    }
    Ok(registry)
}
