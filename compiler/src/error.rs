use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed input text: quoting, block nesting, line continuation.
    #[error("Lexical error at line {line}: {msg} in {text}")]
    Lex {
        msg: String,
        line: usize,
        text: String,
    },

    /// Well-formed lines that do not make a valid schema.
    #[error("Schema error at line {line}: {msg} in {text}")]
    Schema {
        msg: String,
        line: usize,
        text: String,
    },
}

impl CompileError {
    /// The 1-based source line the error was raised at, when it has one.
    pub fn line(&self) -> Option<usize> {
        match self {
            CompileError::Io(_) => None,
            CompileError::Lex { line, .. } | CompileError::Schema { line, .. } => Some(*line),
        }
    }
}
