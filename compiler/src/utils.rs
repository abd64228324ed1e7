use crate::error::CompileError;

/// Quote arbitrary text for an error message, escaping like a JSON string.
pub fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap()
}

pub fn lex_error(msg: &str, line: usize, text: &str) -> CompileError {
    CompileError::Lex {
        msg: msg.to_string(),
        line,
        text: quote(text),
    }
}

pub fn schema_error(msg: &str, line: usize, text: &str) -> CompileError {
    CompileError::Schema {
        msg: msg.to_string(),
        line,
        text: quote(text),
    }
}
