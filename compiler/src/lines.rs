//! Hierarchical line reader.
//!
//! Turns raw schema text into a flat arena of [`Line`]s whose `parent` indices
//! mirror the brace nesting of the input. Block-close lines (`}`) only pop the
//! nesting stack and are not emitted; comment lines are emitted flagged so
//! callers can skip them.

use crate::error::CompileError;
use crate::utils::lex_error;

/// One logical line of schema source.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    /// The first whitespace-delimited token. For comment lines, the comment
    /// text including the leading `#`.
    pub ident: String,
    /// The remaining tokens, quoted or bare, in order.
    pub fields: Vec<String>,
    /// Index of the enclosing block's opening line within the [`LineTree`],
    /// or `None` at top level.
    pub parent: Option<usize>,
    /// 1-based number of the first physical line.
    pub number: usize,
    /// True when the first non-whitespace character is `#`.
    pub comment: bool,
    /// True when the line ends with an unescaped `{`, opening a block.
    pub opens_block: bool,
    /// The raw text of the line, for error reporting.
    pub raw: String,
}

/// The lines of one schema source, in emission order. A line's `parent` is an
/// index into this arena.
#[derive(Debug, Default)]
pub struct LineTree {
    lines: Vec<Line>,
}

impl LineTree {
    /// Read an entire source. Fails on the first lexical error, including a
    /// block left open at end of input.
    pub fn parse(text: &str) -> Result<LineTree, CompileError> {
        let mut reader = LineReader::new(text);
        let mut lines = Vec::new();
        while let Some(line) = reader.next_line()? {
            lines.push(line);
        }
        Ok(LineTree { lines })
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn get(&self, index: usize) -> Option<&Line> {
        self.lines.get(index)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

struct Token {
    text: String,
    /// An unescaped bare `{`.
    brace: bool,
}

struct OpenBlock {
    index: usize,
    number: usize,
    raw: String,
}

/// Incremental reader producing one [`Line`] at a time.
pub struct LineReader<'a> {
    physical: Vec<&'a str>,
    pos: usize,
    emitted: usize,
    stack: Vec<OpenBlock>,
}

impl<'a> LineReader<'a> {
    pub fn new(text: &'a str) -> LineReader<'a> {
        LineReader {
            physical: text.lines().collect(),
            pos: 0,
            emitted: 0,
            stack: Vec::new(),
        }
    }

    /// Number of blocks currently open.
    pub fn open_blocks(&self) -> usize {
        self.stack.len()
    }

    /// Produce the next line, or `None` at end of input. Blank lines are
    /// skipped and `}` lines are consumed internally.
    pub fn next_line(&mut self) -> Result<Option<Line>, CompileError> {
        while self.pos < self.physical.len() {
            let number = self.pos + 1;
            let first = self.physical[self.pos];
            self.pos += 1;
            let trimmed = first.trim();

            if trimmed.is_empty() {
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix('}') {
                if !rest.trim().is_empty() {
                    return Err(lex_error("unexpected text after \"}\"", number, first));
                }
                if self.stack.pop().is_none() {
                    return Err(lex_error("\"}\" with no open block", number, first));
                }
                continue;
            }

            if trimmed.starts_with('#') {
                return Ok(Some(self.emit(Line {
                    ident: trimmed.to_string(),
                    fields: Vec::new(),
                    parent: self.stack.last().map(|b| b.index),
                    number,
                    comment: true,
                    opens_block: false,
                    raw: first.to_string(),
                })));
            }

            if trimmed.starts_with('{') || trimmed.starts_with('"') {
                return Err(lex_error(
                    "line may not begin with \"{\" or a quote",
                    number,
                    first,
                ));
            }

            let mut raw = first.to_string();
            let mut tokens = Vec::new();
            let mut continued = scan_tokens(trimmed, number, &mut tokens)?;
            while continued {
                if self.pos >= self.physical.len() {
                    return Err(lex_error("dangling \"\\\" at end of input", number, &raw));
                }
                let next = self.physical[self.pos];
                self.pos += 1;
                raw.push('\n');
                raw.push_str(next);
                continued = scan_tokens(next.trim(), number, &mut tokens)?;
            }

            if tokens.is_empty() {
                continue;
            }
            if tokens[0].brace {
                return Err(lex_error(
                    "line may not begin with \"{\" or a quote",
                    number,
                    &raw,
                ));
            }
            for token in &tokens[..tokens.len() - 1] {
                if token.brace {
                    return Err(lex_error(
                        "\"{\" must be the last token on its line",
                        number,
                        &raw,
                    ));
                }
            }

            let opens_block = tokens.last().map(|t| t.brace).unwrap_or(false);
            if opens_block {
                tokens.pop();
            }
            let mut texts = tokens.into_iter().map(|t| t.text);
            let ident = texts.next().expect("tokens checked non-empty");
            return Ok(Some(self.emit(Line {
                ident,
                fields: texts.collect(),
                parent: self.stack.last().map(|b| b.index),
                number,
                comment: false,
                opens_block,
                raw,
            })));
        }

        if let Some(open) = self.stack.last() {
            return Err(lex_error(
                "block is never closed",
                open.number,
                &open.raw,
            ));
        }
        Ok(None)
    }

    fn emit(&mut self, line: Line) -> Line {
        let index = self.emitted;
        self.emitted += 1;
        if line.opens_block {
            self.stack.push(OpenBlock {
                index,
                number: line.number,
                raw: line.raw.clone(),
            });
        }
        line
    }
}

/// Scan the tokens of one physical line into `tokens`. Returns `true` when the
/// line ends with a lone `\` and field parsing continues on the next physical
/// line.
fn scan_tokens(s: &str, number: usize, tokens: &mut Vec<Token>) -> Result<bool, CompileError> {
    let chars: Vec<char> = s.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i].is_whitespace() {
            i += 1;
            continue;
        }

        if chars[i] == '"' {
            i += 1;
            let mut text = String::new();
            let mut closed = false;
            while i < chars.len() {
                match chars[i] {
                    '\\' if i + 1 < chars.len()
                        && (chars[i + 1] == '"' || chars[i + 1] == '\\') =>
                    {
                        text.push(chars[i + 1]);
                        i += 2;
                    }
                    '"' => {
                        closed = true;
                        i += 1;
                        break;
                    }
                    c => {
                        text.push(c);
                        i += 1;
                    }
                }
            }
            if !closed {
                return Err(lex_error("unterminated quoted field", number, s));
            }
            tokens.push(Token { text, brace: false });
            continue;
        }

        let mut text = String::new();
        let mut escaped = false;
        while i < chars.len() && !chars[i].is_whitespace() {
            match chars[i] {
                '\\' if i + 1 < chars.len() && chars[i + 1] == '{' => {
                    text.push('{');
                    escaped = true;
                    i += 2;
                }
                '\\' if i + 1 < chars.len() && chars[i + 1] == '\\' => {
                    text.push('\\');
                    escaped = true;
                    i += 2;
                }
                // An unescaped `{` always starts its own token.
                '{' if !text.is_empty() => break,
                c => {
                    text.push(c);
                    i += 1;
                }
            }
        }

        if text == "\\" && !escaped {
            if chars[i..].iter().all(|c| c.is_whitespace()) {
                return Ok(true);
            }
            return Err(lex_error("stray \"\\\" inside a line", number, s));
        }

        let brace = text == "{" && !escaped;
        tokens.push(Token { text, brace });
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> LineTree {
        LineTree::parse(text).expect("parse failed")
    }

    #[test]
    fn test_block_open_close() {
        let mut reader = LineReader::new("Foo {\n  Byte x\n}\n");
        let foo = reader.next_line().unwrap().unwrap();
        assert_eq!(foo.ident, "Foo");
        assert!(foo.fields.is_empty());
        assert!(foo.opens_block);
        assert_eq!(foo.parent, None);
        assert_eq!(foo.number, 1);
        assert_eq!(reader.open_blocks(), 1);

        let x = reader.next_line().unwrap().unwrap();
        assert_eq!(x.ident, "Byte");
        assert_eq!(x.fields, vec!["x".to_string()]);
        assert_eq!(x.parent, Some(0));
        assert_eq!(x.number, 2);

        assert!(reader.next_line().unwrap().is_none());
        assert_eq!(reader.open_blocks(), 0);
    }

    #[test]
    fn test_stray_close_is_lexical_error() {
        let err = LineTree::parse("Foo {\n}\n}\n").unwrap_err();
        assert!(matches!(err, CompileError::Lex { line: 3, .. }), "{:?}", err);
    }

    #[test]
    fn test_unclosed_block_is_lexical_error() {
        let err = LineTree::parse("Foo {\n  Byte x\n").unwrap_err();
        assert!(matches!(err, CompileError::Lex { line: 1, .. }), "{:?}", err);
    }

    #[test]
    fn test_blank_lines_skipped_and_comments_flagged() {
        let tree = parse("\n   \n# heading\nByte x\n");
        assert_eq!(tree.len(), 2);
        assert!(tree.get(0).unwrap().comment);
        assert_eq!(tree.get(0).unwrap().ident, "# heading");
        assert_eq!(tree.get(1).unwrap().ident, "Byte");
    }

    #[test]
    fn test_nested_parents() {
        let tree = parse("A {\nB {\nByte x\n}\nByte y\n}\n");
        let lines = tree.lines();
        assert_eq!(lines[0].parent, None);
        assert_eq!(lines[1].parent, Some(0));
        assert_eq!(lines[2].parent, Some(1));
        assert_eq!(lines[3].parent, Some(0));
        assert_eq!(lines[3].ident, "Byte");
        assert_eq!(lines[3].fields, vec!["y".to_string()]);
    }

    #[test]
    fn test_quoted_fields_with_escapes() {
        let tree = parse(r#"note "a \"quoted\" value" "back\\slash""#);
        let line = tree.get(0).unwrap();
        assert_eq!(line.ident, "note");
        assert_eq!(
            line.fields,
            vec!["a \"quoted\" value".to_string(), "back\\slash".to_string()]
        );
    }

    #[test]
    fn test_unterminated_quote() {
        let err = LineTree::parse("note \"unfinished\n").unwrap_err();
        assert!(matches!(err, CompileError::Lex { line: 1, .. }), "{:?}", err);
    }

    #[test]
    fn test_leading_brace_and_quote_rejected() {
        assert!(LineTree::parse("{ x\n").is_err());
        assert!(LineTree::parse("\"x\" y\n").is_err());
    }

    #[test]
    fn test_continuation_joins_physical_lines() {
        let tree = parse("cmd a \\\n  b c\n");
        let line = tree.get(0).unwrap();
        assert_eq!(line.ident, "cmd");
        assert_eq!(
            line.fields,
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
        assert_eq!(line.number, 1);
    }

    #[test]
    fn test_dangling_continuation_is_error() {
        let err = LineTree::parse("cmd a \\").unwrap_err();
        assert!(matches!(err, CompileError::Lex { .. }), "{:?}", err);
    }

    #[test]
    fn test_escaped_brace_is_literal_field() {
        let tree = parse("cmd \\{ x\n");
        let line = tree.get(0).unwrap();
        assert!(!line.opens_block);
        assert_eq!(line.fields, vec!["{".to_string(), "x".to_string()]);
    }

    #[test]
    fn test_brace_must_be_last_token() {
        let err = LineTree::parse("cmd { x\n").unwrap_err();
        assert!(matches!(err, CompileError::Lex { line: 1, .. }), "{:?}", err);
    }

    #[test]
    fn test_field_brace_opens_block() {
        let tree = parse("object Bar {\nByte x\n}\n");
        let line = tree.get(0).unwrap();
        assert_eq!(line.ident, "object");
        assert_eq!(line.fields, vec!["Bar".to_string()]);
        assert!(line.opens_block);
        assert_eq!(tree.get(1).unwrap().parent, Some(0));
    }

    #[test]
    fn test_glued_brace_opens_block() {
        let tree = parse("Foo{\n}\n");
        let line = tree.get(0).unwrap();
        assert_eq!(line.ident, "Foo");
        assert!(line.opens_block);
        assert!(line.fields.is_empty());
    }
}
