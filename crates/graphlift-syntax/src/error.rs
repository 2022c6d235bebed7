//! Syntax errors with source positions.

use thiserror::Error;

/// A failure to tokenize or parse source text. Lines and columns are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("line {line}, column {column}: unexpected character '{text}'")]
    Lexical { text: String, line: u32, column: u32 },

    #[error("line {line}: unindent does not match any outer indentation level")]
    InconsistentDedent { line: u32 },

    #[error("line {line}, column {column}: {message}")]
    Syntax {
        message: String,
        line: u32,
        column: u32,
    },
}

impl ParseError {
    pub fn line(&self) -> u32 {
        match self {
            ParseError::Lexical { line, .. }
            | ParseError::InconsistentDedent { line }
            | ParseError::Syntax { line, .. } => *line,
        }
    }
}

/// Maps byte offsets to 1-based line/column pairs. Columns count
/// characters, not bytes.
#[derive(Debug, Clone)]
pub struct LineIndex {
    source: String,
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        LineIndex {
            source: source.to_string(),
            line_starts,
        }
    }

    pub fn line(&self, offset: usize) -> u32 {
        self.line_col(offset).0
    }

    pub fn line_col(&self, offset: usize) -> (u32, u32) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(next) => next - 1,
        };
        let start = self.line_starts[line];
        let column = self
            .source
            .get(start..offset)
            .map_or(offset - start, |text| text.chars().count());
        (line as u32 + 1, column as u32 + 1)
    }
}
