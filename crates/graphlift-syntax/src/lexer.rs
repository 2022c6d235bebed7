//! Lexer for the authoring grammar.
//!
//! Uses logos for tokenization with custom handling for indentation-based
//! blocks (INDENT/DEDENT tokens) and logical line ends (NEWLINE tokens).
//!
//! # Indentation Handling
//!
//! The lexer tracks indentation levels using a stack. At the first token of
//! each logical line:
//! - If indentation increases: emit INDENT
//! - If indentation decreases: emit one or more DEDENT tokens
//! - Blank lines and comment-only lines are skipped entirely
//!
//! A NEWLINE is emitted at the end of every non-blank logical line. Inside
//! brackets line breaks are ignored, so calls may span lines.

use std::collections::VecDeque;
use std::fmt;

use logos::{Logos, SpannedIter};

use crate::error::{LineIndex, ParseError};

/// Source span (byte offsets)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// A token with its span
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn quoted(slice: &str, skip: usize, quote_len: usize) -> String {
    unescape(&slice[skip + quote_len..slice.len() - quote_len])
}

/// Token types of the authoring grammar
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\f]+")] // Skip horizontal whitespace (not newlines)
pub enum Token {
    // Keywords
    #[token("def")]
    Def,
    #[token("class")]
    Class,
    #[token("if")]
    If,
    #[token("elif")]
    Elif,
    #[token("else")]
    Else,
    #[token("for")]
    For,
    #[token("in")]
    In,
    #[token("while")]
    While,
    #[token("match")]
    Match,
    #[token("case")]
    Case,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("pass")]
    Pass,
    #[token("return")]
    Return,
    #[token("import")]
    Import,
    #[token("from")]
    From,
    #[token("as")]
    As,
    #[token("and")]
    And,
    #[token("or")]
    Or,
    #[token("not")]
    Not,
    #[token("is")]
    Is,
    #[token("True")]
    True,
    #[token("False")]
    False,
    #[token("None")]
    None_,

    // Identifiers
    #[regex(r"[\p{XID_Start}_][\p{XID_Continue}]*", |lex| lex.slice().to_string())]
    Ident(String),

    // Literals
    #[regex(r"[0-9]+\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    #[regex(r"[0-9]+", priority = 3, callback = |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    #[regex(r#""""([^"]|"[^"]|""[^"])*""""#, |lex| quoted(lex.slice(), 0, 3))]
    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| quoted(lex.slice(), 0, 1))]
    #[regex(r#"'([^'\\\n]|\\.)*'"#, |lex| quoted(lex.slice(), 0, 1))]
    String(String),

    #[regex(r#"f"([^"\\\n]|\\.)*""#, |lex| quoted(lex.slice(), 1, 1))]
    #[regex(r#"f'([^'\\\n]|\\.)*'"#, |lex| quoted(lex.slice(), 1, 1))]
    FString(String),

    // Operators
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("//")]
    DoubleSlash,
    #[token("%")]
    Percent,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("=")]
    Eq,
    #[token("->")]
    Arrow,

    // Delimiters
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("@")]
    At,

    // Physical line break (converted to NEWLINE/INDENT/DEDENT)
    #[regex(r"\n")]
    LineBreak,

    // Comment (skipped)
    #[regex(r"#[^\n]*")]
    Comment,

    // Synthetic tokens (not matched by logos directly)
    Newline,
    Indent,
    Dedent,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Def => write!(f, "def"),
            Token::Class => write!(f, "class"),
            Token::If => write!(f, "if"),
            Token::Elif => write!(f, "elif"),
            Token::Else => write!(f, "else"),
            Token::For => write!(f, "for"),
            Token::In => write!(f, "in"),
            Token::While => write!(f, "while"),
            Token::Match => write!(f, "match"),
            Token::Case => write!(f, "case"),
            Token::Break => write!(f, "break"),
            Token::Continue => write!(f, "continue"),
            Token::Pass => write!(f, "pass"),
            Token::Return => write!(f, "return"),
            Token::Import => write!(f, "import"),
            Token::From => write!(f, "from"),
            Token::As => write!(f, "as"),
            Token::And => write!(f, "and"),
            Token::Or => write!(f, "or"),
            Token::Not => write!(f, "not"),
            Token::Is => write!(f, "is"),
            Token::True => write!(f, "True"),
            Token::False => write!(f, "False"),
            Token::None_ => write!(f, "None"),
            Token::Ident(s) => write!(f, "{s}"),
            Token::Float(n) => write!(f, "{n}"),
            Token::Int(n) => write!(f, "{n}"),
            Token::String(s) => write!(f, "\"{s}\""),
            Token::FString(s) => write!(f, "f\"{s}\""),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::DoubleSlash => write!(f, "//"),
            Token::Percent => write!(f, "%"),
            Token::EqEq => write!(f, "=="),
            Token::NotEq => write!(f, "!="),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::Le => write!(f, "<="),
            Token::Ge => write!(f, ">="),
            Token::Eq => write!(f, "="),
            Token::Arrow => write!(f, "->"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::Comma => write!(f, ","),
            Token::Colon => write!(f, ":"),
            Token::Dot => write!(f, "."),
            Token::At => write!(f, "@"),
            Token::LineBreak => write!(f, "\\n"),
            Token::Comment => write!(f, "# comment"),
            Token::Newline => write!(f, "NEWLINE"),
            Token::Indent => write!(f, "INDENT"),
            Token::Dedent => write!(f, "DEDENT"),
            Token::Eof => write!(f, "EOF"),
        }
    }
}

/// Lexer wrapper that handles indentation
pub struct Lexer<'source> {
    source: &'source str,
    lines: LineIndex,
    inner: SpannedIter<'source, Token>,
    indent_stack: Vec<usize>,
    pending: VecDeque<SpannedToken>,
    at_line_start: bool,
    /// Whether the current logical line produced any token yet
    line_has_content: bool,
    /// Track bracket nesting depth - no NEWLINE/INDENT/DEDENT inside brackets
    bracket_depth: usize,
    done: bool,
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source str) -> Self {
        Self {
            source,
            lines: LineIndex::new(source),
            inner: Token::lexer(source).spanned(),
            indent_stack: vec![0],
            pending: VecDeque::new(),
            at_line_start: true,
            line_has_content: false,
            bracket_depth: 0,
            done: false,
        }
    }

    /// Measure the indentation of the line containing `pos`
    fn measure_indent(&self, pos: usize) -> usize {
        let line_start = self.source[..pos].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let mut indent = 0;
        for ch in self.source[line_start..].chars() {
            match ch {
                ' ' => indent += 1,
                '\t' => indent += 4, // Treat tabs as 4 spaces
                _ => break,
            }
        }
        indent
    }

    /// Process indentation at the first token of a logical line
    fn process_indentation(&mut self, token_start: usize) -> Result<(), ParseError> {
        let indent = self.measure_indent(token_start);
        let current = self.indent_stack.last().copied().unwrap_or(0);
        let span = Span::new(token_start, token_start);

        if indent > current {
            self.indent_stack.push(indent);
            self.pending.push_back(SpannedToken {
                token: Token::Indent,
                span,
            });
        } else if indent < current {
            // Indent decreased - may need multiple dedents
            while self.indent_stack.last().is_some_and(|&top| top > indent) {
                self.indent_stack.pop();
                self.pending.push_back(SpannedToken {
                    token: Token::Dedent,
                    span,
                });
            }
            if self.indent_stack.last() != Some(&indent) {
                return Err(ParseError::InconsistentDedent {
                    line: self.lines.line(token_start),
                });
            }
        }
        Ok(())
    }

    /// Emit the final NEWLINE, remaining dedents and EOF
    fn finish(&mut self) {
        let pos = self.source.len();
        let span = Span::new(pos, pos);
        if self.line_has_content {
            self.pending.push_back(SpannedToken {
                token: Token::Newline,
                span,
            });
        }
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            self.pending.push_back(SpannedToken {
                token: Token::Dedent,
                span,
            });
        }
        self.pending.push_back(SpannedToken {
            token: Token::Eof,
            span,
        });
    }
}

impl<'source> Iterator for Lexer<'source> {
    type Item = Result<SpannedToken, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            // Return any pending tokens first
            if let Some(token) = self.pending.pop_front() {
                return Some(Ok(token));
            }
            if self.done {
                return None;
            }

            match self.inner.next() {
                Some((Ok(token), span)) => {
                    let span = Span::new(span.start, span.end);
                    match token {
                        Token::Comment => continue,
                        Token::LineBreak => {
                            if self.bracket_depth == 0 {
                                if self.line_has_content {
                                    self.pending.push_back(SpannedToken {
                                        token: Token::Newline,
                                        span,
                                    });
                                    self.line_has_content = false;
                                }
                                self.at_line_start = true;
                            }
                            continue;
                        }
                        _ => {}
                    }

                    if self.at_line_start && self.bracket_depth == 0 {
                        if let Err(err) = self.process_indentation(span.start) {
                            self.done = true;
                            return Some(Err(err));
                        }
                    }
                    self.at_line_start = false;
                    self.line_has_content = true;

                    match &token {
                        Token::LParen | Token::LBracket | Token::LBrace => {
                            self.bracket_depth += 1;
                        }
                        Token::RParen | Token::RBracket | Token::RBrace => {
                            self.bracket_depth = self.bracket_depth.saturating_sub(1);
                        }
                        _ => {}
                    }

                    self.pending.push_back(SpannedToken { token, span });
                }
                Some((Err(_), span)) => {
                    self.done = true;
                    let (line, column) = self.lines.line_col(span.start);
                    return Some(Err(ParseError::Lexical {
                        text: self.source[span.start..span.end].to_string(),
                        line,
                        column,
                    }));
                }
                None => {
                    self.done = true;
                    self.finish();
                }
            }
        }
    }
}

/// Convenience function to lex a source string into a vector of tokens
pub fn lex(source: &str) -> Result<Vec<SpannedToken>, ParseError> {
    Lexer::new(source).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_types(source: &str) -> Vec<Token> {
        lex(source)
            .unwrap()
            .into_iter()
            .map(|st| st.token)
            .collect()
    }

    fn ident(name: &str) -> Token {
        Token::Ident(name.to_string())
    }

    #[test]
    fn test_keywords() {
        let tokens = token_types("def if elif else for in match case break");
        assert_eq!(
            tokens,
            vec![
                Token::Def,
                Token::If,
                Token::Elif,
                Token::Else,
                Token::For,
                Token::In,
                Token::Match,
                Token::Case,
                Token::Break,
                Token::Newline,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_literals() {
        let tokens = token_types(r#"42 3.5 "hi" 'there' True None"#);
        assert_eq!(
            tokens,
            vec![
                Token::Int(42),
                Token::Float(3.5),
                Token::String("hi".to_string()),
                Token::String("there".to_string()),
                Token::True,
                Token::None_,
                Token::Newline,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        let tokens = token_types(r#""a\"b\n""#);
        assert_eq!(tokens[0], Token::String("a\"b\n".to_string()));
    }

    #[test]
    fn test_docstring_and_fstring() {
        let tokens = token_types("\"\"\"doc\nstring\"\"\"\nf\"x={x}\"");
        assert_eq!(
            tokens,
            vec![
                Token::String("doc\nstring".to_string()),
                Token::Newline,
                Token::FString("x={x}".to_string()),
                Token::Newline,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_simple_indent() {
        let source = "def f(self):\n    x = 1\n";
        let tokens = token_types(source);
        assert_eq!(
            tokens,
            vec![
                Token::Def,
                ident("f"),
                Token::LParen,
                ident("self"),
                Token::RParen,
                Token::Colon,
                Token::Newline,
                Token::Indent,
                ident("x"),
                Token::Eq,
                Token::Int(1),
                Token::Newline,
                Token::Dedent,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_multiple_dedents() {
        let source = "if x:\n    if y:\n        z = 1\na = 2";
        let tokens = token_types(source);
        let dedent_count = tokens.iter().filter(|t| **t == Token::Dedent).count();
        assert_eq!(dedent_count, 2);
        // The dedents come after the NEWLINE that ends `z = 1`.
        let newline_at = tokens.iter().position(|t| *t == Token::Int(1)).unwrap() + 1;
        assert_eq!(tokens[newline_at], Token::Newline);
        assert_eq!(tokens[newline_at + 1], Token::Dedent);
    }

    #[test]
    fn test_blank_and_comment_lines_are_skipped() {
        let tokens = token_types("x = 1  # trailing\n\n    # indented comment\ny = 2\n");
        assert_eq!(
            tokens,
            vec![
                ident("x"),
                Token::Eq,
                Token::Int(1),
                Token::Newline,
                ident("y"),
                Token::Eq,
                Token::Int(2),
                Token::Newline,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_brackets_suppress_newlines() {
        let tokens = token_types("f(a,\n      b)\n");
        assert_eq!(
            tokens,
            vec![
                ident("f"),
                Token::LParen,
                ident("a"),
                Token::Comma,
                ident("b"),
                Token::RParen,
                Token::Newline,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_inconsistent_dedent() {
        let err = lex("if x:\n        y = 1\n    z = 2\n").unwrap_err();
        assert_eq!(err, ParseError::InconsistentDedent { line: 3 });
    }

    #[test]
    fn test_unicode_identifiers() {
        let tokens = token_types("class 示例图:\n    事件源实体 = _临时1\n");
        assert_eq!(
            tokens,
            vec![
                Token::Class,
                ident("示例图"),
                Token::Colon,
                Token::Newline,
                Token::Indent,
                ident("事件源实体"),
                Token::Eq,
                ident("_临时1"),
                Token::Newline,
                Token::Dedent,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_unexpected_character_after_wide_text() {
        let err = lex("名字 = $").unwrap_err();
        assert!(matches!(err, ParseError::Lexical { ref text, line: 1, column: 6 } if text == "$"));
    }

    #[test]
    fn test_unexpected_character() {
        let err = lex("x = $").unwrap_err();
        assert!(matches!(err, ParseError::Lexical { ref text, line: 1, column: 5 } if text == "$"));
    }
}
