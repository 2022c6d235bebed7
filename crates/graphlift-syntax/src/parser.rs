//! Recursive descent parser for the authoring grammar.
//!
//! Parses the token stream from the lexer into an [`ast::Module`]. The
//! parser handles:
//! - Class and function definitions with decorators
//! - Statements: assignment, annotated assignment, call expressions, `if`,
//!   `match`, `for`, `while`, `break`, `continue`, `pass`, `return`, imports
//! - Expressions with the usual operator precedence

use graphlift_core::{Literal, SourceSpan};

use crate::ast::{
    BinaryOp, BoolOp, Call, ClassDef, CompareOp, Expr, ExprKind, FunctionDef, Keyword, MatchCase,
    Module, Param, Pattern, Stmt, StmtKind, UnaryOp,
};
use crate::error::{LineIndex, ParseError};
use crate::lexer::{Lexer, Span, SpannedToken, Token};

/// Parses a complete source file.
pub fn parse_module(source: &str) -> Result<Module, ParseError> {
    Parser::new(source)?.parse_module()
}

/// Parser state
pub struct Parser {
    lines: LineIndex,
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl Parser {
    /// Create a new parser from source code
    pub fn new(source: &str) -> Result<Self, ParseError> {
        let tokens: Vec<SpannedToken> = Lexer::new(source).collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            lines: LineIndex::new(source),
            tokens,
            pos: 0,
        })
    }

    // -------------------------------------------------------------------------
    // Token navigation
    // -------------------------------------------------------------------------

    fn current(&self) -> &SpannedToken {
        static EOF_TOKEN: std::sync::OnceLock<SpannedToken> = std::sync::OnceLock::new();
        self.tokens.get(self.pos).unwrap_or_else(|| {
            EOF_TOKEN.get_or_init(|| SpannedToken {
                token: Token::Eof,
                span: Span::new(0, 0),
            })
        })
    }

    fn peek(&self) -> &Token {
        &self.current().token
    }

    fn peek_nth(&self, n: usize) -> &Token {
        self.tokens
            .get(self.pos + n)
            .map(|t| &t.token)
            .unwrap_or(&Token::Eof)
    }

    fn peek_span(&self) -> Span {
        self.current().span
    }

    fn advance(&mut self) -> SpannedToken {
        let token = self.current().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn at_end(&self) -> bool {
        matches!(self.peek(), Token::Eof)
    }

    fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<SpannedToken, ParseError> {
        if self.check(expected) {
            Ok(self.advance())
        } else {
            Err(self.error(format!("expected {}, found {}", expected, self.peek())))
        }
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        match self.peek().clone() {
            Token::Ident(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(self.error(format!("expected identifier, found {other}"))),
        }
    }

    fn error(&self, message: String) -> ParseError {
        let (line, column) = self.lines.line_col(self.peek_span().start);
        ParseError::Syntax {
            message,
            line,
            column,
        }
    }

    /// Span from `start` to the end of the last real (non-layout) token.
    fn span_from(&self, start: usize) -> SourceSpan {
        let end = self.tokens[..self.pos.min(self.tokens.len())]
            .iter()
            .rev()
            .find(|t| {
                !matches!(
                    t.token,
                    Token::Newline | Token::Indent | Token::Dedent | Token::Eof
                )
            })
            .map(|t| t.span.end.saturating_sub(1).max(start))
            .unwrap_or(start);
        SourceSpan::new(self.lines.line(start), self.lines.line(end))
    }

    fn at_statement_end(&self) -> bool {
        matches!(self.peek(), Token::Newline | Token::Eof | Token::Dedent)
    }

    // -------------------------------------------------------------------------
    // Top-level parsing
    // -------------------------------------------------------------------------

    /// Parse a complete module
    pub fn parse_module(&mut self) -> Result<Module, ParseError> {
        let mut body = Vec::new();
        loop {
            while self.eat(&Token::Newline) {}
            if self.at_end() {
                break;
            }
            body.push(self.parse_statement()?);
        }
        Ok(Module { body })
    }

    /// Parse a block after its `:` (NEWLINE INDENT statements DEDENT, or a
    /// single simple statement on the same line)
    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        if !self.eat(&Token::Newline) {
            let stmt = self.parse_simple_statement()?;
            self.end_simple_statement()?;
            return Ok(vec![stmt]);
        }

        self.expect(&Token::Indent)?;
        let mut statements = Vec::new();
        loop {
            while self.eat(&Token::Newline) {}
            if self.check(&Token::Dedent) || self.at_end() {
                break;
            }
            statements.push(self.parse_statement()?);
        }
        if !self.at_end() {
            self.expect(&Token::Dedent)?;
        }
        Ok(statements)
    }

    // -------------------------------------------------------------------------
    // Statement parsing
    // -------------------------------------------------------------------------

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        match self.peek() {
            Token::At => self.parse_decorated(),
            Token::Def => self.parse_function_def(Vec::new()),
            Token::Class => self.parse_class_def(Vec::new()),
            Token::If => self.parse_if(),
            Token::For => self.parse_for(),
            Token::While => self.parse_while(),
            Token::Match => self.parse_match(),
            _ => {
                let stmt = self.parse_simple_statement()?;
                self.end_simple_statement()?;
                Ok(stmt)
            }
        }
    }

    fn end_simple_statement(&mut self) -> Result<(), ParseError> {
        if self.eat(&Token::Newline) || self.at_statement_end() {
            Ok(())
        } else {
            Err(self.error(format!("expected end of line, found {}", self.peek())))
        }
    }

    fn parse_decorated(&mut self) -> Result<Stmt, ParseError> {
        let mut decorators = Vec::new();
        while self.eat(&Token::At) {
            decorators.push(self.parse_expr()?);
            self.expect(&Token::Newline)?;
        }
        match self.peek() {
            Token::Def => self.parse_function_def(decorators),
            Token::Class => self.parse_class_def(decorators),
            other => Err(self.error(format!("expected def or class after decorator, found {other}"))),
        }
    }

    fn parse_function_def(&mut self, decorators: Vec<Expr>) -> Result<Stmt, ParseError> {
        let start = self.peek_span().start;
        self.expect(&Token::Def)?;
        let name = self.expect_ident()?;
        self.expect(&Token::LParen)?;

        let mut params = Vec::new();
        while !self.check(&Token::RParen) {
            let param_name = self.expect_ident()?;
            let annotation = if self.eat(&Token::Colon) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            let default = if self.eat(&Token::Eq) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            params.push(Param {
                name: param_name,
                annotation,
                default,
            });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RParen)?;

        let returns = if self.eat(&Token::Arrow) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.expect(&Token::Colon)?;
        let body = self.parse_block()?;
        let span = self.span_from(start);

        Ok(Stmt::new(
            StmtKind::FunctionDef(FunctionDef {
                name,
                params,
                returns,
                decorators,
                body,
                span,
            }),
            span,
        ))
    }

    fn parse_class_def(&mut self, decorators: Vec<Expr>) -> Result<Stmt, ParseError> {
        let start = self.peek_span().start;
        self.expect(&Token::Class)?;
        let name = self.expect_ident()?;
        let bases = if self.eat(&Token::LParen) {
            let bases = self.parse_expr_list(&Token::RParen)?;
            self.expect(&Token::RParen)?;
            bases
        } else {
            Vec::new()
        };
        self.expect(&Token::Colon)?;
        let body = self.parse_block()?;
        let span = self.span_from(start);

        Ok(Stmt::new(
            StmtKind::ClassDef(ClassDef {
                name,
                bases,
                decorators,
                body,
                span,
            }),
            span,
        ))
    }

    /// Parses `if` or `elif`; an `elif` chain nests in `orelse`.
    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        let start = self.peek_span().start;
        self.advance(); // `if` or `elif`
        let test = self.parse_expr()?;
        self.expect(&Token::Colon)?;
        let body = self.parse_block()?;

        let orelse = if self.check(&Token::Elif) {
            vec![self.parse_if()?]
        } else if self.eat(&Token::Else) {
            self.expect(&Token::Colon)?;
            self.parse_block()?
        } else {
            Vec::new()
        };

        Ok(Stmt::new(
            StmtKind::If { test, body, orelse },
            self.span_from(start),
        ))
    }

    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        let start = self.peek_span().start;
        self.expect(&Token::For)?;
        let target = self.parse_target_list()?;
        self.expect(&Token::In)?;
        let iter = self.parse_expr()?;
        self.expect(&Token::Colon)?;
        let body = self.parse_block()?;
        if self.check(&Token::Else) {
            return Err(self.error("for-else is not supported".to_string()));
        }

        Ok(Stmt::new(
            StmtKind::For { target, iter, body },
            self.span_from(start),
        ))
    }

    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        let start = self.peek_span().start;
        self.expect(&Token::While)?;
        let test = self.parse_expr()?;
        self.expect(&Token::Colon)?;
        let body = self.parse_block()?;

        Ok(Stmt::new(
            StmtKind::While { test, body },
            self.span_from(start),
        ))
    }

    fn parse_match(&mut self) -> Result<Stmt, ParseError> {
        let start = self.peek_span().start;
        self.expect(&Token::Match)?;
        let subject = self.parse_expr()?;
        self.expect(&Token::Colon)?;
        self.expect(&Token::Newline)?;
        self.expect(&Token::Indent)?;

        let mut cases = Vec::new();
        loop {
            while self.eat(&Token::Newline) {}
            if self.check(&Token::Dedent) || self.at_end() {
                break;
            }
            let case_start = self.peek_span().start;
            self.expect(&Token::Case)?;
            let pattern = self.parse_pattern()?;
            self.expect(&Token::Colon)?;
            let body = self.parse_block()?;
            cases.push(MatchCase {
                pattern,
                body,
                span: self.span_from(case_start),
            });
        }
        if !self.at_end() {
            self.expect(&Token::Dedent)?;
        }
        if cases.is_empty() {
            return Err(self.error("match statement has no cases".to_string()));
        }

        Ok(Stmt::new(
            StmtKind::Match { subject, cases },
            self.span_from(start),
        ))
    }

    fn parse_pattern(&mut self) -> Result<Pattern, ParseError> {
        let negative = self.eat(&Token::Minus);
        let literal = match self.peek().clone() {
            Token::Ident(name) if name == "_" && !negative => {
                self.advance();
                return Ok(Pattern::Wildcard);
            }
            Token::Int(v) => Literal::Int(if negative { -v } else { v }),
            Token::Float(v) => Literal::Float(if negative { -v } else { v }),
            Token::String(s) if !negative => Literal::Str(s),
            Token::True if !negative => Literal::Bool(true),
            Token::False if !negative => Literal::Bool(false),
            Token::None_ if !negative => Literal::None,
            other => return Err(self.error(format!("unsupported match pattern: {other}"))),
        };
        self.advance();
        Ok(Pattern::Literal(literal))
    }

    fn parse_simple_statement(&mut self) -> Result<Stmt, ParseError> {
        let start = self.peek_span().start;
        let kind = match self.peek() {
            Token::Pass => {
                self.advance();
                StmtKind::Pass
            }
            Token::Break => {
                self.advance();
                StmtKind::Break
            }
            Token::Continue => {
                self.advance();
                StmtKind::Continue
            }
            Token::Return => {
                self.advance();
                if self.at_statement_end() {
                    StmtKind::Return(None)
                } else {
                    StmtKind::Return(Some(self.parse_expr_or_tuple()?))
                }
            }
            Token::Import => {
                self.advance();
                let module = self.parse_dotted_name()?;
                // The alias carries no meaning for lifting.
                if self.eat(&Token::As) {
                    self.expect_ident()?;
                }
                StmtKind::Import {
                    module,
                    names: Vec::new(),
                }
            }
            Token::From => self.parse_from_import()?,
            _ => self.parse_expr_statement()?,
        };
        Ok(Stmt::new(kind, self.span_from(start)))
    }

    fn parse_dotted_name(&mut self) -> Result<String, ParseError> {
        let mut name = String::new();
        while self.eat(&Token::Dot) {
            name.push('.');
        }
        name.push_str(&self.expect_ident()?);
        while self.eat(&Token::Dot) {
            name.push('.');
            name.push_str(&self.expect_ident()?);
        }
        Ok(name)
    }

    fn parse_from_import(&mut self) -> Result<StmtKind, ParseError> {
        self.expect(&Token::From)?;
        let module = self.parse_dotted_name()?;
        self.expect(&Token::Import)?;

        let mut names = Vec::new();
        if self.eat(&Token::Star) {
            names.push("*".to_string());
            return Ok(StmtKind::Import { module, names });
        }
        let parenthesized = self.eat(&Token::LParen);
        loop {
            names.push(self.expect_ident()?);
            if self.eat(&Token::As) {
                self.expect_ident()?;
            }
            if !self.eat(&Token::Comma) || (parenthesized && self.check(&Token::RParen)) {
                break;
            }
        }
        if parenthesized {
            self.expect(&Token::RParen)?;
        }
        Ok(StmtKind::Import { module, names })
    }

    /// Parse assignment, annotated assignment or expression statement
    fn parse_expr_statement(&mut self) -> Result<StmtKind, ParseError> {
        let first = self.parse_expr_or_tuple()?;

        if self.eat(&Token::Colon) {
            self.check_target(&first)?;
            let annotation = self.parse_expr()?;
            let value = if self.eat(&Token::Eq) {
                Some(self.parse_expr_or_tuple()?)
            } else {
                None
            };
            return Ok(StmtKind::AnnAssign {
                target: first,
                annotation,
                value,
            });
        }

        if !self.check(&Token::Eq) {
            return Ok(StmtKind::Expr(first));
        }

        let mut targets = vec![first];
        let value = loop {
            self.expect(&Token::Eq)?;
            let next = self.parse_expr_or_tuple()?;
            if self.check(&Token::Eq) {
                targets.push(next);
            } else {
                break next;
            }
        };
        for target in &targets {
            self.check_target(target)?;
        }
        Ok(StmtKind::Assign { targets, value })
    }

    fn check_target(&self, target: &Expr) -> Result<(), ParseError> {
        match &target.kind {
            ExprKind::Name(_) | ExprKind::Attribute { .. } | ExprKind::Subscript { .. } => Ok(()),
            ExprKind::Tuple(items) | ExprKind::List(items) => {
                items.iter().try_for_each(|item| self.check_target(item))
            }
            _ => Err(ParseError::Syntax {
                message: "cannot assign to expression".to_string(),
                line: target.span.line,
                column: 1,
            }),
        }
    }

    /// `a, b` style target of a `for` loop (stops before `in`)
    fn parse_target_list(&mut self) -> Result<Expr, ParseError> {
        let start = self.peek_span().start;
        let first = self.parse_postfix_expr()?;
        if !self.check(&Token::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(&Token::Comma) {
            if self.check(&Token::In) {
                break;
            }
            items.push(self.parse_postfix_expr()?);
        }
        Ok(Expr::new(ExprKind::Tuple(items), self.span_from(start)))
    }

    // -------------------------------------------------------------------------
    // Expression parsing
    // -------------------------------------------------------------------------

    /// An expression, or a bare comma-separated tuple of expressions
    fn parse_expr_or_tuple(&mut self) -> Result<Expr, ParseError> {
        let start = self.peek_span().start;
        let first = self.parse_expr()?;
        if !self.check(&Token::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(&Token::Comma) {
            if self.at_statement_end() || self.check(&Token::Eq) || self.check(&Token::Colon) {
                break;
            }
            items.push(self.parse_expr()?);
        }
        Ok(Expr::new(ExprKind::Tuple(items), self.span_from(start)))
    }

    pub fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_or_expr()
    }

    fn parse_or_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_bool_chain(&Token::Or, BoolOp::Or, Self::parse_and_expr)
    }

    fn parse_and_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_bool_chain(&Token::And, BoolOp::And, Self::parse_not_expr)
    }

    fn parse_bool_chain(
        &mut self,
        token: &Token,
        op: BoolOp,
        operand: fn(&mut Self) -> Result<Expr, ParseError>,
    ) -> Result<Expr, ParseError> {
        let start = self.peek_span().start;
        let first = operand(self)?;
        if !self.check(token) {
            return Ok(first);
        }
        let mut values = vec![first];
        while self.eat(token) {
            values.push(operand(self)?);
        }
        Ok(Expr::new(ExprKind::BoolOp { op, values }, self.span_from(start)))
    }

    fn parse_not_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.peek_span().start;
        if self.eat(&Token::Not) {
            let operand = self.parse_not_expr()?;
            return Ok(Expr::new(
                ExprKind::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                },
                self.span_from(start),
            ));
        }
        self.parse_comparison_expr()
    }

    fn parse_comparison_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.peek_span().start;
        let mut left = self.parse_additive_expr()?;

        loop {
            let op = match self.peek() {
                Token::EqEq => CompareOp::Eq,
                Token::NotEq => CompareOp::NotEq,
                Token::Lt => CompareOp::Lt,
                Token::Le => CompareOp::Le,
                Token::Gt => CompareOp::Gt,
                Token::Ge => CompareOp::Ge,
                Token::In => CompareOp::In,
                Token::Not if matches!(self.peek_nth(1), Token::In) => {
                    self.advance();
                    CompareOp::NotIn
                }
                Token::Is if matches!(self.peek_nth(1), Token::Not) => {
                    self.advance();
                    CompareOp::IsNot
                }
                Token::Is => CompareOp::Is,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive_expr()?;
            left = Expr::new(
                ExprKind::Compare {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                self.span_from(start),
            );
        }

        Ok(left)
    }

    fn parse_additive_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.peek_span().start;
        let mut left = self.parse_multiplicative_expr()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative_expr()?;
            left = Expr::new(
                ExprKind::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                self.span_from(start),
            );
        }
        Ok(left)
    }

    fn parse_multiplicative_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.peek_span().start;
        let mut left = self.parse_unary_expr()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::DoubleSlash => BinaryOp::FloorDiv,
                Token::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary_expr()?;
            left = Expr::new(
                ExprKind::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                self.span_from(start),
            );
        }
        Ok(left)
    }

    fn parse_unary_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.peek_span().start;
        let op = match self.peek() {
            Token::Minus => UnaryOp::Neg,
            Token::Plus => UnaryOp::Pos,
            _ => return self.parse_postfix_expr(),
        };
        self.advance();
        let operand = self.parse_unary_expr()?;
        Ok(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            self.span_from(start),
        ))
    }

    fn parse_postfix_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.peek_span().start;
        let mut expr = self.parse_primary_expr()?;

        loop {
            match self.peek() {
                Token::Dot => {
                    self.advance();
                    let attr = self.expect_ident()?;
                    expr = Expr::new(
                        ExprKind::Attribute {
                            value: Box::new(expr),
                            attr,
                        },
                        self.span_from(start),
                    );
                }
                Token::LParen => {
                    self.advance();
                    let (args, keywords) = self.parse_call_args()?;
                    self.expect(&Token::RParen)?;
                    expr = Expr::new(
                        ExprKind::Call(Call {
                            func: Box::new(expr),
                            args,
                            keywords,
                        }),
                        self.span_from(start),
                    );
                }
                Token::LBracket => {
                    self.advance();
                    let index = self.parse_expr_or_tuple()?;
                    self.expect(&Token::RBracket)?;
                    expr = Expr::new(
                        ExprKind::Subscript {
                            value: Box::new(expr),
                            index: Box::new(index),
                        },
                        self.span_from(start),
                    );
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_call_args(&mut self) -> Result<(Vec<Expr>, Vec<Keyword>), ParseError> {
        let mut args = Vec::new();
        let mut keywords = Vec::new();

        while !self.check(&Token::RParen) {
            let is_keyword =
                matches!(self.peek(), Token::Ident(_)) && matches!(self.peek_nth(1), Token::Eq);
            if is_keyword {
                let name = self.expect_ident()?;
                self.expect(&Token::Eq)?;
                let value = self.parse_expr()?;
                keywords.push(Keyword { name, value });
            } else {
                args.push(self.parse_expr()?);
            }
            if !self.eat(&Token::Comma) {
                break;
            }
        }

        Ok((args, keywords))
    }

    fn parse_expr_list(&mut self, close: &Token) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        while !self.check(close) {
            items.push(self.parse_expr()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        Ok(items)
    }

    fn parse_primary_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.peek_span().start;
        let kind = match self.peek().clone() {
            Token::Ident(name) => {
                self.advance();
                ExprKind::Name(name)
            }
            Token::Int(v) => {
                self.advance();
                ExprKind::Constant(Literal::Int(v))
            }
            Token::Float(v) => {
                self.advance();
                ExprKind::Constant(Literal::Float(v))
            }
            Token::String(s) => {
                self.advance();
                let mut text = s;
                // Adjacent literals concatenate.
                while let Token::String(next) = self.peek().clone() {
                    self.advance();
                    text.push_str(&next);
                }
                ExprKind::Constant(Literal::Str(text))
            }
            Token::FString(s) => {
                self.advance();
                ExprKind::FString(s)
            }
            Token::True => {
                self.advance();
                ExprKind::Constant(Literal::Bool(true))
            }
            Token::False => {
                self.advance();
                ExprKind::Constant(Literal::Bool(false))
            }
            Token::None_ => {
                self.advance();
                ExprKind::Constant(Literal::None)
            }
            Token::LParen => {
                self.advance();
                if self.eat(&Token::RParen) {
                    ExprKind::Tuple(Vec::new())
                } else {
                    let first = self.parse_expr()?;
                    if self.check(&Token::Comma) {
                        let mut items = vec![first];
                        while self.eat(&Token::Comma) {
                            if self.check(&Token::RParen) {
                                break;
                            }
                            items.push(self.parse_expr()?);
                        }
                        self.expect(&Token::RParen)?;
                        ExprKind::Tuple(items)
                    } else {
                        self.expect(&Token::RParen)?;
                        return Ok(first);
                    }
                }
            }
            Token::LBracket => {
                self.advance();
                let items = self.parse_expr_list(&Token::RBracket)?;
                self.expect(&Token::RBracket)?;
                ExprKind::List(items)
            }
            Token::LBrace => {
                self.advance();
                let mut entries = Vec::new();
                while !self.check(&Token::RBrace) {
                    let key = self.parse_expr()?;
                    self.expect(&Token::Colon)?;
                    let value = self.parse_expr()?;
                    entries.push((key, value));
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
                self.expect(&Token::RBrace)?;
                ExprKind::Dict(entries)
            }
            other => return Err(self.error(format!("unexpected token in expression: {other}"))),
        };
        Ok(Expr::new(kind, self.span_from(start)))
    }
}
