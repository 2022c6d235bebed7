//! The constrained statement grammar graphs are authored in.
//!
//! Source text is indentation-structured: classes hold methods, methods hold
//! statement lists made of assignments, annotated assignments, `if`, `match`,
//! bounded `for`, `break` and call expressions. [`parse_module`] turns text
//! into an [`ast::Module`]; [`printer::print_module`] turns one back into text.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod printer;

pub use ast::{
    Call, ClassDef, Expr, ExprKind, FunctionDef, Keyword, MatchCase, Module, Param, Pattern, Stmt,
    StmtKind,
};
pub use error::ParseError;
pub use parser::{parse_module, Parser};
pub use printer::print_module;
