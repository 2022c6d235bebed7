//! Syntax tree of the authoring grammar.
//!
//! Every statement and expression carries the [`SourceSpan`] it was parsed
//! from so lifted nodes can point back at source lines.

use graphlift_core::{Literal, SourceSpan};

/// A parsed source file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    pub body: Vec<Stmt>,
}

impl Module {
    /// Top-level class definitions, in source order.
    pub fn classes(&self) -> impl Iterator<Item = &ClassDef> {
        self.body.iter().filter_map(|stmt| match &stmt.kind {
            StmtKind::ClassDef(class) => Some(class),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// Expression statement (usually a call).
    Expr(Expr),
    /// `a = b = value`; tuple targets appear as [`ExprKind::Tuple`].
    Assign { targets: Vec<Expr>, value: Expr },
    AnnAssign {
        target: Expr,
        annotation: Expr,
        value: Option<Expr>,
    },
    /// `elif` chains are nested `If` statements in `orelse`.
    If {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    Match { subject: Expr, cases: Vec<MatchCase> },
    For {
        target: Expr,
        iter: Expr,
        body: Vec<Stmt>,
    },
    While { test: Expr, body: Vec<Stmt> },
    Break,
    Continue,
    Pass,
    Return(Option<Expr>),
    Import {
        module: String,
        names: Vec<String>,
    },
    ClassDef(ClassDef),
    FunctionDef(FunctionDef),
}

impl Stmt {
    pub fn new(kind: StmtKind, span: SourceSpan) -> Self {
        Stmt { kind, span }
    }

    /// Nested statement lists (bodies of compound statements).
    pub fn child_blocks(&self) -> Vec<&[Stmt]> {
        match &self.kind {
            StmtKind::If { body, orelse, .. } => vec![body.as_slice(), orelse.as_slice()],
            StmtKind::Match { cases, .. } => cases.iter().map(|c| c.body.as_slice()).collect(),
            StmtKind::For { body, .. } | StmtKind::While { body, .. } => vec![body.as_slice()],
            _ => Vec::new(),
        }
    }

    /// `true` for statements that open divergent control flow.
    pub fn is_branching(&self) -> bool {
        matches!(
            self.kind,
            StmtKind::If { .. } | StmtKind::Match { .. } | StmtKind::For { .. } | StmtKind::While { .. }
        )
    }

    /// Expressions directly owned by this statement (not by nested blocks).
    pub fn own_exprs(&self) -> Vec<&Expr> {
        match &self.kind {
            StmtKind::Expr(expr) => vec![expr],
            StmtKind::Assign { targets, value } => {
                let mut exprs: Vec<&Expr> = targets.iter().collect();
                exprs.push(value);
                exprs
            }
            StmtKind::AnnAssign { target, value, .. } => {
                let mut exprs = vec![target];
                exprs.extend(value.iter());
                exprs
            }
            StmtKind::If { test, .. } | StmtKind::While { test, .. } => vec![test],
            StmtKind::Match { subject, .. } => vec![subject],
            StmtKind::For { target, iter, .. } => vec![target, iter],
            StmtKind::Return(value) => value.iter().collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchCase {
    pub pattern: Pattern,
    pub body: Vec<Stmt>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Literal(Literal),
    /// `case _:`
    Wildcard,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    pub name: String,
    pub bases: Vec<Expr>,
    pub decorators: Vec<Expr>,
    pub body: Vec<Stmt>,
    pub span: SourceSpan,
}

impl ClassDef {
    pub fn methods(&self) -> impl Iterator<Item = &FunctionDef> {
        self.body.iter().filter_map(|stmt| match &stmt.kind {
            StmtKind::FunctionDef(def) => Some(def),
            _ => None,
        })
    }

    pub fn method(&self, name: &str) -> Option<&FunctionDef> {
        self.methods().find(|def| def.name == name)
    }

    /// The decorator named `name`, bare or called.
    pub fn decorator(&self, name: &str) -> Option<&Expr> {
        find_decorator(&self.decorators, name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<Param>,
    pub returns: Option<Expr>,
    pub decorators: Vec<Expr>,
    pub body: Vec<Stmt>,
    pub span: SourceSpan,
}

impl FunctionDef {
    /// Parameters other than a leading `self`.
    pub fn params_without_self(&self) -> &[Param] {
        match self.params.first() {
            Some(first) if first.name == "self" => &self.params[1..],
            _ => &self.params,
        }
    }

    pub fn decorator(&self, name: &str) -> Option<&Expr> {
        find_decorator(&self.decorators, name)
    }
}

fn find_decorator<'a>(decorators: &'a [Expr], name: &str) -> Option<&'a Expr> {
    decorators.iter().find(|decorator| {
        let head = match &decorator.kind {
            ExprKind::Call(call) => &*call.func,
            _ => *decorator,
        };
        head.callee_name() == Some(name)
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub annotation: Option<Expr>,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    Is,
    IsNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Name(String),
    Constant(Literal),
    FString(String),
    Attribute { value: Box<Expr>, attr: String },
    Call(Call),
    Subscript { value: Box<Expr>, index: Box<Expr> },
    List(Vec<Expr>),
    Tuple(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    Compare {
        left: Box<Expr>,
        op: CompareOp,
        right: Box<Expr>,
    },
    BoolOp { op: BoolOp, values: Vec<Expr> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub func: Box<Expr>,
    pub args: Vec<Expr>,
    pub keywords: Vec<Keyword>,
}

impl Call {
    pub fn keyword(&self, name: &str) -> Option<&Expr> {
        self.keywords
            .iter()
            .find(|kw| kw.name == name)
            .map(|kw| &kw.value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Keyword {
    pub name: String,
    pub value: Expr,
}

impl Expr {
    pub fn new(kind: ExprKind, span: SourceSpan) -> Self {
        Expr { kind, span }
    }

    pub fn name(name: impl Into<String>) -> Self {
        Expr::new(ExprKind::Name(name.into()), SourceSpan::default())
    }

    pub fn constant(value: Literal) -> Self {
        Expr::new(ExprKind::Constant(value), SourceSpan::default())
    }

    pub fn attribute(value: Expr, attr: impl Into<String>) -> Self {
        Expr::new(
            ExprKind::Attribute {
                value: Box::new(value),
                attr: attr.into(),
            },
            SourceSpan::default(),
        )
    }

    pub fn call(func: Expr, args: Vec<Expr>, keywords: Vec<Keyword>) -> Self {
        Expr::new(
            ExprKind::Call(Call {
                func: Box::new(func),
                args,
                keywords,
            }),
            SourceSpan::default(),
        )
    }

    pub fn as_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Name(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_call(&self) -> Option<&Call> {
        match &self.kind {
            ExprKind::Call(call) => Some(call),
            _ => None,
        }
    }

    pub fn as_constant(&self) -> Option<&Literal> {
        match &self.kind {
            ExprKind::Constant(value) => Some(value),
            _ => None,
        }
    }

    /// `attr` for `self.attr`.
    pub fn self_attribute(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Attribute { value, attr } if value.as_name() == Some("self") => Some(attr),
            _ => None,
        }
    }

    /// The name a callee or decorator is referred to by: the identifier of
    /// a bare name, or the final attribute of a dotted access.
    pub fn callee_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Name(name) => Some(name),
            ExprKind::Attribute { attr, .. } => Some(attr),
            _ => None,
        }
    }

    /// Visits this expression and every sub-expression, pre-order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expr)) {
        visit(self);
        match &self.kind {
            ExprKind::Name(_) | ExprKind::Constant(_) | ExprKind::FString(_) => {}
            ExprKind::Attribute { value, .. } => value.walk(visit),
            ExprKind::Call(call) => {
                call.func.walk(visit);
                for arg in &call.args {
                    arg.walk(visit);
                }
                for kw in &call.keywords {
                    kw.value.walk(visit);
                }
            }
            ExprKind::Subscript { value, index } => {
                value.walk(visit);
                index.walk(visit);
            }
            ExprKind::List(items) | ExprKind::Tuple(items) | ExprKind::BoolOp { values: items, .. } => {
                for item in items {
                    item.walk(visit);
                }
            }
            ExprKind::Dict(entries) => {
                for (key, value) in entries {
                    key.walk(visit);
                    value.walk(visit);
                }
            }
            ExprKind::Unary { operand, .. } => operand.walk(visit),
            ExprKind::Binary { left, right, .. } | ExprKind::Compare { left, right, .. } => {
                left.walk(visit);
                right.walk(visit);
            }
        }
    }

    /// Names bound when this expression is an assignment target.
    pub fn target_names(&self) -> Vec<&str> {
        match &self.kind {
            ExprKind::Name(name) => vec![name.as_str()],
            ExprKind::Tuple(items) | ExprKind::List(items) => {
                items.iter().flat_map(|item| item.target_names()).collect()
            }
            _ => Vec::new(),
        }
    }
}

/// Visits every statement in `stmts` and in their nested blocks, pre-order.
pub fn walk_stmts<'a>(stmts: &'a [Stmt], visit: &mut impl FnMut(&'a Stmt)) {
    for stmt in stmts {
        visit(stmt);
        for block in stmt.child_blocks() {
            walk_stmts(block, visit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_attribute_detection() {
        let expr = Expr::attribute(Expr::name("self"), "game");
        assert_eq!(expr.self_attribute(), Some("game"));
        let other = Expr::attribute(Expr::name("obj"), "game");
        assert_eq!(other.self_attribute(), None);
    }

    #[test]
    fn walk_visits_nested_arguments() {
        let inner = Expr::call(Expr::name("g"), vec![Expr::name("x")], Vec::new());
        let outer = Expr::call(
            Expr::name("f"),
            vec![inner],
            vec![Keyword {
                name: "k".into(),
                value: Expr::name("y"),
            }],
        );
        let mut names = Vec::new();
        outer.walk(&mut |e| {
            if let Some(name) = e.as_name() {
                names.push(name.to_string());
            }
        });
        assert_eq!(names, vec!["f", "g", "x", "y"]);
    }

    #[test]
    fn tuple_targets_flatten() {
        let target = Expr::new(
            ExprKind::Tuple(vec![Expr::name("a"), Expr::name("b")]),
            SourceSpan::default(),
        );
        assert_eq!(target.target_names(), vec!["a", "b"]);
    }

    #[test]
    fn params_without_self_skips_receiver() {
        let def = FunctionDef {
            name: "on_tick".into(),
            params: vec![
                Param {
                    name: "self".into(),
                    annotation: None,
                    default: None,
                },
                Param {
                    name: "delta".into(),
                    annotation: None,
                    default: None,
                },
            ],
            returns: None,
            decorators: Vec::new(),
            body: Vec::new(),
            span: SourceSpan::default(),
        };
        assert_eq!(def.params_without_self().len(), 1);
    }
}
