//! Renders syntax trees back to source text.
//!
//! Output uses four-space indentation and only the parentheses operator
//! precedence requires, so `parse_module(print_module(m))` yields a tree
//! equal to `m` up to spans.

use std::fmt::Write;

use graphlift_core::Literal;

use crate::ast::{
    BinaryOp, BoolOp, ClassDef, CompareOp, Expr, ExprKind, FunctionDef, Module, Pattern, Stmt,
    StmtKind, UnaryOp,
};

const INDENT: &str = "    ";

/// Renders a module.
pub fn print_module(module: &Module) -> String {
    let mut out = String::new();
    print_block(&mut out, &module.body, 0);
    out
}

/// Renders a single statement (and its nested blocks) at `depth`.
pub fn print_stmt(stmt: &Stmt, depth: usize) -> String {
    let mut out = String::new();
    write_stmt(&mut out, stmt, depth);
    out
}

/// Renders an expression.
pub fn print_expr(expr: &Expr) -> String {
    expr_at(expr, 0)
}

fn print_block(out: &mut String, stmts: &[Stmt], depth: usize) {
    if stmts.is_empty() {
        line(out, depth, "pass");
        return;
    }
    for (i, stmt) in stmts.iter().enumerate() {
        let is_definition = matches!(stmt.kind, StmtKind::ClassDef(_) | StmtKind::FunctionDef(_));
        if i > 0 && is_definition {
            out.push('\n');
        }
        write_stmt(out, stmt, depth);
    }
}

fn line(out: &mut String, depth: usize, text: &str) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
    out.push_str(text);
    out.push('\n');
}

fn write_stmt(out: &mut String, stmt: &Stmt, depth: usize) {
    match &stmt.kind {
        StmtKind::Expr(expr) => line(out, depth, &print_expr(expr)),
        StmtKind::Assign { targets, value } => {
            let mut text = String::new();
            for target in targets {
                text.push_str(&target_text(target));
                text.push_str(" = ");
            }
            text.push_str(&print_expr(value));
            line(out, depth, &text);
        }
        StmtKind::AnnAssign {
            target,
            annotation,
            value,
        } => {
            let mut text = format!("{}: {}", target_text(target), print_expr(annotation));
            if let Some(value) = value {
                let _ = write!(text, " = {}", print_expr(value));
            }
            line(out, depth, &text);
        }
        StmtKind::If { .. } => write_if(out, stmt, depth, "if"),
        StmtKind::Match { subject, cases } => {
            line(out, depth, &format!("match {}:", print_expr(subject)));
            for case in cases {
                let pattern = match &case.pattern {
                    Pattern::Wildcard => "_".to_string(),
                    Pattern::Literal(literal) => literal.to_string(),
                };
                line(out, depth + 1, &format!("case {pattern}:"));
                print_block(out, &case.body, depth + 2);
            }
        }
        StmtKind::For { target, iter, body } => {
            line(
                out,
                depth,
                &format!("for {} in {}:", target_text(target), print_expr(iter)),
            );
            print_block(out, body, depth + 1);
        }
        StmtKind::While { test, body } => {
            line(out, depth, &format!("while {}:", print_expr(test)));
            print_block(out, body, depth + 1);
        }
        StmtKind::Break => line(out, depth, "break"),
        StmtKind::Continue => line(out, depth, "continue"),
        StmtKind::Pass => line(out, depth, "pass"),
        StmtKind::Return(None) => line(out, depth, "return"),
        StmtKind::Return(Some(value)) => {
            line(out, depth, &format!("return {}", target_text(value)))
        }
        StmtKind::Import { module, names } if names.is_empty() => {
            line(out, depth, &format!("import {module}"))
        }
        StmtKind::Import { module, names } => {
            line(out, depth, &format!("from {module} import {}", names.join(", ")))
        }
        StmtKind::ClassDef(class) => write_class(out, class, depth),
        StmtKind::FunctionDef(def) => write_function(out, def, depth),
    }
}

fn write_if(out: &mut String, stmt: &Stmt, depth: usize, keyword: &str) {
    let StmtKind::If { test, body, orelse } = &stmt.kind else {
        return;
    };
    line(out, depth, &format!("{keyword} {}:", print_expr(test)));
    print_block(out, body, depth + 1);

    match orelse.as_slice() {
        [] => {}
        [nested] if matches!(nested.kind, StmtKind::If { .. }) => {
            write_if(out, nested, depth, "elif")
        }
        _ => {
            line(out, depth, "else:");
            print_block(out, orelse, depth + 1);
        }
    }
}

fn write_class(out: &mut String, class: &ClassDef, depth: usize) {
    for decorator in &class.decorators {
        line(out, depth, &format!("@{}", print_expr(decorator)));
    }
    if class.bases.is_empty() {
        line(out, depth, &format!("class {}:", class.name));
    } else {
        line(
            out,
            depth,
            &format!("class {}({}):", class.name, join_exprs(&class.bases)),
        );
    }
    print_block(out, &class.body, depth + 1);
}

fn write_function(out: &mut String, def: &FunctionDef, depth: usize) {
    for decorator in &def.decorators {
        line(out, depth, &format!("@{}", print_expr(decorator)));
    }
    let params: Vec<String> = def
        .params
        .iter()
        .map(|param| {
            let mut text = param.name.clone();
            if let Some(annotation) = &param.annotation {
                let _ = write!(text, ": {}", print_expr(annotation));
            }
            if let Some(default) = &param.default {
                let _ = write!(text, " = {}", print_expr(default));
            }
            text
        })
        .collect();
    let mut header = format!("def {}({})", def.name, params.join(", "));
    if let Some(returns) = &def.returns {
        let _ = write!(header, " -> {}", print_expr(returns));
    }
    header.push(':');
    line(out, depth, &header);
    print_block(out, &def.body, depth + 1);
}

/// Tuples in target position print without parentheses.
fn target_text(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Tuple(items) if items.len() > 1 => join_exprs(items),
        _ => print_expr(expr),
    }
}

fn join_exprs(exprs: &[Expr]) -> String {
    exprs.iter().map(print_expr).collect::<Vec<_>>().join(", ")
}

// -----------------------------------------------------------------------------
// Expressions
// -----------------------------------------------------------------------------

const PREC_OR: u8 = 1;
const PREC_AND: u8 = 2;
const PREC_NOT: u8 = 3;
const PREC_COMPARE: u8 = 4;
const PREC_ADDITIVE: u8 = 5;
const PREC_MULTIPLICATIVE: u8 = 6;
const PREC_UNARY: u8 = 7;
const PREC_ATOM: u8 = 8;

fn precedence(expr: &Expr) -> u8 {
    match &expr.kind {
        ExprKind::BoolOp { op: BoolOp::Or, .. } => PREC_OR,
        ExprKind::BoolOp { op: BoolOp::And, .. } => PREC_AND,
        ExprKind::Unary { op: UnaryOp::Not, .. } => PREC_NOT,
        ExprKind::Compare { .. } => PREC_COMPARE,
        ExprKind::Binary {
            op: BinaryOp::Add | BinaryOp::Sub,
            ..
        } => PREC_ADDITIVE,
        ExprKind::Binary { .. } => PREC_MULTIPLICATIVE,
        ExprKind::Unary { .. } => PREC_UNARY,
        ExprKind::Constant(Literal::Int(v)) if *v < 0 => PREC_UNARY,
        ExprKind::Constant(Literal::Float(v)) if *v < 0.0 => PREC_UNARY,
        _ => PREC_ATOM,
    }
}

fn expr_at(expr: &Expr, min_prec: u8) -> String {
    let prec = precedence(expr);
    let text = match &expr.kind {
        ExprKind::Name(name) => name.clone(),
        ExprKind::Constant(literal) => literal.to_string(),
        ExprKind::FString(text) => format!("f\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\"")),
        ExprKind::Attribute { value, attr } => format!("{}.{attr}", expr_at(value, PREC_ATOM)),
        ExprKind::Call(call) => {
            let mut args: Vec<String> = call.args.iter().map(print_expr).collect();
            args.extend(
                call.keywords
                    .iter()
                    .map(|kw| format!("{}={}", kw.name, print_expr(&kw.value))),
            );
            format!("{}({})", expr_at(&call.func, PREC_ATOM), args.join(", "))
        }
        ExprKind::Subscript { value, index } => {
            format!("{}[{}]", expr_at(value, PREC_ATOM), target_text(index))
        }
        ExprKind::List(items) => format!("[{}]", join_exprs(items)),
        ExprKind::Tuple(items) if items.len() == 1 => format!("({},)", print_expr(&items[0])),
        ExprKind::Tuple(items) => format!("({})", join_exprs(items)),
        ExprKind::Dict(entries) => {
            let entries: Vec<String> = entries
                .iter()
                .map(|(k, v)| format!("{}: {}", print_expr(k), print_expr(v)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
        ExprKind::Unary { op, operand } => match op {
            UnaryOp::Not => format!("not {}", expr_at(operand, PREC_NOT)),
            UnaryOp::Neg => format!("-{}", expr_at(operand, PREC_UNARY)),
            UnaryOp::Pos => format!("+{}", expr_at(operand, PREC_UNARY)),
        },
        ExprKind::Binary { left, op, right } => {
            let symbol = match op {
                BinaryOp::Add => "+",
                BinaryOp::Sub => "-",
                BinaryOp::Mul => "*",
                BinaryOp::Div => "/",
                BinaryOp::FloorDiv => "//",
                BinaryOp::Mod => "%",
            };
            format!(
                "{} {symbol} {}",
                expr_at(left, prec),
                expr_at(right, prec + 1)
            )
        }
        ExprKind::Compare { left, op, right } => {
            let symbol = match op {
                CompareOp::Eq => "==",
                CompareOp::NotEq => "!=",
                CompareOp::Lt => "<",
                CompareOp::Le => "<=",
                CompareOp::Gt => ">",
                CompareOp::Ge => ">=",
                CompareOp::In => "in",
                CompareOp::NotIn => "not in",
                CompareOp::Is => "is",
                CompareOp::IsNot => "is not",
            };
            format!(
                "{} {symbol} {}",
                expr_at(left, PREC_COMPARE),
                expr_at(right, PREC_ADDITIVE)
            )
        }
        ExprKind::BoolOp { op, values } => {
            let symbol = match op {
                BoolOp::And => " and ",
                BoolOp::Or => " or ",
            };
            values
                .iter()
                .map(|value| expr_at(value, prec + 1))
                .collect::<Vec<_>>()
                .join(symbol)
        }
    };

    if prec < min_prec {
        format!("({text})")
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_module;

    fn roundtrip(source: &str) -> String {
        print_module(&parse_module(source).unwrap())
    }

    #[test]
    fn prints_statements_unchanged() {
        let source = "\
class Game:
    def __init__(self, game, owner_entity):
        self.game = game
        self.timer = Timer(game, owner_entity)

    def on_start(self):
        hp = get_health(self.game, self.owner_entity)
        if hp > 0:
            heal(self.game, amount=5)
        elif hp == 0:
            pass
        else:
            die(self.game)
        for i in range(0, 3):
            tick(self.game, i)
            break
        match state:
            case 1:
                go()
            case _:
                stop()
";
        assert_eq!(roundtrip(source), source);
    }

    #[test]
    fn inserts_required_parentheses_only() {
        assert_eq!(
            roundtrip("x = (a + b) * c - (d - e)\n"),
            "x = (a + b) * c - (d - e)\n"
        );
        assert_eq!(
            roundtrip("y = not (a or b) and c\n"),
            "y = not (a or b) and c\n"
        );
        assert_eq!(roundtrip("z = (a - b) - c\n"), "z = a - b - c\n");
    }

    #[test]
    fn prints_call_with_keywords() {
        let module = parse_module("f(self.game, g(x), key=\"a\", n=-1)\n").unwrap();
        let StmtKind::Expr(expr) = &module.body[0].kind else {
            panic!("expected expression statement");
        };
        insta::assert_snapshot!(print_expr(expr), @r#"f(self.game, g(x), key="a", n=-1)"#);
    }

    #[test]
    fn prints_tuple_targets_and_singletons() {
        assert_eq!(roundtrip("a, b = f()\n"), "a, b = f()\n");
        assert_eq!(roundtrip("x = (1,)\n"), "x = (1,)\n");
        assert_eq!(roundtrip("x = [1, \"a\", None]\n"), "x = [1, \"a\", None]\n");
    }

    #[test]
    fn printed_output_reparses_to_same_tree() {
        let source = "\
@composite_class(composite_id=\"timer\")
class Timer:
    @flow_entry()
    def start(self, seconds: \"int\" = 5) -> None:
        speed: \"float\" = scale(self.game, seconds * 2.0)
        while speed > 1:
            speed = halve(speed)
";
        let first = parse_module(source).unwrap();
        let second = parse_module(&print_module(&first)).unwrap();
        assert_eq!(print_module(&first), print_module(&second));
    }

    #[test]
    fn empty_blocks_print_pass() {
        let module = Module {
            body: vec![Stmt::new(
                StmtKind::While {
                    test: Expr::constant(Literal::Bool(true)),
                    body: Vec::new(),
                },
                Default::default(),
            )],
        };
        assert_eq!(print_module(&module), "while True:\n    pass\n");
    }
}
