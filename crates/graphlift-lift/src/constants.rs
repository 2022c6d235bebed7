//! Compile-time constant extraction.
//!
//! Module-level and class-level `NAME = <literal>` assignments are gathered
//! into a [`ConstantCache`] owned by the caller and scoped to one unit. Call
//! arguments that reduce to a literal are inlined into the consuming node's
//! constant map instead of being wired.

use std::collections::HashMap;

use graphlift_core::Literal;
use graphlift_syntax::ast::UnaryOp;
use graphlift_syntax::{ClassDef, Expr, ExprKind, Module, Stmt, StmtKind};

use crate::env::VarEnv;

/// Named constants visible to one compilation unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstantCache {
    module: HashMap<String, Literal>,
    class: HashMap<String, Literal>,
}

impl ConstantCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects top-level module constants and the class-body constants of
    /// `class`. A constant may refer to an earlier one (`B = A`).
    pub fn collect(module: &Module, class: Option<&ClassDef>) -> Self {
        let mut cache = ConstantCache::new();
        for (name, value) in literal_assignments(&module.body) {
            if let Some(literal) = extract_constant(value, None, &cache) {
                cache.module.insert(name.to_string(), literal);
            }
        }
        if let Some(class) = class {
            for (name, value) in literal_assignments(&class.body) {
                if let Some(literal) = extract_constant(value, None, &cache) {
                    cache.class.insert(name.to_string(), literal);
                }
            }
        }
        cache
    }

    pub fn insert_module(&mut self, name: impl Into<String>, value: Literal) {
        self.module.insert(name.into(), value);
    }

    pub fn insert_class(&mut self, name: impl Into<String>, value: Literal) {
        self.class.insert(name.into(), value);
    }

    pub fn module_constant(&self, name: &str) -> Option<&Literal> {
        self.module.get(name)
    }

    /// Class constants are only reachable as `self.<name>`.
    pub fn class_constant(&self, name: &str) -> Option<&Literal> {
        self.class.get(name)
    }
}

fn literal_assignments(body: &[Stmt]) -> impl Iterator<Item = (&str, &Expr)> {
    body.iter().filter_map(|stmt| match &stmt.kind {
        StmtKind::Assign { targets, value } if targets.len() == 1 => {
            targets[0].as_name().map(|name| (name, value))
        }
        StmtKind::AnnAssign {
            target,
            value: Some(value),
            ..
        } => target.as_name().map(|name| (name, value)),
        _ => None,
    })
}

/// Reduces `expr` to a literal, if it is one.
///
/// Accepts literals, unary `+`/`-` on numbers, lists and tuples of
/// extractable elements, and names bound to constants. `self.<attr>` yields
/// the class constant when one exists; otherwise public attributes become
/// the string `"self.<attr>"` and private (`_`-prefixed) ones are not
/// extractable. A name with a producer binding in `env` is never a constant.
pub fn extract_constant(
    expr: &Expr,
    env: Option<&VarEnv>,
    cache: &ConstantCache,
) -> Option<Literal> {
    match &expr.kind {
        ExprKind::Constant(literal) => Some(literal.clone()),
        ExprKind::Unary { op, operand } => {
            let value = extract_constant(operand, env, cache)?;
            match op {
                UnaryOp::Neg => value.negated(),
                UnaryOp::Pos if value.is_number() => Some(value),
                _ => None,
            }
        }
        ExprKind::List(items) | ExprKind::Tuple(items) => items
            .iter()
            .map(|item| extract_constant(item, env, cache))
            .collect::<Option<Vec<_>>>()
            .map(Literal::List),
        ExprKind::Attribute { .. } => {
            let attr = expr.self_attribute()?;
            if let Some(value) = cache.class_constant(attr) {
                return Some(value.clone());
            }
            if attr.starts_with('_') {
                None
            } else {
                Some(Literal::Str(format!("self.{attr}")))
            }
        }
        ExprKind::Name(name) => {
            if let Some(env) = env {
                if env.get(name).is_some() {
                    return None;
                }
                if let Some(value) = env.get_constant(name) {
                    return Some(value.clone());
                }
            }
            cache.module_constant(name).cloned()
        }
        _ => None,
    }
}
