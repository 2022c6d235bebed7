//! Pass 1 of local-variable synthesis.
//!
//! Scans a whole body (nested blocks included) before anything is lifted
//! and decides which variables need a get/set node pair: those assigned
//! inside a branch or loop and read by a statement after that construct.

use std::collections::{HashMap, HashSet};

use graphlift_syntax::ast::walk_stmts;
use graphlift_syntax::{Expr, ExprKind, Stmt, StmtKind};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableAnalysis {
    pub assignment_counts: HashMap<String, usize>,
    pub assigned_in_branch: HashSet<String>,
    pub used_after_branch: HashSet<String>,
}

impl VariableAnalysis {
    pub fn analyze(body: &[Stmt]) -> Self {
        let mut analysis = VariableAnalysis::default();
        analysis.scan_assignments(body, false);
        analysis.scan_usage_after_branch(body);
        analysis
    }

    /// Names needing a synthesized get/set pair, sorted.
    pub fn multi_assign_candidates(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .assigned_in_branch
            .intersection(&self.used_after_branch)
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }

    pub fn is_candidate(&self, name: &str) -> bool {
        self.assigned_in_branch.contains(name) && self.used_after_branch.contains(name)
    }

    fn scan_assignments(&mut self, stmts: &[Stmt], in_branch: bool) {
        for stmt in stmts {
            let targets: Vec<&Expr> = match &stmt.kind {
                StmtKind::Assign { targets, .. } => targets.iter().collect(),
                StmtKind::AnnAssign {
                    target,
                    value: Some(_),
                    ..
                } => vec![target],
                _ => Vec::new(),
            };
            for name in targets.iter().flat_map(|t| t.target_names()) {
                *self.assignment_counts.entry(name.to_string()).or_default() += 1;
                if in_branch {
                    self.assigned_in_branch.insert(name.to_string());
                }
            }
            for block in stmt.child_blocks() {
                self.scan_assignments(block, true);
            }
        }
    }

    fn scan_usage_after_branch(&mut self, stmts: &[Stmt]) {
        // Names stored by any construct seen so far in this block.
        let mut pending: HashSet<String> = HashSet::new();

        for (index, stmt) in stmts.iter().enumerate() {
            if !stmt.is_branching() {
                continue;
            }
            pending.extend(stored_names(stmt));

            for later in &stmts[index + 1..] {
                let loaded = loaded_names(later);
                for name in &pending {
                    if loaded.contains(name) {
                        self.used_after_branch.insert(name.clone());
                    }
                }
            }

            for block in stmt.child_blocks() {
                self.scan_usage_after_branch(block);
            }
        }
    }
}

/// Names bound anywhere within `stmt`, loop targets included.
fn stored_names(stmt: &Stmt) -> HashSet<String> {
    let mut names = HashSet::new();
    walk_stmts(std::slice::from_ref(stmt), &mut |s| {
        let targets: Vec<&Expr> = match &s.kind {
            StmtKind::Assign { targets, .. } => targets.iter().collect(),
            StmtKind::AnnAssign { target, .. } => vec![target],
            StmtKind::For { target, .. } => vec![target],
            _ => Vec::new(),
        };
        for target in targets {
            names.extend(target.target_names().into_iter().map(str::to_string));
        }
    });
    names
}

/// Names read anywhere within `stmt`.
pub(crate) fn loaded_names(stmt: &Stmt) -> HashSet<String> {
    let mut names = HashSet::new();
    walk_stmts(std::slice::from_ref(stmt), &mut |s| {
        let exprs: Vec<&Expr> = match &s.kind {
            StmtKind::Assign { targets, value } => {
                let mut exprs: Vec<&Expr> = targets.iter().filter(|t| !is_store_target(t)).collect();
                exprs.push(value);
                exprs
            }
            StmtKind::AnnAssign { value, .. } => value.iter().collect(),
            StmtKind::For { iter, .. } => vec![iter],
            _ => s.own_exprs(),
        };
        for expr in exprs {
            expr.walk(&mut |e| {
                if let ExprKind::Name(name) = &e.kind {
                    names.insert(name.clone());
                }
            });
        }
    });
    names
}

/// Plain name or tuple-of-names targets only store; attribute and
/// subscript targets also read their base.
fn is_store_target(target: &Expr) -> bool {
    match &target.kind {
        ExprKind::Name(_) => true,
        ExprKind::Tuple(items) | ExprKind::List(items) => items.iter().all(is_store_target),
        _ => false,
    }
}
