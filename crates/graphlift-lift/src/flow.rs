//! Branch and loop builders.
//!
//! Each builder creates the control node, attaches it to the incoming
//! frontier, lifts every arm from the arm's exit port and merges the arm
//! frontiers. Arms are lifted one branch level deeper so assignments inside
//! them take the branch path of local-variable synthesis.

use graphlift_core::builtin::{self, BRANCH_DEFAULT, BRANCH_FALSE, BRANCH_TRUE};
use graphlift_core::{Literal, Node, NodeId, NodeSpec, SourceSpan};
use graphlift_syntax::{printer::print_expr, Call, Expr, ExprKind, MatchCase, Pattern, Stmt};

use crate::diagnostics::DiagnosticKind;
use crate::frontier::FlowFrontier;
use crate::lifter::Lifter;

fn case_label(case: &MatchCase) -> String {
    match &case.pattern {
        Pattern::Literal(literal) => literal.label(),
        Pattern::Wildcard => BRANCH_DEFAULT.to_string(),
    }
}

impl<'g> Lifter<'g> {
    fn add_control_node(&mut self, node: Node) -> NodeId {
        let id = self.graph.add_node(node);
        self.created.push(id);
        id
    }

    fn lift_arm(&mut self, body: &[Stmt], entry: FlowFrontier) -> FlowFrontier {
        self.branch_depth += 1;
        let exit = self.lift_block(body, entry);
        self.branch_depth -= 1;
        exit
    }

    fn record_condition(&mut self, expr: &Expr) {
        if let Some(usage) = self.usage.as_deref_mut() {
            usage.record_condition(expr);
        }
    }

    // -----------------------------------------------------------------------
    // if / else
    // -----------------------------------------------------------------------

    pub(crate) fn lift_if(&mut self, test: &Expr, body: &[Stmt], orelse: &[Stmt], span: SourceSpan) {
        let condition = self.realize_value(test, span);
        let branch = self.add_control_node(builtin::double_branch().with_span(span));
        self.attach(branch);
        self.bind_input(branch, builtin::CONDITION, test, condition, span);
        self.record_condition(test);

        let taken = self.lift_arm(body, FlowFrontier::port(branch, BRANCH_TRUE));
        let not_taken = self.lift_arm(orelse, FlowFrontier::port(branch, BRANCH_FALSE));
        self.frontier = FlowFrontier::merge([taken, not_taken], self.graph);
    }

    // -----------------------------------------------------------------------
    // match
    // -----------------------------------------------------------------------

    pub(crate) fn lift_match(&mut self, subject: &Expr, cases: &[MatchCase], span: SourceSpan) {
        if let ExprKind::Call(call) = &subject.kind {
            if is_instance_method_call(call) {
                self.lift_composite_match(call, cases, span);
                return;
            }
        }

        let labels: Vec<String> = cases
            .iter()
            .filter(|case| case.pattern != Pattern::Wildcard)
            .map(case_label)
            .collect();
        let has_default = cases.iter().any(|case| case.pattern == Pattern::Wildcard);

        let value = self.realize_value(subject, span);
        let branch = self.add_control_node(builtin::multi_branch(&labels).with_span(span));
        self.attach(branch);
        self.bind_input(branch, builtin::SUBJECT, subject, value, span);
        self.record_condition(subject);

        let mut exits = Vec::with_capacity(cases.len() + 1);
        for case in cases {
            let entry = FlowFrontier::port(branch, case_label(case));
            exits.push(self.lift_arm(&case.body, entry));
        }
        if !has_default {
            exits.push(FlowFrontier::port(branch, BRANCH_DEFAULT));
        }
        self.frontier = FlowFrontier::merge(exits, self.graph);
    }

    /// `match self.<instance>.<method>(...)`: the composite's own flow exits
    /// are the arms, so no branch node is created.
    ///
    /// Every case must name a distinct flow exit of the composite (`_` names
    /// `default`). Otherwise the whole statement is dropped with a
    /// diagnostic and nothing is wired.
    fn lift_composite_match(&mut self, call: &Call, cases: &[MatchCase], span: SourceSpan) {
        let callee = print_expr(&call.func);
        let exits: Vec<String> = match self.instance_spec(call) {
            Some(spec) => spec
                .outputs
                .iter()
                .filter(|p| p.is_flow())
                .map(|p| p.name.clone())
                .collect(),
            None => {
                self.warn(
                    DiagnosticKind::AmbiguousMatchDispatch,
                    span,
                    format!("'{callee}' is not a composite instance; match statement dropped"),
                );
                return;
            }
        };

        let mut covered: Vec<String> = Vec::with_capacity(cases.len());
        for case in cases {
            let label = case_label(case);
            if !exits.contains(&label) || covered.contains(&label) {
                self.warn(
                    DiagnosticKind::AmbiguousMatchDispatch,
                    case.span,
                    format!(
                        "case '{label}' does not select a distinct exit of '{callee}' (exits: {}); match statement dropped",
                        exits.join(", ")
                    ),
                );
                return;
            }
            covered.push(label);
        }

        let Some(node) = self.materialize_call(call, span, false) else {
            return;
        };

        let mut frontiers = Vec::with_capacity(exits.len());
        for (case, label) in cases.iter().zip(&covered) {
            frontiers.push(self.lift_arm(&case.body, FlowFrontier::port(node, label.as_str())));
        }
        for exit in exits.iter().filter(|exit| !covered.contains(exit)) {
            frontiers.push(FlowFrontier::port(node, exit.as_str()));
        }
        self.frontier = FlowFrontier::merge(frontiers, self.graph);
    }

    fn instance_spec(&self, call: &Call) -> Option<&'g NodeSpec> {
        let instances = self.ctx.instances;
        match &call.func.kind {
            ExprKind::Attribute { value, .. } => {
                value.self_attribute().and_then(|field| instances.get(field))
            }
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // for
    // -----------------------------------------------------------------------

    /// `for i in range(...)` becomes a finite loop, any other iterable a
    /// list loop. The target is bound to the loop's index or item output.
    pub(crate) fn lift_for(&mut self, target: &Expr, iter: &Expr, body: &[Stmt], span: SourceSpan) {
        let range_args = iter
            .as_call()
            .filter(|call| call.func.as_name() == Some("range"))
            .map(|call| {
                call.args
                    .iter()
                    .filter(|arg| !self.ctx.config.is_reserved_argument(arg))
                    .collect::<Vec<_>>()
            });

        let (loop_node, item_port) = match range_args {
            Some(args) => {
                if args.len() > 2 {
                    self.warn(
                        DiagnosticKind::UnsupportedExpression,
                        span,
                        "range step is not supported and is ignored",
                    );
                }
                let (start, end) = match args.as_slice() {
                    [] => (None, None),
                    [end] => (None, Some(*end)),
                    [start, end, ..] => (Some(*start), Some(*end)),
                };
                let start_value = start.map(|expr| (expr, self.realize_value(expr, span)));
                let end_value = end.map(|expr| (expr, self.realize_value(expr, span)));

                let id = self.add_control_node(builtin::finite_loop().with_span(span));
                self.attach(id);
                match start_value {
                    Some((expr, value)) => self.bind_input(id, builtin::LOOP_START, expr, value, span),
                    None => {
                        if let Some(node) = self.graph.node_mut(id) {
                            node.constants.insert(builtin::LOOP_START.to_string(), Literal::Int(0));
                        }
                    }
                }
                if let Some((expr, value)) = end_value {
                    self.bind_input(id, builtin::LOOP_END, expr, value, span);
                }
                (id, builtin::LOOP_INDEX)
            }
            None => {
                let list = self.realize_value(iter, span);
                let id = self.add_control_node(builtin::list_loop().with_span(span));
                self.attach(id);
                self.bind_input(id, builtin::LOOP_LIST, iter, list, span);
                (id, builtin::LOOP_ITEM)
            }
        };

        match &target.kind {
            ExprKind::Name(name) => self.bind_output(loop_node, item_port, name),
            _ => self.warn(
                DiagnosticKind::UnsupportedExpression,
                span,
                format!("loop target '{}' must be a single name", print_expr(target)),
            ),
        }

        self.env.push_loop(loop_node);
        let _ = self.lift_arm(body, FlowFrontier::port(loop_node, builtin::LOOP_BODY));
        self.env.pop_loop();
        self.frontier = FlowFrontier::Node(loop_node);
        tracing::debug!(node = %loop_node, line = span.line, "loop lowered");
    }
}

/// `self.<attr>.<method>(...)`.
fn is_instance_method_call(call: &Call) -> bool {
    match &call.func.kind {
        ExprKind::Attribute { value, .. } => value.self_attribute().is_some(),
        _ => false,
    }
}
