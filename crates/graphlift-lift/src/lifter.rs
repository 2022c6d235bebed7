//! Statement Lifter.
//!
//! Walks a statement list in order, threading a [`VarEnv`] and a
//! [`FlowFrontier`], and emits nodes and edges into a [`Graph`]. Nothing a
//! single statement does wrong aborts the walk: it is reported through the
//! [`DiagnosticSink`] and the statement is skipped or partially lowered.
//!
//! Expression flattening lives in `flatten`, branch/loop builders in
//! `flow`, and the local-variable path in `local_var`; all of them are
//! further `impl Lifter` blocks.

use graphlift_core::{
    CompositeRef, Graph, Literal, NodeCategory, NodeId, NodeRegistry, NodeSpec, SourceSpan,
};
use graphlift_syntax::{printer::print_expr, Call, Expr, ExprKind, Stmt, StmtKind};
use indexmap::IndexMap;

use crate::analysis::VariableAnalysis;
use crate::config::LiftConfig;
use crate::constants::{extract_constant, ConstantCache};
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::env::{Producer, VarEnv};
use crate::frontier::FlowFrontier;
use crate::usage::UsageTracker;

/// Composite instances owned by the class being lifted: attribute name ->
/// the composite's node spec.
pub type CompositeInstances = IndexMap<String, NodeSpec>;

/// Read-only inputs shared by every body lifted from one unit.
#[derive(Clone, Copy)]
pub struct LiftContext<'a> {
    pub registry: &'a dyn NodeRegistry,
    pub config: &'a LiftConfig,
    pub constants: &'a ConstantCache,
    pub instances: &'a CompositeInstances,
}

/// Whether the enclosing block keeps going after a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Control {
    Continue,
    Halt,
}

pub struct Lifter<'g> {
    pub(crate) graph: &'g mut Graph,
    pub(crate) ctx: LiftContext<'g>,
    pub(crate) sink: &'g mut dyn DiagnosticSink,
    pub(crate) usage: Option<&'g mut UsageTracker>,
    /// Variables read by the caller once the body is lifted.
    pub(crate) exports: Vec<String>,
    pub(crate) env: VarEnv,
    pub(crate) frontier: FlowFrontier,
    pub(crate) suppress_once: bool,
    /// Nesting depth inside branch and loop bodies.
    pub(crate) branch_depth: usize,
    /// Nodes this lifter added, in creation order.
    pub(crate) created: Vec<NodeId>,
}

impl<'g> Lifter<'g> {
    pub fn new(
        graph: &'g mut Graph,
        ctx: LiftContext<'g>,
        sink: &'g mut dyn DiagnosticSink,
    ) -> Self {
        Lifter {
            graph,
            ctx,
            sink,
            usage: None,
            exports: Vec::new(),
            env: VarEnv::new(),
            frontier: FlowFrontier::empty(),
            suppress_once: false,
            branch_depth: 0,
            created: Vec::new(),
        }
    }

    /// Records parameter usage sites while lifting (composite methods).
    pub fn with_usage(mut self, usage: &'g mut UsageTracker) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Names the caller reads from the final environment (data-output
    /// variables). One assigned inside a branch or loop goes through a
    /// local variable so every path reaches it.
    pub fn with_exports<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.exports = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn env(&self) -> &VarEnv {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut VarEnv {
        &mut self.env
    }

    pub fn graph(&self) -> &Graph {
        self.graph
    }

    /// Nodes added by this lifter, in creation order.
    pub fn created_nodes(&self) -> &[NodeId] {
        &self.created
    }

    /// Consumes the lifter, keeping the environment and created nodes.
    pub fn finish(self) -> (VarEnv, Vec<NodeId>) {
        (self.env, self.created)
    }

    /// Lifts a whole method body starting from `entry`, returning the final
    /// frontier.
    ///
    /// Runs the multi-assign analysis over the body first so that variables
    /// assigned inside a construct and read after it are lowered through a
    /// synthesized local variable.
    pub fn lift_body(&mut self, body: &[Stmt], entry: FlowFrontier) -> FlowFrontier {
        let analysis = VariableAnalysis::analyze(body);
        let exported = self
            .exports
            .iter()
            .map(String::as_str)
            .filter(|name| analysis.assigned_in_branch.contains(*name));
        for name in analysis.multi_assign_candidates().into_iter().chain(exported) {
            tracing::debug!(variable = name, "multi-assign candidate");
            self.env.mark_multi_assign_candidate(name);
        }
        self.suppress_once = self.ctx.config.suppress_initial_flow_edge;
        self.lift_block(body, entry)
    }

    /// Lifts one block from `entry` and returns the frontier it leaves.
    ///
    /// The caller's frontier is restored afterwards; branch builders merge
    /// the returned frontiers themselves.
    pub(crate) fn lift_block(&mut self, body: &[Stmt], entry: FlowFrontier) -> FlowFrontier {
        let outer = std::mem::replace(&mut self.frontier, entry);
        for stmt in body {
            if self.lift_statement(stmt) == Control::Halt {
                break;
            }
        }
        std::mem::replace(&mut self.frontier, outer)
    }

    fn lift_statement(&mut self, stmt: &Stmt) -> Control {
        let span = stmt.span;
        match &stmt.kind {
            StmtKind::Expr(expr) => match &expr.kind {
                ExprKind::Call(call) => {
                    self.materialize_call(call, span, false);
                }
                _ => tracing::debug!(line = span.line, "ignoring expression statement"),
            },
            StmtKind::Assign { targets, value } => self.lift_assign(targets, value, None, span),
            StmtKind::AnnAssign {
                target,
                annotation,
                value: Some(value),
            } => self.lift_assign(std::slice::from_ref(target), value, Some(annotation), span),
            StmtKind::AnnAssign { value: None, .. } => {}
            StmtKind::If { test, body, orelse } => self.lift_if(test, body, orelse, span),
            StmtKind::Match { subject, cases } => self.lift_match(subject, cases, span),
            StmtKind::For { target, iter, body } => self.lift_for(target, iter, body, span),
            StmtKind::While { .. } => {
                tracing::debug!(line = span.line, "while loop is not lowered");
            }
            StmtKind::Break => return self.lift_break(span),
            StmtKind::Continue => self.warn(
                DiagnosticKind::UnsupportedStatement,
                span,
                "continue has no node form and is ignored",
            ),
            StmtKind::Pass | StmtKind::Return(_) | StmtKind::Import { .. } => {}
            StmtKind::ClassDef(_) | StmtKind::FunctionDef(_) => self.warn(
                DiagnosticKind::UnsupportedStatement,
                span,
                "nested definitions are not lifted",
            ),
        }
        Control::Continue
    }

    // -----------------------------------------------------------------------
    // Flow wiring
    // -----------------------------------------------------------------------

    /// Connects every frontier element to `target`'s flow entry.
    ///
    /// A pending suppress-once flag is consumed instead, leaving `target`
    /// without incoming flow.
    pub(crate) fn attach(&mut self, target: NodeId) {
        if std::mem::take(&mut self.suppress_once) {
            tracing::debug!(node = %target, "initial flow edge suppressed");
            return;
        }
        let sources = self.frontier.sources(self.graph);
        if sources.is_empty() {
            return;
        }
        let entry = self
            .graph
            .node(target)
            .and_then(|node| node.flow_entry_port())
            .map(str::to_string);
        let Some(entry) = entry else {
            let line = self.graph.node(target).map(|n| n.span.line).unwrap_or_default();
            self.warn_line(
                DiagnosticKind::MissingFlowPort,
                line,
                format!("node {target} has no flow input to attach to"),
            );
            return;
        };
        for (source, port) in sources {
            if let Err(err) = self.graph.add_flow_edge(source, &port, target, &entry) {
                let line = self.graph.node(target).map(|n| n.span.line).unwrap_or_default();
                self.warn_line(DiagnosticKind::MissingFlowPort, line, err.to_string());
            }
        }
    }

    /// `break`: wire the frontier into the innermost loop's break input and
    /// stop the enclosing block.
    fn lift_break(&mut self, span: SourceSpan) -> Control {
        let Some(loop_node) = self.env.current_loop() else {
            self.warn(
                DiagnosticKind::MalformedBreak,
                span,
                "break outside of a loop is ignored",
            );
            return Control::Continue;
        };
        for (source, port) in self.frontier.sources(self.graph) {
            if let Err(err) = self.graph.add_flow_edge(
                source,
                &port,
                loop_node,
                graphlift_core::builtin::LOOP_BREAK,
            ) {
                self.warn(DiagnosticKind::MissingFlowPort, span, err.to_string());
            }
        }
        self.frontier = FlowFrontier::empty();
        Control::Halt
    }

    // -----------------------------------------------------------------------
    // Calls
    // -----------------------------------------------------------------------

    /// Lowers a call in statement or assignment position.
    ///
    /// Returns the node created for it. A flow node is attached to the
    /// frontier and becomes the new frontier, except event nodes, which
    /// never receive incoming flow.
    pub(crate) fn materialize_call(
        &mut self,
        call: &Call,
        span: SourceSpan,
        has_targets: bool,
    ) -> Option<NodeId> {
        if let Some(name) = call.func.as_name() {
            if self.ctx.config.is_pin_marker(name) {
                return None;
            }
        }
        let (spec, composite) = self.resolve_callee(call, span)?;
        if !has_targets && composite.is_none() && spec.is_pure() {
            tracing::debug!(node = %spec.name, line = span.line, "dropping bare call to pure node");
            return None;
        }

        let id = self.realize_call(spec, call, span, composite)?;
        let (flow, event) = match self.graph.node(id) {
            Some(node) => (node.is_flow_node(), node.category == NodeCategory::Event),
            None => (false, false),
        };
        if flow {
            if !event {
                self.attach(id);
            }
            self.frontier = FlowFrontier::Node(id);
        }
        Some(id)
    }

    /// Resolves a callee to a spec. `self.<instance>.<method>(...)` on a
    /// known composite instance yields the composite's spec plus the
    /// reference the node carries.
    pub(crate) fn resolve_callee(
        &mut self,
        call: &Call,
        span: SourceSpan,
    ) -> Option<(&'g NodeSpec, Option<CompositeRef>)> {
        let ctx = self.ctx;
        match &call.func.kind {
            ExprKind::Name(name) => match ctx.registry.resolve(name) {
                Some(spec) => Some((spec, None)),
                None => {
                    self.warn(
                        DiagnosticKind::UnresolvedCall,
                        span,
                        format!("no node named '{name}'"),
                    );
                    None
                }
            },
            ExprKind::Attribute { value, attr } => {
                let instance = value
                    .self_attribute()
                    .and_then(|field| ctx.instances.get_key_value(field));
                match instance {
                    Some((instance, spec)) => {
                        let composite = CompositeRef {
                            composite_id: spec
                                .composite_id
                                .clone()
                                .unwrap_or_else(|| spec.name.clone()),
                            instance: instance.clone(),
                            method: attr.clone(),
                        };
                        Some((spec, Some(composite)))
                    }
                    None => {
                        self.warn(
                            DiagnosticKind::NativeMethodCall,
                            span,
                            format!(
                                "method call '{}()' is not a node; call a node instead",
                                print_expr(&call.func)
                            ),
                        );
                        None
                    }
                }
            }
            _ => {
                self.warn(
                    DiagnosticKind::UnsupportedExpression,
                    span,
                    format!("'{}' cannot be called", print_expr(&call.func)),
                );
                None
            }
        }
    }

    // -----------------------------------------------------------------------
    // Assignment
    // -----------------------------------------------------------------------

    /// Lowers `targets = value`.
    ///
    /// Tried in order: the local-variable path for a single-name target that
    /// needs one, constant binding, aliasing an existing variable, and
    /// finally lowering the right-hand call and binding its outputs.
    fn lift_assign(
        &mut self,
        targets: &[Expr],
        value: &Expr,
        annotation: Option<&Expr>,
        span: SourceSpan,
    ) {
        let single = match targets {
            [target] => target.as_name(),
            _ => None,
        };
        if let Some(name) = single {
            if self.needs_local_variable(name) && self.lift_local_assignment(name, value, span) {
                return;
            }
        }

        if value.as_call().is_none() {
            if let Some(literal) = extract_constant(value, Some(&self.env), self.ctx.constants) {
                if matches!(value.kind, ExprKind::List(_)) {
                    self.warn(
                        DiagnosticKind::LiteralAssignment,
                        span,
                        "list literal assigned to a variable; build the list with a node",
                    );
                }
                for target in targets {
                    self.bind_constant(target, &literal, value);
                }
                return;
            }
        }

        if let ExprKind::Name(source) = &value.kind {
            if !self.ctx.config.is_reserved_name(source) {
                let producer = self.env.get(source).cloned();
                let is_param = self
                    .usage
                    .as_deref()
                    .is_some_and(|usage| usage.param_of(value).is_some());
                if producer.is_some() || is_param {
                    for name in targets.iter().flat_map(|t| t.target_names()) {
                        if let Some(producer) = &producer {
                            self.env.set(name, producer.clone());
                        }
                        if let Some(usage) = self.usage.as_deref_mut() {
                            usage.alias(name, value);
                        }
                    }
                    return;
                }
            }
        }

        match &value.kind {
            ExprKind::Call(call) => {
                if let Some(id) = self.materialize_call(call, span, true) {
                    self.register_outputs(id, targets, annotation);
                }
            }
            ExprKind::Dict(_) | ExprKind::FString(_) | ExprKind::List(_) => self.warn(
                DiagnosticKind::LiteralAssignment,
                span,
                format!(
                    "'{}' cannot be assigned directly; build it with a node",
                    print_expr(value)
                ),
            ),
            _ => self.warn(
                DiagnosticKind::UnsupportedExpression,
                span,
                format!(
                    "right-hand side '{}' is not a call, literal or variable",
                    print_expr(value)
                ),
            ),
        }
    }

    /// Binds a constant to every name in `target`. A tuple target takes a
    /// same-length list element-wise.
    fn bind_constant(&mut self, target: &Expr, literal: &Literal, value: &Expr) {
        match (&target.kind, literal) {
            (ExprKind::Tuple(items) | ExprKind::List(items), Literal::List(values))
                if items.len() == values.len() =>
            {
                for (item, value) in items.iter().zip(values) {
                    if let Some(name) = item.as_name() {
                        self.env.set_constant(name, value.clone());
                    }
                }
            }
            _ => {
                for name in target.target_names() {
                    self.env.set_constant(name, literal.clone());
                    if let Some(usage) = self.usage.as_deref_mut() {
                        usage.alias(name, value);
                    }
                }
            }
        }
    }

    /// Binds assignment targets to the data outputs of `id`: a single name
    /// takes the first output, a tuple takes outputs by position.
    pub(crate) fn register_outputs(&mut self, id: NodeId, targets: &[Expr], annotation: Option<&Expr>) {
        let outputs: Vec<String> = match self.graph.node(id) {
            Some(node) => node.data_outputs().map(|p| p.name.clone()).collect(),
            None => return,
        };
        let Some(first) = outputs.first() else {
            return;
        };

        for target in targets {
            match &target.kind {
                ExprKind::Name(name) => self.bind_output(id, first, name),
                ExprKind::Tuple(items) | ExprKind::List(items) => {
                    for (item, port) in items.iter().zip(&outputs) {
                        if let Some(name) = item.as_name() {
                            self.bind_output(id, port, name);
                        }
                    }
                }
                _ => {}
            }
        }

        let annotated = match (annotation, targets) {
            (Some(annotation), [target]) => annotation
                .as_constant()
                .and_then(Literal::as_str)
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .zip(target.as_name()),
            _ => None,
        };
        if let Some((type_name, name)) = annotated {
            if let Some(producer) = self.env.get(name).filter(|p| p.node == id).cloned() {
                self.graph.set_port_type_override(id, &producer.port, type_name);
            }
        }
    }

    pub(crate) fn bind_output(&mut self, id: NodeId, port: &str, name: &str) {
        self.env.set(name, Producer::new(id, port));
        if let Some(node) = self.graph.node_mut(id) {
            node.var_names.insert(port.to_string(), name.to_string());
        }
        if let Some(usage) = self.usage.as_deref_mut() {
            usage.rebind(name);
        }
    }

    // -----------------------------------------------------------------------
    // Diagnostics
    // -----------------------------------------------------------------------

    pub(crate) fn warn(&mut self, kind: DiagnosticKind, span: SourceSpan, message: impl Into<String>) {
        self.warn_line(kind, span.line, message);
    }

    pub(crate) fn warn_line(&mut self, kind: DiagnosticKind, line: u32, message: impl Into<String>) {
        self.sink.warn(Diagnostic::new(kind, message).at(line));
    }
}
