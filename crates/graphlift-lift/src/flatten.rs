//! Expression Flattener: nested calls become their own nodes.
//!
//! `f(g(x))` lowers innermost first: `g` is created, then `f`, then a data
//! edge from `g`'s first data output to the port `f` binds the argument to.
//! Names resolve through the environment, literals inline into the
//! consumer's constant map.

use graphlift_core::{CompositeRef, CoreError, Literal, NodeId, NodeSpec, SourceSpan};
use graphlift_syntax::{printer::print_expr, Call, Expr, ExprKind};

use crate::constants::extract_constant;
use crate::diagnostics::DiagnosticKind;
use crate::env::Producer;
use crate::factory::Factory;
use crate::lifter::Lifter;

/// Where an argument's value comes from.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ValueSource {
    Producer(Producer),
    Constant(Literal),
    /// Nothing to wire: an unbound name (typically an entry parameter) or
    /// an expression already reported as unsupported.
    Unbound,
}

impl<'g> Lifter<'g> {
    /// Builds the node for `call` and wires every bound argument.
    ///
    /// Argument values are realized before the node itself is added, so
    /// nested nodes always precede their consumer in creation order.
    pub(crate) fn realize_call(
        &mut self,
        spec: &NodeSpec,
        call: &Call,
        span: SourceSpan,
        composite: Option<CompositeRef>,
    ) -> Option<NodeId> {
        let pending = Factory::new(self.ctx.config).build(spec, call, span, &mut *self.sink);
        let mut node = pending.node;
        if composite.is_some() {
            node.composite = composite;
        }

        let mut sources = Vec::with_capacity(pending.bindings.len());
        for (port, expr) in &pending.bindings {
            let source = self.realize_value(expr, span);
            if let ValueSource::Constant(literal) = &source {
                node.constants.insert(port.clone(), literal.clone());
            }
            sources.push(source);
        }

        let id = self.graph.add_node(node);
        self.created.push(id);
        tracing::trace!(node = %id, title = %spec.name, line = span.line, "node created");

        for ((port, expr), source) in pending.bindings.iter().zip(sources) {
            if let ValueSource::Producer(producer) = source {
                self.connect_data(&producer, id, port, span);
            }
            if let Some(usage) = self.usage.as_deref_mut() {
                usage.record(expr, id, port);
            }
        }
        Some(id)
    }

    /// Resolves an argument expression to its value source, creating nodes
    /// for nested calls.
    pub(crate) fn realize_value(&mut self, expr: &Expr, span: SourceSpan) -> ValueSource {
        match &expr.kind {
            ExprKind::Call(call) => match self.realize_nested(call, span) {
                Some(producer) => ValueSource::Producer(producer),
                None => ValueSource::Unbound,
            },
            ExprKind::Name(name) => {
                if let Some(producer) = self.env.get(name) {
                    return ValueSource::Producer(producer.clone());
                }
                match extract_constant(expr, Some(&self.env), self.ctx.constants) {
                    Some(literal) => ValueSource::Constant(literal),
                    None => {
                        tracing::debug!(name = %name, line = span.line, "unbound name left unconnected");
                        ValueSource::Unbound
                    }
                }
            }
            _ => match extract_constant(expr, Some(&self.env), self.ctx.constants) {
                Some(literal) => ValueSource::Constant(literal),
                None if expr.self_attribute().is_some() => ValueSource::Unbound,
                None => {
                    self.warn(
                        DiagnosticKind::UnsupportedExpression,
                        span,
                        format!(
                            "argument '{}' is not a call, variable or literal",
                            print_expr(expr)
                        ),
                    );
                    ValueSource::Unbound
                }
            },
        }
    }

    /// Lowers a call found inside another call's arguments.
    fn realize_nested(&mut self, call: &Call, span: SourceSpan) -> Option<Producer> {
        let (spec, composite) = self.resolve_callee(call, span)?;
        let id = self.realize_call(spec, call, span, composite)?;
        let node = self.graph.node(id)?;
        let flow = node.is_flow_node();
        let output = node.data_outputs().next().map(|p| p.name.clone());

        if flow {
            self.warn(
                DiagnosticKind::NestedFlowCall,
                span,
                format!(
                    "'{}' has flow ports but is nested in an argument; it is created without flow wiring",
                    spec.name
                ),
            );
        }
        match output {
            Some(port) => Some(Producer::new(id, port)),
            None => {
                self.warn(
                    DiagnosticKind::UnknownPort,
                    span,
                    format!("'{}' has no data output to pass as an argument", spec.name),
                );
                None
            }
        }
    }

    /// Applies a realized value to `(node, port)` and records the usage.
    pub(crate) fn bind_input(
        &mut self,
        node: NodeId,
        port: &str,
        expr: &Expr,
        source: ValueSource,
        span: SourceSpan,
    ) {
        match source {
            ValueSource::Producer(producer) => self.connect_data(&producer, node, port, span),
            ValueSource::Constant(literal) => {
                if let Some(target) = self.graph.node_mut(node) {
                    target.constants.insert(port.to_string(), literal);
                }
            }
            ValueSource::Unbound => {}
        }
        if let Some(usage) = self.usage.as_deref_mut() {
            usage.record(expr, node, port);
        }
    }

    pub(crate) fn connect_data(
        &mut self,
        producer: &Producer,
        target: NodeId,
        port: &str,
        span: SourceSpan,
    ) {
        if let Err(err) = self
            .graph
            .add_data_edge(producer.node, &producer.port, target, port)
        {
            let kind = match err {
                CoreError::DuplicateDataInput { .. } => DiagnosticKind::DuplicateDataInput,
                _ => DiagnosticKind::UnknownPort,
            };
            self.warn(kind, span, err.to_string());
        }
    }
}
