//! Local-Variable Synthesizer, pass 2.
//!
//! A name flagged by the multi-assign analysis is lowered through a
//! get/set node pair instead of a plain environment binding, so that reads
//! after a branch or loop see whichever arm assigned last:
//!
//! - first assignment at top level: a get node whose `initial_value` is
//!   the assigned value;
//! - first assignment inside a construct: a get node plus a set node;
//! - every later assignment: another set node on the same handle.
//!
//! Reads always resolve to the get node's `value` output.

use graphlift_core::builtin::{self, LOCAL_HANDLE, LOCAL_INITIAL_VALUE, LOCAL_VALUE};
use graphlift_core::{NodeId, SourceSpan};
use graphlift_syntax::{Call, Expr, ExprKind};

use crate::constants::extract_constant;
use crate::diagnostics::DiagnosticKind;
use crate::env::Producer;
use crate::flatten::ValueSource;
use crate::frontier::FlowFrontier;
use crate::lifter::Lifter;

impl<'g> Lifter<'g> {
    pub(crate) fn needs_local_variable(&self, name: &str) -> bool {
        self.env.is_multi_assign_candidate(name) || self.env.handle(name).is_some()
    }

    /// Lowers `name = value` through the local variable for `name`.
    ///
    /// Returns `false` when `value` is not something this path handles, so
    /// the caller can fall through to the ordinary assignment paths.
    pub(crate) fn lift_local_assignment(&mut self, name: &str, value: &Expr, span: SourceSpan) -> bool {
        let source = match &value.kind {
            ExprKind::Call(call) => match self.call_output(name, call, span) {
                Some(source) => source,
                // Already reported; the variable keeps its previous binding.
                None => return true,
            },
            _ => match self.plain_value_source(value) {
                Some(source) => source,
                None => return false,
            },
        };

        let get = match self.env.handle(name).cloned() {
            Some(handle) => {
                self.emit_set(&handle, value, source, span);
                handle.node
            }
            None => {
                let mut node = builtin::get_local_variable().with_span(span);
                node.var_names.insert(LOCAL_VALUE.to_string(), name.to_string());
                let get = self.graph.add_node(node);
                self.created.push(get);

                let handle = Producer::new(get, LOCAL_HANDLE);
                self.env.set_handle(name, handle.clone());
                if self.branch_depth == 0 {
                    self.bind_input(get, LOCAL_INITIAL_VALUE, value, source, span);
                } else {
                    self.emit_set(&handle, value, source, span);
                }
                get
            }
        };

        self.env.set(name, Producer::new(get, LOCAL_VALUE));
        if let Some(usage) = self.usage.as_deref_mut() {
            usage.rebind(name);
        }
        tracing::debug!(variable = name, node = %get, line = span.line, "assignment through local variable");
        true
    }

    fn call_output(&mut self, name: &str, call: &Call, span: SourceSpan) -> Option<ValueSource> {
        let id = self.materialize_call(call, span, true)?;
        let output = self
            .graph
            .node(id)
            .and_then(|node| node.data_outputs().next())
            .map(|port| port.name.clone());
        match output {
            Some(port) => Some(ValueSource::Producer(Producer::new(id, port))),
            None => {
                self.warn(
                    DiagnosticKind::UnknownPort,
                    span,
                    format!("call assigned to '{name}' has no data output"),
                );
                None
            }
        }
    }

    /// A variable, literal or entry parameter on the right-hand side.
    fn plain_value_source(&self, value: &Expr) -> Option<ValueSource> {
        if let Some(producer) = value.as_name().and_then(|source| self.env.get(source)) {
            return Some(ValueSource::Producer(producer.clone()));
        }
        if let Some(literal) = extract_constant(value, Some(&self.env), self.ctx.constants) {
            return Some(ValueSource::Constant(literal));
        }
        let is_param = self
            .usage
            .as_deref()
            .is_some_and(|usage| usage.param_of(value).is_some());
        is_param.then_some(ValueSource::Unbound)
    }

    /// Adds a set node writing `source` through `handle`, attached to the
    /// frontier; it becomes the new frontier.
    fn emit_set(&mut self, handle: &Producer, value: &Expr, source: ValueSource, span: SourceSpan) -> NodeId {
        let set = self.graph.add_node(builtin::set_local_variable().with_span(span));
        self.created.push(set);
        self.connect_data(handle, set, LOCAL_HANDLE, span);
        self.bind_input(set, LOCAL_VALUE, value, source, span);
        self.attach(set);
        self.frontier = FlowFrontier::Node(set);
        set
    }
}
