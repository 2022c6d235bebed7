//! Node/Edge Factory: builds a node from a call and a resolved spec.
//!
//! The factory only shapes the node: ports (including variadic ranges and
//! dynamic ports) and the list of `(port, argument)` bindings. Realizing the
//! bound values (constants, producer edges, nested calls) is the
//! flattener's job, so both top-level and nested calls share it.

use graphlift_core::{CompositeRef, Literal, Node, NodeSpec, Port, SourceSpan, Variadic};
use graphlift_syntax::{Call, Expr};

use crate::args::{normalize, NormalizedArguments};
use crate::config::LiftConfig;
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};

/// A node built from a call but not yet added to a graph.
#[derive(Debug, Clone)]
pub struct PendingNode<'c> {
    pub node: Node,
    /// Input port -> argument expression, in binding order.
    pub bindings: Vec<(String, &'c Expr)>,
}

pub struct Factory<'a> {
    config: &'a LiftConfig,
}

impl<'a> Factory<'a> {
    pub fn new(config: &'a LiftConfig) -> Self {
        Factory { config }
    }

    /// Shapes a node for `call` against `spec`.
    ///
    /// When the call supplies no variadic argument, the minimal legal port
    /// set is synthesized with constant `0`: one port for a simple range, a
    /// key/value pair for a keyed one.
    pub fn build<'c>(
        &self,
        spec: &NodeSpec,
        call: &'c Call,
        span: SourceSpan,
        sink: &mut dyn DiagnosticSink,
    ) -> PendingNode<'c> {
        let mut node = spec.instantiate().with_span(span);
        if let Some(composite_id) = &spec.composite_id {
            node.composite = Some(CompositeRef {
                composite_id: composite_id.clone(),
                instance: String::new(),
                method: String::new(),
            });
        }

        let variadic = spec.variadic().unwrap_or(Variadic::None);
        let normalized = match normalize(call, spec, self.config) {
            Ok(normalized) => normalized,
            Err(err) => {
                sink.warn(Diagnostic::new(DiagnosticKind::UnknownPort, err.to_string()).at(span.line));
                NormalizedArguments::default()
            }
        };

        if normalized.overflow > 0 {
            let (kind, message) = match &variadic {
                Variadic::None => (
                    DiagnosticKind::UnknownPort,
                    format!(
                        "'{}' takes {} positional argument(s); {} extra dropped",
                        spec.name,
                        spec.fixed_data_inputs().count(),
                        normalized.overflow
                    ),
                ),
                _ => (
                    DiagnosticKind::TooManyVariadicArguments,
                    format!(
                        "'{}' variadic range is full; {} argument(s) dropped",
                        spec.name, normalized.overflow
                    ),
                ),
            };
            sink.warn(Diagnostic::new(kind, message).at(span.line));
        }

        let mut bindings: Vec<(String, &'c Expr)> = Vec::with_capacity(normalized.len());
        let mut variadic_bound = normalized.variadic_count > 0;

        for argument in &normalized.positional {
            node.add_input(argument.port.clone());
            bindings.push((argument.port.name.clone(), argument.expr));
        }

        for (name, expr) in &normalized.keywords {
            if node.input(name).is_some_and(|p| !p.is_flow()) {
                bindings.push((name.to_string(), *expr));
                continue;
            }
            if let Some(port) = range_port(&variadic, name) {
                variadic_bound = true;
                node.add_input(port);
                bindings.push((name.to_string(), *expr));
                continue;
            }
            if spec.dynamic_ports {
                node.add_input(Port::generic(*name));
                bindings.push((name.to_string(), *expr));
                continue;
            }
            sink.warn(
                Diagnostic::new(
                    DiagnosticKind::UnknownPort,
                    format!("'{}' has no input named '{name}'", spec.name),
                )
                .at(span.line),
            );
        }

        if !variadic_bound {
            let minimal: Vec<Port> = match &variadic {
                Variadic::None => Vec::new(),
                Variadic::Simple(range) => vec![range.port(0)],
                Variadic::Keyed { key, value } => vec![key.port(0), value.port(0)],
            };
            for port in minimal {
                node.constants.insert(port.name.clone(), Literal::Int(0));
                node.add_input(port);
            }
        }

        PendingNode { node, bindings }
    }
}

/// A keyword naming a port inside one of the variadic ranges.
fn range_port(variadic: &Variadic, name: &str) -> Option<Port> {
    let ranges = match variadic {
        Variadic::None => return None,
        Variadic::Simple(range) => vec![range],
        Variadic::Keyed { key, value } => vec![key, value],
    };
    ranges
        .into_iter()
        .find(|range| range.contains(name))
        .map(|range| Port::data(name, range.type_name.clone()))
}
