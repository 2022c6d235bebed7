//! Virtual-Pin Resolver.
//!
//! Pins are declared per composite method (marker calls plus, for flow
//! entries, the signature) and bound after the whole unit is lifted, so
//! state-field usages recorded in any method are visible. Binding only produces
//! [`ResolvedPin`] values; the graph is never modified here.

use graphlift_core::{Graph, MappedPort, NodeId, PinDirection, PinSpec, ResolvedPin};
use graphlift_syntax::ast::walk_stmts;
use graphlift_syntax::{printer::print_expr, Expr, ExprKind, FunctionDef, StmtKind};

use crate::config::LiftConfig;
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::env::VarEnv;
use crate::usage::UsageTracker;

const FLOW_TYPE: &str = "flow";
const GENERIC_TYPE: &str = "generic";

/// How a composite method is entered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodKind {
    FlowEntry,
    EventHandler { event: String, expose_params: bool },
}

/// A declared pin plus the variable a data output reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinDeclaration {
    pub spec: PinSpec,
    pub variable: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkerKind {
    FlowIn,
    FlowOut,
    DataIn,
    DataOut,
}

#[derive(Debug, Clone)]
struct Marker {
    kind: MarkerKind,
    name: String,
    type_name: Option<String>,
    variable: Option<String>,
}

fn marker_kind(name: &str) -> Option<MarkerKind> {
    match name {
        "flow_in" => Some(MarkerKind::FlowIn),
        "flow_out" => Some(MarkerKind::FlowOut),
        "data_in" => Some(MarkerKind::DataIn),
        "data_out" => Some(MarkerKind::DataOut),
        _ => None,
    }
}

/// Type named by an annotation or `pin_type=` argument.
pub fn annotation_type(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Constant(literal) => literal
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| literal.to_string()),
        ExprKind::Name(name) => name.clone(),
        _ => print_expr(expr),
    }
}

fn string_value(expr: &Expr) -> Option<String> {
    match &expr.kind {
        ExprKind::Constant(literal) => literal.as_str().map(str::to_string),
        ExprKind::Name(name) => Some(name.clone()),
        _ => None,
    }
}

fn collect_markers(method: &FunctionDef, config: &LiftConfig) -> Vec<Marker> {
    let mut markers = Vec::new();
    walk_stmts(&method.body, &mut |stmt| {
        let StmtKind::Expr(expr) = &stmt.kind else {
            return;
        };
        let Some(call) = expr.as_call() else {
            return;
        };
        let Some(callee) = call.func.as_name() else {
            return;
        };
        if !config.is_pin_marker(callee) {
            return;
        }
        let (Some(kind), Some(name)) = (marker_kind(callee), call.keyword("name").or(call.args.first()).and_then(string_value)) else {
            return;
        };
        markers.push(Marker {
            kind,
            name,
            type_name: call.keyword("pin_type").map(annotation_type),
            variable: call.keyword("variable").and_then(string_value),
        });
    });
    markers
}

/// Declares the pins of one method, numbering them from `next_index`.
///
/// Flow entries declare flow-input markers, signature data inputs, the
/// remaining `data_in` markers, flow-output markers and data-output
/// markers, in that order. Event handlers declare their parameters as data
/// outputs (when exposed), flow-output markers (`flow_out` by default) and
/// data-output markers.
pub fn declare_pins(
    method: &FunctionDef,
    kind: &MethodKind,
    config: &LiftConfig,
    next_index: &mut u32,
) -> Vec<PinDeclaration> {
    let markers = collect_markers(method, config);
    let of_kind = |wanted: MarkerKind| markers.iter().filter(move |m| m.kind == wanted);

    let mut declared: Vec<(String, String, PinDirection, bool, Option<String>)> = Vec::new();
    match kind {
        MethodKind::FlowEntry => {
            for marker in of_kind(MarkerKind::FlowIn) {
                declared.push((marker.name.clone(), FLOW_TYPE.into(), PinDirection::Input, true, None));
            }
            let params = method.params_without_self();
            for param in params {
                let marker_type = of_kind(MarkerKind::DataIn)
                    .find(|m| m.name == param.name)
                    .and_then(|m| m.type_name.clone());
                let type_name = marker_type
                    .or_else(|| param.annotation.as_ref().map(annotation_type))
                    .unwrap_or_else(|| GENERIC_TYPE.to_string());
                declared.push((param.name.clone(), type_name, PinDirection::Input, false, None));
            }
            for marker in of_kind(MarkerKind::DataIn) {
                if params.iter().any(|p| p.name == marker.name) {
                    continue;
                }
                let type_name = marker.type_name.clone().unwrap_or_else(|| GENERIC_TYPE.into());
                declared.push((marker.name.clone(), type_name, PinDirection::Input, false, None));
            }
            for marker in of_kind(MarkerKind::FlowOut) {
                declared.push((marker.name.clone(), FLOW_TYPE.into(), PinDirection::Output, true, None));
            }
        }
        MethodKind::EventHandler { expose_params, .. } => {
            if *expose_params {
                for param in method.params_without_self() {
                    let type_name = param
                        .annotation
                        .as_ref()
                        .map(annotation_type)
                        .unwrap_or_else(|| GENERIC_TYPE.to_string());
                    declared.push((param.name.clone(), type_name, PinDirection::Output, false, None));
                }
            }
            let mut flow_outs = of_kind(MarkerKind::FlowOut).peekable();
            if flow_outs.peek().is_none() {
                declared.push(("flow_out".into(), FLOW_TYPE.into(), PinDirection::Output, true, None));
            }
            for marker in flow_outs {
                declared.push((marker.name.clone(), FLOW_TYPE.into(), PinDirection::Output, true, None));
            }
        }
    }
    for marker in of_kind(MarkerKind::DataOut) {
        let type_name = marker.type_name.clone().unwrap_or_else(|| GENERIC_TYPE.into());
        declared.push((
            marker.name.clone(),
            type_name,
            PinDirection::Output,
            false,
            marker.variable.clone(),
        ));
    }

    declared
        .into_iter()
        .map(|(name, type_name, direction, is_flow, variable)| {
            let index = *next_index;
            *next_index += 1;
            PinDeclaration {
                spec: PinSpec {
                    index,
                    name,
                    type_name,
                    direction,
                    is_flow,
                    method: method.name.clone(),
                },
                variable,
            }
        })
        .collect()
}

/// What pin resolution needs to know about one lifted method.
pub struct MethodPins<'a> {
    pub declarations: &'a [PinDeclaration],
    /// Nodes lifted from the method, in creation order.
    pub nodes: &'a [NodeId],
    pub event_node: Option<NodeId>,
    /// Environment at the end of the method body.
    pub env: &'a VarEnv,
}

/// Binds every declared pin of one method.
pub fn resolve_pins(
    graph: &Graph,
    method: &MethodPins<'_>,
    usage: &UsageTracker,
    sink: &mut dyn DiagnosticSink,
) -> Vec<ResolvedPin> {
    let entry = entry_anchor(graph, method.nodes);
    let first_branch = method
        .nodes
        .iter()
        .copied()
        .find(|id| graph.node(*id).is_some_and(|n| n.is_branch()));
    let branch_exits: Vec<String> = first_branch
        .and_then(|id| graph.node(id).map(|node| (id, node)))
        .filter(|(id, node)| {
            node.flow_outputs()
                .all(|port| graph.flow_targets(*id, &port.name).is_empty())
        })
        .map(|(_, node)| node.flow_outputs().map(|p| p.name.clone()).collect())
        .unwrap_or_default();
    let terminal = terminal_node(graph, method.nodes);
    let mut flow_out_index = 0;

    let mut resolved = Vec::with_capacity(method.declarations.len());
    for declaration in method.declarations {
        let pin = &declaration.spec;
        let mut binding = ResolvedPin::new(pin.clone());

        match (pin.direction, pin.is_flow) {
            (PinDirection::Input, true) => {
                if let Some((node, port)) = &entry {
                    binding.map(*node, port.as_str());
                }
            }
            (PinDirection::Input, false) => {
                for site in usage.usages(&pin.method, &pin.name) {
                    binding.map(site.node, site.port.as_str());
                }
                if !binding.is_mapped() && usage.used_in_condition(&pin.method, &pin.name) {
                    let condition = first_branch.and_then(|id| {
                        graph
                            .node(id)
                            .and_then(|n| n.condition_port())
                            .map(|port| (id, port))
                    });
                    if let Some((node, port)) = condition {
                        binding.map(node, port);
                    }
                }
            }
            (PinDirection::Output, true) => {
                match branch_exits.get(flow_out_index) {
                    Some(port) => {
                        if let Some(branch) = first_branch {
                            binding.map(branch, port.as_str());
                        }
                    }
                    None => {
                        if let Some((node, port)) = &terminal {
                            binding.map(*node, port.as_str());
                        }
                    }
                }
                flow_out_index += 1;
            }
            (PinDirection::Output, false) => {
                let exposed = method.event_node.filter(|event| {
                    declaration.variable.is_none()
                        && graph
                            .node(*event)
                            .and_then(|n| n.output(&pin.name))
                            .is_some_and(|p| !p.is_flow())
                });
                match exposed {
                    Some(event) => {
                        binding.map(event, pin.name.as_str());
                    }
                    None => {
                        let variable = declaration.variable.as_deref().unwrap_or(&pin.name);
                        if let Some(producer) = method.env.get(variable) {
                            binding.map(producer.node, producer.port.as_str());
                        }
                    }
                }
            }
        }

        if !binding.is_mapped() {
            binding.allow_unmapped = true;
            sink.warn(Diagnostic::new(
                DiagnosticKind::UnmappedPin,
                format!(
                    "pin '{}' of '{}' has no anchor in the lifted graph",
                    pin.name, pin.method
                ),
            ));
        }
        resolved.push(binding);
    }
    resolved
}

/// The first node with a flow input that nothing flows into, preferring a
/// branch or loop node.
fn entry_anchor(graph: &Graph, nodes: &[NodeId]) -> Option<(NodeId, String)> {
    let candidates: Vec<(NodeId, String)> = nodes
        .iter()
        .filter_map(|id| {
            let node = graph.node(*id)?;
            let port = node.flow_entry_port()?;
            (!graph.has_incoming_flow(*id, port)).then(|| (*id, port.to_string()))
        })
        .collect();
    let preferred = candidates.iter().find(|(id, _)| {
        graph
            .node(*id)
            .is_some_and(|node| node.is_branch() || node.is_loop())
    });
    preferred.or(candidates.first()).cloned()
}

/// The last node whose flow outputs all lack outgoing flow edges.
fn terminal_node(graph: &Graph, nodes: &[NodeId]) -> Option<(NodeId, String)> {
    nodes.iter().rev().find_map(|id| {
        let node = graph.node(*id)?;
        let mut outputs = node.flow_outputs().peekable();
        outputs.peek()?;
        if outputs.any(|port| !graph.flow_targets(*id, &port.name).is_empty()) {
            return None;
        }
        node.default_flow_output().map(|port| (*id, port.to_string()))
    })
}

/// Extends every mapping to the layout copies of its node.
///
/// Lifting itself never creates copies, so the call made right after
/// resolution only matters for graphs that already carry them. A layout
/// pass that adds copies with [`Graph::add_copy`] must call this again on
/// the unit's pins.
pub fn propagate_copies(graph: &Graph, pins: &mut [ResolvedPin]) {
    for pin in pins.iter_mut() {
        let existing: Vec<MappedPort> = pin.mapped_ports.clone();
        for mapped in existing {
            let root = graph
                .node(mapped.node)
                .and_then(|node| node.copy_of)
                .unwrap_or(mapped.node);
            let family = std::iter::once(root).chain(graph.copies_of(root));
            for node in family {
                pin.map(node, mapped.port.as_str());
            }
        }
    }
}
