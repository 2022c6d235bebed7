//! Class-level front-end.
//!
//! A *graph unit* is the first class in a module not decorated
//! `@composite_class`; each of its event-handler methods becomes an event
//! node plus the lifted body. A *composite unit* is a class decorated
//! `@composite_class`; its `@flow_entry` and `@event_handler` methods are
//! lifted into one graph and its declared pins are bound afterwards.

use std::collections::HashMap;

use graphlift_core::{
    builtin, Graph, Literal, NodeCategory, NodeId, NodeRegistry, NodeSpec, Port, ResolvedPin,
};
use graphlift_syntax::ast::walk_stmts;
use graphlift_syntax::{parse_module, ClassDef, Expr, ExprKind, FunctionDef, Module, StmtKind};
use indexmap::IndexMap;
use serde::Serialize;

use crate::config::LiftConfig;
use crate::constants::ConstantCache;
use crate::diagnostics::Diagnostics;
use crate::env::{Producer, VarEnv};
use crate::error::LiftError;
use crate::frontier::FlowFrontier;
use crate::lifter::{CompositeInstances, LiftContext, Lifter};
use crate::pins::{
    annotation_type, declare_pins, propagate_copies, resolve_pins, MethodKind, MethodPins,
    PinDeclaration,
};
use crate::usage::UsageTracker;

pub const COMPOSITE_CLASS: &str = "composite_class";
pub const FLOW_ENTRY: &str = "flow_entry";
pub const EVENT_HANDLER: &str = "event_handler";

/// A lifted graph unit.
#[derive(Debug, Clone, Serialize)]
pub struct LiftOutput {
    pub graph: Graph,
    pub diagnostics: Diagnostics,
}

/// A lifted composite: its graph, bound pins and diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct CompositeUnit {
    pub name: String,
    pub composite_id: String,
    pub graph: Graph,
    pub pins: Vec<ResolvedPin>,
    pub diagnostics: Diagnostics,
}

impl CompositeUnit {
    /// The composite as a callable node kind: input pins become inputs,
    /// output pins outputs.
    pub fn node_spec(&self) -> NodeSpec {
        let mut spec = NodeSpec::new(self.name.clone(), NodeCategory::Composite);
        spec.composite_id = Some(self.composite_id.clone());
        for resolved in &self.pins {
            let pin = &resolved.pin;
            let port = if pin.is_flow {
                Port::flow(pin.name.clone())
            } else {
                Port::data(pin.name.clone(), pin.type_name.clone())
            };
            match pin.direction {
                graphlift_core::PinDirection::Input => {
                    if !spec.inputs.contains(&port) {
                        spec.inputs.push(port);
                    }
                }
                graphlift_core::PinDirection::Output => {
                    if !spec.outputs.contains(&port) {
                        spec.outputs.push(port);
                    }
                }
            }
        }
        spec
    }
}

/// Composites defined in the module being lifted shadow the base registry.
struct ModuleRegistry<'a> {
    local: IndexMap<String, NodeSpec>,
    base: &'a dyn NodeRegistry,
}

impl NodeRegistry for ModuleRegistry<'_> {
    fn resolve(&self, name: &str) -> Option<&NodeSpec> {
        self.local.get(name).or_else(|| self.base.resolve(name))
    }
}

// ---------------------------------------------------------------------------
// Graph units
// ---------------------------------------------------------------------------

pub fn lift_graph_source(
    source: &str,
    registry: &dyn NodeRegistry,
    config: &LiftConfig,
) -> Result<LiftOutput, LiftError> {
    let module = parse_module(source)?;
    lift_graph_module(&module, registry, config)
}

/// Lifts the graph class of `module`.
///
/// Composite classes in the same module are lifted first and become
/// callable under their class name.
pub fn lift_graph_module(
    module: &Module,
    registry: &dyn NodeRegistry,
    config: &LiftConfig,
) -> Result<LiftOutput, LiftError> {
    let class = module
        .classes()
        .find(|class| class.decorator(COMPOSITE_CLASS).is_none())
        .ok_or(LiftError::NoGraphClass)?;

    let mut diagnostics = Diagnostics::new();
    let mut local = IndexMap::new();
    for composite in module
        .classes()
        .filter(|class| class.decorator(COMPOSITE_CLASS).is_some())
    {
        let unit = lift_composite_class(module, composite, registry, config);
        local.insert(unit.name.clone(), unit.node_spec());
        diagnostics.extend(unit.diagnostics.into_vec());
    }
    let registry = ModuleRegistry { local, base: registry };

    let constants = ConstantCache::collect(module, Some(class));
    let instances = composite_instances(class, &registry);
    let ctx = LiftContext {
        registry: &registry,
        config,
        constants: &constants,
        instances: &instances,
    };

    let mut graph = Graph::new(class.name.clone());
    for method in class.methods() {
        let Some(event) = config.event_name(&method.name) else {
            continue;
        };
        let event_id = add_event_node(&mut graph, event, method, &registry, config);
        graph.event_order.push(event_id);
        tracing::debug!(event, node = %event_id, "lifting event handler");

        let mut lifter = Lifter::new(&mut graph, ctx, &mut diagnostics);
        bind_event_params(&mut lifter, event_id, method, config);
        lifter.lift_body(&method.body, FlowFrontier::Node(event_id));
    }

    Ok(LiftOutput { graph, diagnostics })
}

fn add_event_node(
    graph: &mut Graph,
    event: &str,
    method: &FunctionDef,
    registry: &dyn NodeRegistry,
    config: &LiftConfig,
) -> NodeId {
    let params: Vec<(String, String)> = method
        .params_without_self()
        .iter()
        .filter(|param| !config.is_reserved_name(&param.name))
        .map(|param| {
            let type_name = param
                .annotation
                .as_ref()
                .map(annotation_type)
                .unwrap_or_else(|| graphlift_core::node::GENERIC_TYPE.to_string());
            (param.name.clone(), type_name)
        })
        .collect();
    let mut node = builtin::event(event, &params).with_span(method.span);
    if let Some(spec) = registry.resolve(event) {
        node.inputs.extend(spec.fixed_inputs().cloned());
    }
    graph.add_node(node)
}

fn bind_event_params(lifter: &mut Lifter<'_>, event: NodeId, method: &FunctionDef, config: &LiftConfig) {
    for param in method.params_without_self() {
        if config.is_reserved_name(&param.name) {
            continue;
        }
        lifter
            .env_mut()
            .set(param.name.clone(), Producer::new(event, param.name.clone()));
    }
}

/// `self.<alias> = <Composite>(...)` assignments in `__init__`.
fn composite_instances(class: &ClassDef, registry: &dyn NodeRegistry) -> CompositeInstances {
    let mut instances = CompositeInstances::new();
    let Some(init) = class.method("__init__") else {
        return instances;
    };
    walk_stmts(&init.body, &mut |stmt| {
        let StmtKind::Assign { targets, value } = &stmt.kind else {
            return;
        };
        let [target] = targets.as_slice() else {
            return;
        };
        let (Some(alias), Some(call)) = (target.self_attribute(), value.as_call()) else {
            return;
        };
        let Some(spec) = call.func.as_name().and_then(|name| registry.resolve(name)) else {
            return;
        };
        if spec.composite_id.is_some() || spec.category == NodeCategory::Composite {
            tracing::debug!(instance = alias, composite = %spec.name, "composite instance");
            instances.insert(alias.to_string(), spec.clone());
        }
    });
    instances
}

// ---------------------------------------------------------------------------
// Composite units
// ---------------------------------------------------------------------------

pub fn lift_composite_source(
    source: &str,
    registry: &dyn NodeRegistry,
    config: &LiftConfig,
) -> Result<CompositeUnit, LiftError> {
    let module = parse_module(source)?;
    lift_composite_module(&module, registry, config)
}

/// Lifts the first `@composite_class` class of `module`.
pub fn lift_composite_module(
    module: &Module,
    registry: &dyn NodeRegistry,
    config: &LiftConfig,
) -> Result<CompositeUnit, LiftError> {
    let class = module
        .classes()
        .find(|class| class.decorator(COMPOSITE_CLASS).is_some())
        .ok_or(LiftError::NoCompositeClass)?;
    Ok(lift_composite_class(module, class, registry, config))
}

struct LiftedMethod {
    declarations: Vec<PinDeclaration>,
    nodes: Vec<NodeId>,
    event_node: Option<NodeId>,
    env: VarEnv,
}

fn lift_composite_class(
    module: &Module,
    class: &ClassDef,
    registry: &dyn NodeRegistry,
    config: &LiftConfig,
) -> CompositeUnit {
    let composite_id = class
        .decorator(COMPOSITE_CLASS)
        .and_then(|decorator| decorator.as_call())
        .and_then(|call| call.keyword("composite_id"))
        .and_then(|expr| expr.as_constant())
        .and_then(Literal::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("composite_{}", class.name));

    let constants = ConstantCache::collect(module, Some(class));
    let instances = composite_instances(class, registry);
    let ctx = LiftContext {
        registry,
        config,
        constants: &constants,
        instances: &instances,
    };

    let mut graph = Graph::new(class.name.clone());
    let mut diagnostics = Diagnostics::new();
    let mut usage = UsageTracker::with_state_fields(state_fields(class));
    let mut next_index = 1;
    let mut lifted = Vec::new();

    for method in class.methods() {
        let Some(kind) = method_kind(method) else {
            continue;
        };
        let declarations = declare_pins(method, &kind, config, &mut next_index);

        let (event_node, entry) = match &kind {
            MethodKind::EventHandler { event, .. } => {
                usage.begin_method::<&str>(&method.name, &[]);
                let id = add_event_node(&mut graph, event, method, registry, config);
                graph.event_order.push(id);
                (Some(id), FlowFrontier::Node(id))
            }
            MethodKind::FlowEntry => {
                let params: Vec<&str> = method
                    .params_without_self()
                    .iter()
                    .map(|param| param.name.as_str())
                    .collect();
                usage.begin_method(&method.name, &params);
                (None, FlowFrontier::empty())
            }
        };
        tracing::debug!(method = %method.name, ?kind, "lifting composite method");

        let exports: Vec<String> = declarations
            .iter()
            .filter(|d| d.spec.direction == graphlift_core::PinDirection::Output && !d.spec.is_flow)
            .map(|d| d.variable.clone().unwrap_or_else(|| d.spec.name.clone()))
            .collect();
        let mut lifter = Lifter::new(&mut graph, ctx, &mut diagnostics)
            .with_usage(&mut usage)
            .with_exports(exports);
        if let Some(event) = event_node {
            bind_event_params(&mut lifter, event, method, config);
        }
        lifter.lift_body(&method.body, entry);
        let (env, created) = lifter.finish();

        lifted.push(LiftedMethod {
            declarations,
            nodes: event_node.into_iter().chain(created).collect(),
            event_node,
            env,
        });
    }

    let mut pins = Vec::new();
    for method in &lifted {
        let view = MethodPins {
            declarations: &method.declarations,
            nodes: &method.nodes,
            event_node: method.event_node,
            env: &method.env,
        };
        pins.extend(resolve_pins(&graph, &view, &usage, &mut diagnostics));
    }
    // No-op until a layout pass has added copies; see `propagate_copies`.
    propagate_copies(&graph, &mut pins);

    CompositeUnit {
        name: class.name.clone(),
        composite_id,
        graph,
        pins,
        diagnostics,
    }
}

/// `@flow_entry` / `@event_handler(...)` methods, minus `internal=True`
/// ones.
fn method_kind(method: &FunctionDef) -> Option<MethodKind> {
    let keyword_bool = |decorator: &Expr, name: &str| {
        decorator
            .as_call()
            .and_then(|call| call.keyword(name))
            .and_then(|expr| expr.as_constant())
            .and_then(|literal| match literal {
                Literal::Bool(value) => Some(*value),
                _ => None,
            })
    };

    if let Some(decorator) = method.decorator(FLOW_ENTRY) {
        if keyword_bool(decorator, "internal") == Some(true) {
            return None;
        }
        return Some(MethodKind::FlowEntry);
    }
    let decorator = method.decorator(EVENT_HANDLER)?;
    if keyword_bool(decorator, "internal") == Some(true) {
        return None;
    }
    let event = decorator
        .as_call()
        .and_then(|call| call.keyword("event"))
        .and_then(|expr| expr.as_constant())
        .and_then(Literal::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| method.name.clone());
    Some(MethodKind::EventHandler {
        event,
        expose_params: keyword_bool(decorator, "expose_event_params").unwrap_or(true),
    })
}

/// `self.<field> = <param>` assignments anywhere in the class; the first
/// binding of a field wins.
fn state_fields(class: &ClassDef) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    for method in class.methods() {
        let params = method.params_without_self();
        walk_stmts(&method.body, &mut |stmt| {
            let StmtKind::Assign { targets, value } = &stmt.kind else {
                return;
            };
            let ExprKind::Name(source) = &value.kind else {
                return;
            };
            if !params.iter().any(|param| &param.name == source) {
                return;
            }
            for field in targets.iter().filter_map(|target| target.self_attribute()) {
                fields
                    .entry(field.to_string())
                    .or_insert_with(|| source.clone());
            }
        });
    }
    fields
}
