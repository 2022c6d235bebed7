//! Shared fixtures for the lifting integration tests.

#![allow(dead_code)]

use graphlift_core::{Graph, NodeCategory, NodeId, NodeSpec, Port, StaticRegistry};
use graphlift_lift::{
    CompositeInstances, ConstantCache, Diagnostics, FlowFrontier, LiftConfig, LiftContext, Lifter,
};
use graphlift_syntax::{parse_module, StmtKind};

/// A small node library covering every shape the lifter cares about.
pub fn registry() -> StaticRegistry {
    let mut registry = StaticRegistry::with_builtins();
    registry.insert(
        NodeSpec::new("print_text", NodeCategory::Execution)
            .with_input(Port::flow("flow_in"))
            .with_input(Port::data("text", "string"))
            .with_output(Port::flow("flow_out")),
    );
    registry.insert(
        NodeSpec::new("compute", NodeCategory::Execution)
            .with_input(Port::flow("flow_in"))
            .with_input(Port::data("value", "int"))
            .with_output(Port::flow("flow_out"))
            .with_output(Port::data("result", "int")),
    );
    registry.insert(
        NodeSpec::new("to_text", NodeCategory::Query)
            .with_input(Port::data("value", "generic"))
            .with_output(Port::data("text", "string")),
    );
    registry.insert(
        NodeSpec::new("add", NodeCategory::Query)
            .with_input(Port::data("a", "int"))
            .with_input(Port::data("b", "int"))
            .with_output(Port::data("sum", "int")),
    );
    registry.insert(
        NodeSpec::new("split_pair", NodeCategory::Query)
            .with_input(Port::data("pair", "list"))
            .with_output(Port::data("first", "generic"))
            .with_output(Port::data("second", "generic")),
    );
    registry.insert(
        NodeSpec::new("assemble_list", NodeCategory::Query)
            .with_input(Port::data("0~99", "generic"))
            .with_output(Port::data("list", "list")),
    );
    registry.insert(
        NodeSpec::new("Checker", NodeCategory::Composite)
            .with_input(Port::flow("check"))
            .with_output(Port::flow("0"))
            .with_output(Port::flow("1"))
            .with_output(Port::flow("default")),
    );
    registry
}

/// Indents `body` under a bare `def body(self):` and lifts it from an
/// empty frontier.
pub fn lift_body(body: &str) -> (Graph, Diagnostics) {
    lift_body_with(body, &LiftConfig::default())
}

pub fn lift_body_with(body: &str, config: &LiftConfig) -> (Graph, Diagnostics) {
    let indented: String = body
        .lines()
        .map(|line| format!("    {line}\n"))
        .collect();
    let module = parse_module(&format!("def body(self):\n{indented}")).unwrap();
    let def = match &module.body[0].kind {
        StmtKind::FunctionDef(def) => def.clone(),
        other => panic!("expected def, got {other:?}"),
    };

    let registry = registry();
    let constants = ConstantCache::new();
    let instances = CompositeInstances::new();
    let ctx = LiftContext {
        registry: &registry,
        config,
        constants: &constants,
        instances: &instances,
    };
    let mut graph = Graph::new("body");
    let mut diagnostics = Diagnostics::new();
    let mut lifter = Lifter::new(&mut graph, ctx, &mut diagnostics);
    lifter.lift_body(&def.body, FlowFrontier::empty());
    drop(lifter);
    (graph, diagnostics)
}

pub fn only(graph: &Graph, title: &str) -> NodeId {
    let ids = graph.nodes_titled(title);
    assert_eq!(ids.len(), 1, "expected exactly one '{title}' node, got {ids:?}");
    ids[0]
}

/// `(source title, source port, target title, target port)` for every flow
/// edge, in edge order.
pub fn flow_edges(graph: &Graph) -> Vec<(String, String, String, String)> {
    graph
        .edges()
        .into_iter()
        .filter(|edge| edge.kind == graphlift_core::EdgeKind::Flow)
        .map(|edge| {
            let title = |id: NodeId| graph.node(id).map(|n| n.title.clone()).unwrap_or_default();
            (
                title(edge.source),
                edge.source_port.clone(),
                title(edge.target),
                edge.target_port.clone(),
            )
        })
        .collect()
}
