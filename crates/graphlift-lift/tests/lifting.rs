//! Statement-level lifting behaviour.
//!
//! Bodies are lifted in isolation from an empty frontier (see
//! `common::lift_body`) unless a test needs a full graph class.

mod common;

use common::{flow_edges, lift_body, lift_body_with, only, registry};
use graphlift_core::{builtin, EdgeKind, Literal, NodeCategory, NodeSpec, Port};
use graphlift_lift::{lift_graph_source, DiagnosticKind, LiftConfig, LiftError};

// ---------------------------------------------------------------------------
// Straight-line code and nesting
// ---------------------------------------------------------------------------

#[test]
fn straight_line_calls_chain_in_source_order() {
    let (graph, diagnostics) = lift_body(
        "print_text(self.game, \"a\")\n\
         compute(self.game, 1)\n\
         print_text(self.game, \"b\")",
    );
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    assert_eq!(graph.node_count(), 3);
    assert_eq!(
        flow_edges(&graph),
        vec![
            ("print_text".into(), "flow_out".into(), "compute".into(), "flow_in".into()),
            ("compute".into(), "flow_out".into(), "print_text".into(), "flow_in".into()),
        ]
    );
    let first = graph.nodes_titled("print_text")[0];
    assert_eq!(
        graph.node(first).unwrap().constants.get("text"),
        Some(&Literal::Str("a".into()))
    );
}

#[test]
fn nested_call_becomes_its_own_node_with_one_data_edge() {
    let (graph, diagnostics) = lift_body("print_text(self.game, to_text(42))");
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    assert_eq!(graph.node_count(), 2);
    assert_eq!(graph.count_edges(EdgeKind::Data), 1);
    assert_eq!(graph.count_edges(EdgeKind::Flow), 0);

    let inner = only(&graph, "to_text");
    let outer = only(&graph, "print_text");
    assert_eq!(graph.data_source(outer, "text"), Some((inner, "text".to_string())));
    assert_eq!(
        graph.node(inner).unwrap().constants.get("value"),
        Some(&Literal::Int(42))
    );
    // Innermost first.
    assert!(inner.0 < outer.0);
}

#[test]
fn nesting_does_not_disturb_outer_flow_wiring() {
    let (graph, _) = lift_body(
        "compute(self.game, 1)\n\
         print_text(self.game, to_text(add(1, 2)))",
    );
    assert_eq!(graph.node_count(), 4);
    assert_eq!(graph.count_edges(EdgeKind::Data), 2);
    assert_eq!(
        flow_edges(&graph),
        vec![("compute".into(), "flow_out".into(), "print_text".into(), "flow_in".into())]
    );
}

#[test]
fn variables_wire_data_edges() {
    let (graph, _) = lift_body(
        "total = compute(self.game, 3)\n\
         print_text(self.game, total)",
    );
    let compute = only(&graph, "compute");
    let print = only(&graph, "print_text");
    assert_eq!(graph.data_source(print, "text"), Some((compute, "result".to_string())));
    assert_eq!(
        graph.node(compute).unwrap().var_names.get("result").map(String::as_str),
        Some("total")
    );
}

#[test]
fn tuple_targets_bind_outputs_by_position() {
    let (graph, _) = lift_body(
        "first, second = split_pair([1, 2])\n\
         print_text(self.game, second)",
    );
    let split = only(&graph, "split_pair");
    let print = only(&graph, "print_text");
    assert_eq!(graph.data_source(print, "text"), Some((split, "second".to_string())));
}

#[test]
fn literal_assignment_inlines_constant() {
    let (graph, diagnostics) = lift_body(
        "greeting = \"hi\"\n\
         alias = greeting\n\
         print_text(self.game, alias)",
    );
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    let print = only(&graph, "print_text");
    assert_eq!(
        graph.node(print).unwrap().constants.get("text"),
        Some(&Literal::Str("hi".into()))
    );
    assert_eq!(graph.count_edges(EdgeKind::Data), 0);
}

#[test]
fn annotated_assignment_records_type_override() {
    let (graph, _) = lift_body("total: \"float\" = compute(self.game, 3)");
    let compute = only(&graph, "compute");
    assert_eq!(graph.port_type_override(compute, "result"), Some("float"));
}

#[test]
fn bare_pure_call_is_dropped() {
    let (graph, diagnostics) = lift_body("add(1, 2)");
    assert_eq!(graph.node_count(), 0);
    assert!(diagnostics.is_empty());
}

#[test]
fn zero_variadic_arguments_get_minimal_port() {
    let (graph, _) = lift_body("items = assemble_list(self.game)");
    let list = only(&graph, "assemble_list");
    let node = graph.node(list).unwrap();
    assert_eq!(node.inputs.len(), 1);
    assert_eq!(node.constants.get("0"), Some(&Literal::Int(0)));
}

#[test]
fn variadic_arguments_fill_range() {
    let (graph, _) = lift_body("items = assemble_list(self.game, 1, 2, 3)");
    let node = graph.node(only(&graph, "assemble_list")).unwrap().clone();
    let names: Vec<&str> = node.inputs.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["0", "1", "2"]);
    assert_eq!(node.constants.get("2"), Some(&Literal::Int(3)));
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

#[test]
fn unresolved_call_is_skipped_and_lift_continues() {
    let (graph, diagnostics) = lift_body(
        "print_text(self.game, \"a\")\n\
         teleport(self.game)\n\
         print_text(self.game, \"b\")",
    );
    assert_eq!(diagnostics.count(DiagnosticKind::UnresolvedCall), 1);
    assert_eq!(diagnostics.of_kind(DiagnosticKind::UnresolvedCall)[0].line, Some(3));
    assert_eq!(graph.node_count(), 2);
    assert_eq!(graph.count_edges(EdgeKind::Flow), 1);
}

#[test]
fn native_method_call_is_reported() {
    let (graph, diagnostics) = lift_body("self.items.append(1)");
    assert_eq!(graph.node_count(), 0);
    assert_eq!(diagnostics.count(DiagnosticKind::NativeMethodCall), 1);
}

#[test]
fn dict_assignment_is_reported() {
    let (_, diagnostics) = lift_body("table = {\"a\": 1}");
    assert_eq!(diagnostics.count(DiagnosticKind::LiteralAssignment), 1);
}

#[test]
fn nested_flow_call_is_created_without_flow() {
    let (graph, diagnostics) = lift_body("print_text(self.game, compute(self.game, 1))");
    assert_eq!(diagnostics.count(DiagnosticKind::NestedFlowCall), 1);
    assert_eq!(graph.node_count(), 2);
    assert_eq!(graph.count_edges(EdgeKind::Data), 1);
    assert_eq!(graph.count_edges(EdgeKind::Flow), 0);
}

#[test]
fn continue_is_unsupported() {
    let (_, diagnostics) = lift_body("for i in range(2):\n    continue");
    assert_eq!(diagnostics.count(DiagnosticKind::UnsupportedStatement), 1);
}

// ---------------------------------------------------------------------------
// Branches and local variables
// ---------------------------------------------------------------------------

#[test]
fn variable_assigned_in_both_branches_gets_one_get_two_sets() {
    let (graph, diagnostics) = lift_body(
        "if flag:\n\
         \x20   x = compute(self.game, 1)\n\
         else:\n\
         \x20   x = compute(self.game, 2)\n\
         print_text(self.game, x)",
    );
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    let get = only(&graph, builtin::GET_LOCAL_VARIABLE);
    assert_eq!(graph.nodes_titled(builtin::SET_LOCAL_VARIABLE).len(), 2);

    let print = only(&graph, "print_text");
    assert_eq!(
        graph.data_source(print, "text"),
        Some((get, builtin::LOCAL_VALUE.to_string()))
    );
    for set in graph.nodes_titled(builtin::SET_LOCAL_VARIABLE) {
        assert_eq!(
            graph.data_source(set, builtin::LOCAL_HANDLE),
            Some((get, builtin::LOCAL_HANDLE.to_string()))
        );
        assert!(graph.flow_targets(set, builtin::FLOW_OUT).contains(&(print, "flow_in".into())));
    }
}

#[test]
fn variable_assigned_in_one_branch_and_unread_is_plain_alias() {
    let (graph, _) = lift_body(
        "if flag:\n\
         \x20   y = compute(self.game, 1)\n\
         print_text(self.game, \"done\")",
    );
    assert!(graph.nodes_titled(builtin::GET_LOCAL_VARIABLE).is_empty());
    assert!(graph.nodes_titled(builtin::SET_LOCAL_VARIABLE).is_empty());

    let branch = only(&graph, builtin::DOUBLE_BRANCH);
    let compute = only(&graph, "compute");
    let print = only(&graph, "print_text");
    assert!(graph.flow_targets(compute, "flow_out").contains(&(print, "flow_in".into())));
    assert!(graph.flow_targets(branch, builtin::BRANCH_FALSE).contains(&(print, "flow_in".into())));
}

#[test]
fn plain_variable_assigned_to_a_local_goes_through_set() {
    let (graph, diagnostics) = lift_body(
        "y = compute(self.game, 1)\n\
         if flag:\n\
         \x20   x = compute(self.game, 2)\n\
         else:\n\
         \x20   x = y\n\
         print_text(self.game, x)",
    );
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    let get = only(&graph, builtin::GET_LOCAL_VARIABLE);
    let sets = graph.nodes_titled(builtin::SET_LOCAL_VARIABLE);
    assert_eq!(sets.len(), 2);

    let computes = graph.nodes_titled("compute");
    assert_eq!(
        graph.data_source(sets[0], builtin::LOCAL_VALUE),
        Some((computes[1], "result".to_string()))
    );
    // `x = y` stores y's producer instead of aliasing x to it.
    assert_eq!(
        graph.data_source(sets[1], builtin::LOCAL_VALUE),
        Some((computes[0], "result".to_string()))
    );
    let print = only(&graph, "print_text");
    assert_eq!(
        graph.data_source(print, "text"),
        Some((get, builtin::LOCAL_VALUE.to_string()))
    );
}

#[test]
fn top_level_first_assignment_uses_initial_value() {
    let (graph, _) = lift_body(
        "count = 0\n\
         for i in range(3):\n\
         \x20   count = add(count, 1)\n\
         print_text(self.game, count)",
    );
    let get = only(&graph, builtin::GET_LOCAL_VARIABLE);
    assert_eq!(
        graph.node(get).unwrap().constants.get(builtin::LOCAL_INITIAL_VALUE),
        Some(&Literal::Int(0))
    );
    let set = only(&graph, builtin::SET_LOCAL_VARIABLE);
    let add = only(&graph, "add");
    assert_eq!(graph.data_source(add, "a"), Some((get, builtin::LOCAL_VALUE.to_string())));
    assert_eq!(graph.data_source(set, builtin::LOCAL_VALUE), Some((add, "sum".to_string())));

    let finite = only(&graph, builtin::FINITE_LOOP);
    assert!(graph.flow_targets(finite, builtin::LOOP_BODY).contains(&(set, "flow_in".into())));
    let print = only(&graph, "print_text");
    assert!(graph.flow_targets(finite, builtin::LOOP_DONE).contains(&(print, "flow_in".into())));
}

#[test]
fn if_without_else_merges_false_exit() {
    let (graph, _) = lift_body(
        "if flag:\n\
         \x20   print_text(self.game, \"yes\")\n\
         compute(self.game, 1)",
    );
    let branch = only(&graph, builtin::DOUBLE_BRANCH);
    let compute = only(&graph, "compute");
    assert_eq!(graph.incoming(compute).len(), 2);
    assert!(graph.flow_targets(branch, builtin::BRANCH_FALSE).contains(&(compute, "flow_in".into())));
}

#[test]
fn match_creates_multi_branch_with_default_exit() {
    let (graph, _) = lift_body(
        "match mode:\n\
         \x20   case \"walk\":\n\
         \x20       print_text(self.game, \"w\")\n\
         \x20   case \"run\":\n\
         \x20       print_text(self.game, \"r\")\n\
         compute(self.game, 1)",
    );
    let branch = only(&graph, builtin::MULTI_BRANCH);
    let outputs: Vec<&str> = graph
        .node(branch)
        .unwrap()
        .outputs
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    assert_eq!(outputs, vec!["default", "walk", "run"]);
    let compute = only(&graph, "compute");
    assert_eq!(graph.incoming(compute).len(), 3);
    assert!(graph.flow_targets(branch, builtin::BRANCH_DEFAULT).contains(&(compute, "flow_in".into())));
}

// ---------------------------------------------------------------------------
// Loops and break
// ---------------------------------------------------------------------------

#[test]
fn break_wires_to_loop_break_port() {
    let (graph, diagnostics) = lift_body(
        "for i in range(3):\n\
         \x20   print_text(self.game, i)\n\
         \x20   break\n\
         \x20   compute(self.game, 1)",
    );
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    let finite = only(&graph, builtin::FINITE_LOOP);
    let print = only(&graph, "print_text");
    assert!(graph.nodes_titled("compute").is_empty());

    let into_loop: Vec<String> = graph
        .incoming(finite)
        .into_iter()
        .filter(|e| e.kind == EdgeKind::Flow)
        .map(|e| e.target_port)
        .collect();
    assert_eq!(into_loop, vec![builtin::LOOP_BREAK.to_string()]);
    assert!(graph.flow_targets(print, "flow_out").contains(&(finite, builtin::LOOP_BREAK.into())));
    assert_eq!(graph.data_source(print, "text"), Some((finite, builtin::LOOP_INDEX.to_string())));

    let node = graph.node(finite).unwrap();
    assert_eq!(node.constants.get(builtin::LOOP_START), Some(&Literal::Int(0)));
    assert_eq!(node.constants.get(builtin::LOOP_END), Some(&Literal::Int(3)));
}

#[test]
fn break_outside_loop_is_diagnosed_without_edges() {
    let (graph, diagnostics) = lift_body("break");
    assert_eq!(diagnostics.count(DiagnosticKind::MalformedBreak), 1);
    assert_eq!(graph.edge_count(), 0);
    assert_eq!(graph.node_count(), 0);
}

#[test]
fn list_iteration_uses_list_loop() {
    let (graph, _) = lift_body(
        "items = assemble_list(1, 2)\n\
         for item in items:\n\
         \x20   print_text(self.game, item)",
    );
    let list_loop = only(&graph, builtin::LIST_LOOP);
    let assemble = only(&graph, "assemble_list");
    let print = only(&graph, "print_text");
    assert_eq!(graph.data_source(list_loop, builtin::LOOP_LIST), Some((assemble, "list".into())));
    assert_eq!(graph.data_source(print, "text"), Some((list_loop, builtin::LOOP_ITEM.into())));
}

#[test]
fn while_loop_is_a_no_op() {
    let (graph, diagnostics) = lift_body("while flag:\n    print_text(self.game, \"x\")");
    assert_eq!(graph.node_count(), 0);
    assert!(diagnostics.is_empty());
}

// ---------------------------------------------------------------------------
// Suppress-once
// ---------------------------------------------------------------------------

#[test]
fn suppress_once_skips_only_the_first_edge() {
    let config = LiftConfig {
        suppress_initial_flow_edge: true,
        ..LiftConfig::default()
    };
    let source = "class Scene:\n\
                  \x20   def on_start(self):\n\
                  \x20       print_text(self.game, \"a\")\n\
                  \x20       print_text(self.game, \"b\")\n";
    let output = lift_graph_source(source, &registry(), &config).unwrap();
    let graph = output.graph;
    assert_eq!(graph.node_count(), 3);
    assert_eq!(graph.count_edges(EdgeKind::Flow), 1);

    let (body_graph, _) = lift_body_with("print_text(self.game, \"a\")", &config);
    assert_eq!(body_graph.edge_count(), 0);
}

// ---------------------------------------------------------------------------
// Graph units
// ---------------------------------------------------------------------------

#[test]
fn event_handlers_become_event_nodes() {
    let source = "class Scene:\n\
                  \x20   def on_hit(self, damage: int):\n\
                  \x20       print_text(self.game, damage)\n\
                  \n\
                  \x20   def helper(self):\n\
                  \x20       print_text(self.game, \"ignored\")\n";
    let output = lift_graph_source(source, &registry(), &LiftConfig::default()).unwrap();
    let graph = output.graph;
    assert_eq!(graph.name, "Scene");
    assert_eq!(graph.event_order.len(), 1);

    let event = graph.event_order[0];
    let node = graph.node(event).unwrap();
    assert_eq!(node.title, "hit");
    assert_eq!(node.category, NodeCategory::Event);
    assert_eq!(node.output("damage").map(|p| p.type_name.as_str()), Some("int"));

    let print = only(&graph, "print_text");
    assert_eq!(graph.data_source(print, "text"), Some((event, "damage".into())));
    assert!(graph.flow_targets(event, "flow_out").contains(&(print, "flow_in".into())));
    assert!(!graph.has_incoming_flow(event, "flow_out"));
}

#[test]
fn non_ascii_names_lift_like_any_other() {
    let mut registry = registry();
    registry.insert(
        NodeSpec::new("打印字符串", NodeCategory::Execution)
            .with_input(Port::flow("flow_in"))
            .with_input(Port::data("字符串", "string"))
            .with_output(Port::flow("flow_out")),
    );
    let source = "class 示例图:\n\
                  \x20   def on_实体创建时(self, 事件源实体):\n\
                  \x20       打印字符串(self.game, \"hi\")\n";
    let output = lift_graph_source(source, &registry, &LiftConfig::default()).unwrap();
    let graph = output.graph;
    assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);
    assert_eq!(graph.name, "示例图");

    let event = graph.event_order[0];
    let node = graph.node(event).unwrap();
    assert_eq!(node.title, "实体创建时");
    assert!(node.output("事件源实体").is_some());

    let print = only(&graph, "打印字符串");
    assert_eq!(
        graph.node(print).unwrap().constants.get("字符串"),
        Some(&Literal::Str("hi".into()))
    );
    assert!(graph.flow_targets(event, "flow_out").contains(&(print, "flow_in".into())));
}

#[test]
fn composite_match_uses_call_exits_directly() {
    let source = "class Scene:\n\
                  \x20   def __init__(self, game):\n\
                  \x20       self.checker = Checker(game)\n\
                  \n\
                  \x20   def on_start(self):\n\
                  \x20       match self.checker.check():\n\
                  \x20           case 0:\n\
                  \x20               print_text(self.game, \"zero\")\n\
                  \x20           case 1:\n\
                  \x20               print_text(self.game, \"one\")\n\
                  \x20           case _:\n\
                  \x20               print_text(self.game, \"other\")\n";
    let output = lift_graph_source(source, &registry(), &LiftConfig::default()).unwrap();
    let graph = output.graph;
    assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);
    assert!(graph.nodes_titled(builtin::MULTI_BRANCH).is_empty());
    assert!(graph.nodes_titled(builtin::DOUBLE_BRANCH).is_empty());

    let checker = only(&graph, "Checker");
    let composite = graph.node(checker).unwrap().composite.clone().unwrap();
    assert_eq!(composite.instance, "checker");
    assert_eq!(composite.method, "check");
    assert!(graph.has_incoming_flow(checker, "check"));
    for exit in ["0", "1", "default"] {
        assert_eq!(graph.flow_targets(checker, exit).len(), 1, "exit {exit}");
    }
}

#[test]
fn composite_match_with_unmatched_case_is_dropped() {
    let source = "class Scene:\n\
                  \x20   def __init__(self, game):\n\
                  \x20       self.checker = Checker(game)\n\
                  \n\
                  \x20   def on_start(self):\n\
                  \x20       match self.checker.check():\n\
                  \x20           case 0:\n\
                  \x20               print_text(self.game, \"zero\")\n\
                  \x20           case 1:\n\
                  \x20               print_text(self.game, \"one\")\n\
                  \x20           case 2:\n\
                  \x20               print_text(self.game, \"two\")\n\
                  \x20           case _:\n\
                  \x20               print_text(self.game, \"other\")\n";
    let output = lift_graph_source(source, &registry(), &LiftConfig::default()).unwrap();
    assert_eq!(output.diagnostics.count(DiagnosticKind::AmbiguousMatchDispatch), 1);
    assert_eq!(output.graph.node_count(), 1);
    assert_eq!(output.graph.edge_count(), 0);
}

#[test]
fn module_without_graph_class_is_an_error() {
    let source = "@composite_class\nclass Only:\n    pass\n";
    let result = lift_graph_source(source, &registry(), &LiftConfig::default());
    assert!(matches!(result, Err(LiftError::NoGraphClass)));
}

#[test]
fn syntax_errors_surface_as_parse_errors() {
    let result = lift_graph_source("class Scene(:\n", &registry(), &LiftConfig::default());
    assert!(matches!(result, Err(LiftError::Parse(_))));
}
