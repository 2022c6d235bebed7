//! Shared fixtures for the re-lowering integration tests.

#![allow(dead_code)]

use graphlift_codegen::{check_roundtrip, CodegenOptions, RoundTrip};
use graphlift_core::{NodeCategory, NodeSpec, Port, StaticRegistry};
use graphlift_lift::LiftConfig;

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
        NodeSpec::new("打印字符串", NodeCategory::Execution)
            .with_input(Port::flow("flow_in"))
            .with_input(Port::data("字符串", "string"))
            .with_output(Port::flow("flow_out")),
    );
    registry.insert(
        NodeSpec::new("to_text", NodeCategory::Query)
            .with_input(Port::data("value", "generic"))
            .with_output(Port::data("text", "string")),
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

/// A `Scene` graph class with one `on_<event>(self)` handler per entry.
/// Body lines are written at statement depth zero.
pub fn scene(handlers: &[(&str, &[&str])]) -> String {
    let mut source = String::from(
        "class Scene:\n    def __init__(self, game):\n        self.checker = Checker(game)\n",
    );
    for (event, lines) in handlers {
        source.push_str(&format!("\n    def on_{event}(self):\n"));
        for line in *lines {
            source.push_str(&format!("        {line}\n"));
        }
    }
    source
}

/// Round-trips `source` with default settings and fails with the
/// topology differences when the second lift disagrees.
pub fn assert_roundtrip(source: &str) -> RoundTrip {
    let round_trip = check_roundtrip(
        source,
        &registry(),
        &LiftConfig::default(),
        &CodegenOptions::default(),
    )
    .unwrap();
    assert!(
        round_trip.is_idempotent(),
        "re-lowered source lifts differently:\n{}\n--- source ---\n{}",
        round_trip.differences().join("\n"),
        round_trip.relowered
    );
    round_trip
}
