//! Synthetic node kinds and well-known port names.
//!
//! These nodes are produced by the lifter itself rather than resolved from a
//! registry entry: event entry points, branch and loop nodes, and the
//! local-variable get/set pair.

use crate::node::{Node, NodeCategory, Port};
use crate::registry::NodeSpec;

// ---------------------------------------------------------------------------
// Port names
// ---------------------------------------------------------------------------

pub const FLOW_IN: &str = "flow_in";
pub const FLOW_OUT: &str = "flow_out";

pub const BRANCH_TRUE: &str = "true";
pub const BRANCH_FALSE: &str = "false";
pub const BRANCH_DEFAULT: &str = "default";
pub const CONDITION: &str = "condition";
pub const SUBJECT: &str = "subject";

pub const LOOP_BODY: &str = "loop_body";
pub const LOOP_DONE: &str = "loop_done";
pub const LOOP_BREAK: &str = "break";
pub const LOOP_START: &str = "start";
pub const LOOP_END: &str = "end";
pub const LOOP_INDEX: &str = "index";
pub const LOOP_LIST: &str = "list";
pub const LOOP_ITEM: &str = "item";

pub const LOCAL_INITIAL_VALUE: &str = "initial_value";
pub const LOCAL_HANDLE: &str = "handle";
pub const LOCAL_VALUE: &str = "value";

// ---------------------------------------------------------------------------
// Titles
// ---------------------------------------------------------------------------

pub const DOUBLE_BRANCH: &str = "Double Branch";
pub const MULTI_BRANCH: &str = "Multi Branch";
pub const FINITE_LOOP: &str = "Finite Loop";
pub const LIST_LOOP: &str = "List Loop";
pub const GET_LOCAL_VARIABLE: &str = "Get Local Variable";
pub const SET_LOCAL_VARIABLE: &str = "Set Local Variable";

// ---------------------------------------------------------------------------
// Constructors
// ---------------------------------------------------------------------------

/// Two-way branch: `true`/`false` flow outputs selected by `condition`.
pub fn double_branch() -> Node {
    let mut node = Node::new(DOUBLE_BRANCH, NodeCategory::ControlFlow);
    node.inputs.push(Port::flow(FLOW_IN));
    node.inputs.push(Port::data(CONDITION, "bool"));
    node.outputs.push(Port::flow(BRANCH_TRUE));
    node.outputs.push(Port::flow(BRANCH_FALSE));
    node
}

/// N-way branch over `subject`: a `default` output followed by one output
/// per case label.
pub fn multi_branch<S: AsRef<str>>(labels: &[S]) -> Node {
    let mut node = Node::new(MULTI_BRANCH, NodeCategory::ControlFlow);
    node.inputs.push(Port::flow(FLOW_IN));
    node.inputs.push(Port::generic(SUBJECT));
    node.outputs.push(Port::flow(BRANCH_DEFAULT));
    for label in labels {
        node.add_output(Port::flow(label.as_ref()));
    }
    node
}

/// Counted loop over `start..end`.
pub fn finite_loop() -> Node {
    let mut node = Node::new(FINITE_LOOP, NodeCategory::ControlFlow);
    node.inputs.push(Port::flow(FLOW_IN));
    node.inputs.push(Port::flow(LOOP_BREAK));
    node.inputs.push(Port::data(LOOP_START, "int"));
    node.inputs.push(Port::data(LOOP_END, "int"));
    node.outputs.push(Port::flow(LOOP_BODY));
    node.outputs.push(Port::flow(LOOP_DONE));
    node.outputs.push(Port::data(LOOP_INDEX, "int"));
    node
}

/// Iteration over the elements of `list`.
pub fn list_loop() -> Node {
    let mut node = Node::new(LIST_LOOP, NodeCategory::ControlFlow);
    node.inputs.push(Port::flow(FLOW_IN));
    node.inputs.push(Port::flow(LOOP_BREAK));
    node.inputs.push(Port::data(LOOP_LIST, "list"));
    node.outputs.push(Port::flow(LOOP_BODY));
    node.outputs.push(Port::flow(LOOP_DONE));
    node.outputs.push(Port::generic(LOOP_ITEM));
    node
}

pub fn get_local_variable() -> Node {
    let mut node = Node::new(GET_LOCAL_VARIABLE, NodeCategory::LocalVariable);
    node.inputs.push(Port::generic(LOCAL_INITIAL_VALUE));
    node.outputs.push(Port::data(LOCAL_HANDLE, "local_handle"));
    node.outputs.push(Port::generic(LOCAL_VALUE));
    node
}

pub fn set_local_variable() -> Node {
    let mut node = Node::new(SET_LOCAL_VARIABLE, NodeCategory::LocalVariable);
    node.inputs.push(Port::flow(FLOW_IN));
    node.inputs.push(Port::data(LOCAL_HANDLE, "local_handle"));
    node.inputs.push(Port::generic(LOCAL_VALUE));
    node.outputs.push(Port::flow(FLOW_OUT));
    node
}

/// Event entry node: `flow_out` followed by one output per handler parameter.
pub fn event<S: AsRef<str>>(name: &str, params: &[(S, S)]) -> Node {
    let mut node = Node::new(name, NodeCategory::Event);
    node.outputs.push(Port::flow(FLOW_OUT));
    for (param, type_name) in params {
        node.add_output(Port::data(param.as_ref(), type_name.as_ref()));
    }
    node
}

/// `true` for titles the lifter synthesizes itself.
pub fn is_synthetic(title: &str) -> bool {
    matches!(
        title,
        DOUBLE_BRANCH | MULTI_BRANCH | FINITE_LOOP | LIST_LOOP | GET_LOCAL_VARIABLE | SET_LOCAL_VARIABLE
    )
}

/// Registry entries describing the synthetic kinds, so consumers that look
/// nodes up by title (validators, re-lowering) see them too.
pub fn specs() -> Vec<NodeSpec> {
    [
        double_branch(),
        multi_branch::<&str>(&[]),
        finite_loop(),
        list_loop(),
        get_local_variable(),
        set_local_variable(),
    ]
    .into_iter()
    .map(|node| NodeSpec {
        name: node.title.clone(),
        category: node.category,
        inputs: node.inputs.to_vec(),
        outputs: node.outputs.to_vec(),
        aliases: Vec::new(),
        dynamic_ports: node.title == MULTI_BRANCH,
        composite_id: None,
    })
    .collect()
}
