//! Structured-flow queries over a lifted graph.
//!
//! Lifted flow is a DAG once edges into a loop's `break` input are set
//! aside: arms of a branch either end, break, or converge on the statement
//! that followed the branch in source. That statement is the branch's join
//! point.

use std::collections::{BTreeMap, BTreeSet};

use graphlift_core::{builtin, EdgeKind, Graph, NodeId};

use crate::error::CodegenError;

/// Where a flow output leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    /// Nothing is connected.
    End,
    /// The output is wired to the `break` input of `loop_node`.
    Break { loop_node: NodeId },
    Node(NodeId),
}

/// The single successor of `node`'s flow output `port`.
pub(crate) fn follow(graph: &Graph, node: NodeId, port: &str) -> Result<Step, CodegenError> {
    let targets = graph.flow_targets(node, port);
    match targets.as_slice() {
        [] => Ok(Step::End),
        [(target, target_port)] if target_port == builtin::LOOP_BREAK => {
            Ok(Step::Break { loop_node: *target })
        }
        [(target, _)] => Ok(Step::Node(*target)),
        _ => Err(CodegenError::UnstructuredFlow {
            node,
            reason: format!("flow output '{port}' has {} successors", targets.len()),
        }),
    }
}

/// Nodes reachable from `starts` (inclusive) along flow edges, ignoring
/// edges into `break` inputs.
pub(crate) fn reachable(graph: &Graph, starts: &[NodeId]) -> BTreeSet<NodeId> {
    let mut seen = BTreeSet::new();
    let mut stack: Vec<NodeId> = starts.to_vec();
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        for edge in graph.outgoing(id) {
            if edge.kind == EdgeKind::Flow && edge.target_port != builtin::LOOP_BREAK {
                stack.push(edge.target);
            }
        }
    }
    seen
}

fn arm_entries(graph: &Graph, branch: NodeId, port: &str) -> Vec<NodeId> {
    graph
        .flow_targets(branch, port)
        .into_iter()
        .filter(|(_, target_port)| target_port != builtin::LOOP_BREAK)
        .map(|(target, _)| target)
        .collect()
}

/// The join point of the arms leaving `branch` through `ports`: the unique
/// node reachable from at least two arms and not reachable from another
/// such node. `None` when the arms never meet.
pub(crate) fn join_point(
    graph: &Graph,
    branch: NodeId,
    ports: &[String],
) -> Result<Option<NodeId>, CodegenError> {
    let mut hits: BTreeMap<NodeId, usize> = BTreeMap::new();
    for port in ports {
        for id in reachable(graph, &arm_entries(graph, branch, port)) {
            *hits.entry(id).or_default() += 1;
        }
    }

    let shared: Vec<NodeId> = hits
        .into_iter()
        .filter(|&(_, count)| count >= 2)
        .map(|(id, _)| id)
        .collect();
    let earliest: Vec<NodeId> = shared
        .iter()
        .copied()
        .filter(|&candidate| {
            !shared
                .iter()
                .any(|&other| other != candidate && reachable(graph, &[other]).contains(&candidate))
        })
        .collect();

    match earliest.as_slice() {
        [] => Ok(None),
        [join] => Ok(Some(*join)),
        _ => Err(CodegenError::UnstructuredFlow {
            node: branch,
            reason: format!("arms meet at {} unrelated nodes", earliest.len()),
        }),
    }
}

/// `true` if `port` of `node` has any flow successor.
pub(crate) fn is_connected(graph: &Graph, node: NodeId, port: &str) -> bool {
    !graph.flow_targets(node, port).is_empty()
}
