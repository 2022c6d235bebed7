//! Graph shape comparison.
//!
//! Two graphs have the same topology when they have the same node count,
//! the same number of flow and data edges, and the same multiset of edges
//! described by endpoint titles and ports. Node ids, spans, constants and
//! variable names are ignored.

use std::cmp::Ordering;
use std::fmt;

use graphlift_core::{EdgeKind, Graph};
use serde::Serialize;

/// One edge, identified by what it connects rather than by id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct EdgeSignature {
    pub source_title: String,
    pub source_port: String,
    pub target_title: String,
    pub target_port: String,
    pub kind: EdgeKind,
}

impl fmt::Display for EdgeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            EdgeKind::Flow => "flow",
            EdgeKind::Data => "data",
        };
        write!(
            f,
            "{}.{} -> {}.{} ({kind})",
            self.source_title, self.source_port, self.target_title, self.target_port
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Topology {
    pub node_count: usize,
    pub flow_edges: usize,
    pub data_edges: usize,
    /// Sorted.
    pub edges: Vec<EdgeSignature>,
}

impl Topology {
    pub fn of(graph: &Graph) -> Self {
        let title = |id| {
            graph
                .node(id)
                .map(|node| node.title.clone())
                .unwrap_or_default()
        };
        let mut edges: Vec<EdgeSignature> = graph
            .edges()
            .into_iter()
            .map(|edge| EdgeSignature {
                source_title: title(edge.source),
                source_port: edge.source_port,
                target_title: title(edge.target),
                target_port: edge.target_port,
                kind: edge.kind,
            })
            .collect();
        edges.sort();

        Topology {
            node_count: graph.node_count(),
            flow_edges: graph.count_edges(EdgeKind::Flow),
            data_edges: graph.count_edges(EdgeKind::Data),
            edges,
        }
    }

    /// What `other` lacks (`-`) or adds (`+`) relative to `self`. Empty
    /// when the topologies are equal.
    pub fn differences(&self, other: &Topology) -> Vec<String> {
        let mut lines = Vec::new();
        let counts = [
            ("nodes", self.node_count, other.node_count),
            ("flow edges", self.flow_edges, other.flow_edges),
            ("data edges", self.data_edges, other.data_edges),
        ];
        for (what, before, after) in counts {
            if before != after {
                lines.push(format!("{what}: {before} -> {after}"));
            }
        }

        let (mut i, mut j) = (0, 0);
        while i < self.edges.len() || j < other.edges.len() {
            let order = match (self.edges.get(i), other.edges.get(j)) {
                (Some(left), Some(right)) => left.cmp(right),
                (Some(_), None) => Ordering::Less,
                _ => Ordering::Greater,
            };
            match order {
                Ordering::Equal => {
                    i += 1;
                    j += 1;
                }
                Ordering::Less => {
                    lines.push(format!("- {}", self.edges[i]));
                    i += 1;
                }
                Ordering::Greater => {
                    lines.push(format!("+ {}", other.edges[j]));
                    j += 1;
                }
            }
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphlift_core::{builtin, Node, NodeCategory, Port};

    fn call(graph: &mut Graph, title: &str) -> graphlift_core::NodeId {
        let mut node = Node::new(title, NodeCategory::Execution);
        node.inputs.push(Port::flow(builtin::FLOW_IN));
        node.outputs.push(Port::flow(builtin::FLOW_OUT));
        graph.add_node(node)
    }

    #[test]
    fn ids_do_not_matter() {
        let mut first = Graph::new("g");
        let a = call(&mut first, "a");
        let b = call(&mut first, "b");
        first.add_flow_edge(a, "flow_out", b, "flow_in").unwrap();

        let mut second = Graph::new("g");
        let b = call(&mut second, "b");
        let a = call(&mut second, "a");
        second.add_flow_edge(a, "flow_out", b, "flow_in").unwrap();

        assert_eq!(Topology::of(&first), Topology::of(&second));
        assert!(Topology::of(&first).differences(&Topology::of(&second)).is_empty());
    }

    #[test]
    fn differences_name_missing_and_extra_edges() {
        let mut first = Graph::new("g");
        let a = call(&mut first, "a");
        let b = call(&mut first, "b");
        first.add_flow_edge(a, "flow_out", b, "flow_in").unwrap();

        let mut second = Graph::new("g");
        let a = call(&mut second, "a");
        let b = call(&mut second, "b");
        second.add_flow_edge(b, "flow_out", a, "flow_in").unwrap();

        let lines = Topology::of(&first).differences(&Topology::of(&second));
        assert_eq!(
            lines,
            vec![
                "- a.flow_out -> b.flow_in (flow)".to_string(),
                "+ b.flow_out -> a.flow_in (flow)".to_string(),
            ]
        );
    }

    #[test]
    fn node_count_changes_are_reported() {
        let mut first = Graph::new("g");
        call(&mut first, "a");
        let second = Graph::new("g");
        assert_eq!(
            Topology::of(&first).differences(&Topology::of(&second)),
            vec!["nodes: 1 -> 0".to_string()]
        );
    }
}
