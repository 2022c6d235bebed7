//! Edge types for the lifted graph.
//!
//! The graph carries two edge kinds on one petgraph: flow edges sequence
//! execution between flow ports, data edges carry a value from an output
//! port to an input port. They are kept apart by [`EdgeKind`] so either kind
//! can be traversed independently.

use serde::{Deserialize, Serialize};

use crate::id::{EdgeId, NodeId};

/// Which layer an edge belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Target executes after source. Many flow edges may converge on one
    /// flow input.
    Flow,
    /// Source output feeds target input. A data input has at most one
    /// incoming data edge.
    Data,
}

/// Edge weight stored in the graph. Endpoints live in petgraph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub kind: EdgeKind,
    pub source_port: String,
    pub target_port: String,
}

impl Edge {
    pub fn flow(source_port: impl Into<String>, target_port: impl Into<String>) -> Self {
        Edge {
            kind: EdgeKind::Flow,
            source_port: source_port.into(),
            target_port: target_port.into(),
        }
    }

    pub fn data(source_port: impl Into<String>, target_port: impl Into<String>) -> Self {
        Edge {
            kind: EdgeKind::Data,
            source_port: source_port.into(),
            target_port: target_port.into(),
        }
    }

    /// Returns `true` if this is a data edge.
    pub fn is_data(&self) -> bool {
        self.kind == EdgeKind::Data
    }

    /// Returns `true` if this is a flow edge.
    pub fn is_flow(&self) -> bool {
        self.kind == EdgeKind::Flow
    }
}

/// A resolved edge: weight plus endpoints, as returned by graph queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeView {
    pub id: EdgeId,
    pub kind: EdgeKind,
    pub source: NodeId,
    pub source_port: String,
    pub target: NodeId,
    pub target_port: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_kind_predicates() {
        let flow = Edge::flow("flow_out", "flow_in");
        assert!(flow.is_flow());
        assert!(!flow.is_data());

        let data = Edge::data("result", "a");
        assert!(data.is_data());
        assert!(!data.is_flow());
    }

    #[test]
    fn serde_roundtrip_edge() {
        let edge = Edge::data("value", "text");
        let json = serde_json::to_string(&edge).unwrap();
        assert_eq!(
            json,
            r#"{"kind":"data","source_port":"value","target_port":"text"}"#
        );
        let back: Edge = serde_json::from_str(&json).unwrap();
        assert_eq!(back, edge);
    }

    #[test]
    fn flow_edge_json_snapshot() {
        insta::assert_json_snapshot!(Edge::flow("true", "flow_in"), @r###"
        {
          "kind": "flow",
          "source_port": "true",
          "target_port": "flow_in"
        }
        "###);
    }
}
