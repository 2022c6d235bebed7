//! Graph: the container every lift produces.
//!
//! [`Graph`] wraps a petgraph `StableGraph<Node, Edge>` and is the single
//! entry point for constructing and querying a lifted unit. All mutations go
//! through builder methods so that port existence, port kind, and the
//! single-producer rule for data inputs hold for every graph handed out.
//!
//! Node and edge ids are assigned in insertion order and never reused, so
//! lifting the same input twice yields structurally identical graphs.

use indexmap::IndexMap;
use petgraph::graph::EdgeIndex;
use petgraph::stable_graph::StableGraph;
use petgraph::visit::EdgeRef;
use petgraph::{Directed, Direction};
use serde::{Deserialize, Serialize};

use crate::edge::{Edge, EdgeKind, EdgeView};
use crate::error::{CoreError, PortSide};
use crate::id::{EdgeId, NodeId};
use crate::node::{Node, Port};

/// Metadata key holding annotated output types: `{node id: {port: type}}`.
pub const PORT_TYPE_OVERRIDES: &str = "port_type_overrides";

/// A lifted unit: one graph class with its event handlers, or one composite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    pub name: String,
    graph: StableGraph<Node, Edge, Directed, u32>,
    /// Free-form annotations. Later passes may rewrite entries here, never
    /// nodes or edges.
    pub metadata: IndexMap<String, serde_json::Value>,
    /// Event entry nodes in source order.
    pub event_order: Vec<NodeId>,
}

impl Graph {
    pub fn new(name: impl Into<String>) -> Self {
        Graph {
            name: name.into(),
            graph: StableGraph::new(),
            metadata: IndexMap::new(),
            event_order: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    /// Returns a read-only reference to the underlying petgraph.
    pub fn inner(&self) -> &StableGraph<Node, Edge, Directed, u32> {
        &self.graph
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.graph.node_weight(id.into())
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.graph.node_weight_mut(id.into())
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.graph
            .node_indices()
            .filter_map(|idx| self.graph.node_weight(idx).map(|n| (NodeId::from(idx), n)))
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.graph.node_indices().map(NodeId::from).collect()
    }

    /// Nodes whose title matches, in insertion order.
    pub fn nodes_titled(&self, title: &str) -> Vec<NodeId> {
        self.nodes()
            .filter(|(_, n)| n.title == title)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn count_edges(&self, kind: EdgeKind) -> usize {
        self.graph
            .edge_weights()
            .filter(|edge| edge.kind == kind)
            .count()
    }

    /// All edges in insertion order.
    pub fn edges(&self) -> Vec<EdgeView> {
        self.graph
            .edge_indices()
            .filter_map(|idx| self.edge(EdgeId::from(idx)))
            .collect()
    }

    pub fn edge(&self, id: EdgeId) -> Option<EdgeView> {
        let idx: EdgeIndex<u32> = id.into();
        let (source, target) = self.graph.edge_endpoints(idx)?;
        let weight = self.graph.edge_weight(idx)?;
        Some(EdgeView {
            id,
            kind: weight.kind,
            source: source.into(),
            source_port: weight.source_port.clone(),
            target: target.into(),
            target_port: weight.target_port.clone(),
        })
    }

    /// Edges entering `node`, ordered by edge id.
    pub fn incoming(&self, node: NodeId) -> Vec<EdgeView> {
        self.directed_edges(node, Direction::Incoming)
    }

    /// Edges leaving `node`, ordered by edge id.
    pub fn outgoing(&self, node: NodeId) -> Vec<EdgeView> {
        self.directed_edges(node, Direction::Outgoing)
    }

    fn directed_edges(&self, node: NodeId, direction: Direction) -> Vec<EdgeView> {
        let mut views: Vec<EdgeView> = self
            .graph
            .edges_directed(node.into(), direction)
            .map(|edge| EdgeView {
                id: EdgeId::from(edge.id()),
                kind: edge.weight().kind,
                source: edge.source().into(),
                source_port: edge.weight().source_port.clone(),
                target: edge.target().into(),
                target_port: edge.weight().target_port.clone(),
            })
            .collect();
        views.sort_by_key(|view| view.id);
        views
    }

    /// The producer feeding a data input, if connected.
    pub fn data_source(&self, node: NodeId, port: &str) -> Option<(NodeId, String)> {
        self.incoming(node)
            .into_iter()
            .find(|e| e.kind == EdgeKind::Data && e.target_port == port)
            .map(|e| (e.source, e.source_port))
    }

    /// Data consumers of an output port, ordered by edge id.
    pub fn data_targets(&self, node: NodeId, port: &str) -> Vec<(NodeId, String)> {
        self.outgoing(node)
            .into_iter()
            .filter(|e| e.kind == EdgeKind::Data && e.source_port == port)
            .map(|e| (e.target, e.target_port))
            .collect()
    }

    /// Flow successors of an output port, ordered by edge id.
    pub fn flow_targets(&self, node: NodeId, port: &str) -> Vec<(NodeId, String)> {
        self.outgoing(node)
            .into_iter()
            .filter(|e| e.kind == EdgeKind::Flow && e.source_port == port)
            .map(|e| (e.target, e.target_port))
            .collect()
    }

    pub fn has_incoming_flow(&self, node: NodeId, port: &str) -> bool {
        self.incoming(node)
            .iter()
            .any(|e| e.kind == EdgeKind::Flow && e.target_port == port)
    }

    /// `true` if any edge of either kind leaves `port`.
    pub fn has_outgoing(&self, node: NodeId, port: &str) -> bool {
        self.outgoing(node).iter().any(|e| e.source_port == port)
    }

    // -----------------------------------------------------------------------
    // Node methods
    // -----------------------------------------------------------------------

    /// Adds a node and returns its [`NodeId`].
    pub fn add_node(&mut self, node: Node) -> NodeId {
        NodeId::from(self.graph.add_node(node))
    }

    /// Adds an input port to an existing node (dynamic-port nodes).
    pub fn add_input_port(&mut self, id: NodeId, port: Port) -> Result<(), CoreError> {
        let node = self.node_mut(id).ok_or(CoreError::NodeNotFound { id })?;
        node.add_input(port);
        Ok(())
    }

    /// Duplicates `original` for layout purposes.
    ///
    /// The copy's `copy_of` always names the root original, even when
    /// `original` is itself a copy. Edges are not duplicated.
    pub fn add_copy(&mut self, original: NodeId) -> Result<NodeId, CoreError> {
        let source = self
            .node(original)
            .ok_or(CoreError::NodeNotFound { id: original })?;
        let root = source.copy_of.unwrap_or(original);
        let mut copy = source.clone();
        copy.copy_of = Some(root);
        Ok(self.add_node(copy))
    }

    /// Layout copies of `root`, in insertion order.
    pub fn copies_of(&self, root: NodeId) -> Vec<NodeId> {
        self.nodes()
            .filter(|(_, n)| n.copy_of == Some(root))
            .map(|(id, _)| id)
            .collect()
    }

    // -----------------------------------------------------------------------
    // Edge methods
    // -----------------------------------------------------------------------

    /// Adds a flow edge between two flow ports.
    ///
    /// A flow input may have any number of incoming edges. Adding an edge
    /// identical to an existing one returns the existing id.
    pub fn add_flow_edge(
        &mut self,
        source: NodeId,
        source_port: &str,
        target: NodeId,
        target_port: &str,
    ) -> Result<EdgeId, CoreError> {
        self.check_port(source, source_port, PortSide::Output, true)?;
        self.check_port(target, target_port, PortSide::Input, true)?;

        if let Some(existing) = self.outgoing(source).into_iter().find(|e| {
            e.kind == EdgeKind::Flow
                && e.source_port == source_port
                && e.target == target
                && e.target_port == target_port
        }) {
            return Ok(existing.id);
        }

        let idx = self.graph.add_edge(
            source.into(),
            target.into(),
            Edge::flow(source_port, target_port),
        );
        Ok(EdgeId::from(idx))
    }

    /// Adds a data edge from an output port to an input port.
    ///
    /// Errors with [`CoreError::DuplicateDataInput`] if the input already has
    /// a producer.
    pub fn add_data_edge(
        &mut self,
        source: NodeId,
        source_port: &str,
        target: NodeId,
        target_port: &str,
    ) -> Result<EdgeId, CoreError> {
        self.check_port(source, source_port, PortSide::Output, false)?;
        self.check_port(target, target_port, PortSide::Input, false)?;

        if self.data_source(target, target_port).is_some() {
            return Err(CoreError::DuplicateDataInput {
                node: target,
                port: target_port.to_string(),
            });
        }

        let idx = self.graph.add_edge(
            source.into(),
            target.into(),
            Edge::data(source_port, target_port),
        );
        Ok(EdgeId::from(idx))
    }

    fn check_port(
        &self,
        id: NodeId,
        port: &str,
        side: PortSide,
        flow: bool,
    ) -> Result<(), CoreError> {
        let node = self.node(id).ok_or(CoreError::NodeNotFound { id })?;
        let found = match side {
            PortSide::Input => node.input(port),
            PortSide::Output => node.output(port),
        };
        let found = found.ok_or_else(|| CoreError::PortNotFound {
            node: id,
            port: port.to_string(),
            side,
        })?;
        if found.is_flow() != flow {
            return Err(CoreError::PortKindMismatch {
                node: id,
                port: port.to_string(),
                expected: if flow { "flow" } else { "data" },
            });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Metadata
    // -----------------------------------------------------------------------

    /// Records an annotated type for an output port under
    /// [`PORT_TYPE_OVERRIDES`].
    pub fn set_port_type_override(&mut self, node: NodeId, port: &str, type_name: &str) {
        let overrides = self
            .metadata
            .entry(PORT_TYPE_OVERRIDES.to_string())
            .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
        if let serde_json::Value::Object(by_node) = overrides {
            let ports = by_node
                .entry(node.to_string())
                .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
            if let serde_json::Value::Object(ports) = ports {
                ports.insert(
                    port.to_string(),
                    serde_json::Value::String(type_name.to_string()),
                );
            }
        }
    }

    /// Reads back an override recorded by [`Graph::set_port_type_override`].
    pub fn port_type_override(&self, node: NodeId, port: &str) -> Option<&str> {
        self.metadata
            .get(PORT_TYPE_OVERRIDES)?
            .get(node.to_string())?
            .get(port)?
            .as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{self, FLOW_IN, FLOW_OUT};
    use crate::node::NodeCategory;

    fn action(graph: &mut Graph, title: &str) -> NodeId {
        let mut node = Node::new(title, NodeCategory::Execution);
        node.inputs.push(Port::flow(FLOW_IN));
        node.inputs.push(Port::generic("a"));
        node.outputs.push(Port::flow(FLOW_OUT));
        node.outputs.push(Port::generic("result"));
        graph.add_node(node)
    }

    #[test]
    fn ids_are_sequential() {
        let mut graph = Graph::new("g");
        assert_eq!(action(&mut graph, "A"), NodeId(0));
        assert_eq!(action(&mut graph, "B"), NodeId(1));
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn flow_edges_may_converge() {
        let mut graph = Graph::new("g");
        let a = action(&mut graph, "A");
        let b = action(&mut graph, "B");
        let c = action(&mut graph, "C");
        graph.add_flow_edge(a, FLOW_OUT, c, FLOW_IN).unwrap();
        graph.add_flow_edge(b, FLOW_OUT, c, FLOW_IN).unwrap();
        assert_eq!(graph.count_edges(EdgeKind::Flow), 2);
        assert!(graph.has_incoming_flow(c, FLOW_IN));
    }

    #[test]
    fn identical_flow_edge_is_not_duplicated() {
        let mut graph = Graph::new("g");
        let a = action(&mut graph, "A");
        let b = action(&mut graph, "B");
        let first = graph.add_flow_edge(a, FLOW_OUT, b, FLOW_IN).unwrap();
        let second = graph.add_flow_edge(a, FLOW_OUT, b, FLOW_IN).unwrap();
        assert_eq!(first, second);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn second_data_producer_is_rejected() {
        let mut graph = Graph::new("g");
        let a = action(&mut graph, "A");
        let b = action(&mut graph, "B");
        let c = action(&mut graph, "C");
        graph.add_data_edge(a, "result", c, "a").unwrap();
        let err = graph.add_data_edge(b, "result", c, "a").unwrap_err();
        assert!(matches!(err, CoreError::DuplicateDataInput { node, .. } if node == c));
        assert_eq!(graph.data_source(c, "a"), Some((a, "result".to_string())));
    }

    #[test]
    fn port_kind_is_enforced() {
        let mut graph = Graph::new("g");
        let a = action(&mut graph, "A");
        let b = action(&mut graph, "B");
        let err = graph.add_flow_edge(a, "result", b, FLOW_IN).unwrap_err();
        assert!(matches!(err, CoreError::PortKindMismatch { .. }));
        let err = graph.add_data_edge(a, "missing", b, "a").unwrap_err();
        assert!(matches!(err, CoreError::PortNotFound { side: PortSide::Output, .. }));
    }

    #[test]
    fn missing_node_errors() {
        let mut graph = Graph::new("g");
        let a = action(&mut graph, "A");
        let err = graph.add_flow_edge(a, FLOW_OUT, NodeId(9), FLOW_IN).unwrap_err();
        assert!(matches!(err, CoreError::NodeNotFound { id } if id == NodeId(9)));
    }

    #[test]
    fn copies_point_at_root() {
        let mut graph = Graph::new("g");
        let a = action(&mut graph, "A");
        let first = graph.add_copy(a).unwrap();
        let second = graph.add_copy(first).unwrap();
        assert_eq!(graph.node(second).unwrap().copy_of, Some(a));
        assert_eq!(graph.copies_of(a), vec![first, second]);
    }

    #[test]
    fn flow_targets_follow_port() {
        let mut graph = Graph::new("g");
        let branch = graph.add_node(builtin::double_branch());
        let a = action(&mut graph, "A");
        let b = action(&mut graph, "B");
        graph.add_flow_edge(branch, builtin::BRANCH_TRUE, a, FLOW_IN).unwrap();
        graph.add_flow_edge(branch, builtin::BRANCH_FALSE, b, FLOW_IN).unwrap();
        assert_eq!(
            graph.flow_targets(branch, builtin::BRANCH_FALSE),
            vec![(b, FLOW_IN.to_string())]
        );
        assert!(graph.has_outgoing(branch, builtin::BRANCH_TRUE));
    }

    #[test]
    fn port_type_overrides_live_in_metadata() {
        let mut graph = Graph::new("g");
        let a = action(&mut graph, "A");
        graph.set_port_type_override(a, "result", "float");
        assert_eq!(graph.port_type_override(a, "result"), Some("float"));
        assert_eq!(graph.port_type_override(a, "other"), None);
    }

    #[test]
    fn serde_roundtrip_preserves_topology() {
        let mut graph = Graph::new("g");
        let a = action(&mut graph, "A");
        let b = action(&mut graph, "B");
        graph.add_flow_edge(a, FLOW_OUT, b, FLOW_IN).unwrap();
        graph.add_data_edge(a, "result", b, "a").unwrap();
        let json = serde_json::to_string(&graph).unwrap();
        let back: Graph = serde_json::from_str(&json).unwrap();
        assert_eq!(back.edges(), graph.edges());
        assert_eq!(back.node(b), graph.node(b));
    }
}
