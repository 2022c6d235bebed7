//! The flow frontier: where the next flow edge attaches.

use graphlift_core::{Graph, NodeId};

/// Current attachment point(s) for the next flow edge.
///
/// `Ports` is needed when an element must leave through a specific exit
/// (a branch arm, a loop body) rather than the node's default flow output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowFrontier {
    Node(NodeId),
    Nodes(Vec<NodeId>),
    Ports(Vec<(NodeId, String)>),
}

impl Default for FlowFrontier {
    fn default() -> Self {
        FlowFrontier::empty()
    }
}

impl FlowFrontier {
    /// No attachment point: the next flow node starts unconnected.
    pub fn empty() -> Self {
        FlowFrontier::Nodes(Vec::new())
    }

    pub fn port(node: NodeId, port: impl Into<String>) -> Self {
        FlowFrontier::Ports(vec![(node, port.into())])
    }

    pub fn is_empty(&self) -> bool {
        match self {
            FlowFrontier::Node(_) => false,
            FlowFrontier::Nodes(nodes) => nodes.is_empty(),
            FlowFrontier::Ports(ports) => ports.is_empty(),
        }
    }

    /// Resolves every element to a concrete `(node, output port)` source.
    ///
    /// Elements without a forced port use the node's default flow output;
    /// nodes that have none are skipped.
    pub fn sources(&self, graph: &Graph) -> Vec<(NodeId, String)> {
        let default_of = |id: NodeId| {
            graph
                .node(id)
                .and_then(|node| node.default_flow_output())
                .map(|port| (id, port.to_string()))
        };
        match self {
            FlowFrontier::Node(id) => default_of(*id).into_iter().collect(),
            FlowFrontier::Nodes(nodes) => nodes.iter().filter_map(|id| default_of(*id)).collect(),
            FlowFrontier::Ports(ports) => ports.clone(),
        }
    }

    /// Concatenates frontiers without dropping any element.
    ///
    /// Stays in node form while no element is forced; otherwise every
    /// element is resolved to an explicit port.
    pub fn merge(frontiers: impl IntoIterator<Item = FlowFrontier>, graph: &Graph) -> Self {
        let frontiers: Vec<FlowFrontier> = frontiers.into_iter().filter(|f| !f.is_empty()).collect();
        let forced = frontiers
            .iter()
            .any(|f| matches!(f, FlowFrontier::Ports(_)));

        if !forced {
            let mut nodes: Vec<NodeId> = Vec::new();
            for frontier in frontiers {
                match frontier {
                    FlowFrontier::Node(id) => nodes.push(id),
                    FlowFrontier::Nodes(ids) => nodes.extend(ids),
                    FlowFrontier::Ports(_) => {}
                }
            }
            return match nodes.as_slice() {
                [single] => FlowFrontier::Node(*single),
                _ => FlowFrontier::Nodes(nodes),
            };
        }

        let mut ports: Vec<(NodeId, String)> = Vec::new();
        for frontier in &frontiers {
            for source in frontier.sources(graph) {
                if !ports.contains(&source) {
                    ports.push(source);
                }
            }
        }
        FlowFrontier::Ports(ports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphlift_core::builtin;

    fn graph_with_branch() -> (Graph, NodeId, NodeId) {
        let mut graph = Graph::new("test");
        let branch = graph.add_node(builtin::double_branch());
        let set = graph.add_node(builtin::set_local_variable());
        (graph, branch, set)
    }

    #[test]
    fn empty_frontier() {
        let (graph, _, _) = graph_with_branch();
        let frontier = FlowFrontier::empty();
        assert!(frontier.is_empty());
        assert!(frontier.sources(&graph).is_empty());
        assert_eq!(FlowFrontier::default(), frontier);
    }

    #[test]
    fn sources_use_forced_or_default_ports() {
        let (graph, branch, set) = graph_with_branch();
        assert_eq!(
            FlowFrontier::Node(set).sources(&graph),
            vec![(set, "flow_out".to_string())]
        );
        assert_eq!(
            FlowFrontier::port(branch, "false").sources(&graph),
            vec![(branch, "false".to_string())]
        );
        // First flow output when there is no `flow_out`.
        assert_eq!(
            FlowFrontier::Node(branch).sources(&graph),
            vec![(branch, "true".to_string())]
        );
    }

    #[test]
    fn merge_keeps_every_arm() {
        let (graph, branch, set) = graph_with_branch();
        let merged = FlowFrontier::merge(
            [
                FlowFrontier::Node(set),
                FlowFrontier::empty(),
                FlowFrontier::port(branch, "false"),
            ],
            &graph,
        );
        assert_eq!(
            merged,
            FlowFrontier::Ports(vec![
                (set, "flow_out".to_string()),
                (branch, "false".to_string()),
            ])
        );
    }

    #[test]
    fn merge_of_plain_nodes_stays_plain() {
        let (graph, branch, set) = graph_with_branch();
        assert_eq!(
            FlowFrontier::merge([FlowFrontier::Node(set)], &graph),
            FlowFrontier::Node(set)
        );
        assert_eq!(
            FlowFrontier::merge([FlowFrontier::Node(set), FlowFrontier::Nodes(vec![branch])], &graph),
            FlowFrontier::Nodes(vec![set, branch])
        );
        assert!(FlowFrontier::merge([], &graph).is_empty());
    }
}
